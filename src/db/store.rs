// db/store.rs
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    dtos::importdtos::ImportRow,
    models::{
        bookingmodel::{BookingRecord, Listing},
        locationmodel::{City, Neighborhood},
        propertymodel::Review,
    },
    service::{error::ServiceError, filter::BookingFilter},
};

/// Row order for `fetch_bookings`. Both end with the booking id so that
/// repeated reads page identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingOrder {
    CheckIn,
    /// Ascending, bookings without a nightly price last.
    PricePerNight,
}

/// Read side of the entity store. Every engine service talks to this.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn list_cities(&self) -> Result<Vec<City>, ServiceError>;

    async fn list_neighborhoods(&self, city_id: i64) -> Result<Vec<Neighborhood>, ServiceError>;

    async fn find_city(&self, city_id: i64) -> Result<Option<City>, ServiceError>;

    async fn find_neighborhood(
        &self,
        neighborhood_id: i64,
    ) -> Result<Option<Neighborhood>, ServiceError>;

    /// Cities with at least one booking checking in on or after `from`.
    async fn cities_with_bookings_from(&self, from: NaiveDate) -> Result<Vec<City>, ServiceError>;

    async fn neighborhoods_with_bookings_from(
        &self,
        city_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<Neighborhood>, ServiceError>;

    /// Joined, deduplicated booking rows matching `filter`.
    async fn fetch_bookings(
        &self,
        filter: &BookingFilter,
        order: BookingOrder,
        limit: Option<i64>,
    ) -> Result<Vec<BookingRecord>, ServiceError>;

    /// One batched read for all listings of the given bookings.
    async fn fetch_listings(&self, booking_ids: &[i64]) -> Result<Vec<Listing>, ServiceError>;

    /// One batched read for all reviews of the given properties, best rating first.
    async fn fetch_reviews(&self, property_ids: &[i64]) -> Result<Vec<Review>, ServiceError>;

    async fn distinct_check_ins(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<NaiveDate>, ServiceError>;

    async fn distinct_guests(&self, filter: &BookingFilter) -> Result<Vec<i32>, ServiceError>;

    /// Positive stay lengths only; open-ended bookings are skipped.
    async fn distinct_nights(&self, filter: &BookingFilter) -> Result<Vec<i64>, ServiceError>;
}

/// Write side used only by the bulk import.
#[async_trait]
pub trait ImportSink: Send + Sync {
    /// Upsert locations and properties, then insert bookings, listings and
    /// reviews for one batch. Returns the number of bookings written.
    async fn import_batch(&self, rows: &[ImportRow]) -> Result<u64, ServiceError>;
}
