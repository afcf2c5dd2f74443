use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    db::store::BookingStore,
    dtos::locationdtos::OptionsCriteria,
    models::locationmodel::{City, Location, Neighborhood},
    service::{
        error::ServiceError,
        filter::{BookingFilter, Predicate},
    },
};

/// Location listings and the cascading date -> guests -> nights option lists.
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn BookingStore>,
}

impl LocationService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn cities(&self) -> Result<Vec<City>, ServiceError> {
        self.store.list_cities().await
    }

    /// Cities that still have bookings from `today` on.
    pub async fn cities_with_data(&self, today: NaiveDate) -> Result<Vec<City>, ServiceError> {
        self.store.cities_with_bookings_from(today).await
    }

    pub async fn neighborhoods(
        &self,
        city_id: i64,
        with_data: bool,
        today: NaiveDate,
    ) -> Result<Vec<Neighborhood>, ServiceError> {
        if with_data {
            self.store.neighborhoods_with_bookings_from(city_id, today).await
        } else {
            self.store.list_neighborhoods(city_id).await
        }
    }

    /// Distinct check-in dates from `today` on. With two locations only the
    /// dates both offer are returned.
    pub async fn dates(
        &self,
        criteria: &OptionsCriteria,
        today: NaiveDate,
    ) -> Result<Vec<NaiveDate>, ServiceError> {
        let mut common: Option<BTreeSet<NaiveDate>> = None;
        for location in &criteria.locations {
            let filter = BookingFilter::new()
                .and_location(location)
                .and(Predicate::CheckInFrom(today));
            let dates = self.store.distinct_check_ins(&filter).await?;
            common = Some(intersect(common, dates));
        }
        Ok(common.unwrap_or_default().into_iter().collect())
    }

    /// Distinct guest counts offered on the requested check-in date.
    pub async fn guests(&self, criteria: &OptionsCriteria) -> Result<Vec<i32>, ServiceError> {
        let mut common: Option<BTreeSet<i32>> = None;
        for location in &criteria.locations {
            let filter = self.on_date(location, criteria);
            let guests = self.store.distinct_guests(&filter).await?;
            common = Some(intersect(common, guests));
        }
        Ok(common.unwrap_or_default().into_iter().collect())
    }

    /// Distinct stay lengths on the date for at least the requested guests.
    pub async fn nights(&self, criteria: &OptionsCriteria) -> Result<Vec<i64>, ServiceError> {
        let mut common: Option<BTreeSet<i64>> = None;
        for location in &criteria.locations {
            let filter = self
                .on_date(location, criteria)
                .and_if(criteria.guests.map(Predicate::MinGuests));
            let nights = self.store.distinct_nights(&filter).await?;
            common = Some(intersect(common, nights.into_iter().filter(|n| *n > 0)));
        }
        Ok(common.unwrap_or_default().into_iter().collect())
    }

    fn on_date(&self, location: &Location, criteria: &OptionsCriteria) -> BookingFilter {
        BookingFilter::new()
            .and_location(location)
            .and_if(criteria.check_in.map(Predicate::CheckInOn))
    }
}

fn intersect<T: Ord>(acc: Option<BTreeSet<T>>, values: impl IntoIterator<Item = T>) -> BTreeSet<T> {
    let values: BTreeSet<T> = values.into_iter().collect();
    match acc {
        None => values,
        Some(acc) => acc.into_iter().filter(|v| values.contains(v)).collect(),
    }
}
