// db/memory.rs
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use num_traits::ToPrimitive;
use tokio::sync::RwLock;

use super::store::{BookingOrder, BookingStore, ImportSink};
use crate::{
    dtos::importdtos::ImportRow,
    models::{
        bookingmodel::{Booking, BookingRecord, Listing, NewBooking},
        locationmodel::{City, Neighborhood},
        propertymodel::{NewProperty, Property, Review},
    },
    service::{error::ServiceError, filter::BookingFilter},
};

#[derive(Debug, Default, Clone)]
struct Tables {
    sequence: i64,
    cities: BTreeMap<i64, City>,
    neighborhoods: BTreeMap<i64, Neighborhood>,
    properties: BTreeMap<i64, Property>,
    bookings: BTreeMap<i64, Booking>,
    listings: BTreeMap<i64, Listing>,
    reviews: BTreeMap<i64, Review>,
}

fn integrity(message: impl Into<String>) -> ServiceError {
    ServiceError::DataIntegrity(message.into())
}

fn as_f64(value: &Option<BigDecimal>) -> Option<f64> {
    value.as_ref().and_then(|v| v.to_f64())
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    /// City names are unique; an existing city is returned as is, except
    /// that a missing state code gets filled in.
    fn upsert_city(&mut self, name: &str, state: &str) -> City {
        if let Some(city) = self.cities.values_mut().find(|c| c.name == name) {
            if city.state.is_empty() && !state.is_empty() {
                city.state = state.to_string();
            }
            return city.clone();
        }
        let city = City {
            id: self.next_id(),
            name: name.to_string(),
            state: state.to_string(),
        };
        self.cities.insert(city.id, city.clone());
        city
    }

    fn upsert_neighborhood(
        &mut self,
        city_id: i64,
        name: &str,
    ) -> Result<Neighborhood, ServiceError> {
        if !self.cities.contains_key(&city_id) {
            return Err(integrity(format!("city {} does not exist", city_id)));
        }
        if let Some(existing) = self
            .neighborhoods
            .values()
            .find(|n| n.city_id == city_id && n.name == name)
        {
            return Ok(existing.clone());
        }
        let neighborhood = Neighborhood {
            id: self.next_id(),
            city_id,
            name: name.to_string(),
        };
        self.neighborhoods.insert(neighborhood.id, neighborhood.clone());
        Ok(neighborhood)
    }

    fn upsert_property(&mut self, new: NewProperty) -> Result<Property, ServiceError> {
        let neighborhood = self
            .neighborhoods
            .get(&new.neighborhood_id)
            .ok_or_else(|| {
                integrity(format!("neighborhood {} does not exist", new.neighborhood_id))
            })?;
        if neighborhood.city_id != new.city_id {
            return Err(integrity(format!(
                "neighborhood {} does not belong to city {}",
                new.neighborhood_id, new.city_id
            )));
        }

        // Location stays fixed once imported; specs are refreshed when known.
        if let Some(existing) = self
            .properties
            .values_mut()
            .find(|p| p.external_id == new.external_id)
        {
            existing.accommodation_type = new.accommodation_type;
            existing.rooms = new.rooms.or(existing.rooms);
            existing.beds = new.beds.or(existing.beds);
            existing.bathrooms = new.bathrooms.or(existing.bathrooms);
            return Ok(existing.clone());
        }

        let property = Property {
            id: self.next_id(),
            external_id: new.external_id,
            accommodation_type: new.accommodation_type,
            city_id: new.city_id,
            neighborhood_id: new.neighborhood_id,
            rooms: new.rooms,
            beds: new.beds,
            bathrooms: new.bathrooms,
        };
        self.properties.insert(property.id, property.clone());
        Ok(property)
    }

    fn insert_booking(&mut self, new: NewBooking) -> Result<Booking, ServiceError> {
        if !self.properties.contains_key(&new.property_id) {
            return Err(integrity(format!("property {} does not exist", new.property_id)));
        }
        if new.guests < 1 {
            return Err(integrity("guest capacity must be positive"));
        }
        if matches!(new.check_out, Some(out) if out < new.check_in) {
            return Err(integrity("check-out precedes check-in"));
        }
        let booking = Booking {
            id: self.next_id(),
            property_id: new.property_id,
            check_in: new.check_in,
            check_out: new.check_out,
            total_price: new.total_price,
            price_per_night: new.price_per_night,
            guests: new.guests,
            link: new.link,
        };
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn import_rows(&mut self, rows: &[ImportRow]) -> Result<u64, ServiceError> {
        for row in rows {
            let city = self.upsert_city(&row.city, &row.state);
            let neighborhood = self.upsert_neighborhood(city.id, &row.neighborhood)?;
            let property = self.upsert_property(NewProperty {
                external_id: row.external_id,
                accommodation_type: row.accommodation_type.clone(),
                city_id: city.id,
                neighborhood_id: neighborhood.id,
                rooms: row.rooms,
                beds: row.beds,
                bathrooms: row.bathrooms,
            })?;
            let booking = self.insert_booking(NewBooking {
                property_id: property.id,
                check_in: row.check_in,
                check_out: Some(row.check_out),
                total_price: row.total_price.clone(),
                price_per_night: row.price_per_night.clone(),
                guests: row.guests,
                link: row.link.clone(),
            })?;

            if row.title.is_some() || !row.link.is_empty() {
                let title = row.title.clone().unwrap_or_default();
                self.insert_listing(booking.id, &title, &row.link)?;
            }

            let has_review = self.reviews.values().any(|r| r.property_id == property.id);
            if row.rating.is_some() && !has_review {
                self.insert_review(property.id, row.rating.clone(), row.review_count)?;
            }
        }
        Ok(rows.len() as u64)
    }

    fn insert_listing(
        &mut self,
        booking_id: i64,
        title: &str,
        link: &str,
    ) -> Result<Listing, ServiceError> {
        if !self.bookings.contains_key(&booking_id) {
            return Err(integrity(format!("booking {} does not exist", booking_id)));
        }
        let listing = Listing {
            id: self.next_id(),
            booking_id,
            title: title.to_string(),
            link: link.to_string(),
        };
        self.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn insert_review(
        &mut self,
        property_id: i64,
        rating: Option<BigDecimal>,
        review_count: Option<i32>,
    ) -> Result<Review, ServiceError> {
        if !self.properties.contains_key(&property_id) {
            return Err(integrity(format!("property {} does not exist", property_id)));
        }
        if let Some(r) = &rating {
            if *r < BigDecimal::from(0) || *r > BigDecimal::from(10) {
                return Err(integrity("rating must be between 0 and 10"));
            }
        }
        let review = Review {
            id: self.next_id(),
            property_id,
            rating,
            review_count,
        };
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn record(&self, booking: &Booking) -> Option<BookingRecord> {
        let property = self.properties.get(&booking.property_id)?;
        let city = self.cities.get(&property.city_id)?;
        let neighborhood = self.neighborhoods.get(&property.neighborhood_id)?;
        Some(BookingRecord {
            booking_id: booking.id,
            property_id: property.id,
            external_id: property.external_id,
            accommodation_type: property.accommodation_type.clone(),
            city_id: city.id,
            city_name: city.name.clone(),
            city_state: city.state.clone(),
            neighborhood_id: neighborhood.id,
            neighborhood_name: neighborhood.name.clone(),
            rooms: property.rooms,
            beds: property.beds,
            bathrooms: property.bathrooms,
            check_in: booking.check_in,
            check_out: booking.check_out,
            total_price: as_f64(&booking.total_price),
            price_per_night: as_f64(&booking.price_per_night),
            guests: booking.guests,
            link: booking.link.clone(),
        })
    }

    fn matching(&self, filter: &BookingFilter) -> Vec<BookingRecord> {
        let records: Vec<BookingRecord> =
            self.bookings.values().filter_map(|b| self.record(b)).collect();
        filter.apply(&records)
    }
}

fn price_order(a: &BookingRecord, b: &BookingRecord) -> Ordering {
    match (a.price_per_night, b.price_per_night) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// In-process entity store with the same integrity rules as the schema:
/// protected location deletes, cascading property and booking deletes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Direct writes and deletes for fixtures and integrity tests.
#[cfg(test)]
impl MemoryStore {
    pub async fn insert_city(&self, name: &str, state: &str) -> City {
        self.tables.write().await.upsert_city(name, state)
    }

    pub async fn insert_neighborhood(
        &self,
        city_id: i64,
        name: &str,
    ) -> Result<Neighborhood, ServiceError> {
        self.tables.write().await.upsert_neighborhood(city_id, name)
    }

    pub async fn insert_property(&self, new: NewProperty) -> Result<Property, ServiceError> {
        self.tables.write().await.upsert_property(new)
    }

    pub async fn insert_booking(&self, new: NewBooking) -> Result<Booking, ServiceError> {
        self.tables.write().await.insert_booking(new)
    }

    pub async fn insert_listing(
        &self,
        booking_id: i64,
        title: &str,
        link: &str,
    ) -> Result<Listing, ServiceError> {
        self.tables.write().await.insert_listing(booking_id, title, link)
    }

    pub async fn insert_review(
        &self,
        property_id: i64,
        rating: Option<BigDecimal>,
        review_count: Option<i32>,
    ) -> Result<Review, ServiceError> {
        self.tables.write().await.insert_review(property_id, rating, review_count)
    }

    /// Blocked while any property references the city; its neighborhoods go with it.
    pub async fn delete_city(&self, city_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if tables.properties.values().any(|p| p.city_id == city_id) {
            return Err(integrity(format!("city {} is referenced by properties", city_id)));
        }
        tables
            .cities
            .remove(&city_id)
            .ok_or_else(|| ServiceError::NotFound(format!("City {}", city_id)))?;
        tables.neighborhoods.retain(|_, n| n.city_id != city_id);
        Ok(())
    }

    pub async fn delete_neighborhood(&self, neighborhood_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        if tables.properties.values().any(|p| p.neighborhood_id == neighborhood_id) {
            return Err(integrity(format!(
                "neighborhood {} is referenced by properties",
                neighborhood_id
            )));
        }
        tables
            .neighborhoods
            .remove(&neighborhood_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Neighborhood {}", neighborhood_id)))
    }

    pub async fn delete_property(&self, property_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables
            .properties
            .remove(&property_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Property {}", property_id)))?;
        let booking_ids: BTreeSet<i64> = tables
            .bookings
            .values()
            .filter(|b| b.property_id == property_id)
            .map(|b| b.id)
            .collect();
        tables.bookings.retain(|id, _| !booking_ids.contains(id));
        tables.listings.retain(|_, l| !booking_ids.contains(&l.booking_id));
        tables.reviews.retain(|_, r| r.property_id != property_id);
        Ok(())
    }

    pub async fn delete_booking(&self, booking_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables
            .bookings
            .remove(&booking_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {}", booking_id)))?;
        tables.listings.retain(|_, l| l.booking_id != booking_id);
        Ok(())
    }

    pub async fn booking_count(&self) -> usize {
        self.tables.read().await.bookings.len()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn list_cities(&self) -> Result<Vec<City>, ServiceError> {
        let tables = self.tables.read().await;
        let mut cities: Vec<City> = tables.cities.values().cloned().collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cities)
    }

    async fn list_neighborhoods(&self, city_id: i64) -> Result<Vec<Neighborhood>, ServiceError> {
        let tables = self.tables.read().await;
        let mut neighborhoods: Vec<Neighborhood> = tables
            .neighborhoods
            .values()
            .filter(|n| n.city_id == city_id)
            .cloned()
            .collect();
        neighborhoods.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(neighborhoods)
    }

    async fn find_city(&self, city_id: i64) -> Result<Option<City>, ServiceError> {
        Ok(self.tables.read().await.cities.get(&city_id).cloned())
    }

    async fn find_neighborhood(
        &self,
        neighborhood_id: i64,
    ) -> Result<Option<Neighborhood>, ServiceError> {
        Ok(self.tables.read().await.neighborhoods.get(&neighborhood_id).cloned())
    }

    async fn cities_with_bookings_from(&self, from: NaiveDate) -> Result<Vec<City>, ServiceError> {
        let ids: BTreeSet<i64> = {
            let tables = self.tables.read().await;
            tables
                .bookings
                .values()
                .filter(|b| b.check_in >= from)
                .filter_map(|b| tables.properties.get(&b.property_id))
                .map(|p| p.city_id)
                .collect()
        };
        let mut cities = self.list_cities().await?;
        cities.retain(|c| ids.contains(&c.id));
        Ok(cities)
    }

    async fn neighborhoods_with_bookings_from(
        &self,
        city_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<Neighborhood>, ServiceError> {
        let ids: BTreeSet<i64> = {
            let tables = self.tables.read().await;
            tables
                .bookings
                .values()
                .filter(|b| b.check_in >= from)
                .filter_map(|b| tables.properties.get(&b.property_id))
                .map(|p| p.neighborhood_id)
                .collect()
        };
        let mut neighborhoods = self.list_neighborhoods(city_id).await?;
        neighborhoods.retain(|n| ids.contains(&n.id));
        Ok(neighborhoods)
    }

    async fn fetch_bookings(
        &self,
        filter: &BookingFilter,
        order: BookingOrder,
        limit: Option<i64>,
    ) -> Result<Vec<BookingRecord>, ServiceError> {
        let mut records = self.tables.read().await.matching(filter);
        match order {
            BookingOrder::CheckIn => records.sort_by(|a, b| {
                a.check_in.cmp(&b.check_in).then(a.booking_id.cmp(&b.booking_id))
            }),
            BookingOrder::PricePerNight => {
                records.sort_by(|a, b| price_order(a, b).then(a.booking_id.cmp(&b.booking_id)))
            }
        }
        if let Some(limit) = limit {
            records.truncate(limit.max(0) as usize);
        }
        Ok(records)
    }

    async fn fetch_listings(&self, booking_ids: &[i64]) -> Result<Vec<Listing>, ServiceError> {
        let wanted: BTreeSet<i64> = booking_ids.iter().copied().collect();
        let tables = self.tables.read().await;
        let mut listings: Vec<Listing> = tables
            .listings
            .values()
            .filter(|l| wanted.contains(&l.booking_id))
            .cloned()
            .collect();
        listings.sort_by(|a, b| a.booking_id.cmp(&b.booking_id).then(a.id.cmp(&b.id)));
        Ok(listings)
    }

    async fn fetch_reviews(&self, property_ids: &[i64]) -> Result<Vec<Review>, ServiceError> {
        let wanted: BTreeSet<i64> = property_ids.iter().copied().collect();
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .values()
            .filter(|r| wanted.contains(&r.property_id))
            .cloned()
            .collect();
        // Rating descending, unrated last.
        reviews.sort_by(|a, b| match (&a.rating, &b.rating) {
            (Some(x), Some(y)) => y.cmp(x).then(a.id.cmp(&b.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        Ok(reviews)
    }

    async fn distinct_check_ins(
        &self,
        filter: &BookingFilter,
    ) -> Result<Vec<NaiveDate>, ServiceError> {
        let records = self.tables.read().await.matching(filter);
        let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.check_in).collect();
        Ok(dates.into_iter().collect())
    }

    async fn distinct_guests(&self, filter: &BookingFilter) -> Result<Vec<i32>, ServiceError> {
        let records = self.tables.read().await.matching(filter);
        let guests: BTreeSet<i32> = records.iter().map(|r| r.guests).collect();
        Ok(guests.into_iter().collect())
    }

    async fn distinct_nights(&self, filter: &BookingFilter) -> Result<Vec<i64>, ServiceError> {
        let records = self.tables.read().await.matching(filter);
        let nights: BTreeSet<i64> = records
            .iter()
            .filter_map(|r| r.nights())
            .filter(|n| *n > 0)
            .collect();
        Ok(nights.into_iter().collect())
    }
}

#[async_trait]
impl ImportSink for MemoryStore {
    /// All or nothing per batch, like the database transaction.
    async fn import_batch(&self, rows: &[ImportRow]) -> Result<u64, ServiceError> {
        let mut tables = self.tables.write().await;
        let snapshot = tables.clone();
        tables.import_rows(rows).map_err(|e| {
            *tables = snapshot;
            e
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::service::filter::Predicate;

    #[tokio::test]
    async fn city_names_are_unique() {
        let store = MemoryStore::new();
        let first = store.insert_city("Gramado", "RS").await;
        let second = store.insert_city("Gramado", "RS").await;
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_cities().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn property_must_sit_in_its_neighborhoods_city() {
        let sample = sample().await;
        let result = sample
            .store
            .insert_property(NewProperty {
                external_id: 999,
                accommodation_type: "Casa".into(),
                city_id: sample.gramado.id,
                neighborhood_id: sample.lagoa.id,
                rooms: None,
                beds: None,
                bathrooms: None,
            })
            .await;
        assert!(matches!(result, Err(ServiceError::DataIntegrity(_))));
    }

    #[tokio::test]
    async fn referenced_locations_cannot_be_deleted() {
        let sample = sample().await;
        assert!(matches!(
            sample.store.delete_city(sample.gramado.id).await,
            Err(ServiceError::DataIntegrity(_))
        ));
        assert!(matches!(
            sample.store.delete_neighborhood(sample.lagoa.id).await,
            Err(ServiceError::DataIntegrity(_))
        ));

        let empty = sample.store.insert_neighborhood(sample.gramado.id, "Planalto").await.unwrap();
        sample.store.delete_neighborhood(empty.id).await.unwrap();
    }

    #[tokio::test]
    async fn deleting_an_unreferenced_city_takes_its_neighborhoods() {
        let store = MemoryStore::new();
        let city = store.insert_city("Canela", "RS").await;
        store.insert_neighborhood(city.id, "Centro").await.unwrap();
        store.delete_city(city.id).await.unwrap();
        assert!(store.list_neighborhoods(city.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_property_cascades() {
        let sample = sample().await;
        let before = sample.store.booking_count().await;
        let lagoa = BookingFilter::new().and(Predicate::Neighborhood(sample.lagoa.id));
        let record = sample
            .store
            .fetch_bookings(&lagoa, BookingOrder::CheckIn, Some(1))
            .await
            .unwrap()
            .remove(0);

        sample.store.delete_property(record.property_id).await.unwrap();

        assert_eq!(sample.store.booking_count().await, before - 1);
        assert!(sample.store.fetch_listings(&[record.booking_id]).await.unwrap().is_empty());
        assert!(sample.store.fetch_reviews(&[record.property_id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_booking_removes_its_listing() {
        let sample = sample().await;
        let records = sample
            .store
            .fetch_bookings(&BookingFilter::new(), BookingOrder::CheckIn, None)
            .await
            .unwrap();
        let booking_id = records[0].booking_id;
        sample.store.delete_booking(booking_id).await.unwrap();
        assert!(sample.store.fetch_listings(&[booking_id]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn price_order_is_ascending_with_limit() {
        let sample = sample().await;
        let records = sample
            .store
            .fetch_bookings(&BookingFilter::new(), BookingOrder::PricePerNight, Some(3))
            .await
            .unwrap();
        let prices: Vec<Option<f64>> = records.iter().map(|r| r.price_per_night).collect();
        assert_eq!(prices, vec![Some(100.0), Some(150.0), Some(200.0)]);
    }

    #[tokio::test]
    async fn reviews_come_back_best_first() {
        let sample = sample().await;
        let records = sample
            .store
            .fetch_bookings(&BookingFilter::new(), BookingOrder::CheckIn, None)
            .await
            .unwrap();
        let property_ids: Vec<i64> = records.iter().map(|r| r.property_id).collect();
        let reviews = sample.store.fetch_reviews(&property_ids).await.unwrap();
        let ratings: Vec<String> = reviews
            .iter()
            .map(|r| r.rating.as_ref().map(|v| v.to_string()).unwrap_or_default())
            .collect();
        assert_eq!(ratings, vec!["9.5", "8.0", "7.2"]);
    }

    #[tokio::test]
    async fn distinct_lookups_are_sorted_and_unique() {
        let sample = sample().await;
        let florianopolis = BookingFilter::new().and(Predicate::City(sample.florianopolis.id));
        assert_eq!(
            sample.store.distinct_check_ins(&florianopolis).await.unwrap(),
            vec![check_in()]
        );
        assert_eq!(sample.store.distinct_guests(&florianopolis).await.unwrap(), vec![2, 4]);
        assert_eq!(sample.store.distinct_nights(&florianopolis).await.unwrap(), vec![3]);
        assert!(sample.store.distinct_guests(&BookingFilter::none()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn locations_with_future_bookings() {
        let sample = sample().await;
        let cities = sample.store.cities_with_bookings_from(today()).await.unwrap();
        assert_eq!(cities.len(), 2);

        sample.store.insert_neighborhood(sample.gramado.id, "Planalto").await.unwrap();
        let neighborhoods = sample
            .store
            .neighborhoods_with_bookings_from(sample.gramado.id, today())
            .await
            .unwrap();
        assert_eq!(neighborhoods, vec![sample.centro_gramado.clone()]);

        let later = check_in() + chrono::Duration::days(1);
        assert!(sample.store.cities_with_bookings_from(later).await.unwrap().is_empty());
    }

    fn import_row(external_id: i64, city: &str, nights: i64) -> ImportRow {
        ImportRow {
            line: 2,
            external_id,
            title: Some("Casa".into()),
            accommodation_type: "Casa inteira".into(),
            city: city.into(),
            state: "RS".into(),
            neighborhood: "Centro".into(),
            check_in: check_in(),
            check_out: check_in() + chrono::Duration::days(nights),
            guests: 2,
            total_price: None,
            price_per_night: None,
            rooms: Some(1),
            beds: None,
            bathrooms: None,
            rating: None,
            review_count: None,
            link: String::new(),
        }
    }

    #[tokio::test]
    async fn failed_batch_leaves_no_trace() {
        let store = MemoryStore::new();
        // Check-out before check-in violates the booking check.
        let rows = vec![import_row(1, "Canela", 3), import_row(2, "Gramado", -1)];
        assert!(matches!(
            store.import_batch(&rows).await,
            Err(ServiceError::DataIntegrity(_))
        ));
        assert_eq!(store.booking_count().await, 0);
        assert!(store.list_cities().await.unwrap().is_empty());

        assert_eq!(store.import_batch(&rows[..1]).await.unwrap(), 1);
        assert_eq!(store.booking_count().await, 1);
    }
}
