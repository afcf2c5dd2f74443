use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::{
    dtos::searchdtos::SearchQueryDto,
    models::{bookingmodel::BookingRecord, locationmodel::Location},
    service::aggregator::Category,
};

/// Highest selectable "N+" tier for each specification filter.
pub const ROOM_TIER_CAP: i32 = 5;
pub const BED_TIER_CAP: i32 = 5;
pub const BATHROOM_TIER_CAP: i32 = 3;

/// A single condition over a booking record.
///
/// Each variant has an in-memory meaning (`matches`) and a SQL rendering
/// (`push_sql`); the two must always agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    City(i64),
    Neighborhood(i64),
    CheckInOn(NaiveDate),
    CheckInFrom(NaiveDate),
    /// Inclusive on both ends.
    CheckInBetween(NaiveDate, NaiveDate),
    CheckInYear(i32),
    CheckInMonth { year: i32, month: u32 },
    MinGuests(i32),
    /// checkout - checkin must equal this many days.
    ExactNights(i64),
    MinRooms(i32),
    MinBeds(i32),
    MinBathrooms(i32),
    MaxNightlyPrice(f64),
    HasCategory(Category),
}

fn at_least(value: Option<i32>, floor: i32) -> bool {
    matches!(value, Some(v) if v >= floor)
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - Duration::days(1)))
}

fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

impl Predicate {
    pub fn matches(&self, record: &BookingRecord) -> bool {
        match self {
            Predicate::City(id) => record.city_id == *id,
            Predicate::Neighborhood(id) => record.neighborhood_id == *id,
            Predicate::CheckInOn(date) => record.check_in == *date,
            Predicate::CheckInFrom(date) => record.check_in >= *date,
            Predicate::CheckInBetween(start, end) => {
                record.check_in >= *start && record.check_in <= *end
            }
            Predicate::CheckInYear(year) => record.check_in.year() == *year,
            Predicate::CheckInMonth { year, month } => {
                record.check_in.year() == *year && record.check_in.month() == *month
            }
            Predicate::MinGuests(guests) => record.guests >= *guests,
            Predicate::ExactNights(nights) => record.nights() == Some(*nights),
            Predicate::MinRooms(rooms) => at_least(record.rooms, *rooms),
            Predicate::MinBeds(beds) => at_least(record.beds, *beds),
            Predicate::MinBathrooms(baths) => at_least(record.bathrooms, *baths),
            Predicate::MaxNightlyPrice(max) => {
                matches!(record.price_per_night, Some(price) if price <= *max)
            }
            Predicate::HasCategory(category) => category.value_of(record).is_some(),
        }
    }

    /// Append ` AND <condition>` using the `b` (bookings) and `p`
    /// (properties) aliases of the store's joined query.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Predicate::City(id) => {
                qb.push(" AND p.city_id = ").push_bind(*id);
            }
            Predicate::Neighborhood(id) => {
                qb.push(" AND p.neighborhood_id = ").push_bind(*id);
            }
            Predicate::CheckInOn(date) => {
                qb.push(" AND b.check_in = ").push_bind(*date);
            }
            Predicate::CheckInFrom(date) => {
                qb.push(" AND b.check_in >= ").push_bind(*date);
            }
            Predicate::CheckInBetween(start, end) => {
                push_date_range(qb, *start, *end);
            }
            Predicate::CheckInYear(year) => match year_bounds(*year) {
                Some((start, end)) => push_date_range(qb, start, end),
                None => {
                    qb.push(" AND FALSE");
                }
            },
            Predicate::CheckInMonth { year, month } => match month_bounds(*year, *month) {
                Some((start, end)) => push_date_range(qb, start, end),
                None => {
                    qb.push(" AND FALSE");
                }
            },
            Predicate::MinGuests(guests) => {
                qb.push(" AND b.guests >= ").push_bind(*guests);
            }
            Predicate::ExactNights(nights) => {
                qb.push(" AND b.check_out IS NOT NULL AND (b.check_out - b.check_in) = ")
                    .push_bind(*nights as i32);
            }
            Predicate::MinRooms(rooms) => {
                qb.push(" AND p.rooms >= ").push_bind(*rooms);
            }
            Predicate::MinBeds(beds) => {
                qb.push(" AND p.beds >= ").push_bind(*beds);
            }
            Predicate::MinBathrooms(baths) => {
                qb.push(" AND p.bathrooms >= ").push_bind(*baths);
            }
            Predicate::MaxNightlyPrice(max) => {
                qb.push(" AND b.price_per_night::float8 <= ").push_bind(*max);
            }
            Predicate::HasCategory(Category::Rooms) => {
                qb.push(" AND p.rooms IS NOT NULL");
            }
            Predicate::HasCategory(Category::Beds) => {
                qb.push(" AND p.beds IS NOT NULL");
            }
        }
    }
}

fn push_date_range(qb: &mut QueryBuilder<'_, Postgres>, start: NaiveDate, end: NaiveDate) {
    qb.push(" AND b.check_in BETWEEN ")
        .push_bind(start)
        .push(" AND ")
        .push_bind(end);
}

/// A conjunction of predicates over bookings.
///
/// `BookingFilter::none()` is the explicit empty result: it matches nothing,
/// which is what an invalid search produces instead of an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingFilter {
    predicates: Vec<Predicate>,
    matches_nothing: bool,
}

impl BookingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn none() -> Self {
        Self {
            predicates: Vec::new(),
            matches_nothing: true,
        }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn and_if(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(predicate) => self.and(predicate),
            None => self,
        }
    }

    /// Neighborhood wins over city when both are present.
    pub fn and_location(self, location: &Location) -> Self {
        match location.neighborhood_id {
            Some(neighborhood_id) => self.and(Predicate::Neighborhood(neighborhood_id)),
            None => self.and(Predicate::City(location.city_id)),
        }
    }

    pub fn is_none(&self) -> bool {
        self.matches_nothing
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, record: &BookingRecord) -> bool {
        !self.matches_nothing && self.predicates.iter().all(|p| p.matches(record))
    }

    /// Filter an iterator of records, keeping the first occurrence of each
    /// booking so join fan-out can never repeat a booking.
    pub fn apply<'a, I>(&self, records: I) -> Vec<BookingRecord>
    where
        I: IntoIterator<Item = &'a BookingRecord>,
    {
        if self.matches_nothing {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|r| self.matches(r))
            .filter(|r| seen.insert(r.booking_id))
            .cloned()
            .collect()
    }

    /// Append the WHERE conditions. The caller's SQL must already contain a
    /// `WHERE TRUE` (or another condition) for the ` AND ...` fragments.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if self.matches_nothing {
            qb.push(" AND FALSE");
            return;
        }
        for predicate in &self.predicates {
            predicate.push_sql(qb);
        }
    }
}

/// Map an "N+" choice onto the `>= N` predicate value. The top tier is
/// already `>= cap`, so a request at or above the cap collapses onto it.
pub fn tier_floor(requested: i32, cap: i32) -> i32 {
    if requested >= cap {
        cap
    } else {
        requested
    }
}

/// Validated search parameters. Built by `SearchQueryDto::into_criteria`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub location: Location,
    pub check_in: NaiveDate,
    pub guests: i32,
    pub nights: i64,
    pub min_rooms: Option<i32>,
    pub min_beds: Option<i32>,
    pub min_bathrooms: Option<i32>,
    pub max_price: Option<f64>,
}

pub struct FilterBuilder;

impl FilterBuilder {
    /// Build the search predicate straight from user input.
    /// Invalid input yields `BookingFilter::none()` rather than an error.
    pub fn from_query(query: &SearchQueryDto, today: NaiveDate) -> BookingFilter {
        match query.clone().into_criteria(today) {
            Ok(criteria) => Self::search(&criteria),
            Err(errors) => {
                tracing::debug!("search criteria rejected, returning empty filter: {}", errors);
                BookingFilter::none()
            }
        }
    }

    pub fn search(criteria: &SearchCriteria) -> BookingFilter {
        BookingFilter::new()
            .and_location(&criteria.location)
            .and(Predicate::CheckInOn(criteria.check_in))
            .and(Predicate::MinGuests(criteria.guests))
            .and(Predicate::ExactNights(criteria.nights))
            .and_if(
                criteria
                    .min_rooms
                    .map(|r| Predicate::MinRooms(tier_floor(r, ROOM_TIER_CAP))),
            )
            .and_if(
                criteria
                    .min_beds
                    .map(|b| Predicate::MinBeds(tier_floor(b, BED_TIER_CAP))),
            )
            .and_if(
                criteria
                    .min_bathrooms
                    .map(|b| Predicate::MinBathrooms(tier_floor(b, BATHROOM_TIER_CAP))),
            )
            .and_if(criteria.max_price.map(Predicate::MaxNightlyPrice))
    }

    /// Month-of-check-in trend: location, guest threshold and one category,
    /// without the nights, price and room/bed filters of the main search.
    pub fn daily_trend(criteria: &SearchCriteria, category: Category) -> BookingFilter {
        BookingFilter::new()
            .and_location(&criteria.location)
            .and(Predicate::MinGuests(criteria.guests))
            .and(Predicate::CheckInMonth {
                year: criteria.check_in.year(),
                month: criteria.check_in.month(),
            })
            .and(Predicate::HasCategory(category))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn record(booking_id: i64) -> BookingRecord {
        BookingRecord {
            booking_id,
            property_id: booking_id,
            external_id: 1000 + booking_id,
            accommodation_type: "Apartamento inteiro".into(),
            city_id: 1,
            city_name: "Florianópolis".into(),
            city_state: "SC".into(),
            neighborhood_id: 10,
            neighborhood_name: "Lagoa".into(),
            rooms: Some(2),
            beds: Some(2),
            bathrooms: Some(1),
            check_in: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2030, 1, 13),
            total_price: Some(300.0),
            price_per_night: Some(100.0),
            guests: 2,
            link: format!("https://example.com/rooms/{}", booking_id),
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            location: Location::city(1),
            check_in: NaiveDate::from_ymd_opt(2030, 1, 10).unwrap(),
            guests: 2,
            nights: 3,
            min_rooms: None,
            min_beds: None,
            min_bathrooms: None,
            max_price: None,
        }
    }

    #[test]
    fn nights_filter_is_an_exact_match() {
        let mut five_nights = record(1);
        five_nights.check_out = NaiveDate::from_ymd_opt(2030, 1, 15);

        for requested in [4, 6] {
            let filter = BookingFilter::new().and(Predicate::ExactNights(requested));
            assert!(!filter.matches(&five_nights), "nights={} must not match", requested);
        }
        let filter = BookingFilter::new().and(Predicate::ExactNights(5));
        assert!(filter.matches(&five_nights));
    }

    #[test]
    fn open_ended_bookings_never_match_a_duration() {
        let mut open = record(1);
        open.check_out = None;
        assert!(!Predicate::ExactNights(3).matches(&open));
    }

    #[test]
    fn room_filter_is_an_inclusive_lower_bound() {
        let filter = BookingFilter::new().and(Predicate::MinRooms(2));
        let cases = [
            (Some(1), false),
            (Some(2), true),
            (Some(3), true),
            (Some(4), true),
            (Some(9), true),
            (None, false),
        ];
        for (rooms, expected) in cases {
            let mut r = record(1);
            r.rooms = rooms;
            assert_eq!(filter.matches(&r), expected, "rooms={:?}", rooms);
        }
    }

    #[test]
    fn guest_filter_is_an_inclusive_lower_bound() {
        let mut r = record(1);
        r.guests = 4;
        assert!(Predicate::MinGuests(4).matches(&r));
        assert!(Predicate::MinGuests(3).matches(&r));
        assert!(!Predicate::MinGuests(5).matches(&r));
    }

    #[test]
    fn top_tiers_collapse_to_their_cap() {
        assert_eq!(tier_floor(5, ROOM_TIER_CAP), 5);
        assert_eq!(tier_floor(7, ROOM_TIER_CAP), 5);
        assert_eq!(tier_floor(2, ROOM_TIER_CAP), 2);
        assert_eq!(tier_floor(3, BATHROOM_TIER_CAP), 3);
        assert_eq!(tier_floor(4, BATHROOM_TIER_CAP), 3);
    }

    #[test]
    fn price_filter_excludes_unpriced_bookings() {
        let mut unpriced = record(1);
        unpriced.price_per_night = None;
        let filter = BookingFilter::new().and(Predicate::MaxNightlyPrice(150.0));
        assert!(!filter.matches(&unpriced));
        assert!(filter.matches(&record(2)));

        let mut pricey = record(3);
        pricey.price_per_night = Some(150.01);
        assert!(!filter.matches(&pricey));
    }

    #[test]
    fn neighborhood_takes_precedence_over_city() {
        let filter = BookingFilter::new().and_location(&Location::neighborhood(1, 11));
        assert_eq!(filter.predicates(), &[Predicate::Neighborhood(11)]);
        assert!(!filter.matches(&record(1)));
    }

    #[test]
    fn apply_deduplicates_fanned_out_rows() {
        let rows = vec![record(1), record(1), record(2), record(1)];
        let kept = BookingFilter::new().apply(&rows);
        let ids: Vec<i64> = kept.iter().map(|r| r.booking_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn none_filter_matches_nothing() {
        let rows = vec![record(1), record(2)];
        assert!(BookingFilter::none().apply(&rows).is_empty());
    }

    #[test]
    fn search_filter_scenario_guest_threshold() {
        let mut a = record(1);
        a.price_per_night = Some(100.0);
        let mut b = record(2);
        b.price_per_night = Some(150.0);
        let rows = vec![a, b];

        let found = FilterBuilder::search(&criteria()).apply(&rows);
        assert_eq!(found.len(), 2);

        let three_guests = SearchCriteria { guests: 3, ..criteria() };
        assert!(FilterBuilder::search(&three_guests).apply(&rows).is_empty());
    }

    #[test]
    fn month_predicate_handles_december() {
        let mut r = record(1);
        r.check_in = NaiveDate::from_ymd_opt(2030, 12, 31).unwrap();
        assert!(Predicate::CheckInMonth { year: 2030, month: 12 }.matches(&r));
        assert_eq!(
            month_bounds(2030, 12),
            Some((
                NaiveDate::from_ymd_opt(2030, 12, 1).unwrap(),
                NaiveDate::from_ymd_opt(2030, 12, 31).unwrap()
            ))
        );
    }

    #[test]
    fn sql_rendering_binds_every_predicate() {
        let filter = FilterBuilder::search(&SearchCriteria {
            min_rooms: Some(5),
            max_price: Some(300.0),
            ..criteria()
        });
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT 1 FROM bookings b JOIN properties p ON p.id = b.property_id WHERE TRUE",
        );
        filter.push_where(&mut qb);
        let sql = qb.sql();
        assert!(sql.contains("p.city_id = $1"));
        assert!(sql.contains("b.check_in = $2"));
        assert!(sql.contains("b.guests >= $3"));
        assert!(sql.contains("(b.check_out - b.check_in) = $4"));
        assert!(sql.contains("p.rooms >= $5"));
        assert!(sql.contains("b.price_per_night::float8 <= $6"));
    }

    #[test]
    fn sql_rendering_of_none_filter_is_false() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 WHERE TRUE");
        BookingFilter::none().push_where(&mut qb);
        assert!(qb.sql().ends_with("AND FALSE"));
    }
}
