use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    config::CacheTtl,
    db::{
        cache::{namespace, CacheHelper, CacheKey, QueryCache},
        store::{BookingOrder, BookingStore},
    },
    dtos::comparisondtos::ComparisonCriteria,
    models::{
        bookingmodel::BookingRecord,
        locationmodel::{Location, LocationKind},
    },
    service::{
        aggregator::{self, BucketStat, Category, MonthlyTrendPoint, PriceSummary},
        error::ServiceError,
        filter::{BookingFilter, Predicate},
        search_service::first_listings,
    },
    utils::decimal::{round_to, BigDecimalHelpers},
};

pub const TOP_CHEAPEST: usize = 10;

/// Below this percentage difference the two sides count as equally priced.
pub const SIMILAR_PRICE_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSummary {
    pub kind: LocationKind,
    pub id: i64,
    pub city_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheapOption {
    pub property_id: i64,
    pub external_id: i64,
    pub accommodation_type: String,
    pub neighborhood: String,
    pub rooms: Option<i32>,
    pub beds: Option<i32>,
    pub listing_title: Option<String>,
    pub listing_link: Option<String>,
    pub average_price: f64,
    pub average_rating: Option<f64>,
    pub average_review_count: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSide {
    pub location: LocationSummary,
    pub yearly_by_rooms: Vec<MonthlyTrendPoint>,
    pub yearly_by_beds: Vec<MonthlyTrendPoint>,
    pub same_day_by_rooms: Vec<BucketStat>,
    pub same_day_by_beds: Vec<BucketStat>,
    pub top_cheapest: Vec<CheapOption>,
    pub statistics: PriceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Computed {
        price_difference_percent: f64,
        /// 1 or 2; `None` when both averages are equal.
        cheaper_location: Option<u8>,
        cheaper_location_name: Option<String>,
        savings_per_night: f64,
        savings_total: f64,
        property_difference: i64,
        recommendation: String,
    },
    InsufficientData {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateChartSide {
    pub name: String,
    pub by_rooms: Vec<BucketStat>,
    pub by_beds: Vec<BucketStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateChart {
    pub check_in: NaiveDate,
    pub location_1: DateChartSide,
    pub location_2: DateChartSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub criteria: ComparisonCriteria,
    pub location_1: ComparisonSide,
    pub location_2: ComparisonSide,
    pub comparison: ComparisonOutcome,
    pub date_chart: DateChart,
}

#[derive(Serialize)]
struct ComparisonKey<'a> {
    criteria: &'a ComparisonCriteria,
    year: i32,
}

/// Cross-side figures from each side's unrounded mean nightly price; only
/// the outputs are rounded. The percentage divides by the cheaper side's
/// price, so swapping the two sides changes only which one is named cheaper.
pub fn synthesize(
    side_1: &ComparisonSide,
    price_1: f64,
    side_2: &ComparisonSide,
    price_2: f64,
    nights: i64,
) -> ComparisonOutcome {

    if price_1 <= 0.0 || price_2 <= 0.0 {
        return ComparisonOutcome::InsufficientData {
            message: "Insufficient data to compare these locations".to_string(),
        };
    }

    let difference = (price_2 - price_1).abs();
    let percent = difference / price_1.min(price_2) * 100.0;

    let cheaper = match price_1.partial_cmp(&price_2) {
        Some(Ordering::Less) => Some((1u8, side_1, side_2)),
        Some(Ordering::Greater) => Some((2u8, side_2, side_1)),
        _ => None,
    };

    let recommendation = match cheaper {
        Some((_, cheap, dear)) if percent >= SIMILAR_PRICE_PERCENT => format!(
            "{} is {:.1}% cheaper than {}, saving on average R$ {:.2} per night.",
            cheap.location.name, percent, dear.location.name, difference
        ),
        _ => format!(
            "Prices are very similar between {} and {} ({:.1}% difference). \
             Consider other factors such as location and amenities.",
            side_1.location.name, side_2.location.name, percent
        ),
    };

    ComparisonOutcome::Computed {
        price_difference_percent: round_to(percent, 2),
        cheaper_location: cheaper.map(|(index, _, _)| index),
        cheaper_location_name: cheaper.map(|(_, side, _)| side.location.name.clone()),
        savings_per_night: round_to(difference, 2),
        savings_total: round_to(difference * nights as f64, 2),
        property_difference: side_2.statistics.property_count as i64
            - side_1.statistics.property_count as i64,
        recommendation,
    }
}

#[derive(Default)]
struct CheapAcc {
    price_sum: f64,
    priced: usize,
    first: Option<BookingRecord>,
}

#[derive(Clone)]
pub struct ComparisonService {
    store: Arc<dyn BookingStore>,
    cache: Arc<dyn QueryCache>,
    ttl: CacheTtl,
}

impl ComparisonService {
    pub fn new(store: Arc<dyn BookingStore>, cache: Arc<dyn QueryCache>, ttl: CacheTtl) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn compare(
        &self,
        criteria: &ComparisonCriteria,
        today: NaiveDate,
    ) -> Result<ComparisonReport, ServiceError> {
        let key = CacheKey::new(
            namespace::COMPARISON,
            &ComparisonKey { criteria, year: today.year() },
        )?;
        CacheHelper::get_or_compute(self.cache.as_ref(), &key, self.ttl.search, || {
            self.compute(criteria, today.year())
        })
        .await
    }

    async fn compute(
        &self,
        criteria: &ComparisonCriteria,
        year: i32,
    ) -> Result<ComparisonReport, ServiceError> {
        let (location_1, location_2) = tokio::try_join!(
            self.describe(&criteria.location_1),
            self.describe(&criteria.location_2)
        )?;

        let ((side_1, price_1), (side_2, price_2)) = tokio::try_join!(
            self.side(location_1, &criteria.location_1, criteria, year),
            self.side(location_2, &criteria.location_2, criteria, year)
        )?;

        let comparison = synthesize(&side_1, price_1, &side_2, price_2, criteria.nights);
        tracing::debug!(
            "compared {} with {}: {:?}",
            side_1.location.name,
            side_2.location.name,
            comparison
        );

        let date_chart = DateChart {
            check_in: criteria.check_in,
            location_1: DateChartSide {
                name: side_1.location.name.clone(),
                by_rooms: side_1.same_day_by_rooms.clone(),
                by_beds: side_1.same_day_by_beds.clone(),
            },
            location_2: DateChartSide {
                name: side_2.location.name.clone(),
                by_rooms: side_2.same_day_by_rooms.clone(),
                by_beds: side_2.same_day_by_beds.clone(),
            },
        };

        Ok(ComparisonReport {
            criteria: criteria.clone(),
            location_1: side_1,
            location_2: side_2,
            comparison,
            date_chart,
        })
    }

    /// City as "Name, ST", neighborhood as "Name, City".
    pub async fn describe(&self, location: &Location) -> Result<LocationSummary, ServiceError> {
        match location.neighborhood_id {
            Some(neighborhood_id) => {
                let neighborhood = self
                    .store
                    .find_neighborhood(neighborhood_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Neighborhood {}", neighborhood_id))
                    })?;
                let city = self
                    .store
                    .find_city(neighborhood.city_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("City {}", neighborhood.city_id))
                    })?;
                Ok(LocationSummary {
                    kind: LocationKind::Neighborhood,
                    id: neighborhood.id,
                    city_id: city.id,
                    name: format!("{}, {}", neighborhood.name, city.name),
                })
            }
            None => {
                let city = self
                    .store
                    .find_city(location.city_id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("City {}", location.city_id)))?;
                Ok(LocationSummary {
                    kind: LocationKind::City,
                    id: city.id,
                    city_id: city.id,
                    name: city.display_name(),
                })
            }
        }
    }

    async fn side(
        &self,
        summary: LocationSummary,
        location: &Location,
        criteria: &ComparisonCriteria,
        year: i32,
    ) -> Result<(ComparisonSide, f64), ServiceError> {
        let shared = BookingFilter::new()
            .and_location(location)
            .and(Predicate::ExactNights(criteria.nights))
            .and(Predicate::MinGuests(criteria.guests));
        let yearly = shared.clone().and(Predicate::CheckInYear(year));
        let same_day = shared.and(Predicate::CheckInOn(criteria.check_in));

        let (yearly, same_day) = tokio::try_join!(
            self.store.fetch_bookings(&yearly, BookingOrder::CheckIn, None),
            self.store.fetch_bookings(&same_day, BookingOrder::PricePerNight, None)
        )?;

        let top_cheapest = self.top_cheapest(&same_day).await?;

        let side = ComparisonSide {
            location: summary,
            yearly_by_rooms: aggregator::monthly_trend(&yearly, Category::Rooms),
            yearly_by_beds: aggregator::monthly_trend(&yearly, Category::Beds),
            same_day_by_rooms: aggregator::by_bucket(&same_day, Category::Rooms),
            same_day_by_beds: aggregator::by_bucket(&same_day, Category::Beds),
            top_cheapest,
            statistics: aggregator::summarize(&same_day),
        };
        Ok((side, aggregator::mean_price(&same_day)))
    }

    /// Cheapest (property, listing) pairs by average nightly price, with the
    /// property's average review.
    async fn top_cheapest(
        &self,
        records: &[BookingRecord],
    ) -> Result<Vec<CheapOption>, ServiceError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let booking_ids: Vec<i64> = records.iter().map(|r| r.booking_id).collect();
        let mut property_ids: Vec<i64> = records.iter().map(|r| r.property_id).collect();
        property_ids.sort_unstable();
        property_ids.dedup();

        let (listings, reviews) = tokio::try_join!(
            self.store.fetch_listings(&booking_ids),
            self.store.fetch_reviews(&property_ids)
        )?;
        let listings = first_listings(listings);

        let mut review_stats: HashMap<i64, (Vec<f64>, Vec<f64>)> = HashMap::new();
        for review in reviews {
            let entry = review_stats.entry(review.property_id).or_default();
            if let Some(rating) = &review.rating {
                entry.0.push(rating.to_f64_or_zero());
            }
            if let Some(count) = review.review_count {
                entry.1.push(count as f64);
            }
        }

        let mut order: Vec<(i64, Option<i64>)> = Vec::new();
        let mut groups: HashMap<(i64, Option<i64>), CheapAcc> = HashMap::new();
        for record in records {
            let listing_id = listings.get(&record.booking_id).map(|l| l.id);
            let key = (record.property_id, listing_id);
            let acc = groups.entry(key).or_insert_with(|| {
                order.push(key);
                CheapAcc::default()
            });
            if let Some(price) = record.price_per_night {
                acc.price_sum += price;
                acc.priced += 1;
            }
            if acc.first.is_none() {
                acc.first = Some(record.clone());
            }
        }

        let mean = |values: &Vec<f64>| {
            if values.is_empty() {
                None
            } else {
                Some(round_to(values.iter().sum::<f64>() / values.len() as f64, 2))
            }
        };

        let mut options: Vec<CheapOption> = order
            .into_iter()
            .filter_map(|key| {
                let acc = groups.remove(&key)?;
                let record = acc.first?;
                if acc.priced == 0 {
                    return None;
                }
                let listing = listings.get(&record.booking_id);
                let reviews = review_stats.get(&record.property_id);
                Some(CheapOption {
                    property_id: record.property_id,
                    external_id: record.external_id,
                    accommodation_type: record.accommodation_type,
                    neighborhood: record.neighborhood_name,
                    rooms: record.rooms,
                    beds: record.beds,
                    listing_title: listing.map(|l| l.title.clone()),
                    listing_link: listing.map(|l| l.link.clone()),
                    average_price: round_to(acc.price_sum / acc.priced as f64, 2),
                    average_rating: reviews.and_then(|(ratings, _)| mean(ratings)),
                    average_review_count: reviews.and_then(|(_, counts)| mean(counts)),
                })
            })
            .collect();

        options.sort_by(|a, b| {
            a.average_price
                .partial_cmp(&b.average_price)
                .unwrap_or(Ordering::Equal)
                .then(a.property_id.cmp(&b.property_id))
        });
        options.truncate(TOP_CHEAPEST);
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{cache::MemoryCache, memory::fixtures::*, memory::MemoryStore};

    fn service(store: MemoryStore) -> ComparisonService {
        ComparisonService::new(Arc::new(store), Arc::new(MemoryCache::new()), CacheTtl::default())
    }

    fn side(name: &str, average_price: f64, property_count: usize) -> ComparisonSide {
        ComparisonSide {
            location: LocationSummary {
                kind: LocationKind::City,
                id: 1,
                city_id: 1,
                name: name.to_string(),
            },
            yearly_by_rooms: vec![],
            yearly_by_beds: vec![],
            same_day_by_rooms: vec![],
            same_day_by_beds: vec![],
            top_cheapest: vec![],
            statistics: PriceSummary {
                average_price,
                min_price: average_price,
                max_price: average_price,
                property_count,
                booking_count: property_count,
            },
        }
    }

    fn figures(outcome: &ComparisonOutcome) -> (f64, Option<u8>, f64, i64) {
        match outcome {
            ComparisonOutcome::Computed {
                price_difference_percent,
                cheaper_location,
                savings_per_night,
                property_difference,
                ..
            } => (
                *price_difference_percent,
                *cheaper_location,
                *savings_per_night,
                *property_difference,
            ),
            ComparisonOutcome::InsufficientData { .. } => panic!("expected computed outcome"),
        }
    }

    #[test]
    fn percentage_uses_the_cheaper_side_as_denominator() {
        let outcome = synthesize(&side("A", 100.0, 2), 100.0, &side("B", 150.0, 5), 150.0, 3);
        let (percent, cheaper, savings, properties) = figures(&outcome);
        assert_eq!(percent, 50.0);
        assert_eq!(cheaper, Some(1));
        assert_eq!(savings, 50.0);
        assert_eq!(properties, 3);
    }

    #[test]
    fn comparison_is_symmetric() {
        let a = side("A", 120.0, 2);
        let b = side("B", 200.0, 4);
        let (pct_ab, cheaper_ab, savings_ab, props_ab) =
            figures(&synthesize(&a, 120.0, &b, 200.0, 2));
        let (pct_ba, cheaper_ba, savings_ba, props_ba) =
            figures(&synthesize(&b, 200.0, &a, 120.0, 2));
        assert_eq!(pct_ab, pct_ba);
        assert_eq!(savings_ab, savings_ba);
        assert_eq!(cheaper_ab, Some(1));
        assert_eq!(cheaper_ba, Some(2));
        assert_eq!(props_ab, -props_ba);
    }

    #[test]
    fn equal_prices_name_no_winner() {
        let outcome = synthesize(&side("A", 100.0, 1), 100.0, &side("B", 100.0, 1), 100.0, 3);
        let (percent, cheaper, _, _) = figures(&outcome);
        assert_eq!(percent, 0.0);
        assert_eq!(cheaper, None);
        match outcome {
            ComparisonOutcome::Computed { recommendation, .. } => {
                assert!(recommendation.starts_with("Prices are very similar"))
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn small_differences_read_as_similar() {
        let outcome = synthesize(&side("A", 100.0, 1), 100.0, &side("B", 104.0, 1), 104.0, 3);
        match outcome {
            ComparisonOutcome::Computed { recommendation, cheaper_location, .. } => {
                assert_eq!(cheaper_location, Some(1));
                assert!(recommendation.starts_with("Prices are very similar"));
            }
            _ => panic!("expected computed outcome"),
        }
    }

    #[test]
    fn totals_come_from_unrounded_means() {
        // 500 / 3 = 166.666..; the rounded 166.67 would give 88.33 x 3 = 264.99.
        let a = side("A", 166.67, 3);
        let b = side("B", 255.0, 2);
        match synthesize(&a, 500.0 / 3.0, &b, 255.0, 3) {
            ComparisonOutcome::Computed {
                savings_per_night,
                savings_total,
                price_difference_percent,
                ..
            } => {
                assert_eq!(savings_per_night, 88.33);
                assert_eq!(savings_total, 265.0);
                assert_eq!(price_difference_percent, 53.0);
            }
            _ => panic!("expected computed outcome"),
        }
    }

    #[test]
    fn missing_prices_are_insufficient_data() {
        let outcome = synthesize(&side("A", 0.0, 0), 0.0, &side("B", 100.0, 1), 100.0, 3);
        assert!(matches!(outcome, ComparisonOutcome::InsufficientData { .. }));
    }

    #[tokio::test]
    async fn compares_two_cities_end_to_end() {
        let sample = sample().await;
        let criteria = ComparisonCriteria {
            location_1: Location::city(sample.florianopolis.id),
            location_2: Location::city(sample.gramado.id),
            check_in: check_in(),
            guests: 2,
            nights: 3,
        };
        let service = service(sample.store);
        let report = service.compare(&criteria, today()).await.unwrap();

        assert_eq!(report.location_1.location.name, "Florianópolis, SC");
        assert_eq!(report.location_2.location.name, "Gramado, RS");
        // Floripa: 100, 150, 250 -> 166.67; Gramado: 310, 200 -> 255.
        assert_eq!(report.location_1.statistics.average_price, 166.67);
        assert_eq!(report.location_2.statistics.average_price, 255.0);
        let prices: Vec<f64> =
            report.location_1.top_cheapest.iter().map(|o| o.average_price).collect();
        assert_eq!(prices, vec![100.0, 150.0, 250.0]);
        assert_eq!(report.location_1.top_cheapest[0].average_rating, Some(9.5));
        assert_eq!(report.location_1.top_cheapest[2].average_rating, None);

        let (_, cheaper, per_night, _) = figures(&report.comparison);
        assert_eq!(cheaper, Some(1));
        assert_eq!(per_night, 88.33);
        assert_eq!(report.date_chart.location_2.name, "Gramado, RS");
    }

    #[tokio::test]
    async fn neighborhoods_are_named_after_their_city() {
        let sample = sample().await;
        let lagoa = Location::neighborhood(sample.florianopolis.id, sample.lagoa.id);
        let service = service(sample.store);
        let summary = service.describe(&lagoa).await.unwrap();
        assert_eq!(summary.name, "Lagoa, Florianópolis");
        assert_eq!(summary.kind, LocationKind::Neighborhood);
    }

    #[tokio::test]
    async fn unknown_locations_are_not_found() {
        let service = service(MemoryStore::new());
        let result = service.describe(&Location::city(404)).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_sides_report_insufficient_data() {
        let store = MemoryStore::new();
        let a = store.insert_city("Canela", "RS").await;
        let b = store.insert_city("Bento", "RS").await;
        let criteria = ComparisonCriteria {
            location_1: Location::city(a.id),
            location_2: Location::city(b.id),
            check_in: check_in(),
            guests: 2,
            nights: 3,
        };
        let report = service(store).compare(&criteria, today()).await.unwrap();
        assert!(report.location_1.top_cheapest.is_empty());
        assert!(report.location_1.yearly_by_rooms.is_empty());
        assert!(matches!(report.comparison, ComparisonOutcome::InsufficientData { .. }));
    }
}
