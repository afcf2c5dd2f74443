use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::{
    config::CacheTtl,
    db::{
        cache::{namespace, CacheHelper, CacheKey, QueryCache},
        store::{BookingOrder, BookingStore},
    },
    dtos::plannerdtos::PlannerCriteria,
    models::bookingmodel::BookingRecord,
    service::{
        aggregator,
        error::ServiceError,
        filter::{BookingFilter, Predicate},
        search_service::first_listings,
    },
    utils::decimal::round_to,
};

/// Candidate ceiling after the database stage.
pub const CANDIDATE_LIMIT: i64 = 2000;
/// Ceiling on candidates turned into options.
pub const OPTION_LIMIT: usize = 1000;
pub const OPTIONS_PER_NEIGHBORHOOD: usize = 3;
pub const TOP_CITIES: usize = 10;
/// Only this many leading options are sampled for the destination hint.
pub const DESTINATION_SAMPLE: usize = 50;
pub const ECONOMY_SUGGESTION_THRESHOLD: f64 = 100.0;
pub const QUICK_STATS_WINDOW_DAYS: i64 = 30;

/// True when the stay has a Saturday whose following Sunday is still a
/// night of the stay. Only the first seven days are scanned, so very long
/// stays are judged by their first week.
pub fn includes_weekend(check_in: NaiveDate, check_out: NaiveDate) -> bool {
    let span = (check_out - check_in).num_days();
    if span < 2 {
        return false;
    }
    (0..span.min(7)).any(|i| {
        let day = check_in + Duration::days(i);
        let next = day + Duration::days(1);
        day.weekday() == Weekday::Sat && next < check_out && next.weekday() == Weekday::Sun
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOption {
    pub booking_id: i64,
    pub city_id: i64,
    pub city: String,
    pub state: String,
    pub neighborhood_id: i64,
    pub neighborhood: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub price_per_night: f64,
    pub total_price: f64,
    pub savings: f64,
    pub guests: i32,
    pub includes_weekend: bool,
    pub accommodation_type: String,
    pub rooms: i32,
    pub beds: i32,
    pub bathrooms: i32,
    pub listing_title: String,
    pub listing_link: Option<String>,
    /// Reviews are not joined in this flow.
    pub rating: Option<f64>,
    pub review_count: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodGroup {
    pub neighborhood_id: i64,
    pub neighborhood: String,
    pub option_count: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub average_savings: f64,
    pub options: Vec<PlanOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityGroup {
    pub city_id: i64,
    pub city: String,
    pub state: String,
    pub option_count: usize,
    pub average_price: f64,
    pub min_price: f64,
    pub average_savings: f64,
    pub neighborhoods: Vec<NeighborhoodGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanStatistics {
    pub total_options: usize,
    pub city_count: usize,
    pub neighborhood_count: usize,
    pub average_savings: f64,
    pub max_savings: f64,
    pub average_price: f64,
    pub weekend_options: usize,
    pub budget_used_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Economy,
    Weekend,
    RecommendedDestination,
    NoResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub title: String,
    pub description: String,
    pub action: String,
}

impl Suggestion {
    fn new(kind: SuggestionKind, title: String, description: &str, action: &str) -> Self {
        Suggestion {
            kind,
            title,
            description: description.to_string(),
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub success: bool,
    pub criteria: PlannerCriteria,
    pub total_options: usize,
    pub results_by_city: Vec<CityGroup>,
    pub statistics: PlanStatistics,
    pub suggestions: Vec<Suggestion>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickStats {
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub option_count: usize,
    pub city_count: usize,
    pub suggested_budget_3_nights: f64,
    pub suggested_budget_7_nights: f64,
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn min_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

fn group_stats(options: &[PlanOption]) -> (f64, f64, f64) {
    if options.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    (
        round_to(mean(options.iter().map(|o| o.total_price)), 2),
        round_to(min_of(options.iter().map(|o| o.total_price)), 2),
        round_to(mean(options.iter().map(|o| o.savings)), 2),
    )
}

/// Group options city -> neighborhood in order of first appearance, keep
/// the three best savings per neighborhood and the ten best cities by
/// average savings. Group figures cover every option, not just the kept ones.
pub fn group_by_city(options: &[PlanOption]) -> Vec<CityGroup> {
    let mut cities: Vec<(i64, Vec<(i64, Vec<PlanOption>)>)> = Vec::new();
    let mut city_index: HashMap<i64, usize> = HashMap::new();

    for option in options {
        let ci = *city_index.entry(option.city_id).or_insert_with(|| {
            cities.push((option.city_id, Vec::new()));
            cities.len() - 1
        });
        let neighborhoods = &mut cities[ci].1;
        match neighborhoods.iter_mut().find(|(id, _)| *id == option.neighborhood_id) {
            Some((_, members)) => members.push(option.clone()),
            None => neighborhoods.push((option.neighborhood_id, vec![option.clone()])),
        }
    }

    let mut groups: Vec<CityGroup> = cities
        .into_iter()
        .filter_map(|(city_id, neighborhoods)| {
            let all: Vec<PlanOption> = neighborhoods
                .iter()
                .flat_map(|(_, members)| members.iter().cloned())
                .collect();
            let first = all.first()?.clone();
            let (average_price, min_price, average_savings) = group_stats(&all);

            let neighborhoods = neighborhoods
                .into_iter()
                .filter_map(|(neighborhood_id, mut members)| {
                    let (average_price, min_price, average_savings) = group_stats(&members);
                    let name = members.first()?.neighborhood.clone();
                    let option_count = members.len();
                    members.sort_by(|a, b| {
                        b.savings
                            .partial_cmp(&a.savings)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    members.truncate(OPTIONS_PER_NEIGHBORHOOD);
                    Some(NeighborhoodGroup {
                        neighborhood_id,
                        neighborhood: name,
                        option_count,
                        average_price,
                        min_price,
                        average_savings,
                        options: members,
                    })
                })
                .collect();

            Some(CityGroup {
                city_id,
                city: first.city,
                state: first.state,
                option_count: all.len(),
                average_price,
                min_price,
                average_savings,
                neighborhoods,
            })
        })
        .collect();

    // stable: equal savings keep first-appearance order
    groups.sort_by(|a, b| {
        b.average_savings
            .partial_cmp(&a.average_savings)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    groups.truncate(TOP_CITIES);
    groups
}

pub fn statistics(options: &[PlanOption], total_budget: f64) -> PlanStatistics {
    if options.is_empty() {
        return PlanStatistics::default();
    }
    let cities: HashSet<i64> = options.iter().map(|o| o.city_id).collect();
    let neighborhoods: HashSet<i64> = options.iter().map(|o| o.neighborhood_id).collect();
    let average_price = mean(options.iter().map(|o| o.total_price));
    let max_savings = options
        .iter()
        .map(|o| o.savings)
        .fold(f64::NEG_INFINITY, f64::max);

    PlanStatistics {
        total_options: options.len(),
        city_count: cities.len(),
        neighborhood_count: neighborhoods.len(),
        average_savings: round_to(mean(options.iter().map(|o| o.savings)), 2),
        max_savings: round_to(max_savings, 2),
        average_price: round_to(average_price, 2),
        weekend_options: options.iter().filter(|o| o.includes_weekend).count(),
        budget_used_percent: round_to(average_price / total_budget * 100.0, 1),
    }
}

pub fn suggestions(options: &[PlanOption]) -> Vec<Suggestion> {
    if options.is_empty() {
        return vec![Suggestion::new(
            SuggestionKind::NoResults,
            "No options found".to_string(),
            "Try raising your budget or widening the search window.",
            "Adjust",
        )];
    }

    let mut suggestions = Vec::new();

    let average_savings = mean(options.iter().map(|o| o.savings));
    if average_savings > ECONOMY_SUGGESTION_THRESHOLD {
        suggestions.push(Suggestion::new(
            SuggestionKind::Economy,
            format!("Average savings of R$ {:.2}", average_savings),
            "Your budget leaves room for great options!",
            "View options",
        ));
    }

    let weekend_options = options.iter().filter(|o| o.includes_weekend).count();
    if weekend_options > 0 {
        suggestions.push(Suggestion::new(
            SuggestionKind::Weekend,
            format!("{} options include a weekend", weekend_options),
            "Perfect for unwinding!",
            "View options",
        ));
    }

    // Sampled: only the leading options are considered.
    let mut by_city: Vec<(&str, f64, usize)> = Vec::new();
    for option in options.iter().take(DESTINATION_SAMPLE) {
        match by_city.iter_mut().find(|(city, _, _)| *city == option.city) {
            Some((_, sum, count)) => {
                *sum += option.savings;
                *count += 1;
            }
            None => by_city.push((&option.city, option.savings, 1)),
        }
    }
    let mut best: Option<(&str, f64)> = None;
    for (city, sum, count) in by_city {
        let average = sum / count as f64;
        if best.map_or(true, |(_, top)| average > top) {
            best = Some((city, average));
        }
    }
    if let Some((city, _)) = best {
        suggestions.push(Suggestion::new(
            SuggestionKind::RecommendedDestination,
            format!("{} offers good savings", city),
            "Among the options analysed",
            "View options",
        ));
    }

    suggestions
}

#[derive(Clone)]
pub struct PlannerService {
    store: Arc<dyn BookingStore>,
    cache: Arc<dyn QueryCache>,
    ttl: CacheTtl,
}

impl PlannerService {
    pub fn new(store: Arc<dyn BookingStore>, cache: Arc<dyn QueryCache>, ttl: CacheTtl) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn plan(&self, criteria: &PlannerCriteria) -> Result<PlanReport, ServiceError> {
        let options = self.find_options(criteria).await?;
        for warning in &criteria.warnings {
            tracing::warn!("planner request: {}", warning);
        }
        tracing::debug!(
            "planner: {} options for budget {} over {} nights",
            options.len(),
            criteria.total_budget,
            criteria.nights
        );

        Ok(PlanReport {
            success: true,
            criteria: criteria.clone(),
            total_options: options.len(),
            results_by_city: group_by_city(&options),
            statistics: statistics(&options, criteria.total_budget),
            suggestions: suggestions(&options),
            warnings: criteria.warnings.clone(),
        })
    }

    /// Staged candidate search, most selective filters first.
    pub async fn find_options(
        &self,
        criteria: &PlannerCriteria,
    ) -> Result<Vec<PlanOption>, ServiceError> {
        let filter = BookingFilter::new()
            .and(Predicate::MaxNightlyPrice(criteria.budget_per_night))
            .and(Predicate::CheckInBetween(criteria.window_start, criteria.window_end))
            .and(Predicate::MinGuests(criteria.guests))
            .and(Predicate::ExactNights(criteria.nights))
            .and_if(criteria.min_rooms.map(Predicate::MinRooms))
            .and_if(criteria.min_beds.map(Predicate::MinBeds));

        let candidates = self
            .store
            .fetch_bookings(&filter, BookingOrder::PricePerNight, Some(CANDIDATE_LIMIT))
            .await?;

        let nights = Duration::days(criteria.nights);
        let candidates: Vec<BookingRecord> = candidates
            .into_iter()
            .filter(|c| {
                !criteria.weekend_required || includes_weekend(c.check_in, c.check_in + nights)
            })
            .take(OPTION_LIMIT)
            .collect();

        let booking_ids: Vec<i64> = candidates.iter().map(|c| c.booking_id).collect();
        let listings = first_listings(self.store.fetch_listings(&booking_ids).await?);

        let options = candidates
            .into_iter()
            .filter_map(|candidate| {
                let price_per_night = candidate.price_per_night?;
                let total_price = round_to(price_per_night * criteria.nights as f64, 2);
                // Nightly rounding can push a stay over the total; re-check it.
                if total_price > criteria.total_budget {
                    return None;
                }
                let check_out = candidate.check_in + nights;
                let listing = listings.get(&candidate.booking_id);
                let fallback_title = if candidate.accommodation_type.is_empty() {
                    "Accommodation".to_string()
                } else {
                    candidate.accommodation_type.clone()
                };
                let weekend = includes_weekend(candidate.check_in, check_out);
                Some(PlanOption {
                    booking_id: candidate.booking_id,
                    city_id: candidate.city_id,
                    city: candidate.city_name,
                    state: candidate.city_state,
                    neighborhood_id: candidate.neighborhood_id,
                    neighborhood: candidate.neighborhood_name,
                    check_in: candidate.check_in,
                    check_out,
                    price_per_night,
                    total_price,
                    savings: round_to(criteria.total_budget - total_price, 2),
                    guests: candidate.guests,
                    includes_weekend: weekend,
                    accommodation_type: candidate.accommodation_type,
                    rooms: candidate.rooms.unwrap_or(0),
                    beds: candidate.beds.unwrap_or(0),
                    bathrooms: candidate.bathrooms.unwrap_or(0),
                    listing_title: listing.map(|l| l.title.clone()).unwrap_or(fallback_title),
                    listing_link: listing.map(|l| l.link.clone()).filter(|l| !l.is_empty()),
                    rating: None,
                    review_count: 0,
                })
            })
            .collect();

        Ok(options)
    }

    /// Price snapshot of the next 30 days with suggested budgets.
    pub async fn quick_stats(&self, today: NaiveDate) -> Result<QuickStats, ServiceError> {
        let window = (today, today + Duration::days(QUICK_STATS_WINDOW_DAYS));
        let key = CacheKey::new(namespace::QUICK_STATS, &window)?;
        CacheHelper::get_or_compute(self.cache.as_ref(), &key, self.ttl.quick_stats, || async {
            let filter = BookingFilter::new().and(Predicate::CheckInBetween(window.0, window.1));
            let records = self.store.fetch_bookings(&filter, BookingOrder::CheckIn, None).await?;
            let summary = aggregator::summarize(&records);
            if summary.average_price <= 0.0 {
                return Ok(QuickStats::default());
            }
            let cities: HashSet<i64> = records.iter().map(|r| r.city_id).collect();
            Ok(QuickStats {
                average_price: summary.average_price,
                min_price: summary.min_price,
                max_price: summary.max_price,
                option_count: summary.booking_count,
                city_count: cities.len(),
                suggested_budget_3_nights: round_to(summary.average_price * 3.0, 2),
                suggested_budget_7_nights: round_to(summary.average_price * 7.0, 2),
            })
        })
        .await
    }
}
