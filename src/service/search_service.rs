use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    config::CacheTtl,
    db::{
        cache::{namespace, CacheHelper, CacheKey, QueryCache},
        store::{BookingOrder, BookingStore},
    },
    dtos::searchdtos::{SearchQueryDto, SEARCH_PAGE_SIZE},
    models::{
        bookingmodel::{BookingRecord, Listing},
        propertymodel::Review,
    },
    service::{
        aggregator::{self, BucketStat, Category, DailyTrendPoint, PriceSummary},
        error::ServiceError,
        filter::{BookingFilter, FilterBuilder, SearchCriteria},
    },
    utils::decimal::BigDecimalHelpers,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub booking_id: i64,
    pub property_id: i64,
    pub external_id: i64,
    pub accommodation_type: String,
    pub city: String,
    pub neighborhood: String,
    pub rooms: Option<i32>,
    pub beds: Option<i32>,
    pub bathrooms: Option<i32>,
    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
    pub nights: Option<i64>,
    pub total_price: Option<f64>,
    pub price_per_night: Option<f64>,
    pub guests: i32,
    pub link: String,
    pub listing: Option<ListingSummary>,
    pub rating: Option<f64>,
    pub review_count: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub page: usize,
    pub page_size: usize,
    pub total_results: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl SearchPage {
    pub fn empty(page: usize) -> Self {
        SearchPage {
            results: Vec::new(),
            page,
            page_size: SEARCH_PAGE_SIZE,
            total_results: 0,
            total_pages: 0,
            has_next: false,
            has_previous: page > 1,
        }
    }

    fn slice(all: &[SearchResult], page: usize) -> Self {
        let page = page.max(1);
        let total_results = all.len();
        let total_pages = total_results.div_ceil(SEARCH_PAGE_SIZE);
        let results = all
            .iter()
            .skip((page - 1) * SEARCH_PAGE_SIZE)
            .take(SEARCH_PAGE_SIZE)
            .cloned()
            .collect();
        SearchPage {
            results,
            page,
            page_size: SEARCH_PAGE_SIZE,
            total_results,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchChart {
    pub by_rooms: Vec<BucketStat>,
    pub by_beds: Vec<BucketStat>,
    pub daily_by_rooms: Vec<DailyTrendPoint>,
    pub daily_by_beds: Vec<DailyTrendPoint>,
    pub summary: PriceSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub criteria: SearchCriteria,
    pub page: SearchPage,
    pub chart: SearchChart,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChartBuckets {
    by_rooms: Vec<BucketStat>,
    by_beds: Vec<BucketStat>,
    summary: PriceSummary,
}

#[derive(Serialize)]
struct TrendKey<'a> {
    criteria: &'a SearchCriteria,
    category: Category,
}

/// Best review per property; reviews arrive best first.
pub(crate) fn best_reviews(reviews: Vec<Review>) -> HashMap<i64, Review> {
    let mut best = HashMap::new();
    for review in reviews {
        best.entry(review.property_id).or_insert(review);
    }
    best
}

/// One listing per booking: the lowest id wins when the data holds several.
pub(crate) fn first_listings(listings: Vec<Listing>) -> HashMap<i64, Listing> {
    let mut first: HashMap<i64, Listing> = HashMap::new();
    for listing in listings {
        match first.get(&listing.booking_id) {
            Some(existing) if existing.id <= listing.id => {}
            _ => {
                first.insert(listing.booking_id, listing);
            }
        }
    }
    first
}

fn nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn best_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    nulls_last(a.map(|x| -x), b.map(|y| -y))
}

#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn BookingStore>,
    cache: Arc<dyn QueryCache>,
    ttl: CacheTtl,
}

impl SearchService {
    pub fn new(store: Arc<dyn BookingStore>, cache: Arc<dyn QueryCache>, ttl: CacheTtl) -> Self {
        Self { store, cache, ttl }
    }

    /// Raw query entry point. Invalid input never errors: it produces an
    /// empty page, the same as a search that matched nothing.
    pub async fn search_query(
        &self,
        query: &SearchQueryDto,
        today: NaiveDate,
    ) -> Result<SearchPage, ServiceError> {
        let page = query.page();
        if FilterBuilder::from_query(query, today).is_none() {
            return Ok(SearchPage::empty(page));
        }
        let criteria = query.clone().into_criteria(today)?;
        self.page(&criteria, page).await
    }

    pub async fn search(
        &self,
        criteria: &SearchCriteria,
        page: usize,
    ) -> Result<SearchResponse, ServiceError> {
        let (page, chart) = tokio::try_join!(self.page(criteria, page), self.chart(criteria))?;
        Ok(SearchResponse {
            criteria: criteria.clone(),
            page,
            chart,
        })
    }

    pub async fn page(
        &self,
        criteria: &SearchCriteria,
        page: usize,
    ) -> Result<SearchPage, ServiceError> {
        let key = CacheKey::new(namespace::SEARCH, criteria)?;
        let all: Vec<SearchResult> =
            CacheHelper::get_or_compute(self.cache.as_ref(), &key, self.ttl.search, || {
                self.results(criteria)
            })
            .await?;
        Ok(SearchPage::slice(&all, page))
    }

    /// Every match, fully ordered: nightly price ascending with unpriced
    /// bookings last, then best review rating, then booking id.
    async fn results(&self, criteria: &SearchCriteria) -> Result<Vec<SearchResult>, ServiceError> {
        let filter = FilterBuilder::search(criteria);
        let records = self
            .store
            .fetch_bookings(&filter, BookingOrder::PricePerNight, None)
            .await?;
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
        let reviews = best_reviews(reviews);

        let mut results: Vec<SearchResult> = records
            .into_iter()
            .map(|record| {
                let listing = listings.get(&record.booking_id).map(|l| ListingSummary {
                    title: l.title.clone(),
                    link: l.link.clone(),
                });
                let review = reviews.get(&record.property_id);
                to_result(
                    record,
                    listing,
                    review.and_then(|r| r.rating.as_ref().map(|v| v.to_f64_or_zero())),
                    review.and_then(|r| r.review_count),
                )
            })
            .collect();

        results.sort_by(|a, b| {
            nulls_last(a.price_per_night, b.price_per_night)
                .then_with(|| best_first(a.rating, b.rating))
                .then(a.booking_id.cmp(&b.booking_id))
        });
        Ok(results)
    }

    pub async fn chart(&self, criteria: &SearchCriteria) -> Result<SearchChart, ServiceError> {
        let key = CacheKey::new(namespace::CHART, criteria)?;
        let buckets: ChartBuckets =
            CacheHelper::get_or_compute(self.cache.as_ref(), &key, self.ttl.search, || async {
                let records = self.records(&FilterBuilder::search(criteria)).await?;
                Ok(ChartBuckets {
                    by_rooms: aggregator::by_bucket(&records, Category::Rooms),
                    by_beds: aggregator::by_bucket(&records, Category::Beds),
                    summary: aggregator::summarize(&records),
                })
            })
            .await?;

        let (daily_by_rooms, daily_by_beds) = tokio::try_join!(
            self.daily_trend(criteria, Category::Rooms),
            self.daily_trend(criteria, Category::Beds)
        )?;

        Ok(SearchChart {
            by_rooms: buckets.by_rooms,
            by_beds: buckets.by_beds,
            daily_by_rooms,
            daily_by_beds,
            summary: buckets.summary,
        })
    }

    /// Day-by-day prices across the requested month, independent of the
    /// nights, price and room/bed filters.
    pub async fn daily_trend(
        &self,
        criteria: &SearchCriteria,
        category: Category,
    ) -> Result<Vec<DailyTrendPoint>, ServiceError> {
        let key = CacheKey::new(namespace::TREND, &TrendKey { criteria, category })?;
        CacheHelper::get_or_compute(self.cache.as_ref(), &key, self.ttl.trend, || async {
            let records = self
                .records(&FilterBuilder::daily_trend(criteria, category))
                .await?;
            Ok(aggregator::daily_trend(&records, category))
        })
        .await
    }

    async fn records(&self, filter: &BookingFilter) -> Result<Vec<BookingRecord>, ServiceError> {
        self.store.fetch_bookings(filter, BookingOrder::CheckIn, None).await
    }
}

fn to_result(
    record: BookingRecord,
    listing: Option<ListingSummary>,
    rating: Option<f64>,
    review_count: Option<i32>,
) -> SearchResult {
    let nights = record.nights();
    SearchResult {
        booking_id: record.booking_id,
        property_id: record.property_id,
        external_id: record.external_id,
        accommodation_type: record.accommodation_type,
        city: format!("{}, {}", record.city_name, record.city_state),
        neighborhood: record.neighborhood_name,
        rooms: record.rooms,
        beds: record.beds,
        bathrooms: record.bathrooms,
        check_in: record.check_in,
        check_out: record.check_out,
        nights,
        total_price: record.total_price,
        price_per_night: record.price_per_night,
        guests: record.guests,
        link: record.link,
        listing,
        rating,
        review_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{cache::MemoryCache, memory::fixtures::*, memory::MemoryStore};
    use crate::models::locationmodel::Location;

    fn service(store: MemoryStore) -> SearchService {
        SearchService::new(Arc::new(store), Arc::new(MemoryCache::new()), CacheTtl::default())
    }

    fn criteria(city_id: i64, guests: i32) -> SearchCriteria {
        SearchCriteria {
            location: Location::city(city_id),
            check_in: check_in(),
            guests,
            nights: 3,
            min_rooms: None,
            min_beds: None,
            min_bathrooms: None,
            max_price: None,
        }
    }

    #[tokio::test]
    async fn guest_threshold_scenario() {
        let sample = sample().await;
        let city_id = sample.florianopolis.id;
        let service = service(sample.store);

        // Lagoa 100 and 150 (2 guests), Centro 250 (4 guests).
        let page = service.page(&criteria(city_id, 2), 1).await.unwrap();
        let prices: Vec<Option<f64>> = page.results.iter().map(|r| r.price_per_night).collect();
        assert_eq!(prices, vec![Some(100.0), Some(150.0), Some(250.0)]);

        let page = service.page(&criteria(city_id, 5), 1).await.unwrap();
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[tokio::test]
    async fn results_carry_listing_and_best_review() {
        let sample = sample().await;
        let city_id = sample.florianopolis.id;
        let service = service(sample.store);

        let page = service.page(&criteria(city_id, 2), 1).await.unwrap();
        let cheapest = &page.results[0];
        assert_eq!(cheapest.rating, Some(9.5));
        assert_eq!(cheapest.review_count, Some(12));
        assert_eq!(cheapest.listing.as_ref().unwrap().title, "Listing 101");
        assert_eq!(cheapest.nights, Some(3));
        assert_eq!(cheapest.city, "Florianópolis, SC");
    }

    #[tokio::test]
    async fn equal_prices_prefer_better_reviews() {
        let sample = sample().await;
        seed(
            &sample.store,
            Seed {
                neighborhood: &sample.lagoa,
                external_id: 104,
                rooms: 1,
                beds: 1,
                bathrooms: 1,
                price: "100",
                guests: 2,
                nights: 3,
                rating: Some("9.9"),
            },
        )
        .await;
        let city_id = sample.florianopolis.id;
        let service = service(sample.store);

        let page = service.page(&criteria(city_id, 2), 1).await.unwrap();
        assert_eq!(page.results[0].external_id, 104);
        assert_eq!(page.results[1].external_id, 101);
    }

    #[tokio::test]
    async fn pages_hold_twelve_results() {
        let sample = sample().await;
        for i in 0..13 {
            seed(
                &sample.store,
                Seed {
                    neighborhood: &sample.centro_gramado,
                    external_id: 300 + i,
                    rooms: 1,
                    beds: 1,
                    bathrooms: 1,
                    price: "90",
                    guests: 2,
                    nights: 3,
                    rating: None,
                },
            )
            .await;
        }
        let city_id = sample.gramado.id;
        let service = service(sample.store);

        let first = service.page(&criteria(city_id, 2), 1).await.unwrap();
        assert_eq!(first.results.len(), 12);
        assert_eq!(first.total_results, 15);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next);

        let second = service.page(&criteria(city_id, 2), 2).await.unwrap();
        assert_eq!(second.results.len(), 3);
        assert!(!second.has_next && second.has_previous);
    }

    #[tokio::test]
    async fn invalid_queries_yield_an_empty_page() {
        let sample = sample().await;
        let service = service(sample.store);
        let query = SearchQueryDto {
            city_id: Some(1),
            check_in: Some(today() - chrono::Duration::days(3)),
            guests: Some(2),
            nights: Some(3),
            ..SearchQueryDto::default()
        };
        let page = service.search_query(&query, today()).await.unwrap();
        assert_eq!(page, SearchPage::empty(1));
    }

    #[tokio::test]
    async fn chart_groups_matches_and_trends_the_month() {
        let sample = sample().await;
        let city_id = sample.florianopolis.id;
        let service = service(sample.store);

        let response = service.search(&criteria(city_id, 2), 1).await.unwrap();
        let rooms: Vec<i32> = response.chart.by_rooms.iter().map(|b| b.bucket).collect();
        assert_eq!(rooms, vec![2, 3, 4]);
        assert_eq!(response.chart.summary.booking_count, 3);

        let overall: Vec<&DailyTrendPoint> = response
            .chart
            .daily_by_rooms
            .iter()
            .filter(|p| p.is_overall_average)
            .collect();
        assert_eq!(overall.len(), 1);
        assert_eq!(overall[0].average_price, 166.67);
    }

    #[tokio::test]
    async fn empty_store_gives_well_formed_empty_payloads() {
        let service = service(MemoryStore::new());
        let response = service.search(&criteria(1, 2), 1).await.unwrap();
        assert!(response.page.results.is_empty());
        assert_eq!(response.chart, SearchChart::default());
    }
}
