use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::{models::bookingmodel::BookingRecord, utils::decimal::round_to};

/// Every category value at or above this collapses into one "4+" bucket.
pub const BUCKET_CAP: i32 = 4;

/// The dimension a grouping runs over. Each variant selects one fixed
/// column; there is no free-form field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Rooms,
    Beds,
}

impl Category {
    pub fn value_of(&self, record: &BookingRecord) -> Option<i32> {
        match self {
            Category::Rooms => record.rooms,
            Category::Beds => record.beds,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Rooms => "rooms",
            Category::Beds => "beds",
        }
    }
}

pub fn bucket(value: i32) -> i32 {
    value.min(BUCKET_CAP)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStat {
    pub bucket: i32,
    pub average_price: f64,
    pub property_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrendPoint {
    pub day: u32,
    /// `None` on the synthetic per-day overall average.
    pub bucket: Option<i32>,
    pub average_price: f64,
    /// Distinct properties for a bucket row; number of buckets for the overall row.
    pub option_count: usize,
    pub is_overall_average: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrendPoint {
    pub month: u32,
    pub bucket: i32,
    pub average_price: f64,
    pub property_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub property_count: usize,
    pub booking_count: usize,
}

/// Running price average plus the distinct properties seen in a group.
#[derive(Default)]
struct GroupAcc {
    price_sum: f64,
    priced: usize,
    properties: HashSet<i64>,
}

impl GroupAcc {
    fn push(&mut self, record: &BookingRecord) {
        if let Some(price) = record.price_per_night {
            self.price_sum += price;
            self.priced += 1;
        }
        self.properties.insert(record.property_id);
    }

    // Null prices never count; a group with no priced booking averages 0.
    fn average(&self) -> f64 {
        if self.priced == 0 {
            0.0
        } else {
            self.price_sum / self.priced as f64
        }
    }
}

fn group_by<K, F>(records: &[BookingRecord], category: Category, key: F) -> BTreeMap<K, GroupAcc>
where
    K: Ord,
    F: Fn(&BookingRecord, i32) -> K,
{
    let mut groups: BTreeMap<K, GroupAcc> = BTreeMap::new();
    for record in records {
        let Some(value) = category.value_of(record) else {
            continue;
        };
        groups
            .entry(key(record, bucket(value)))
            .or_default()
            .push(record);
    }
    groups
}

/// Average price and distinct properties per bucket, buckets ascending.
pub fn by_bucket(records: &[BookingRecord], category: Category) -> Vec<BucketStat> {
    group_by(records, category, |_, b| b)
        .into_iter()
        .map(|(bucket, acc)| BucketStat {
            bucket,
            average_price: round_to(acc.average(), 2),
            property_count: acc.properties.len(),
        })
        .collect()
}

/// Per (day-of-month, bucket) averages. After each day's bucket rows comes
/// one overall row whose price is the mean of that day's bucket averages.
pub fn daily_trend(records: &[BookingRecord], category: Category) -> Vec<DailyTrendPoint> {
    let groups = group_by(records, category, |r, b| (r.check_in.day(), b));

    let mut points = Vec::with_capacity(groups.len());
    let mut per_day: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for ((day, bucket), acc) in &groups {
        let average = acc.average();
        per_day.entry(*day).or_default().push(average);
        points.push(DailyTrendPoint {
            day: *day,
            bucket: Some(*bucket),
            average_price: round_to(average, 2),
            option_count: acc.properties.len(),
            is_overall_average: false,
        });
    }

    for (day, averages) in per_day {
        let mean = averages.iter().sum::<f64>() / averages.len() as f64;
        points.push(DailyTrendPoint {
            day,
            bucket: None,
            average_price: round_to(mean, 2),
            option_count: averages.len(),
            is_overall_average: true,
        });
    }

    points.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then(a.is_overall_average.cmp(&b.is_overall_average))
            .then(a.bucket.cmp(&b.bucket))
    });
    points
}

/// Per (month, bucket) averages, in calendar order.
pub fn monthly_trend(records: &[BookingRecord], category: Category) -> Vec<MonthlyTrendPoint> {
    group_by(records, category, |r, b| (r.check_in.month(), b))
        .into_iter()
        .map(|((month, bucket), acc)| MonthlyTrendPoint {
            month,
            bucket,
            average_price: round_to(acc.average(), 2),
            property_count: acc.properties.len(),
        })
        .collect()
}

/// Unrounded mean nightly price over priced bookings, zero when none are priced.
pub fn mean_price(records: &[BookingRecord]) -> f64 {
    let prices: Vec<f64> = records.iter().filter_map(|r| r.price_per_night).collect();
    if prices.is_empty() {
        return 0.0;
    }
    prices.iter().sum::<f64>() / prices.len() as f64
}

/// Average/min/max over priced bookings. All zeros when nothing is priced.
pub fn summarize(records: &[BookingRecord]) -> PriceSummary {
    let prices: Vec<f64> = records.iter().filter_map(|r| r.price_per_night).collect();
    let properties: HashSet<i64> = records.iter().map(|r| r.property_id).collect();

    if prices.is_empty() {
        return PriceSummary {
            property_count: properties.len(),
            booking_count: records.len(),
            ..PriceSummary::default()
        };
    }

    let min_price = prices
        .iter()
        .copied()
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);
    let max_price = prices
        .iter()
        .copied()
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
        .unwrap_or(0.0);

    PriceSummary {
        average_price: round_to(mean_price(records), 2),
        min_price: round_to(min_price, 2),
        max_price: round_to(max_price, 2),
        property_count: properties.len(),
        booking_count: records.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::filter::tests::record;
    use chrono::NaiveDate;

    fn priced(id: i64, property_id: i64, rooms: Option<i32>, price: Option<f64>) -> BookingRecord {
        let mut r = record(id);
        r.property_id = property_id;
        r.rooms = rooms;
        r.price_per_night = price;
        r
    }

    #[test]
    fn values_of_four_or_more_share_bucket_four() {
        for v in 4..12 {
            assert_eq!(bucket(v), 4);
        }
        assert_eq!(bucket(1), 1);
        assert_eq!(bucket(3), 3);

        let rows = vec![
            priced(1, 1, Some(4), Some(100.0)),
            priced(2, 2, Some(5), Some(200.0)),
            priced(3, 3, Some(9), Some(300.0)),
        ];
        let stats = by_bucket(&rows, Category::Rooms);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].bucket, 4);
        assert_eq!(stats[0].average_price, 200.0);
        assert_eq!(stats[0].property_count, 3);
    }

    #[test]
    fn null_categories_are_ignored() {
        let rows = vec![
            priced(1, 1, None, Some(1000.0)),
            priced(2, 2, Some(2), Some(100.0)),
        ];
        let stats = by_bucket(&rows, Category::Rooms);
        assert_eq!(stats, vec![BucketStat { bucket: 2, average_price: 100.0, property_count: 1 }]);
    }

    #[test]
    fn property_count_is_distinct() {
        let rows = vec![
            priced(1, 7, Some(2), Some(100.0)),
            priced(2, 7, Some(2), Some(200.0)),
        ];
        let stats = by_bucket(&rows, Category::Rooms);
        assert_eq!(stats[0].property_count, 1);
        assert_eq!(stats[0].average_price, 150.0);
    }

    #[test]
    fn beds_dimension_reads_the_bed_column() {
        let mut r = priced(1, 1, Some(1), Some(80.0));
        r.beds = Some(6);
        let stats = by_bucket(&[r], Category::Beds);
        assert_eq!(stats[0].bucket, 4);
    }

    #[test]
    fn overall_average_is_a_mean_of_group_averages() {
        // bucket 1: 100 and 100 -> 100; bucket 2: 400 -> 400.
        // Mean of groups is 250, price-weighted mean would be 200.
        let rows = vec![
            priced(1, 1, Some(1), Some(100.0)),
            priced(2, 2, Some(1), Some(100.0)),
            priced(3, 3, Some(2), Some(400.0)),
        ];
        let trend = daily_trend(&rows, Category::Rooms);
        assert_eq!(trend.len(), 3);

        let overall = trend.iter().find(|p| p.is_overall_average).unwrap();
        assert_eq!(overall.day, 10);
        assert_eq!(overall.bucket, None);
        assert_eq!(overall.average_price, 250.0);
        assert_eq!(overall.option_count, 2);
        assert!(trend.last().unwrap().is_overall_average);
    }

    #[test]
    fn daily_trend_keeps_days_apart() {
        let mut later = priced(2, 2, Some(1), Some(300.0));
        later.check_in = NaiveDate::from_ymd_opt(2030, 1, 20).unwrap();
        let rows = vec![priced(1, 1, Some(1), Some(100.0)), later];
        let trend = daily_trend(&rows, Category::Rooms);
        let days: Vec<u32> = trend.iter().map(|p| p.day).collect();
        assert_eq!(days, vec![10, 10, 20, 20]);
    }

    #[test]
    fn monthly_trend_groups_by_month_and_bucket() {
        let mut march = priced(2, 2, Some(2), Some(300.0));
        march.check_in = NaiveDate::from_ymd_opt(2030, 3, 2).unwrap();
        let rows = vec![priced(1, 1, Some(2), Some(100.0)), march];
        let trend = monthly_trend(&rows, Category::Rooms);
        assert_eq!(trend.len(), 2);
        assert_eq!((trend[0].month, trend[0].average_price), (1, 100.0));
        assert_eq!((trend[1].month, trend[1].average_price), (3, 300.0));
    }

    #[test]
    fn summary_ignores_unpriced_bookings() {
        let rows = vec![
            priced(1, 1, Some(1), Some(100.0)),
            priced(2, 2, Some(1), None),
            priced(3, 2, Some(1), Some(150.0)),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.average_price, 125.0);
        assert_eq!(summary.min_price, 100.0);
        assert_eq!(summary.max_price, 150.0);
        assert_eq!(summary.property_count, 2);
        assert_eq!(summary.booking_count, 3);
    }

    #[test]
    fn empty_inputs_produce_empty_outputs() {
        assert!(by_bucket(&[], Category::Rooms).is_empty());
        assert!(daily_trend(&[], Category::Beds).is_empty());
        assert!(monthly_trend(&[], Category::Rooms).is_empty());
        assert_eq!(summarize(&[]), PriceSummary::default());
    }
}
