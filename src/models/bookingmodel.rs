use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub property_id: i64,
    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
    pub total_price: Option<BigDecimal>,
    pub price_per_night: Option<BigDecimal>,
    pub guests: i32,
    pub link: String,
}

#[cfg(test)]
impl Booking {
    pub fn nights(&self) -> Option<i64> {
        self.check_out.map(|out| (out - self.check_in).num_days())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub property_id: i64,
    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
    pub total_price: Option<BigDecimal>,
    pub price_per_night: Option<BigDecimal>,
    pub guests: i32,
    pub link: String,
}

/// Marketing entry for a booking. The data holds at most one per booking.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Listing {
    pub id: i64,
    pub booking_id: i64,
    pub title: String,
    pub link: String,
}

/// A booking joined with its property, city and neighborhood.
///
/// This is the row shape every query returns and every aggregation consumes.
/// Prices are carried as `f64`; the decimal columns are cast on read.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct BookingRecord {
    pub booking_id: i64,
    pub property_id: i64,
    pub external_id: i64,
    pub accommodation_type: String,

    pub city_id: i64,
    pub city_name: String,
    pub city_state: String,
    pub neighborhood_id: i64,
    pub neighborhood_name: String,

    pub rooms: Option<i32>,
    pub beds: Option<i32>,
    pub bathrooms: Option<i32>,

    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
    pub total_price: Option<f64>,
    pub price_per_night: Option<f64>,
    pub guests: i32,
    pub link: String,
}

impl BookingRecord {
    pub fn nights(&self) -> Option<i64> {
        self.check_out.map(|out| (out - self.check_in).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nights_is_checkout_minus_checkin() {
        let booking = Booking {
            id: 1,
            property_id: 1,
            check_in: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2030, 3, 6),
            total_price: None,
            price_per_night: None,
            guests: 2,
            link: String::new(),
        };
        assert_eq!(booking.nights(), Some(5));

        let open_ended = Booking { check_out: None, ..booking };
        assert_eq!(open_ended.nights(), None);
    }
}
