use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::{check_not_past, field_checks, finish};
use crate::{
    models::locationmodel::Location,
    service::filter::SearchCriteria,
    utils::query::empty_string_as_none,
};

pub const SEARCH_PAGE_SIZE: usize = 12;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SearchQueryDto {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "City is required"))]
    pub city_id: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub neighborhood_id: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "Check-in date is required"))]
    pub check_in: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Guests is required"),
        range(min = 1, message = "Guests must be at least 1")
    )]
    pub guests: Option<i32>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Nights is required"),
        range(min = 1, message = "Nights must be at least 1")
    )]
    pub nights: Option<i64>,

    // "N+" choices
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 5, message = "Rooms must be between 1 and 5+"))]
    pub min_rooms: Option<i32>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 5, message = "Beds must be between 1 and 5+"))]
    pub min_beds: Option<i32>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 3, message = "Bathrooms must be between 1 and 3+"))]
    pub min_bathrooms: Option<i32>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 0.0, message = "Maximum price cannot be negative"))]
    pub max_price: Option<f64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<usize>,
}

impl SearchQueryDto {
    pub fn into_criteria(self, today: NaiveDate) -> Result<SearchCriteria, ValidationErrors> {
        let mut errors = field_checks(&self);
        check_not_past(&mut errors, "check_in", self.check_in, today);

        let criteria = match (self.city_id, self.check_in, self.guests, self.nights) {
            (Some(city_id), Some(check_in), Some(guests), Some(nights)) => Some(SearchCriteria {
                location: match self.neighborhood_id {
                    Some(neighborhood_id) => Location::neighborhood(city_id, neighborhood_id),
                    None => Location::city(city_id),
                },
                check_in,
                guests,
                nights,
                min_rooms: self.min_rooms,
                min_beds: self.min_beds,
                min_bathrooms: self.min_bathrooms,
                max_price: self.max_price,
            }),
            _ => None,
        };
        finish(errors, criteria)
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }
}
