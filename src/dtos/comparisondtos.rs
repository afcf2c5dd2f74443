use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::{check_not_past, field_checks, finish, rule, NON_FIELD_ERRORS};
use crate::{models::locationmodel::Location, utils::query::empty_string_as_none};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CompareQueryDto {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "First city is required"))]
    pub city_1: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub neighborhood_1: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "Second city is required"))]
    pub city_2: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub neighborhood_2: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "Check-in date is required"))]
    pub check_in: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Guests is required"),
        range(min = 1, max = 20, message = "Guests must be between 1 and 20")
    )]
    pub guests: Option<i32>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Nights is required"),
        range(min = 1, max = 30, message = "Nights must be between 1 and 30")
    )]
    pub nights: Option<i64>,
}

/// Validated comparison request: two distinct locations sharing one set of
/// search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonCriteria {
    pub location_1: Location,
    pub location_2: Location,
    pub check_in: NaiveDate,
    pub guests: i32,
    pub nights: i64,
}

fn location(city_id: Option<i64>, neighborhood_id: Option<i64>) -> Option<Location> {
    city_id.map(|city_id| match neighborhood_id {
        Some(neighborhood_id) => Location::neighborhood(city_id, neighborhood_id),
        None => Location::city(city_id),
    })
}

/// Two locations in the same city must be told apart by neighborhood.
pub(crate) fn check_distinct_locations(
    errors: &mut ValidationErrors,
    first: &Location,
    second: &Location,
) {
    if first.city_id != second.city_id {
        return;
    }
    match (first.neighborhood_id, second.neighborhood_id) {
        (None, None) => errors.add(
            NON_FIELD_ERRORS,
            rule(
                "same_city",
                "To compare the same city, specify at least one neighborhood",
            ),
        ),
        (Some(a), Some(b)) if a == b => errors.add(
            NON_FIELD_ERRORS,
            rule("same_neighborhood", "Select different neighborhoods to compare"),
        ),
        _ => {}
    }
}

impl CompareQueryDto {
    pub fn location_1(&self) -> Option<Location> {
        location(self.city_1, self.neighborhood_1)
    }

    pub fn location_2(&self) -> Option<Location> {
        location(self.city_2, self.neighborhood_2)
    }

    pub fn into_criteria(self, today: NaiveDate) -> Result<ComparisonCriteria, ValidationErrors> {
        let mut errors = field_checks(&self);
        check_not_past(&mut errors, "check_in", self.check_in, today);

        let (location_1, location_2) = (self.location_1(), self.location_2());
        if let (Some(first), Some(second)) = (&location_1, &location_2) {
            check_distinct_locations(&mut errors, first, second);
        }

        let criteria = match (location_1, location_2, self.check_in, self.guests, self.nights) {
            (Some(location_1), Some(location_2), Some(check_in), Some(guests), Some(nights)) => {
                Some(ComparisonCriteria {
                    location_1,
                    location_2,
                    check_in,
                    guests,
                    nights,
                })
            }
            _ => None,
        };
        finish(errors, criteria)
    }
}
