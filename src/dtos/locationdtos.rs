use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use super::{comparisondtos::check_distinct_locations, finish, required};
use crate::{
    models::locationmodel::{City, Location, Neighborhood},
    utils::query::empty_string_as_none,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NeighborhoodQueryDto {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city_id: Option<i64>,

    /// Only neighborhoods that still have upcoming bookings.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub with_data: Option<bool>,
}

impl NeighborhoodQueryDto {
    pub fn city_id(&self) -> Result<i64, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let city_id = required(&mut errors, "city_id", self.city_id);
        finish(errors, city_id)
    }
}

/// Query for the cascading option lists: dates for a location, guest
/// counts for a location and date, nights for a location, date and guests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsQueryDto {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city_id: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub neighborhood_id: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub check_in: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub guests: Option<i32>,
}

/// The same cascade for two locations at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareOptionsQueryDto {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city_1: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub neighborhood_1: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub city_2: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub neighborhood_2: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub check_in: Option<NaiveDate>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub guests: Option<i32>,
}

/// Which step of the cascade is being asked for; each needs one more input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionStep {
    Dates,
    Guests,
    Nights,
}

/// Validated cascade request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsCriteria {
    pub locations: Vec<Location>,
    pub check_in: Option<NaiveDate>,
    pub guests: Option<i32>,
}

fn check_step(
    errors: &mut ValidationErrors,
    step: OptionStep,
    check_in: Option<NaiveDate>,
    guests: Option<i32>,
) {
    if step != OptionStep::Dates {
        required(errors, "check_in", check_in);
    }
    if step == OptionStep::Nights {
        required(errors, "guests", guests);
    }
}

fn location(city_id: i64, neighborhood_id: Option<i64>) -> Location {
    match neighborhood_id {
        Some(neighborhood_id) => Location::neighborhood(city_id, neighborhood_id),
        None => Location::city(city_id),
    }
}

impl OptionsQueryDto {
    pub fn into_criteria(self, step: OptionStep) -> Result<OptionsCriteria, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let city_id = required(&mut errors, "city_id", self.city_id);
        check_step(&mut errors, step, self.check_in, self.guests);

        let criteria = city_id.map(|city_id| OptionsCriteria {
            locations: vec![location(city_id, self.neighborhood_id)],
            check_in: self.check_in,
            guests: self.guests,
        });
        finish(errors, criteria)
    }
}

impl CompareOptionsQueryDto {
    pub fn into_criteria(self, step: OptionStep) -> Result<OptionsCriteria, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let city_1 = required(&mut errors, "city_1", self.city_1);
        let city_2 = required(&mut errors, "city_2", self.city_2);
        check_step(&mut errors, step, self.check_in, self.guests);

        let criteria = match (city_1, city_2) {
            (Some(city_1), Some(city_2)) => {
                let first = location(city_1, self.neighborhood_1);
                let second = location(city_2, self.neighborhood_2);
                check_distinct_locations(&mut errors, &first, &second);
                Some(OptionsCriteria {
                    locations: vec![first, second],
                    check_in: self.check_in,
                    guests: self.guests,
                })
            }
            _ => None,
        };
        finish(errors, criteria)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CityDto {
    pub id: i64,
    pub name: String,
    pub state: String,
    pub display_name: String,
}

impl CityDto {
    pub fn filter_city(city: &City) -> Self {
        CityDto {
            id: city.id,
            name: city.name.clone(),
            state: city.state.clone(),
            display_name: city.display_name(),
        }
    }

    pub fn filter_cities(cities: &[City]) -> Vec<CityDto> {
        cities.iter().map(CityDto::filter_city).collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NeighborhoodDto {
    pub id: i64,
    pub city_id: i64,
    pub name: String,
}

impl NeighborhoodDto {
    pub fn filter_neighborhoods(neighborhoods: &[Neighborhood]) -> Vec<NeighborhoodDto> {
        neighborhoods
            .iter()
            .map(|n| NeighborhoodDto {
                id: n.id,
                city_id: n.city_id,
                name: n.name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_step_requires_one_more_input() {
        let base = OptionsQueryDto { city_id: Some(1), ..OptionsQueryDto::default() };
        assert!(base.clone().into_criteria(OptionStep::Dates).is_ok());

        let errors = base.clone().into_criteria(OptionStep::Guests).unwrap_err();
        assert!(errors.field_errors().contains_key("check_in"));

        let with_date = OptionsQueryDto { check_in: NaiveDate::from_ymd_opt(2030, 1, 1), ..base };
        let errors = with_date.clone().into_criteria(OptionStep::Nights).unwrap_err();
        assert!(errors.field_errors().contains_key("guests"));
        assert!(with_date.into_criteria(OptionStep::Guests).is_ok());
    }

    #[test]
    fn compare_options_need_two_distinct_locations() {
        let query = CompareOptionsQueryDto {
            city_1: Some(1),
            city_2: Some(1),
            ..CompareOptionsQueryDto::default()
        };
        assert!(query.into_criteria(OptionStep::Dates).is_err());

        let query = CompareOptionsQueryDto {
            city_1: Some(1),
            city_2: Some(2),
            ..CompareOptionsQueryDto::default()
        };
        let criteria = query.into_criteria(OptionStep::Dates).unwrap();
        assert_eq!(criteria.locations, vec![Location::city(1), Location::city(2)]);
    }
}
