use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use super::{field_checks, finish, rule, NON_FIELD_ERRORS};
use crate::utils::{
    decimal::round_to,
    query::{empty_string_as_none, form_checkbox},
};

pub const MIN_BUDGET_PER_NIGHT: f64 = 50.0;
pub const HIGH_BUDGET_PER_NIGHT: f64 = 2000.0;
pub const SEARCH_WINDOWS: [i64; 4] = [30, 60, 90, 180];

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PlannerQueryDto {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Total budget is required"),
        range(min = 100.0, max = 50000.0, message = "Total budget must be between 100 and 50000")
    )]
    pub total_budget: Option<f64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Nights is required"),
        range(min = 1, max = 30, message = "Nights must be between 1 and 30")
    )]
    pub nights: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(
        required(message = "Guests is required"),
        range(min = 1, max = 20, message = "Guests must be between 1 and 20")
    )]
    pub guests: Option<i32>,

    #[serde(default, deserialize_with = "form_checkbox")]
    pub weekend_required: Option<bool>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(required(message = "Search window is required"))]
    pub window_days: Option<i64>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 10, message = "Minimum rooms must be between 1 and 10"))]
    pub min_rooms: Option<i32>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    #[validate(range(min = 1, max = 20, message = "Minimum beds must be between 1 and 20"))]
    pub min_beds: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerCriteria {
    pub total_budget: f64,
    pub budget_per_night: f64,
    pub nights: i64,
    pub guests: i32,
    pub weekend_required: bool,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub min_rooms: Option<i32>,
    pub min_beds: Option<i32>,
    /// Non-blocking remarks about the request, e.g. an unusually high budget.
    pub warnings: Vec<String>,
}

impl PlannerQueryDto {
    pub fn into_criteria(self, today: NaiveDate) -> Result<PlannerCriteria, ValidationErrors> {
        let mut errors = field_checks(&self);

        if let Some(window) = self.window_days {
            if !SEARCH_WINDOWS.contains(&window) {
                errors.add(
                    "window_days",
                    rule("choice", "Search window must be 30, 60, 90 or 180 days"),
                );
            }
        }

        let mut warnings = Vec::new();
        if let (Some(budget), Some(nights)) = (self.total_budget, self.nights) {
            if nights > 0 {
                let per_night = budget / nights as f64;
                if per_night < MIN_BUDGET_PER_NIGHT {
                    errors.add(
                        NON_FIELD_ERRORS,
                        rule(
                            "budget_too_low",
                            format!(
                                "Your budget works out to R$ {:.2} per night. \
                                 Raise the budget or shorten the stay.",
                                per_night
                            ),
                        ),
                    );
                } else if per_night > HIGH_BUDGET_PER_NIGHT {
                    warnings.push(
                        "Very high budget. Excellent options are available for much less."
                            .to_string(),
                    );
                }
            }
        }

        let criteria = match (self.total_budget, self.nights, self.guests, self.window_days) {
            (Some(total_budget), Some(nights), Some(guests), Some(window_days)) if nights > 0 => {
                Some(PlannerCriteria {
                    total_budget,
                    budget_per_night: round_to(total_budget / nights as f64, 2),
                    nights,
                    guests,
                    weekend_required: self.weekend_required.unwrap_or(false),
                    window_start: today,
                    window_end: today + Duration::days(window_days),
                    min_rooms: self.min_rooms,
                    min_beds: self.min_beds,
                    warnings,
                })
            }
            _ => None,
        };
        finish(errors, criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    }

    fn dto() -> PlannerQueryDto {
        PlannerQueryDto {
            total_budget: Some(900.0),
            nights: Some(3),
            guests: Some(2),
            window_days: Some(30),
            ..PlannerQueryDto::default()
        }
    }

    #[test]
    fn per_night_budget_is_total_over_nights() {
        let criteria = dto().into_criteria(today()).unwrap();
        assert_eq!(criteria.budget_per_night, 300.0);
        assert_eq!(criteria.window_end, NaiveDate::from_ymd_opt(2030, 1, 31).unwrap());
        assert!(!criteria.weekend_required);
        assert!(criteria.warnings.is_empty());
    }

    #[test]
    fn tiny_nightly_budget_is_rejected() {
        let query = PlannerQueryDto { total_budget: Some(100.0), nights: Some(3), ..dto() };
        let errors = query.into_criteria(today()).unwrap_err();
        assert!(errors.field_errors().contains_key(NON_FIELD_ERRORS));
    }

    #[test]
    fn huge_nightly_budget_only_warns() {
        let query = PlannerQueryDto { total_budget: Some(45000.0), nights: Some(2), ..dto() };
        let criteria = query.into_criteria(today()).unwrap();
        assert_eq!(criteria.warnings.len(), 1);
    }

    #[test]
    fn window_must_be_a_known_choice() {
        let query = PlannerQueryDto { window_days: Some(45), ..dto() };
        let errors = query.into_criteria(today()).unwrap_err();
        assert!(errors.field_errors().contains_key("window_days"));
    }

    #[test]
    fn budget_bounds_are_enforced() {
        for budget in [99.0, 50001.0] {
            let query = PlannerQueryDto { total_budget: Some(budget), nights: Some(1), ..dto() };
            assert!(query.into_criteria(today()).is_err(), "budget {}", budget);
        }
    }
}
