pub mod comparisondtos;
pub mod importdtos;
pub mod locationdtos;
pub mod plannerdtos;
pub mod searchdtos;

use std::borrow::Cow;

use chrono::NaiveDate;
use validator::{Validate, ValidationError, ValidationErrors};

/// Field key for errors that belong to the request as a whole.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub(crate) fn rule(code: &'static str, message: impl Into<String>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message.into()));
    error
}

/// Run the derived field rules and hand back the (possibly empty) error set
/// so cross-field checks can keep adding to it.
pub(crate) fn field_checks<T: Validate>(dto: &T) -> ValidationErrors {
    match dto.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    }
}

pub(crate) fn check_not_past(
    errors: &mut ValidationErrors,
    field: &'static str,
    date: Option<NaiveDate>,
    today: NaiveDate,
) {
    if matches!(date, Some(d) if d < today) {
        errors.add(field, rule("past_date", "Check-in date cannot be in the past"));
    }
}

pub(crate) fn required<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<T>,
) -> Option<T> {
    if value.is_none() {
        errors.add(field, rule("required", format!("{} is required", field)));
    }
    value
}

pub(crate) fn finish<T>(errors: ValidationErrors, value: Option<T>) -> Result<T, ValidationErrors> {
    match value {
        Some(value) if errors.errors().is_empty() => Ok(value),
        _ => Err(errors),
    }
}
