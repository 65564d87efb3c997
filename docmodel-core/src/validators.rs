//! Built-in field validators.
//!
//! Validators are pure functions from a BSON value to a validation outcome.
//! They never raise; failures are returned and accumulated by
//! [`Field::run_validators`](crate::field::Field::run_validators).

use bson::Bson;

use crate::error::ValidationFailure;

fn type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "boolean",
        Bson::Null => "null",
        Bson::Int32(_) => "int32",
        Bson::Int64(_) => "int64",
        Bson::DateTime(_) => "datetime",
        Bson::Binary(_) => "binary",
        _ => "other",
    }
}

/// Passes only whole-number values.
pub fn validate_int(value: &Bson) -> Result<(), ValidationFailure> {
    match value {
        Bson::Int32(_) | Bson::Int64(_) => Ok(()),
        other => Err(ValidationFailure::new(
            format!("value is of type {} and should be int", type_name(other)),
            "use int values",
        )),
    }
}

/// Passes only floating-point values.
pub fn validate_float(value: &Bson) -> Result<(), ValidationFailure> {
    match value {
        Bson::Double(_) => Ok(()),
        other => Err(ValidationFailure::new(
            format!("value is of type {} and should be float", type_name(other)),
            "use float values",
        )),
    }
}

/// Passes only text values.
pub fn validate_str(value: &Bson) -> Result<(), ValidationFailure> {
    match value {
        Bson::String(_) => Ok(()),
        other => Err(ValidationFailure::new(
            format!("value is of type {} and should be str", type_name(other)),
            "use string values",
        )),
    }
}
