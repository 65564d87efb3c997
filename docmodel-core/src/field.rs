//! Typed scalar field descriptors and value holders.
//!
//! A [`Field`] is the leaf building block of a model: it pairs a scalar kind
//! (with its parameters) with a current value, a validator list, and the
//! failures accumulated by the last validation pass. Fields are declared once
//! per model as prototypes and cloned into every materialized document, so
//! each document owns independent value state.
//!
//! A field never validates on assignment: [`Field::set_value`] stores the
//! value verbatim and [`Field::run_validators`] populates
//! [`Field::errors`] in a single, non-short-circuiting pass.

use std::fmt;
use std::sync::Arc;

use bson::Bson;

use crate::error::ValidationFailure;
use crate::validators::validate_int;

/// A pure validation function over a BSON value.
pub type Validator = Arc<dyn Fn(&Bson) -> Result<(), ValidationFailure> + Send + Sync>;

const STRING_MIN_LENGTH: usize = 1;
const STRING_MAX_LENGTH: usize = 128;
const TEXT_MAX_LENGTH: usize = 1000;

/// The scalar kind of a field, with its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Short text with exclusive length bounds.
    String { min_length: usize, max_length: usize },
    /// Long-form text; length is bounded above only.
    Text { max_length: usize },
    /// Whole numbers.
    Integer,
    /// A timestamp; defaults to the Unix epoch sentinel when unset.
    Date,
}

/// Typed scalar value holder with validators.
#[derive(Clone)]
pub struct Field {
    kind: FieldKind,
    required: bool,
    validators: Vec<Validator>,
    value: Option<Bson>,
    errors: Vec<ValidationFailure>,
}

impl Field {
    fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            validators: Vec::new(),
            value: None,
            errors: Vec::new(),
        }
    }

    /// A short text field; length bounds default to 1 and 128, both exclusive.
    pub fn string() -> Self {
        Self::new(FieldKind::String {
            min_length: STRING_MIN_LENGTH,
            max_length: STRING_MAX_LENGTH,
        })
    }

    /// A long-form text field; maximum length defaults to 1000, exclusive.
    pub fn text() -> Self {
        Self::new(FieldKind::Text { max_length: TEXT_MAX_LENGTH })
    }

    /// A whole-number field. Always carries the int-type validator.
    pub fn integer() -> Self {
        let mut field = Self::new(FieldKind::Integer);
        field.validators.push(Arc::new(validate_int));
        field
    }

    /// A timestamp field defaulting to the Unix epoch sentinel.
    pub fn date() -> Self {
        let mut field = Self::new(FieldKind::Date);
        field.value = Some(Bson::DateTime(bson::DateTime::from_millis(0)));
        field
    }

    /// A timestamp field with an explicit initial value.
    ///
    /// Taking a [`bson::DateTime`] rejects non-timestamp values at
    /// construction time rather than deferring to validation.
    pub fn date_at(when: bson::DateTime) -> Self {
        let mut field = Self::new(FieldKind::Date);
        field.value = Some(Bson::DateTime(when));
        field
    }

    /// Overrides the exclusive lower length bound (string kinds).
    pub fn min_length(mut self, min_length: usize) -> Self {
        if let FieldKind::String { min_length: min, .. } = &mut self.kind {
            *min = min_length;
        }
        self
    }

    /// Overrides the exclusive upper length bound (string kinds).
    pub fn max_length(mut self, max_length: usize) -> Self {
        match &mut self.kind {
            FieldKind::String { max_length: max, .. } => *max = max_length,
            FieldKind::Text { max_length: max } => *max = max_length,
            _ => {}
        }
        self
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Appends a validator to the ordered validator list.
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Bson) -> Result<(), ValidationFailure> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The current value, if one has been set.
    pub fn value(&self) -> Option<&Bson> {
        self.value.as_ref()
    }

    /// Stores the value verbatim. No coercion, no validation.
    pub fn set_value(&mut self, value: impl Into<Bson>) {
        self.value = Some(value.into());
    }

    /// Clears the value back to unset.
    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Runs every validator in declared order against the current value,
    /// appending each failure to [`Field::errors`]. Does not short-circuit,
    /// so one pass collects all violations. An unset value is validated as
    /// `Bson::Null`.
    pub fn run_validators(&mut self) {
        let value = self.value.clone().unwrap_or(Bson::Null);
        for validator in &self.validators {
            if let Err(failure) = validator(&value) {
                self.errors.push(failure);
            }
        }
    }

    /// Length check for string kinds. Fails when
    /// `len <= min_length || len >= max_length` — both bounds are exclusive,
    /// so a value exactly at either bound is rejected.
    pub fn validate_length(&self) -> Result<(), ValidationFailure> {
        let (min_length, max_length) = match self.kind {
            FieldKind::String { min_length, max_length } => (min_length, max_length),
            FieldKind::Text { max_length } => (0, max_length),
            _ => return Ok(()),
        };

        let text = match &self.value {
            Some(Bson::String(text)) => text,
            _ => {
                return Err(ValidationFailure::new(
                    "value is not a string",
                    "set a string value before checking its length",
                ));
            }
        };

        if text.len() <= min_length || text.len() >= max_length {
            return Err(ValidationFailure::new(
                format!("length of data must be between {} and {}", min_length, max_length),
                format!(
                    "make text no less than {} characters or more than {} characters",
                    min_length, max_length
                ),
            ));
        }

        Ok(())
    }

    /// Renders a date-kind value with a chrono format string.
    ///
    /// Returns `None` for non-date kinds or when no timestamp value is set.
    pub fn format(&self, fmt: &str) -> Option<String> {
        match (&self.kind, &self.value) {
            (FieldKind::Date, Some(Bson::DateTime(when))) => {
                Some(when.to_chrono().format(fmt).to_string())
            }
            _ => None,
        }
    }

    /// Failures accumulated by the last [`Field::run_validators`] pass.
    pub fn errors(&self) -> &[ValidationFailure] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("validators", &self.validators.len())
            .field("value", &self.value)
            .field("errors", &self.errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::validate_str;

    #[test]
    fn set_value_stores_verbatim_without_validating() {
        let mut field = Field::integer();
        field.set_value("not an int");
        assert_eq!(field.value(), Some(&Bson::String("not an int".into())));
        assert!(field.errors().is_empty());
    }

    #[test]
    fn run_validators_collects_all_failures() {
        let mut field = Field::integer().validator(validate_str);
        field.set_value(Bson::Double(1.5));
        field.run_validators();
        // Both the int and the str validator fail; neither short-circuits.
        assert_eq!(field.errors().len(), 2);
        assert!(!field.is_valid());
    }

    #[test]
    fn run_validators_passes_null_when_unset() {
        let mut field = Field::integer();
        field.run_validators();
        assert_eq!(field.errors().len(), 1);
        assert!(field.errors()[0].message.contains("null"));
    }

    #[test]
    fn length_bounds_are_exclusive_on_both_ends() {
        let mut field = Field::string().min_length(1).max_length(5);

        field.set_value("abcde"); // len == max
        assert!(field.validate_length().is_err());

        field.set_value("a"); // len == min
        assert!(field.validate_length().is_err());

        field.set_value("abc");
        assert!(field.validate_length().is_ok());
    }

    #[test]
    fn text_field_bounds_above_only() {
        let mut field = Field::text().max_length(10);
        field.set_value("long enough? no");
        assert!(field.validate_length().is_err());
        field.set_value("short");
        assert!(field.validate_length().is_ok());
    }

    #[test]
    fn length_check_on_non_string_value_fails() {
        let mut field = Field::string();
        field.set_value(42);
        assert!(field.validate_length().is_err());
    }

    #[test]
    fn date_defaults_to_epoch() {
        let field = Field::date();
        assert_eq!(field.value(), Some(&Bson::DateTime(bson::DateTime::from_millis(0))));
        assert_eq!(field.format("%Y-%m-%d").as_deref(), Some("1970-01-01"));
    }

    #[test]
    fn date_at_carries_the_given_timestamp() {
        let when = bson::DateTime::from_millis(86_400_000);
        let field = Field::date_at(when);
        assert_eq!(field.format("%Y-%m-%d").as_deref(), Some("1970-01-02"));
    }

    #[test]
    fn format_is_none_for_non_date_kinds() {
        let mut field = Field::string();
        field.set_value("1970");
        assert!(field.format("%Y").is_none());
    }
}
