//! Form declaration and validation.
//!
//! A [`Form`] lists the fields a resource accepts and, per field, a chain of
//! validators. Each validator answers with a three-way [`Validation`]:
//!
//! - `Valid(value)`: pass `value` (possibly normalized) to the next validator.
//! - `Skip`: stop the chain and accept the current value as is.
//! - `Invalid(message)`: the field fails with `message`.
//!
//! Creating a record needs every field to pass. Updating one applies each
//! field independently and leaves failing fields untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

const DEFAULT_MESSAGE: &str = "Please correct this field.";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[_a-z0-9-]+(?:\.[_a-z0-9-]+)*@[a-z0-9-]+(?:\.[a-z0-9-]+)*(?:\.[a-z]{2,})$")
        .expect("EMAIL: invalid pattern")
});

/// Outcome of one validator on one value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Validation {
    Valid(String),
    Skip,
    Invalid(String),
}

/// A single field check.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &str) -> Validation;
}

impl<F> Validator for F
where
    F: Fn(&str) -> Validation + Send + Sync,
{
    fn validate(&self, value: &str) -> Validation {
        self(value)
    }
}

/// One field that failed its chain.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

/// Every failing field of a submission, field → message.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn len(&self) -> usize { self.0.len() }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn push(&mut self, failure: ValidationFailure) {
        self.0.insert(failure.field, failure.message);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Values that passed validation, in form declaration order.
pub type Fields = Vec<(String, String)>;

/// The fields a resource accepts and how each is checked.
#[derive(Clone, Default)]
pub struct Form {
    fields: Vec<(String, Vec<Arc<dyn Validator>>)>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field with its validator chain. Returns `self` for chaining.
    pub fn field(mut self, name: &str, validators: Vec<Arc<dyn Validator>>) -> Self {
        self.fields.push((name.to_owned(), validators));
        self
    }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() }

    /// Declared field names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Runs the chain of `field` over `value`.
    ///
    /// Undeclared fields are invalid.
    pub fn check(&self, field: &str, value: &str) -> Result<String, ValidationFailure> {
        let Some((_, chain)) = self.fields.iter().find(|(name, _)| name == field) else {
            return Err(ValidationFailure { field: field.to_owned(), message: "Unknown field.".to_owned() });
        };

        let mut current = value.to_owned();
        for validator in chain {
            match validator.validate(&current) {
                Validation::Valid(next) => current = next,
                Validation::Skip => break,
                Validation::Invalid(message) => {
                    return Err(ValidationFailure { field: field.to_owned(), message });
                }
            }
        }
        Ok(current)
    }

    /// Validates a whole submission. A field missing from `data` is checked as empty.
    ///
    /// Fails with every failing field at once.
    pub fn validate<'a, F>(&self, data: F) -> Result<Fields, FieldErrors>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut accepted = Vec::with_capacity(self.fields.len());
        let mut errors = FieldErrors::default();

        for name in self.names() {
            match self.check(name, data(name).unwrap_or_default()) {
                Ok(value) => accepted.push((name.to_owned(), value)),
                Err(failure) => errors.push(failure),
            }
        }

        if errors.is_empty() { Ok(accepted) } else { Err(errors) }
    }
}

// ── Built-in validators ───────────────────────────────────────────────────────

fn verdict(ok: bool, value: &str, message: &str) -> Validation {
    if ok {
        Validation::Valid(value.to_owned())
    } else {
        Validation::Invalid(message.to_owned())
    }
}

macro_rules! with_message {
    ($ty:ident) => {
        impl $ty {
            /// Replaces the default failure message.
            pub fn message(mut self, message: &str) -> Self {
                self.message = message.to_owned();
                self
            }

            /// Erases the validator for use in a [`Form`] chain.
            pub fn boxed(self) -> Arc<dyn Validator> {
                Arc::new(self)
            }
        }
    };
}

/// Fails on an empty value.
pub struct Required { message: String }

impl Required {
    pub fn new() -> Self { Self { message: DEFAULT_MESSAGE.to_owned() } }
}

impl Validator for Required {
    fn validate(&self, value: &str) -> Validation {
        verdict(!value.is_empty(), value, &self.message)
    }
}

/// Passes an empty value without running the rest of the chain.
#[derive(Default)]
pub struct Optional;

impl Optional {
    pub fn new() -> Self { Self }

    pub fn boxed(self) -> Arc<dyn Validator> {
        Arc::new(self)
    }
}

impl Validator for Optional {
    fn validate(&self, value: &str) -> Validation {
        if value.is_empty() { Validation::Skip } else { Validation::Valid(value.to_owned()) }
    }
}

/// Character count within `min..=max`. `None` leaves a side open.
pub struct Length { min: Option<usize>, max: Option<usize>, message: String }

impl Length {
    pub fn new(min: Option<usize>, max: Option<usize>) -> Self {
        Self { min, max, message: DEFAULT_MESSAGE.to_owned() }
    }
}

impl Validator for Length {
    fn validate(&self, value: &str) -> Validation {
        let len = value.chars().count();
        let ok = self.min.is_none_or(|min| len >= min) && self.max.is_none_or(|max| len <= max);
        verdict(ok, value, &self.message)
    }
}

/// The value must be one of a fixed set.
pub struct AnyOf { values: Vec<String>, message: String }

impl AnyOf {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(values: I) -> Self {
        Self { values: values.into_iter().map(Into::into).collect(), message: DEFAULT_MESSAGE.to_owned() }
    }
}

impl Validator for AnyOf {
    fn validate(&self, value: &str) -> Validation {
        verdict(self.values.iter().any(|v| v == value), value, &self.message)
    }
}

/// The value must not be one of a fixed set.
pub struct NoneOf { values: Vec<String>, message: String }

impl NoneOf {
    pub fn new<I: IntoIterator<Item = S>, S: Into<String>>(values: I) -> Self {
        Self { values: values.into_iter().map(Into::into).collect(), message: DEFAULT_MESSAGE.to_owned() }
    }
}

impl Validator for NoneOf {
    fn validate(&self, value: &str) -> Validation {
        verdict(!self.values.iter().any(|v| v == value), value, &self.message)
    }
}

/// The value must equal a given one (confirmation fields, honeypots).
pub struct EqualTo { expected: String, message: String }

impl EqualTo {
    pub fn new(expected: &str) -> Self {
        Self { expected: expected.to_owned(), message: DEFAULT_MESSAGE.to_owned() }
    }
}

impl Validator for EqualTo {
    fn validate(&self, value: &str) -> Validation {
        verdict(value == self.expected, value, &self.message)
    }
}

/// A lowercase `local@domain.tld` address.
pub struct Email { message: String }

impl Email {
    pub fn new() -> Self { Self { message: DEFAULT_MESSAGE.to_owned() } }
}

impl Validator for Email {
    fn validate(&self, value: &str) -> Validation {
        verdict(EMAIL.is_match(value), value, &self.message)
    }
}

/// The value must match a regular expression.
pub struct Regexp { regex: Regex, message: String }

impl Regexp {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self { regex: Regex::new(pattern)?, message: DEFAULT_MESSAGE.to_owned() })
    }
}

impl Validator for Regexp {
    fn validate(&self, value: &str) -> Validation {
        verdict(self.regex.is_match(value), value, &self.message)
    }
}

/// A number within `min..=max`. `None` leaves a side open.
pub struct NumberRange { min: Option<f64>, max: Option<f64>, message: String }

impl NumberRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max, message: DEFAULT_MESSAGE.to_owned() }
    }
}

impl Validator for NumberRange {
    fn validate(&self, value: &str) -> Validation {
        let ok = value.trim().parse::<f64>().is_ok_and(|n| {
            self.min.is_none_or(|min| n >= min) && self.max.is_none_or(|max| n <= max)
        });
        verdict(ok, value.trim(), &self.message)
    }
}

with_message!(Required);
with_message!(Length);
with_message!(AnyOf);
with_message!(NoneOf);
with_message!(EqualTo);
with_message!(Email);
with_message!(Regexp);
with_message!(NumberRange);

impl Default for Required { fn default() -> Self { Self::new() } }
impl Default for Email { fn default() -> Self { Self::new() } }

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_form() -> Form {
        Form::new()
            .field("name", vec![Required::new().message("Name is required.").boxed(), Length::new(Some(2), Some(20)).boxed()])
            .field("email", vec![Optional::new().boxed(), Email::new().boxed()])
            .field("size", vec![NumberRange::new(Some(1.0), Some(10.0)).message("1 to 10.").boxed()])
    }

    #[test]
    fn valid_submission_keeps_declaration_order() {
        let data = [("size", " 3 "), ("name", "sprocket"), ("email", "")];
        let lookup = |k: &str| data.iter().find(|(n, _)| *n == k).map(|(_, v)| *v);

        let fields = widget_form().validate(lookup).unwrap();
        assert_eq!(
            fields,
            vec![
                ("name".to_owned(), "sprocket".to_owned()),
                ("email".to_owned(), String::new()),
                ("size".to_owned(), "3".to_owned()),
            ]
        );
    }

    #[test]
    fn aggregates_every_failure() {
        let data = [("name", ""), ("email", "not-an-email"), ("size", "11")];
        let lookup = |k: &str| data.iter().find(|(n, _)| *n == k).map(|(_, v)| *v);

        let errors = widget_form().validate(lookup).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.get("name"), Some("Name is required."));
        assert_eq!(errors.get("email"), Some(DEFAULT_MESSAGE));
        assert_eq!(errors.get("size"), Some("1 to 10."));
    }

    #[test]
    fn skip_stops_the_chain() {
        let form = Form::new().field("nick", vec![Optional::new().boxed(), Required::new().boxed()]);
        assert_eq!(form.check("nick", ""), Ok(String::new()));
    }

    #[test]
    fn closures_are_validators() {
        let upper: Arc<dyn Validator> = Arc::new(|v: &str| Validation::Valid(v.to_uppercase()));
        let form = Form::new().field("code", vec![upper, AnyOf::new(["ABC"]).boxed()]);
        assert_eq!(form.check("code", "abc"), Ok("ABC".to_owned()));
        assert!(form.check("code", "xyz").is_err());
        assert!(form.check("other", "abc").is_err());
    }

    #[test]
    fn membership_and_equality() {
        assert_eq!(NoneOf::new(["admin"]).validate("admin"), Validation::Invalid(DEFAULT_MESSAGE.to_owned()));
        assert_eq!(EqualTo::new("yes").validate("yes"), Validation::Valid("yes".to_owned()));
        assert!(matches!(Regexp::new("^[a-z]+$").unwrap().validate("a1"), Validation::Invalid(_)));
    }
}
