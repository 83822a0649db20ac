//! Field processing pipeline.
//!
//! Every raw input goes through the same steps: preprocess, empty and
//! required rules, conversion, then the validator chain. The result is an
//! [`Outcome`] that the form state applies to its stores and data source.

use crate::converter::{Converter, EmptyEncoding, RawRepr};
use crate::field::Field;
use crate::options::ConverterOptions;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Check on a converted value. Returns an error message on failure.
///
/// The second argument is the form context from
/// [`ConverterOptions::context`].
pub type Validator<V> = Arc<dyn Fn(&V, &Value) -> Option<String> + Send + Sync>;

/// Run validators in order and return the first failure message.
///
/// ```
/// use formstate::validation::{first_failure, Validator};
/// use serde_json::Value;
/// use std::sync::Arc;
///
/// let positive: Validator<i64> =
///     Arc::new(|v, _| (*v <= 0).then(|| "must be positive".to_string()));
/// let small: Validator<i64> = Arc::new(|v, _| (*v > 10).then(|| "too big".to_string()));
///
/// let chain = [positive, small];
/// assert_eq!(first_failure(&chain, &-1, &Value::Null).as_deref(), Some("must be positive"));
/// assert_eq!(first_failure(&chain, &5, &Value::Null), None);
/// ```
pub fn first_failure<V>(validators: &[Validator<V>], value: &V, context: &Value) -> Option<String> {
    validators.iter().find_map(|validate| validate(value, context))
}

/// Change to apply to the data source at the field's path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Write {
    Set(Value),
    Unset,
}

/// Result of running a raw value through a field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// The value passed every check.
    Accepted(Write),
    /// The field is required and the raw is empty; the empty value, if the
    /// converter has one, is still written.
    Required(Option<Write>),
    /// The raw could not be converted.
    ConversionFailed,
    /// A validator rejected the value.
    Invalid(String),
}

impl Outcome {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Outcome::Accepted(_) => "accepted",
            Outcome::Required(_) => "required",
            Outcome::ConversionFailed => "conversion_failed",
            Outcome::Invalid(_) => "invalid",
        }
    }
}

fn encode<V: Serialize>(value: &V) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::warn!(error = %e, "converted value is not representable as JSON");
            None
        }
    }
}

fn empty_write<R, V>(converter: &Converter<R, V>) -> Option<Write>
where
    R: RawRepr,
    V: Serialize + Clone + Send + Sync + 'static,
{
    if converter.is_empty_impossible() {
        return None;
    }
    let empty = converter.empty_value()?;
    match converter.empty_encoding() {
        EmptyEncoding::Omit => Some(Write::Unset),
        EmptyEncoding::Null => encode(empty).map(Write::Set),
    }
}

/// Run the full pipeline for one raw value.
pub(crate) async fn process<R, V>(field: Field<R, V>, raw: Value, options: ConverterOptions) -> Outcome
where
    R: RawRepr,
    V: Serialize + Clone + Send + Sync + 'static,
{
    let Some(raw) = R::from_json(&raw) else {
        return Outcome::ConversionFailed;
    };
    let converter = field.converter();
    let raw = converter.preprocess(raw, &options);

    if raw == *converter.empty_raw() {
        if field.is_required() && !converter.is_never_required() {
            return Outcome::Required(empty_write(converter));
        }
        if let Some(write) = empty_write(converter) {
            return Outcome::Accepted(write);
        }
    }

    let value = match converter.convert(raw, &options).resolve().await {
        Ok(value) => value,
        Err(_) => return Outcome::ConversionFailed,
    };

    if let Some(message) = first_failure(field.validators(), &value, &options.context) {
        return Outcome::Invalid(message);
    }

    match encode(&value) {
        Some(json) => Outcome::Accepted(Write::Set(json)),
        None => Outcome::ConversionFailed,
    }
}
