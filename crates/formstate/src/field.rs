//! Field definitions.

use crate::converter::{Controlled, Converter, RawRepr};
use crate::options::ConverterOptions;
use crate::validation::{self, Outcome, Validator};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A leaf of a form: a converter plus the checks applied to its value.
///
/// ```
/// use formstate::{converters, Field};
///
/// let age = Field::new(converters::integer())
///     .required()
///     .validator(|age: &i64, _| (*age < 18).then(|| "too young".to_string()));
/// assert!(age.is_required());
/// ```
pub struct Field<R, V> {
    converter: Converter<R, V>,
    validators: Vec<Validator<V>>,
    required: bool,
    required_error: Option<String>,
    conversion_error: Option<String>,
}

impl<R: Clone, V: Clone> Clone for Field<R, V> {
    fn clone(&self) -> Self {
        Self {
            converter: self.converter.clone(),
            validators: self.validators.clone(),
            required: self.required,
            required_error: self.required_error.clone(),
            conversion_error: self.conversion_error.clone(),
        }
    }
}

impl<R: fmt::Debug, V> fmt::Debug for Field<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("converter", &self.converter)
            .field("validators", &self.validators.len())
            .field("required", &self.required)
            .finish()
    }
}

impl<R, V> Field<R, V>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    /// Create an optional field without validators.
    pub fn new(converter: Converter<R, V>) -> Self {
        Self {
            converter,
            validators: Vec::new(),
            required: false,
            required_error: None,
            conversion_error: None,
        }
    }

    /// Reject empty input.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Append a validator. Validators run in the order they were added.
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&V, &Value) -> Option<String> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(f));
        self
    }

    /// Override the form's required message for this field.
    pub fn required_error(mut self, message: impl Into<String>) -> Self {
        self.required_error = Some(message.into());
        self
    }

    /// Override the form's conversion message for this field.
    pub fn conversion_error(mut self, message: impl Into<String>) -> Self {
        self.conversion_error = Some(message.into());
        self
    }

    /// The field's converter.
    #[inline]
    pub fn converter(&self) -> &Converter<R, V> {
        &self.converter
    }

    /// The field's validators in order.
    #[inline]
    pub fn validators(&self) -> &[Validator<V>] {
        &self.validators
    }

    /// Whether empty input is rejected.
    #[inline]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Type-erased view of a field used by the form state.
pub(crate) trait FieldDef: Send + Sync {
    fn controlled(&self) -> Controlled;

    fn is_required(&self) -> bool;

    fn required_error(&self) -> Option<&str>;

    fn conversion_error(&self) -> Option<&str>;

    /// Raw for a stored value; `None` if the data has no value at the path.
    fn render(&self, stored: Option<&Value>, options: &ConverterOptions) -> Value;

    fn process(&self, raw: Value, options: &ConverterOptions) -> BoxFuture<'static, Outcome>;
}

impl<R, V> FieldDef for Field<R, V>
where
    R: RawRepr,
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn controlled(&self) -> Controlled {
        self.converter.controlled()
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn required_error(&self) -> Option<&str> {
        self.required_error.as_deref()
    }

    fn conversion_error(&self) -> Option<&str> {
        self.conversion_error.as_deref()
    }

    fn render(&self, stored: Option<&Value>, options: &ConverterOptions) -> Value {
        let value = match stored {
            Some(json) => serde_json::from_value::<V>(json.clone()).ok(),
            None => self.converter.empty_value().cloned(),
        };
        match value {
            Some(value) => self.converter.render(&value, options).to_json(),
            None => self.converter.empty_raw().to_json(),
        }
    }

    fn process(&self, raw: Value, options: &ConverterOptions) -> BoxFuture<'static, Outcome> {
        validation::process(self.clone(), raw, options.clone()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters;
    use serde_json::json;

    #[test]
    fn test_render_stored_value() {
        let options = ConverterOptions::default();
        let field = Field::new(converters::number());
        assert_eq!(field.render(Some(&json!(2.5)), &options), json!("2.5"));
        assert_eq!(field.render(None, &options), json!(""));
        // stored data of the wrong type renders as empty input
        assert_eq!(field.render(Some(&json!("x")), &options), json!(""));
    }

    #[test]
    fn test_render_missing_optional() {
        let options = ConverterOptions::default();
        let field = Field::new(converters::maybe_null(converters::integer()));
        assert_eq!(field.render(Some(&Value::Null), &options), json!(""));
        assert_eq!(field.render(None, &options), json!(""));
        assert_eq!(field.render(Some(&json!(3)), &options), json!("3"));
    }

    #[test]
    fn test_messages() {
        let field = Field::new(converters::string())
            .required()
            .required_error("Fill me")
            .conversion_error("Bad");
        assert_eq!(FieldDef::required_error(&field), Some("Fill me"));
        assert_eq!(FieldDef::conversion_error(&field), Some("Bad"));
        assert_eq!(field.controlled(), Controlled::Value);
    }
}
