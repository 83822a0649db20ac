//! Form-wide configuration.
//!
//! Options are plain serde structs so a host can load them from JSON:
//!
//! ```
//! use formstate::FormOptions;
//!
//! let options: FormOptions = serde_json::from_str(
//!     r#"{"converter": {"decimal_separator": ",", "thousand_separator": "."}}"#,
//! )
//! .unwrap();
//! assert_eq!(options.converter.decimal_separator, ',');
//! assert_eq!(options.required_error, "Required");
//! ```

use crate::decimal::DecimalOptions;
use crate::error::{FormError, FormResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options passed to every converter call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    /// Separator between whole and fractional digits.
    pub decimal_separator: char,
    /// Separator between groups of three whole digits.
    pub thousand_separator: char,
    /// Whether decimals render with thousand separators (and accept them).
    pub render_thousands: bool,
    /// Arbitrary host data, visible to validators and context-aware converters.
    pub context: Value,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            thousand_separator: ',',
            render_thousands: false,
            context: Value::Null,
        }
    }
}

impl ConverterOptions {
    /// Decimal codec settings combining these separators with digit limits.
    pub fn decimal_options(
        &self,
        max_whole_digits: usize,
        decimal_places: usize,
        allow_negative: bool,
        add_zeroes: bool,
    ) -> DecimalOptions {
        DecimalOptions {
            max_whole_digits,
            decimal_places,
            allow_negative,
            add_zeroes,
            decimal_separator: self.decimal_separator,
            thousand_separator: self.thousand_separator,
            render_thousands: self.render_thousands,
        }
    }

    /// Validate separator settings.
    pub fn check(&self) -> FormResult<()> {
        self.decimal_options(0, 0, true, false)
            .check()
            .map_err(|e| FormError::invalid_options(e.to_string()))
    }
}

/// Configuration for a [`FormState`](crate::FormState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Converter options shared by all fields.
    pub converter: ConverterOptions,
    /// Message for a required field left empty.
    pub required_error: String,
    /// Message for raw input that could not be converted.
    pub conversion_error: String,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            converter: ConverterOptions::default(),
            required_error: "Required".to_string(),
            conversion_error: "Could not convert".to_string(),
        }
    }
}

impl FormOptions {
    /// Set the converter context.
    pub fn with_context(mut self, context: Value) -> Self {
        self.converter.context = context;
        self
    }

    /// Set decimal and thousand separators.
    pub fn with_separators(mut self, decimal: char, thousand: char) -> Self {
        self.converter.decimal_separator = decimal;
        self.converter.thousand_separator = thousand;
        self
    }

    /// Enable thousand separators when rendering decimals.
    pub fn with_render_thousands(mut self, render: bool) -> Self {
        self.converter.render_thousands = render;
        self
    }

    /// Validate the configuration.
    pub fn check(&self) -> FormResult<()> {
        self.converter.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = FormOptions::default();
        assert_eq!(options.conversion_error, "Could not convert");
        assert_eq!(options.converter.decimal_separator, '.');
        assert!(options.check().is_ok());
    }

    #[test]
    fn test_load_partial_json() {
        let options: FormOptions = serde_json::from_value(json!({
            "required_error": "Verplicht",
            "converter": {"context": {"currency": "EUR"}}
        }))
        .unwrap();
        assert_eq!(options.required_error, "Verplicht");
        assert_eq!(options.conversion_error, "Could not convert");
        assert_eq!(options.converter.context["currency"], "EUR");
        assert_eq!(options.converter.thousand_separator, ',');
    }

    #[test]
    fn test_equal_separators_rejected() {
        let options = FormOptions::default().with_separators(',', ',');
        assert!(matches!(options.check(), Err(FormError::InvalidOptions { .. })));
    }
}
