//! Concrete converters and converter combinators.

use crate::converter::{
    Conversion, ConversionError, Controlled, Converter, ConverterKind, EmptyEncoding, RawRepr,
};
use crate::options::ConverterOptions;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, LazyLock};

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(0|[1-9]\d*)$").expect("integer pattern is valid"));

/// Digit limits wide enough to make `number` accept any reasonable input.
const NUMBER_DIGITS: usize = 100;

fn trimmed(raw: String, _: &ConverterOptions) -> String {
    let trimmed = raw.trim();
    if trimmed.len() == raw.len() {
        raw
    } else {
        trimmed.to_owned()
    }
}

/// Free text. Surrounding whitespace is trimmed; empty input is `""`.
pub fn string() -> Converter<String, String> {
    Converter::new(String::new(), |raw, _| Ok(raw), |value: &String, _| value.clone())
        .with_empty_value(String::new())
        .with_preprocess(trimmed)
}

/// Floating point number entered as text.
///
/// Accepts the form's decimal and thousand separators; empty input is a
/// conversion failure.
pub fn number() -> Converter<String, f64> {
    Converter::new(
        String::new(),
        |raw: String, options: &ConverterOptions| {
            let canonical = options
                .decimal_options(NUMBER_DIGITS, NUMBER_DIGITS, true, false)
                .parse_canonical(&raw)?;
            let value: f64 = canonical.parse()?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ConversionError)
            }
        },
        |value: &f64, options: &ConverterOptions| {
            options
                .decimal_options(NUMBER_DIGITS, NUMBER_DIGITS, true, false)
                .render_canonical(&value.to_string())
        },
    )
    .empty_impossible()
    .with_preprocess(trimmed)
}

/// Whole number entered as text. Values outside the `i64` range fail.
pub fn integer() -> Converter<String, i64> {
    Converter::new(
        String::new(),
        |raw: String, _: &ConverterOptions| Ok(raw.parse::<i64>()?),
        |value: &i64, _: &ConverterOptions| value.to_string(),
    )
    .empty_impossible()
    .with_preprocess(trimmed)
    .with_raw_validate(|raw, _| INTEGER.is_match(raw))
}

/// Digit limits for the [`decimal`] converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimalLimits {
    /// Maximum number of digits before the decimal separator.
    pub max_whole_digits: usize,
    /// Number of digits after the decimal separator.
    pub decimal_places: usize,
    /// Whether negative values are accepted.
    pub allow_negative: bool,
}

impl Default for DecimalLimits {
    fn default() -> Self {
        Self {
            max_whole_digits: 10,
            decimal_places: 2,
            allow_negative: true,
        }
    }
}

impl DecimalLimits {
    /// Create limits allowing negative values.
    pub fn new(max_whole_digits: usize, decimal_places: usize) -> Self {
        Self {
            max_whole_digits,
            decimal_places,
            allow_negative: true,
        }
    }

    /// Reject negative values.
    pub fn non_negative(mut self) -> Self {
        self.allow_negative = false;
        self
    }
}

/// Fixed point decimal with fixed limits.
///
/// The raw always renders with exactly `decimal_places` fractional digits.
///
/// ```
/// use formstate::converters::{decimal, DecimalLimits};
/// use formstate::FormOptions;
///
/// let options = FormOptions::default()
///     .with_separators(',', '.')
///     .with_render_thousands(true);
/// let price = decimal(DecimalLimits::new(6, 2));
/// let value = futures::executor::block_on(
///     price.convert("1.234,5".into(), &options.converter).resolve(),
/// )
/// .unwrap();
/// assert_eq!(price.render(&value, &options.converter), "1.234,50");
/// ```
pub fn decimal(limits: DecimalLimits) -> Converter<String, Decimal> {
    decimal_with(move |_| limits)
}

/// Fixed point decimal whose limits are computed from the converter context.
pub fn decimal_with<F>(limits: F) -> Converter<String, Decimal>
where
    F: Fn(&Value) -> DecimalLimits + Send + Sync + 'static,
{
    let limits = Arc::new(limits);
    let render_limits = Arc::clone(&limits);
    Converter::new(
        String::new(),
        move |raw: String, options: &ConverterOptions| {
            let l = limits(&options.context);
            Ok(options
                .decimal_options(l.max_whole_digits, l.decimal_places, l.allow_negative, true)
                .parse(&raw)?)
        },
        move |value: &Decimal, options: &ConverterOptions| {
            let l = render_limits(&options.context);
            options
                .decimal_options(l.max_whole_digits, l.decimal_places, l.allow_negative, true)
                .render(value)
        },
    )
    .empty_impossible()
    .with_preprocess(trimmed)
}

/// Checkbox state. Never required; `false` is a valid value, not emptiness.
pub fn boolean() -> Converter<bool, bool> {
    Converter::new(false, |raw, _| Ok(raw), |value: &bool, _| *value)
        .empty_impossible()
        .never_required()
        .with_controlled(Controlled::Checked)
}

/// List of strings edited as a list (e.g. a multi-select).
pub fn string_array() -> Converter<Vec<String>, Vec<String>> {
    Converter::new(Vec::new(), |raw, _| Ok(raw), |value: &Vec<String>, _| value.clone())
        .with_empty_value(Vec::new())
}

/// List of strings edited as text, one entry per line.
pub fn text_string_array() -> Converter<String, Vec<String>> {
    Converter::new(
        String::new(),
        |raw: String, _: &ConverterOptions| {
            let lines: Vec<String> = raw.split('\n').map(|line| line.trim().to_owned()).collect();
            if lines.len() == 1 && lines[0].is_empty() {
                return Ok(Vec::new());
            }
            Ok(lines)
        },
        |value: &Vec<String>, _: &ConverterOptions| value.join("\n"),
    )
    .with_empty_value(Vec::new())
}

/// Opaque JSON value, passed through unchanged.
///
/// `null` is the empty raw; an empty value removes the key.
pub fn object() -> Converter<Value, Value> {
    Converter::new(Value::Null, |raw, _| Ok(raw), |value: &Value, _| value.clone())
        .with_empty_value(Value::Null)
        .with_empty_encoding(EmptyEncoding::Omit)
}

/// Nested model selected as a whole. A raw of `None` fails to convert.
pub fn model<M>() -> Converter<Option<M>, M>
where
    M: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    Converter::new(
        None,
        |raw: Option<M>, _: &ConverterOptions| raw.ok_or(ConversionError),
        |value: &M, _: &ConverterOptions| Some(value.clone()),
    )
    .empty_impossible()
    .with_controlled(Controlled::Object)
}

/// Make a converter optional, removing the key when the input is empty.
///
/// # Panics
///
/// Panics if the converter's raw is a flag or a list: those have no empty
/// input distinct from a valid value.
pub fn maybe<R, V>(inner: Converter<R, V>) -> Converter<R, Option<V>>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    optional(inner, EmptyEncoding::Omit)
}

/// Make a converter optional, writing `null` when the input is empty.
///
/// # Panics
///
/// Panics under the same conditions as [`maybe`].
pub fn maybe_null<R, V>(inner: Converter<R, V>) -> Converter<R, Option<V>>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    optional(inner, EmptyEncoding::Null)
}

fn optional<R, V>(inner: Converter<R, V>, encoding: EmptyEncoding) -> Converter<R, Option<V>>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    let controlled = inner.controlled();
    let wrapped = match inner.kind() {
        ConverterKind::Text => optional_text(inner),
        ConverterKind::Object => optional_object(inner),
        kind => panic!("cannot make a {kind:?} converter optional"),
    };
    wrapped
        .with_empty_value(None)
        .with_empty_encoding(encoding)
        .with_controlled(controlled)
}

fn optional_text<R, V>(inner: Converter<R, V>) -> Converter<R, Option<V>>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    assert!(
        inner.empty_raw().is_blank(),
        "text converter with a non-blank empty raw cannot be made optional"
    );
    let empty_raw = inner.empty_raw().clone();
    let render_empty = empty_raw.clone();
    let preprocess = inner.clone();
    let render = inner.clone();
    Converter::from_fn(
        empty_raw,
        move |raw: R, options: &ConverterOptions| {
            if raw.is_blank() {
                Conversion::value(None)
            } else {
                inner.convert(raw, options).map(Some)
            }
        },
        move |value: &Option<V>, options: &ConverterOptions| match value {
            Some(v) => render.render(v, options),
            None => render_empty.clone(),
        },
    )
    .with_preprocess(move |raw, options| preprocess.preprocess(raw, options))
}

fn optional_object<R, V>(inner: Converter<R, V>) -> Converter<R, Option<V>>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    let empty_raw = inner.empty_raw().clone();
    let is_empty = empty_raw.clone();
    let render_empty = empty_raw.clone();
    let render = inner.clone();
    Converter::from_fn(
        empty_raw,
        move |raw: R, options: &ConverterOptions| {
            if raw == is_empty {
                Conversion::value(None)
            } else {
                inner.convert(raw, options).map(Some)
            }
        },
        move |value: &Option<V>, options: &ConverterOptions| match value {
            Some(v) => render.render(v, options),
            None => render_empty.clone(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ConversionResult;
    use futures::executor::block_on;
    use serde_json::json;

    fn convert<R: RawRepr, V: Clone + Send + Sync + 'static>(
        converter: &Converter<R, V>,
        raw: R,
    ) -> ConversionResult<V> {
        block_on(converter.convert(raw, &ConverterOptions::default()).resolve())
    }

    fn render<R: RawRepr, V: Clone + Send + Sync + 'static>(converter: &Converter<R, V>, value: &V) -> R {
        converter.render(value, &ConverterOptions::default())
    }

    #[test]
    fn test_string_trims() {
        let c = string();
        assert_eq!(convert(&c, "  hi ".into()), Ok("hi".to_string()));
        assert_eq!(c.empty_value(), Some(&String::new()));
    }

    #[test]
    fn test_number() {
        let c = number();
        assert_eq!(convert(&c, "3.5".into()), Ok(3.5));
        assert_eq!(convert(&c, "-12".into()), Ok(-12.0));
        assert_eq!(convert(&c, "abc".into()), Err(ConversionError));
        assert_eq!(convert(&c, "".into()), Err(ConversionError));
        assert_eq!(render(&c, &1234.5), "1234.5");
        assert!(c.is_empty_impossible());
    }

    #[test]
    fn test_number_uses_form_separators() {
        let options = ConverterOptions {
            decimal_separator: ',',
            thousand_separator: '.',
            ..Default::default()
        };
        let c = number();
        let value = block_on(c.convert("2,25".into(), &options).resolve());
        assert_eq!(value, Ok(2.25));
        assert_eq!(c.render(&2.25, &options), "2,25");
    }

    #[test]
    fn test_integer() {
        let c = integer();
        assert_eq!(convert(&c, "42".into()), Ok(42));
        assert_eq!(convert(&c, " -7 ".into()), Ok(-7));
        assert_eq!(convert(&c, "4.2".into()), Err(ConversionError));
        assert_eq!(convert(&c, "007".into()), Err(ConversionError));
        assert_eq!(convert(&c, "-0".into()), Ok(0));
        assert_eq!(convert(&c, "99999999999999999999".into()), Err(ConversionError));
        assert_eq!(render(&c, &-7), "-7");
    }

    #[test]
    fn test_decimal_pads_and_limits() {
        let c = decimal(DecimalLimits::new(4, 2));
        let value = convert(&c, "3.1".into()).unwrap();
        assert_eq!(render(&c, &value), "3.10");
        assert_eq!(convert(&c, "12345".into()), Err(ConversionError));
        assert_eq!(convert(&c, "1.234".into()), Err(ConversionError));

        let positive = decimal(DecimalLimits::new(4, 2).non_negative());
        assert_eq!(convert(&positive, "-1".into()), Err(ConversionError));
    }

    #[test]
    fn test_decimal_limits_from_context() {
        let c = decimal_with(|context| DecimalLimits::new(4, context["places"].as_u64().unwrap_or(2) as usize));
        let options = ConverterOptions {
            context: json!({"places": 3}),
            ..Default::default()
        };
        let value = block_on(c.convert("1.5".into(), &options).resolve()).unwrap();
        assert_eq!(c.render(&value, &options), "1.500");
    }

    #[test]
    fn test_boolean() {
        let c = boolean();
        assert_eq!(convert(&c, false), Ok(false));
        assert!(c.is_never_required());
        assert_eq!(c.controlled(), Controlled::Checked);
    }

    #[test]
    fn test_text_string_array() {
        let c = text_string_array();
        assert_eq!(
            convert(&c, "a\n b \nc".into()),
            Ok(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(convert(&c, "".into()), Ok(Vec::new()));
        assert_eq!(render(&c, &vec!["x".to_string(), "y".to_string()]), "x\ny");
    }

    #[test]
    fn test_object_identity() {
        let c = object();
        assert_eq!(convert(&c, json!({"id": 1})), Ok(json!({"id": 1})));
        assert_eq!(c.empty_encoding(), EmptyEncoding::Omit);
    }

    #[test]
    fn test_model() {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        struct Pet {
            name: String,
        }
        let c = model::<Pet>();
        let pet = Pet { name: "Rex".into() };
        assert_eq!(convert(&c, Some(pet.clone())), Ok(pet.clone()));
        assert_eq!(convert(&c, None), Err(ConversionError));
        assert_eq!(render(&c, &pet), Some(pet));
        assert_eq!(c.controlled(), Controlled::Object);
    }

    #[test]
    fn test_maybe_text() {
        let c = maybe(number());
        assert_eq!(convert(&c, "  ".into()), Ok(None));
        assert_eq!(convert(&c, "3".into()), Ok(Some(3.0)));
        assert_eq!(convert(&c, "x".into()), Err(ConversionError));
        assert_eq!(render(&c, &None), "");
        assert_eq!(render(&c, &Some(3.0)), "3");
        assert_eq!(c.empty_encoding(), EmptyEncoding::Omit);
        assert!(!c.is_empty_impossible());
        assert_eq!(maybe_null(number()).empty_encoding(), EmptyEncoding::Null);
    }

    #[test]
    fn test_maybe_model() {
        let c = maybe(model::<u32>());
        assert_eq!(convert(&c, None), Ok(None));
        assert_eq!(convert(&c, Some(4)), Ok(Some(4)));
        assert_eq!(render(&c, &None), None);
        assert_eq!(c.controlled(), Controlled::Object);
    }

    #[test]
    #[should_panic(expected = "cannot make a Flag converter optional")]
    fn test_maybe_boolean_panics() {
        let _ = maybe(boolean());
    }

    #[test]
    #[should_panic(expected = "cannot make a List converter optional")]
    fn test_maybe_string_array_panics() {
        let _ = maybe(string_array());
    }
}
