//! The `Converter` abstraction.
//!
//! A converter turns the raw editable representation of a leaf (typically
//! text) into its domain value and back. Conversion may fail and may be
//! asynchronous; rendering is total and synchronous.

use crate::decimal::DecimalError;
use crate::options::ConverterOptions;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Raw input could not be converted.
///
/// Structural failures and transform failures look the same; both surface
/// as the field's conversion error message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("could not convert")]
pub struct ConversionError;

impl From<DecimalError> for ConversionError {
    fn from(_: DecimalError) -> Self {
        ConversionError
    }
}

impl From<std::num::ParseIntError> for ConversionError {
    fn from(_: std::num::ParseIntError) -> Self {
        ConversionError
    }
}

impl From<std::num::ParseFloatError> for ConversionError {
    fn from(_: std::num::ParseFloatError) -> Self {
        ConversionError
    }
}

/// Result of converting a raw value.
pub type ConversionResult<V> = Result<V, ConversionError>;

/// A conversion that is either already complete or still pending.
pub enum Conversion<V> {
    /// The result is available immediately.
    Ready(ConversionResult<V>),
    /// The result arrives when the future resolves.
    Pending(BoxFuture<'static, ConversionResult<V>>),
}

impl<V: Send + 'static> Conversion<V> {
    /// A successful conversion.
    #[inline]
    pub fn value(value: V) -> Self {
        Conversion::Ready(Ok(value))
    }

    /// A failed conversion.
    #[inline]
    pub fn failed() -> Self {
        Conversion::Ready(Err(ConversionError))
    }

    /// A conversion completed by a future.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = ConversionResult<V>> + Send + 'static,
    {
        Conversion::Pending(Box::pin(future))
    }

    /// Whether the result is available without awaiting.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, Conversion::Ready(_))
    }

    /// Wait for the result.
    pub async fn resolve(self) -> ConversionResult<V> {
        match self {
            Conversion::Ready(result) => result,
            Conversion::Pending(future) => future.await,
        }
    }

    /// Transform a successful value, preserving readiness.
    pub fn map<U, F>(self, f: F) -> Conversion<U>
    where
        U: Send + 'static,
        F: FnOnce(V) -> U + Send + 'static,
    {
        match self {
            Conversion::Ready(result) => Conversion::Ready(result.map(f)),
            Conversion::Pending(future) => {
                Conversion::Pending(future.map(move |result| result.map(f)).boxed())
            }
        }
    }
}

impl<V> From<ConversionResult<V>> for Conversion<V> {
    fn from(result: ConversionResult<V>) -> Self {
        Conversion::Ready(result)
    }
}

impl<V> fmt::Debug for Conversion<V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Conversion::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Which event property a bound control should use by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controlled {
    /// The control's text value.
    Value,
    /// The control's checked state.
    Checked,
    /// An object reference selected by the control.
    Object,
}

/// The shape of a converter's raw representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterKind {
    /// Raw is text.
    Text,
    /// Raw is a boolean flag.
    Flag,
    /// Raw is a list of strings.
    List,
    /// Raw is an opaque object reference.
    Object,
}

/// A type usable as the raw side of a converter.
///
/// Raw values cross the UI boundary as JSON; `from_json` returning `None`
/// means the raw has the wrong shape for the field.
pub trait RawRepr: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Kind tag used when wrapping the converter in `maybe`.
    const KIND: ConverterKind;

    /// Read the raw from its JSON form.
    fn from_json(raw: &Value) -> Option<Self>;

    /// Write the raw to its JSON form.
    fn to_json(&self) -> Value;

    /// Whether this raw is a blank text entry.
    fn is_blank(&self) -> bool {
        false
    }
}

impl RawRepr for String {
    const KIND: ConverterKind = ConverterKind::Text;

    fn from_json(raw: &Value) -> Option<Self> {
        raw.as_str().map(str::to_owned)
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }

    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl RawRepr for bool {
    const KIND: ConverterKind = ConverterKind::Flag;

    fn from_json(raw: &Value) -> Option<Self> {
        raw.as_bool()
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl RawRepr for Vec<String> {
    const KIND: ConverterKind = ConverterKind::List;

    fn from_json(raw: &Value) -> Option<Self> {
        raw.as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect()
    }

    fn to_json(&self) -> Value {
        Value::Array(self.iter().cloned().map(Value::String).collect())
    }
}

impl RawRepr for Value {
    const KIND: ConverterKind = ConverterKind::Object;

    fn from_json(raw: &Value) -> Option<Self> {
        Some(raw.clone())
    }

    fn to_json(&self) -> Value {
        self.clone()
    }
}

impl<M> RawRepr for Option<M>
where
    M: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    const KIND: ConverterKind = ConverterKind::Object;

    fn from_json(raw: &Value) -> Option<Self> {
        if raw.is_null() {
            return Some(None);
        }
        serde_json::from_value(raw.clone()).ok().map(Some)
    }

    fn to_json(&self) -> Value {
        match self {
            Some(m) => serde_json::to_value(m).unwrap_or(Value::Null),
            None => Value::Null,
        }
    }
}

/// How an empty value is written to the backing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyEncoding {
    /// Write the serialized empty value (`null` for optional values).
    #[default]
    Null,
    /// Remove the key instead of writing a value.
    Omit,
}

type PreprocessFn<R> = Arc<dyn Fn(R, &ConverterOptions) -> R + Send + Sync>;
type RawValidateFn<R> = Arc<dyn Fn(&R, &ConverterOptions) -> bool + Send + Sync>;
type ConvertFn<R, V> = Arc<dyn Fn(R, &ConverterOptions) -> Conversion<V> + Send + Sync>;
type RenderFn<R, V> = Arc<dyn Fn(&V, &ConverterOptions) -> R + Send + Sync>;

/// Bidirectional transform between a raw representation `R` and a domain
/// value `V`.
///
/// Converters are immutable and cheap to clone.
///
/// # Examples
///
/// ```
/// use formstate::{Converter, ConverterOptions, ConversionError};
///
/// let percent = Converter::<String, u8>::new(
///     String::new(),
///     |raw, _| raw.trim_end_matches('%').parse().map_err(|_| ConversionError),
///     |value, _| format!("{value}%"),
/// )
/// .empty_impossible();
///
/// let options = ConverterOptions::default();
/// assert_eq!(percent.render(&5, &options), "5%");
/// ```
pub struct Converter<R, V> {
    empty_raw: R,
    empty_value: Option<V>,
    empty_impossible: bool,
    never_required: bool,
    empty_encoding: EmptyEncoding,
    controlled: Controlled,
    preprocess: Option<PreprocessFn<R>>,
    raw_validate: Option<RawValidateFn<R>>,
    convert: ConvertFn<R, V>,
    render: RenderFn<R, V>,
}

impl<R: Clone, V: Clone> Clone for Converter<R, V> {
    fn clone(&self) -> Self {
        Self {
            empty_raw: self.empty_raw.clone(),
            empty_value: self.empty_value.clone(),
            empty_impossible: self.empty_impossible,
            never_required: self.never_required,
            empty_encoding: self.empty_encoding,
            controlled: self.controlled,
            preprocess: self.preprocess.clone(),
            raw_validate: self.raw_validate.clone(),
            convert: Arc::clone(&self.convert),
            render: Arc::clone(&self.render),
        }
    }
}

impl<R: fmt::Debug, V> fmt::Debug for Converter<R, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("empty_raw", &self.empty_raw)
            .field("empty_impossible", &self.empty_impossible)
            .field("never_required", &self.never_required)
            .field("controlled", &self.controlled)
            .finish_non_exhaustive()
    }
}

impl<R, V> Converter<R, V>
where
    R: RawRepr,
    V: Clone + Send + Sync + 'static,
{
    /// Create a converter with a synchronous transform.
    pub fn new<C, Rn>(empty_raw: R, convert: C, render: Rn) -> Self
    where
        C: Fn(R, &ConverterOptions) -> ConversionResult<V> + Send + Sync + 'static,
        Rn: Fn(&V, &ConverterOptions) -> R + Send + Sync + 'static,
    {
        Self::from_parts(
            empty_raw,
            Arc::new(move |raw: R, options: &ConverterOptions| {
                Conversion::Ready(convert(raw, options))
            }),
            Arc::new(render),
        )
    }

    /// Create a converter whose transform completes asynchronously.
    ///
    /// The transform receives the options by reference and must copy what
    /// the returned future needs.
    pub fn new_async<C, Fut, Rn>(empty_raw: R, convert: C, render: Rn) -> Self
    where
        C: Fn(R, &ConverterOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConversionResult<V>> + Send + 'static,
        Rn: Fn(&V, &ConverterOptions) -> R + Send + Sync + 'static,
    {
        Self::from_parts(
            empty_raw,
            Arc::new(move |raw: R, options: &ConverterOptions| {
                Conversion::pending(convert(raw, options))
            }),
            Arc::new(render),
        )
    }

    /// Create a converter from a transform that decides per call whether it
    /// completes immediately or later.
    pub fn from_fn<C, Rn>(empty_raw: R, convert: C, render: Rn) -> Self
    where
        C: Fn(R, &ConverterOptions) -> Conversion<V> + Send + Sync + 'static,
        Rn: Fn(&V, &ConverterOptions) -> R + Send + Sync + 'static,
    {
        Self::from_parts(empty_raw, Arc::new(convert), Arc::new(render))
    }

    fn from_parts(empty_raw: R, convert: ConvertFn<R, V>, render: RenderFn<R, V>) -> Self {
        Self {
            empty_raw,
            empty_value: None,
            empty_impossible: false,
            never_required: false,
            empty_encoding: EmptyEncoding::Null,
            controlled: Controlled::Value,
            preprocess: None,
            raw_validate: None,
            convert,
            render,
        }
    }

    /// Set the value an empty raw converts to.
    pub fn with_empty_value(mut self, value: V) -> Self {
        self.empty_value = Some(value);
        self
    }

    /// Treat an empty raw as a failure instead of a valid empty value.
    pub fn empty_impossible(mut self) -> Self {
        self.empty_impossible = true;
        self
    }

    /// Exempt this converter's fields from required checks.
    pub fn never_required(mut self) -> Self {
        self.never_required = true;
        self
    }

    /// Set how the empty value is written.
    pub fn with_empty_encoding(mut self, encoding: EmptyEncoding) -> Self {
        self.empty_encoding = encoding;
        self
    }

    /// Set the default control binding.
    pub fn with_controlled(mut self, controlled: Controlled) -> Self {
        self.controlled = controlled;
        self
    }

    /// Normalize raw input before anything else looks at it.
    pub fn with_preprocess<F>(mut self, f: F) -> Self
    where
        F: Fn(R, &ConverterOptions) -> R + Send + Sync + 'static,
    {
        self.preprocess = Some(Arc::new(f));
        self
    }

    /// Structural pre-check; a raw failing it is never passed to the transform.
    pub fn with_raw_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, &ConverterOptions) -> bool + Send + Sync + 'static,
    {
        self.raw_validate = Some(Arc::new(f));
        self
    }

    /// The raw meaning "nothing entered".
    #[inline]
    pub fn empty_raw(&self) -> &R {
        &self.empty_raw
    }

    /// The value an empty raw converts to, if emptiness is representable.
    #[inline]
    pub fn empty_value(&self) -> Option<&V> {
        self.empty_value.as_ref()
    }

    /// Whether an empty raw is a failure.
    #[inline]
    pub fn is_empty_impossible(&self) -> bool {
        self.empty_impossible
    }

    /// Whether fields using this converter are exempt from required checks.
    #[inline]
    pub fn is_never_required(&self) -> bool {
        self.never_required
    }

    /// How the empty value is written.
    #[inline]
    pub fn empty_encoding(&self) -> EmptyEncoding {
        self.empty_encoding
    }

    /// The default control binding.
    #[inline]
    pub fn controlled(&self) -> Controlled {
        self.controlled
    }

    /// Kind tag derived from the raw type.
    #[inline]
    pub fn kind(&self) -> ConverterKind {
        R::KIND
    }

    /// Apply the preprocessing step.
    pub fn preprocess(&self, raw: R, options: &ConverterOptions) -> R {
        match &self.preprocess {
            Some(f) => f(raw, options),
            None => raw,
        }
    }

    /// Convert a raw value: preprocess, structural check, transform.
    pub fn convert(&self, raw: R, options: &ConverterOptions) -> Conversion<V> {
        let raw = self.preprocess(raw, options);
        if let Some(check) = &self.raw_validate {
            if !check(&raw, options) {
                return Conversion::failed();
            }
        }
        (self.convert)(raw, options)
    }

    /// Render a value back to its raw representation.
    pub fn render(&self, value: &V, options: &ConverterOptions) -> R {
        (self.render)(value, options)
    }
}
