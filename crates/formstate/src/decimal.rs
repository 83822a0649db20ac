//! Locale-aware decimal parsing and rendering.
//!
//! Raw input is checked structurally before any numeric interpretation:
//! thousand separators are layout only and stripped, digit limits are
//! enforced (never truncated), and the decimal separator is configurable.
//! Parsing produces a canonical string (`-1234.50`) which the converters
//! turn into `rust_decimal::Decimal` or `f64`.

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-)?([0-9]+)(?:\.([0-9]*))?$").expect("canonical decimal pattern is valid")
});

/// Structural failures while parsing a decimal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecimalError {
    /// Nothing but whitespace, a sign or separators was entered.
    #[error("no digits entered")]
    Empty,
    /// The input does not have the shape of a decimal number.
    #[error("malformed decimal")]
    Malformed,
    /// A thousand separator was entered while they are not rendered.
    #[error("thousand separators are not allowed")]
    ThousandsNotAllowed,
    /// A minus sign was entered while negatives are not allowed.
    #[error("negative numbers are not allowed")]
    NegativeNotAllowed,
    /// The whole part has more digits than allowed.
    #[error("more than {max} whole digits")]
    TooManyWholeDigits {
        /// Maximum number of whole digits.
        max: usize,
    },
    /// The fractional part has more digits than allowed.
    #[error("more than {max} decimal places")]
    TooManyDecimalPlaces {
        /// Maximum number of decimal places.
        max: usize,
    },
    /// The number does not fit the numeric domain type.
    #[error("decimal out of range")]
    OutOfRange,
    /// The options themselves are inconsistent.
    #[error("invalid decimal options: {0}")]
    InvalidOptions(String),
}

/// Options controlling decimal parsing and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecimalOptions {
    /// Maximum number of digits before the decimal separator.
    pub max_whole_digits: usize,
    /// Maximum number of digits after the decimal separator.
    pub decimal_places: usize,
    /// Whether a leading minus is accepted.
    pub allow_negative: bool,
    /// Pad (and round) to exactly `decimal_places` digits.
    pub add_zeroes: bool,
    /// Character between whole and fractional digits.
    pub decimal_separator: char,
    /// Character grouping whole digits by three.
    pub thousand_separator: char,
    /// Whether thousand separators are rendered (and accepted on input).
    pub render_thousands: bool,
}

/// Largest scale `rust_decimal` stores without rounding.
const MAX_DECIMAL_PLACES: usize = 28;

impl Default for DecimalOptions {
    fn default() -> Self {
        Self {
            max_whole_digits: 10,
            decimal_places: 2,
            allow_negative: true,
            add_zeroes: true,
            decimal_separator: '.',
            thousand_separator: ',',
            render_thousands: false,
        }
    }
}

impl DecimalOptions {
    /// Check the separator invariants.
    pub fn check(&self) -> Result<(), DecimalError> {
        if self.decimal_separator == self.thousand_separator {
            return Err(DecimalError::InvalidOptions(
                "decimal and thousand separator must differ".into(),
            ));
        }
        for sep in [self.decimal_separator, self.thousand_separator] {
            if sep.is_ascii_digit() || sep == '-' {
                return Err(DecimalError::InvalidOptions(format!(
                    "`{sep}` cannot be used as a separator"
                )));
            }
        }
        Ok(())
    }

    /// Check that `decimal_places` fits a `Decimal`.
    ///
    /// Only [`parse`](Self::parse) needs this. Canonical text has no scale
    /// limit, so `check` leaves it out.
    pub fn check_scale(&self) -> Result<(), DecimalError> {
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(DecimalError::InvalidOptions(format!(
                "at most {MAX_DECIMAL_PLACES} decimal places fit a decimal, got {}",
                self.decimal_places
            )));
        }
        Ok(())
    }

    /// Parse raw text into the canonical form `-?digits(.digits)?`.
    ///
    /// With `add_zeroes` the fractional part is padded to exactly
    /// `decimal_places` digits.
    pub fn parse_canonical(&self, raw: &str) -> Result<String, DecimalError> {
        self.check()?;
        let raw = raw.trim();
        let (negative, body) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if !body.chars().any(|c| c.is_ascii_digit()) {
            return Err(DecimalError::Empty);
        }
        if negative && !self.allow_negative {
            return Err(DecimalError::NegativeNotAllowed);
        }

        let mut body = body.to_owned();
        if body.starts_with(self.decimal_separator) {
            body.insert(0, '0');
        }

        if body.contains(self.thousand_separator) {
            if !self.render_thousands {
                return Err(DecimalError::ThousandsNotAllowed);
            }
            let whole_end = body.find(self.decimal_separator).unwrap_or(body.len());
            if body[whole_end..].contains(self.thousand_separator) {
                return Err(DecimalError::Malformed);
            }
            body.retain(|c| c != self.thousand_separator);
        }

        if self.decimal_separator != '.' {
            if body.contains('.') {
                return Err(DecimalError::Malformed);
            }
            body = body.replace(self.decimal_separator, ".");
        }

        let caps = CANONICAL.captures(&body).ok_or(DecimalError::Malformed)?;
        if caps.get(1).is_some() {
            // a second minus sign
            return Err(DecimalError::Malformed);
        }
        let whole = caps.get(2).map_or("", |m| m.as_str());
        let fraction = caps.get(3).map_or("", |m| m.as_str());

        if whole.len() > 1 && whole.starts_with('0') {
            return Err(DecimalError::Malformed);
        }
        if whole.len() > self.max_whole_digits {
            return Err(DecimalError::TooManyWholeDigits {
                max: self.max_whole_digits,
            });
        }
        if fraction.len() > self.decimal_places {
            return Err(DecimalError::TooManyDecimalPlaces {
                max: self.decimal_places,
            });
        }

        let is_zero = whole.bytes().chain(fraction.bytes()).all(|b| b == b'0');
        let mut canonical = String::with_capacity(whole.len() + self.decimal_places + 2);
        if negative && !is_zero {
            canonical.push('-');
        }
        canonical.push_str(whole);
        if self.add_zeroes && self.decimal_places > 0 {
            canonical.push('.');
            canonical.push_str(fraction);
            canonical.extend(std::iter::repeat('0').take(self.decimal_places - fraction.len()));
        } else if !fraction.is_empty() {
            canonical.push('.');
            canonical.push_str(fraction);
        }
        Ok(canonical)
    }

    /// Parse raw text into a `Decimal`.
    ///
    /// # Examples
    ///
    /// ```
    /// use formstate::DecimalOptions;
    /// use rust_decimal::Decimal;
    ///
    /// let options = DecimalOptions {
    ///     decimal_separator: ',',
    ///     thousand_separator: '.',
    ///     render_thousands: true,
    ///     ..DecimalOptions::default()
    /// };
    /// let value = options.parse("1.234,5").unwrap();
    /// assert_eq!(value, Decimal::new(12345, 1));
    /// assert_eq!(options.render(&value), "1.234,50");
    /// ```
    pub fn parse(&self, raw: &str) -> Result<Decimal, DecimalError> {
        self.check_scale()?;
        let canonical = self.parse_canonical(raw)?;
        Decimal::from_str(&canonical).map_err(|_| DecimalError::OutOfRange)
    }

    /// Render a `Decimal`.
    ///
    /// With `add_zeroes` the value is rounded (midpoint away from zero) and
    /// padded to `decimal_places`; otherwise trailing zeros are trimmed.
    pub fn render(&self, value: &Decimal) -> String {
        let value = if self.add_zeroes {
            let places = u32::try_from(self.decimal_places).unwrap_or(u32::MAX);
            value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        } else {
            value.normalize()
        };
        self.render_canonical(&value.to_string())
    }

    /// Render a canonical decimal string with the configured separators.
    ///
    /// Input that is not in canonical form is returned unchanged.
    pub fn render_canonical(&self, canonical: &str) -> String {
        let Some(caps) = CANONICAL.captures(canonical) else {
            return canonical.to_owned();
        };
        let negative = caps.get(1).is_some();
        let whole = caps.get(2).map_or("0", |m| m.as_str());
        let mut fraction = caps.get(3).map_or("", |m| m.as_str()).to_owned();

        let whole = whole.trim_start_matches('0');
        let whole = if whole.is_empty() { "0" } else { whole };

        if self.add_zeroes {
            if fraction.len() < self.decimal_places {
                let missing = self.decimal_places - fraction.len();
                fraction.extend(std::iter::repeat('0').take(missing));
            }
        } else {
            fraction.truncate(fraction.trim_end_matches('0').len());
        }

        let is_zero = whole == "0" && fraction.bytes().all(|b| b == b'0');
        let mut out = String::new();
        if negative && !is_zero {
            out.push('-');
        }
        if self.render_thousands {
            out.push_str(&group_thousands(whole, self.thousand_separator));
        } else {
            out.push_str(whole);
        }
        if !fraction.is_empty() {
            out.push(self.decimal_separator);
            out.push_str(&fraction);
        }
        out
    }
}

fn group_thousands(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}
