//! Value conversion - turns stored text plus a declared type tag into a typed value.
//!
//! Conversion happens in two steps. The tag selects one parser from a closed set
//! ([`ValueType`]), which turns the text into a JSON value of the tag's natural type. That value
//! is then deserialized into whatever `T` the caller asked for, so widening (`int` read as
//! `i64`) works while narrowing, truncation and cross-kind reads (`string` read as `i32`) fail
//! with [`Error::Conversion`]. Unknown tags fall back to parsing the text as JSON directly into
//! `T`.

use crate::errors::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use std::fmt;
use std::str::FromStr;

/// The closed vocabulary of type tags a record can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    /// `int` or `integer`, a 32-bit signed integer
    Integer,
    /// `bool` or `boolean`
    Boolean,
    Double,
    Decimal,
    Long,
    Float,
    /// Any unrecognized tag; the value is parsed as JSON
    Structured,
}

impl ValueType {
    /// Classifies a tag. Matching ignores case and surrounding whitespace.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "int" | "integer" => Self::Integer,
            "bool" | "boolean" => Self::Boolean,
            "double" => Self::Double,
            "decimal" => Self::Decimal,
            "long" => Self::Long,
            "float" => Self::Float,
            _ => Self::Structured,
        }
    }

    /// Canonical tag written for this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "int",
            Self::Boolean => "bool",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Long => "long",
            Self::Float => "float",
            Self::Structured => "json",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_trimmed<T: FromStr>(text: &str) -> Option<T> {
    text.trim().parse().ok()
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_finite_f64(text: &str) -> Option<f64> {
    parse_trimmed::<f64>(text).filter(|v| v.is_finite())
}

/// `[+-]digits[.digits]`, at least one digit, no exponent.
fn is_decimal_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    !(int_part.is_empty() && frac_part.is_empty())
        && all_digits(int_part)
        && all_digits(frac_part)
}

/// Canonical spelling of a decimal literal: no sign on zero, no leading integer zeros, no
/// trailing fraction zeros.
fn canonical_decimal(text: &str) -> String {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let int_part = int_part.trim_start_matches('0');
    let frac_part = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if negative && !(int_part.is_empty() && frac_part.is_empty()) {
        out.push('-');
    }
    out.push_str(if int_part.is_empty() { "0" } else { int_part });
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Parses a decimal into a JSON number only when no digit is lost.
///
/// Integers become `i64`/`u64`. Fractions become `f64` if the float prints back as the same
/// decimal. Anything else stays as its exact text, so it can still be read as a `String` but
/// never as a rounded number.
fn parse_decimal(text: &str) -> Option<Value> {
    let text = text.trim();
    if !is_decimal_literal(text) {
        return None;
    }
    if !text.contains('.') {
        if let Ok(integral) = text.parse::<i64>() {
            return Some(Value::from(integral));
        }
        if let Ok(integral) = text.parse::<u64>() {
            return Some(Value::from(integral));
        }
    }
    let exact = text
        .parse::<f64>()
        .ok()
        .filter(|f| canonical_decimal(&f.to_string()) == canonical_decimal(text))
        .and_then(Number::from_f64)
        .map(Value::Number);
    Some(exact.unwrap_or_else(|| Value::String(text.to_string())))
}

/// Parses `value` according to its tag into the JSON value of the tag's natural type.
///
/// Returns `None` for [`ValueType::Structured`], whose text is decoded by the caller.
fn parse_tagged(value: &str, value_type: ValueType) -> Option<Option<Value>> {
    let parsed = match value_type {
        ValueType::String => Some(Value::String(value.to_string())),
        ValueType::Integer => parse_trimmed::<i32>(value).map(Value::from),
        ValueType::Long => parse_trimmed::<i64>(value).map(Value::from),
        ValueType::Boolean => parse_bool(value).map(Value::Bool),
        ValueType::Double => parse_finite_f64(value)
            .and_then(Number::from_f64)
            .map(Value::Number),
        ValueType::Float => parse_trimmed::<f32>(value)
            .filter(|v| v.is_finite())
            .and_then(|v| Number::from_f64(f64::from(v)))
            .map(Value::Number),
        ValueType::Decimal => parse_decimal(value),
        ValueType::Structured => return None,
    };
    Some(parsed)
}

/// Converts a stored `value` declared as `value_type` into `T`.
///
/// # Errors
/// Returns [`Error::Conversion`] carrying the raw value, the declared tag and the requested
/// type when the text does not match the tag's grammar or the result does not fit `T`.
pub fn convert<T: DeserializeOwned>(value: &str, value_type: &str) -> Result<T> {
    let fail = || Error::conversion(value, value_type, std::any::type_name::<T>());
    let kind = ValueType::from_tag(value_type);

    match parse_tagged(value, kind) {
        // A decimal can always be read back as its exact text
        Some(Some(typed)) if kind == ValueType::Decimal => serde_json::from_value(typed)
            .or_else(|_| serde_json::from_value(Value::String(value.trim().to_string())))
            .map_err(|_| fail()),
        Some(Some(typed)) => serde_json::from_value(typed).map_err(|_| fail()),
        Some(None) => Err(fail()),
        None => serde_json::from_str(value).map_err(|_| fail()),
    }
}

/// Guesses the tag for a bare settings value: boolean, then integer, then floating point,
/// otherwise string.
#[must_use]
pub fn infer_value_type(text: &str) -> ValueType {
    if parse_bool(text).is_some() {
        ValueType::Boolean
    } else if parse_trimmed::<i32>(text).is_some() {
        ValueType::Integer
    } else if parse_finite_f64(text).is_some() {
        ValueType::Double
    } else {
        ValueType::String
    }
}
