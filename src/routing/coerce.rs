//! Typed coercion of path and query parameters.
//!
//! # Responsibilities
//! - Map a declared schema tag (`string`, `number`, `date`, `json`) to a parser
//! - Turn raw URL text into a typed [`ParamValue`]
//!
//! # Design Decisions
//! - Closed enum: every tag has exactly one coercion function
//! - Failures are reported, never replaced by sentinel values (NaN, invalid date)

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared type of a path or query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    /// Passed through unchanged.
    #[default]
    String,
    /// Parsed as a finite floating point number.
    Number,
    /// RFC 3339 timestamp, `YYYY-MM-DD` date (midnight UTC) or epoch milliseconds.
    Date,
    /// Parsed as a JSON document.
    Json,
}

/// Error produced when a raw value does not fit its declared coercion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot coerce {raw:?} to {kind}")]
pub struct CoercionError {
    pub kind: Coercion,
    pub raw: String,
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Number(f64),
    Date(DateTime<Utc>),
    Json(serde_json::Value),
}

impl ParamValue {
    /// The value as text, when it was kept as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a number, when coerced with `Coercion::Number`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The value as a UTC timestamp, when coerced with `Coercion::Date`.
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            ParamValue::Date(d) => Some(d),
            _ => None,
        }
    }

    /// The parsed value, when coerced with `Coercion::Json`.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParamValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl Coercion {
    /// Coerce a raw (already percent-decoded) value.
    pub fn apply(self, raw: &str) -> Result<ParamValue, CoercionError> {
        let fail = || CoercionError {
            kind: self,
            raw: raw.to_string(),
        };

        match self {
            Coercion::String => Ok(ParamValue::Str(raw.to_string())),
            Coercion::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(ParamValue::Number)
                .ok_or_else(fail),
            Coercion::Date => parse_date(raw).map(ParamValue::Date).ok_or_else(fail),
            Coercion::Json => serde_json::from_str(raw)
                .map(ParamValue::Json)
                .map_err(|_| fail()),
        }
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Coercion::String => "string",
            Coercion::Number => "number",
            Coercion::Date => "date",
            Coercion::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for Coercion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Coercion::String),
            "number" => Ok(Coercion::Number),
            "date" => Ok(Coercion::Date),
            "json" => Ok(Coercion::Json),
            other => Err(format!("unknown coercion '{}'", other)),
        }
    }
}
