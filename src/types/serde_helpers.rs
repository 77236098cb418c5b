//! Custom serde deserializers for flexible type handling
//!
//! The upstream feed is loosely typed: URLs arrive as empty strings before
//! an artifact is rendered, counters are sometimes null, and timestamps are
//! not always RFC 3339. These helpers normalize all of that at the edge.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Deserialize an optional string, mapping `null`, missing and blank values
/// to `None`.
pub fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Deserialize a string that may be `null`, defaulting to empty.
pub fn null_as_empty_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Deserialize a counter that may be `null`, a float or a numeric string.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleCount {
        Int(u64),
        Signed(i64),
        Float(f64),
        String(String),
    }

    let value: Option<FlexibleCount> = Option::deserialize(deserializer)?;

    Ok(match value {
        None => 0,
        Some(FlexibleCount::Int(n)) => n,
        Some(FlexibleCount::Signed(n)) => n.max(0) as u64,
        Some(FlexibleCount::Float(f)) if f.is_finite() && f > 0.0 => f as u64,
        Some(FlexibleCount::Float(_)) => 0,
        Some(FlexibleCount::String(s)) => s.trim().parse().unwrap_or(0),
    })
}

/// Deserialize a boolean that may be `null`.
pub fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<bool> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or(false))
}

/// Deserialize a timestamp, accepting RFC 3339 and naive ISO 8601 values.
/// Anything unparsable becomes `None` rather than failing the whole record.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
