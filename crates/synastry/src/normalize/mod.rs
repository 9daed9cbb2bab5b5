//! Converts the two upstream payload shapes into one [`Report`].
//!
//! The caller tags the payload with the endpoint it came from; nothing in
//! here sniffs the structure to guess the shape.

mod cards;
mod raw;

use crate::report::{Aspect, Calculation, Meta, Report, ScoreItem, ScoreKey};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

pub use cards::normalize_cards;
pub use raw::normalize_synastry;

/// Upstream response body, tagged by the endpoint that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamPayload {
    /// `/western/synastry`: `{meta?, synastry, text?}`.
    Synastry(Value),
    /// `/western/synastrycards`: `{meta?, summary, aspects}`.
    Cards(Value),
}

/// The upstream broke its contract: a mandatory container is absent or unusable.
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("{shape} payload is not a JSON object")]
    NotAnObject { shape: &'static str },
    #[error("{shape} payload is missing the `{field}` container")]
    MissingContainer {
        shape: &'static str,
        field: &'static str,
    },
    #[error("{shape} payload has a malformed `{field}` container: {source}")]
    Malformed {
        shape: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Normalizes a tagged payload. `now` is only consulted when upstream omits
/// `generated_at`.
pub fn normalize(payload: UpstreamPayload, now: DateTime<Utc>) -> Result<Report, ShapeError> {
    match payload {
        UpstreamPayload::Synastry(body) => normalize_synastry(body, now),
        UpstreamPayload::Cards(body) => normalize_cards(body, now),
    }
}

pub(crate) fn into_object(
    body: Value,
    shape: &'static str,
) -> Result<Map<String, Value>, ShapeError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ShapeError::NotAnObject { shape }),
    }
}

/// Removes a mandatory container; `null` counts as absent.
pub(crate) fn take_container(
    map: &mut Map<String, Value>,
    shape: &'static str,
    field: &'static str,
) -> Result<Value, ShapeError> {
    match map.remove(field) {
        None | Some(Value::Null) => Err(ShapeError::MissingContainer { shape, field }),
        Some(value) => Ok(value),
    }
}

pub(crate) fn parse_container<T>(
    value: Value,
    shape: &'static str,
    field: &'static str,
) -> Result<T, ShapeError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|source| ShapeError::Malformed {
        shape,
        field,
        source,
    })
}

/// Optional sub-value parsed leniently: anything that does not fit is dropped.
pub(crate) fn lenient<T>(value: Option<Value>) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    value
        .filter(|value| !value.is_null())
        .and_then(|value| serde_json::from_value(value).ok())
}

/// `deserialize_with` helpers for optional record fields. A value of the
/// wrong JSON type reads as absent so the rest of the record survives.
pub(crate) mod field {
    use super::*;

    pub(crate) fn tolerant<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(lenient(Some(Value::deserialize(deserializer)?)))
    }

    /// Strings; numbers are accepted in their decimal form.
    pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }

    /// The string items of a list. Anything else is skipped.
    pub(crate) fn strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// Scores as either `{key: number}` or `[{key, value}]`. Unknown keys and
/// non-numeric values are skipped; the first entry for a key wins.
pub(crate) fn extract_scores(raw: Option<&Value>) -> Vec<ScoreItem> {
    let mut found: Vec<ScoreItem> = Vec::new();

    match raw {
        Some(Value::Object(map)) => {
            for key in ScoreKey::ORDERED {
                if let Some(value) = map.get(key.as_str()).and_then(Value::as_f64) {
                    found.push(ScoreItem {
                        key,
                        value,
                        direction: None,
                    });
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let key = item
                    .get("key")
                    .and_then(Value::as_str)
                    .and_then(ScoreKey::parse);
                let value = item.get("value").and_then(Value::as_f64);
                if let (Some(key), Some(value)) = (key, value) {
                    if found.iter().any(|existing| existing.key == key) {
                        continue;
                    }
                    found.push(ScoreItem {
                        key,
                        value,
                        direction: item
                            .get("direction")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    });
                }
            }
            found.sort_by_key(|item| {
                ScoreKey::ORDERED
                    .iter()
                    .position(|key| *key == item.key)
                    .unwrap_or(usize::MAX)
            });
        }
        _ => {}
    }

    found
}

/// Keeps the first aspect for each key, along with its parallel tag.
pub(crate) fn dedupe_by_key<T>(
    entries: Vec<(Aspect, T)>,
    shape: &'static str,
) -> Vec<(Aspect, T)> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|(aspect, _)| {
            let fresh = seen.insert(aspect.key.clone());
            if !fresh {
                warn!(shape, key = %aspect.key, "dropping duplicate aspect key");
            }
            fresh
        })
        .collect()
}

pub(crate) fn unit_interval(value: Option<f64>) -> f64 {
    match value {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

pub(crate) fn percent(value: f64) -> u8 {
    (value * 100.0).round().clamp(0.0, 100.0) as u8
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Builds `meta`, filling `generated_at` from `now` and `report_id` from the
/// generation time when upstream omits them.
pub(crate) fn build_meta(
    calculation: Calculation,
    generated_at: Option<String>,
    report_id: Option<String>,
    now: DateTime<Utc>,
) -> Meta {
    let generated_at = non_empty(generated_at)
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));
    let report_id = non_empty(report_id).unwrap_or_else(|| {
        let millis = DateTime::parse_from_rfc3339(&generated_at)
            .map(|parsed| parsed.timestamp_millis())
            .unwrap_or_else(|_| now.timestamp_millis());
        format!("rep_{millis}")
    });

    Meta {
        calculation,
        generated_at,
        report_id,
    }
}
