//! City lookup against the upstream geocoder.

use super::client::{RetrievalError, SynastryClient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const GEO_SEARCH_PATH: &str = "/api/v1/geo/search";
pub const GEO_RESULT_LIMIT: usize = 10;
/// Shorter queries are answered locally with no results.
pub const GEO_MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    name: String,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    lat: f64,
    lng: f64,
    #[serde(default)]
    timezone: Option<String>,
}

impl From<RawCity> for City {
    fn from(raw: RawCity) -> Self {
        let country = raw
            .country
            .filter(|value| !value.is_empty())
            .or(raw.country_code)
            .unwrap_or_default();
        Self {
            name: raw.name,
            country,
            lat: raw.lat,
            lng: raw.lng,
            timezone: raw.timezone.filter(|value| !value.is_empty()),
        }
    }
}

impl SynastryClient {
    pub async fn search_cities(&self, query: &str) -> Result<Vec<City>, RetrievalError> {
        if query.chars().count() < GEO_MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        let api_key = self.api_key()?;

        let params = [
            ("q", query.to_string()),
            ("limit", GEO_RESULT_LIMIT.to_string()),
        ];
        let response = self
            .transport()
            .get_json(GEO_SEARCH_PATH, api_key, &params)
            .await
            .map_err(|err| {
                warn!(error = %err, "geo search transport failed");
                RetrievalError::from(err)
            })?;

        if !response.is_success() {
            warn!(status = response.status, "geo search rejected");
            return Err(RetrievalError::UpstreamHttp {
                status: response.status,
                body: response.body,
            });
        }

        let body: Value = serde_json::from_str(&response.body)
            .map_err(|err| RetrievalError::Network(format!("undecodable geo body: {err}")))?;
        let cities = parse_cities(body);
        debug!(query, results = cities.len(), "geo search completed");
        Ok(cities)
    }
}

/// Accepts `{results: [...]}` or a bare array; unreadable entries are skipped.
fn parse_cities(body: Value) -> Vec<City> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawCity>(item).ok())
        .map(City::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn country_falls_back_to_code() {
        let cities = parse_cities(json!({
            "results": [
                { "name": "Paris", "country": "France", "lat": 48.85, "lng": 2.35, "timezone": "Europe/Paris" },
                { "name": "Lyon", "country_code": "FR", "lat": 45.76, "lng": 4.83 },
                { "name": "Nowhere", "lat": 0.0, "lng": 0.0 },
                { "name": "Broken" }
            ]
        }));
        assert_eq!(cities.len(), 3);
        assert_eq!(cities[0].timezone.as_deref(), Some("Europe/Paris"));
        assert_eq!(cities[1].country, "FR");
        assert_eq!(cities[2].country, "");
    }

    #[test]
    fn bare_arrays_are_accepted() {
        let cities = parse_cities(json!([{ "name": "Oslo", "country": "Norway", "lat": 59.9, "lng": 10.7 }]));
        assert_eq!(cities[0].name, "Oslo");
        assert!(parse_cities(json!("nope")).is_empty());
    }
}
