//! Birth-profile input carried to the upstream API and inside shared links.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Wire format the upstream API expects for local civil birth time.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Fallback timezone when the selected city carries none.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Aspect set every report is computed with.
pub const REPORT_ASPECT_SET: &str = "major";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub city: String,
}

/// One person's natal input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(with = "local_datetime")]
    pub datetime: NaiveDateTime,
    pub tz_str: String,
    pub location: Location,
}

impl BirthProfile {
    /// Builds a profile from form-style input. A missing birth time means noon,
    /// a missing timezone means [`DEFAULT_TIMEZONE`], and a blank name is dropped.
    pub fn new(
        name: Option<String>,
        date: NaiveDate,
        time: Option<NaiveTime>,
        tz_str: Option<String>,
        location: Location,
    ) -> Self {
        let time = time.unwrap_or_else(noon);
        let name = name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let tz_str = tz_str
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        Self {
            name,
            datetime: date.and_time(time),
            tz_str,
            location,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.location.city)
    }
}

fn noon() -> NaiveTime {
    NaiveTime::MIN + chrono::Duration::hours(12)
}

/// Which parts of the computation the upstream API should return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeFlags {
    #[serde(default)]
    pub scores: bool,
    #[serde(default)]
    pub archetype: bool,
    #[serde(default)]
    pub text: bool,
    #[serde(default)]
    pub aspects: bool,
    #[serde(default)]
    pub synastry_bands: bool,
    #[serde(default)]
    pub house_overlays: bool,
}

impl IncludeFlags {
    pub fn report() -> Self {
        Self {
            scores: true,
            archetype: true,
            text: true,
            aspects: true,
            synastry_bands: true,
            house_overlays: false,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "scores": self.scores,
            "archetype": self.archetype,
            "text": self.text,
            "aspects": self.aspects,
            "synastry_bands": self.synastry_bands,
            "house_overlays": self.house_overlays,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<IncludeFlags>,
    /// Caller settings the service does not interpret, forwarded untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The unit of idempotent computation: equal requests yield equivalent reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub person_a: BirthProfile,
    pub person_b: BirthProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<CalculationSettings>,
    /// Top-level caller fields the service does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportRequest {
    pub fn new(person_a: BirthProfile, person_b: BirthProfile) -> Self {
        Self {
            person_a,
            person_b,
            settings: None,
            extra: Map::new(),
        }
    }

    /// Forces the major aspect set and the full set of report sections while
    /// keeping any other caller settings.
    pub fn with_report_inclusions(mut self) -> Self {
        let mut settings = self.settings.take().unwrap_or_default();
        settings.aspect_set = Some(REPORT_ASPECT_SET.to_string());
        settings.include = Some(IncludeFlags::report());
        self.settings = Some(settings);
        self
    }
}

/// [`ReportRequest::with_report_inclusions`] for a body that was never typed.
///
/// Every caller field is kept apart from `settings.aspect_set` and
/// `settings.include`. A body or `settings` value that is not an object
/// contributes nothing.
pub fn merge_report_inclusions(body: Value) -> Value {
    let mut root = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let mut settings = match root.remove("settings") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    settings.insert(
        "aspect_set".to_string(),
        Value::String(REPORT_ASPECT_SET.to_string()),
    );
    settings.insert("include".to_string(), IncludeFlags::report().to_json());
    root.insert("settings".to_string(), Value::Object(settings));
    Value::Object(root)
}

mod local_datetime {
    use super::DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(DATETIME_FORMAT))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub(super) fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        let trimmed = raw.trim();
        NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
            .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DDTHH:MM[:SS] ({err})"))
    }
}
