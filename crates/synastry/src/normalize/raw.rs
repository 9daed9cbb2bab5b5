use super::{
    build_meta, dedupe_by_key, extract_scores, field, into_object, lenient, non_empty,
    parse_container, percent, take_container, unit_interval, ShapeError,
};
use crate::report::highlights::strongest_titles;
use crate::report::{
    Archetype, Aspect, AspectBlocks, Bands, Block, BlockSide, Calculation, DisplayPolicy, Domain,
    Polarity, Report, StrengthCategory, Summary,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const SHAPE: &str = "synastry";

pub(super) const NO_SUMMARY: &str = "No summary available.";
pub(super) const NO_INSIGHT: &str = "No detailed insight available.";
pub(super) const UNKNOWN_ASPECT: &str = "Unknown Aspect";
pub(super) const GROWTH_TITLE: &str = "Growth Opportunity";
pub(super) const FRICTION_TITLE: &str = "Potential Friction";

/// Polarity vocabulary of the raw endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawPolarity {
    Supportive,
    Easy,
    Challenging,
    Friction,
    Neutral,
    #[serde(other)]
    Other,
}

impl RawPolarity {
    fn canonical(self) -> Polarity {
        match self {
            Self::Supportive | Self::Easy => Polarity::Supportive,
            Self::Challenging | Self::Friction => Polarity::Challenging,
            Self::Neutral | Self::Other => Polarity::Neutral,
        }
    }

    fn is_challenging(self) -> bool {
        matches!(self, Self::Challenging | Self::Friction)
    }

    fn highlight_side(self) -> Option<BlockSide> {
        match self {
            Self::Supportive | Self::Easy => Some(BlockSide::Supportive),
            Self::Challenging | Self::Friction => Some(BlockSide::Challenging),
            Self::Neutral | Self::Other => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSynastry {
    #[serde(default)]
    scores: Option<Value>,
    #[serde(default)]
    aspects: Option<Vec<Value>>,
    #[serde(default)]
    archetype: Option<Value>,
    #[serde(default)]
    bands: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAspect {
    #[serde(default, deserialize_with = "field::text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    pair_key: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    label: Option<String>,
    #[serde(default, deserialize_with = "field::tolerant")]
    strength: Option<f64>,
    #[serde(default, deserialize_with = "field::text")]
    strength_label: Option<String>,
    #[serde(default, deserialize_with = "field::tolerant")]
    polarity: Option<RawPolarity>,
    #[serde(default, deserialize_with = "field::strings")]
    domains: Vec<String>,
    #[serde(default, deserialize_with = "field::text")]
    text_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawText {
    #[serde(default, deserialize_with = "field::text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    detail: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawArchetype {
    #[serde(default, deserialize_with = "field::text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    label: Option<String>,
    #[serde(default, deserialize_with = "field::tolerant")]
    confidence: Option<f64>,
    #[serde(default, deserialize_with = "field::text")]
    one_liner: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    zodiac: Option<String>,
    #[serde(default)]
    house_system: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMeta {
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    report_id: Option<String>,
    #[serde(default)]
    settings_resolved: Option<Value>,
}

/// Normalizes a `/western/synastry` response body.
///
/// Highlights are re-derived from the strongest aspects and stored as block
/// titles; upstream highlight refs are ignored.
pub fn normalize_synastry(body: Value, now: DateTime<Utc>) -> Result<Report, ShapeError> {
    let mut root = into_object(body, SHAPE)?;
    let synastry: RawSynastry =
        parse_container(take_container(&mut root, SHAPE, "synastry")?, SHAPE, "synastry")?;

    let texts = text_lookup(root.remove("text"));
    let meta: RawMeta = lenient(root.remove("meta")).unwrap_or_default();

    let scores = extract_scores(synastry.scores.as_ref());

    let entries: Vec<(Aspect, RawPolarity)> = synastry
        .aspects
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<RawAspect>(value) {
            Ok(raw) => Some(normalize_aspect(index, raw, &texts)),
            Err(err) => {
                warn!(shape = SHAPE, index, error = %err, "skipping unreadable aspect");
                None
            }
        })
        .collect();
    let (aspects, polarities): (Vec<Aspect>, Vec<RawPolarity>) =
        dedupe_by_key(entries, SHAPE).into_iter().unzip();

    let highlights = strongest_titles(&aspects, |index, _| polarities[index].highlight_side());

    let raw_archetype: RawArchetype = lenient(synastry.archetype).unwrap_or_default();
    let narrative = non_empty(raw_archetype.one_liner.clone()).unwrap_or_default();
    let archetype = build_archetype(raw_archetype);
    let bands: Option<Bands> = lenient(synastry.bands);

    let settings: RawSettings = lenient(meta.settings_resolved).unwrap_or_default();
    let defaults = Calculation::default();
    let calculation = Calculation {
        zodiac: non_empty(settings.zodiac).unwrap_or(defaults.zodiac),
        house_system: non_empty(settings.house_system).unwrap_or(defaults.house_system),
    };

    debug!(
        shape = SHAPE,
        aspects = aspects.len(),
        scores = scores.len(),
        "normalized synastry payload"
    );

    Ok(Report {
        meta: build_meta(calculation, meta.generated_at, meta.report_id, now),
        summary: Summary {
            archetype,
            scores,
            strengths: highlights.strengths,
            challenges: highlights.challenges,
            narrative,
            bands,
            drivers_by_domain: None,
        },
        aspects,
    })
}

fn text_lookup(text: Option<Value>) -> Map<String, Value> {
    match text {
        Some(Value::Object(mut map)) => match map.remove("by_key") {
            Some(Value::Object(by_key)) => by_key,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

fn normalize_aspect(
    index: usize,
    raw: RawAspect,
    texts: &Map<String, Value>,
) -> (Aspect, RawPolarity) {
    let text_key = non_empty(raw.text_key);
    let text: RawText = text_key
        .as_deref()
        .and_then(|key| texts.get(key))
        .cloned()
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default();

    let resolved_title = non_empty(text.title);
    let content = Block {
        title: resolved_title
            .clone()
            .or_else(|| text_key.clone())
            .unwrap_or_else(|| UNKNOWN_ASPECT.to_string()),
        one_liner: non_empty(text.summary).unwrap_or_else(|| NO_SUMMARY.to_string()),
        insight: non_empty(text.detail)
            .or_else(|| non_empty(text.description))
            .unwrap_or_else(|| NO_INSIGHT.to_string()),
    };

    let polarity = raw.polarity.unwrap_or(RawPolarity::Neutral);
    let challenging = polarity.is_challenging();
    let blocks = if challenging {
        AspectBlocks {
            supportive: Block {
                title: GROWTH_TITLE.to_string(),
                ..content.clone()
            },
            challenging: content,
        }
    } else {
        AspectBlocks {
            challenging: Block {
                title: FRICTION_TITLE.to_string(),
                ..content.clone()
            },
            supportive: content,
        }
    };

    let strength = unit_interval(raw.strength);
    // Upstream sends no signed score in this shape; the sign follows polarity.
    let polarity_score = if challenging { -strength } else { strength };

    let key = non_empty(raw.pair_key)
        .or_else(|| non_empty(raw.id.clone()))
        .unwrap_or_else(|| format!("aspect-{}", index + 1));

    let aspect = Aspect {
        key,
        aspect_id: non_empty(raw.id),
        label: non_empty(raw.label)
            .or(resolved_title)
            .unwrap_or_else(|| UNKNOWN_ASPECT.to_string()),
        rank: percent(strength),
        strength: raw
            .strength_label
            .as_deref()
            .and_then(StrengthCategory::parse)
            .unwrap_or(StrengthCategory::Moderate),
        strength_value: strength,
        polarity: polarity.canonical(),
        polarity_score,
        abs_polarity: strength,
        dominant: strength > 0.8,
        domains: parse_domains(raw.domains),
        display_policy: DisplayPolicy::Show,
        default_block: if challenging {
            BlockSide::Challenging
        } else {
            BlockSide::Supportive
        },
        blocks,
    };

    (aspect, polarity)
}

pub(super) fn parse_domains(raw: Vec<String>) -> Vec<Domain> {
    let mut domains = Vec::with_capacity(raw.len());
    for value in raw {
        match Domain::parse(&value) {
            Some(domain) if !domains.contains(&domain) => domains.push(domain),
            Some(_) => {}
            None => debug!(domain = %value, "ignoring unknown aspect domain"),
        }
    }
    domains
}

pub(super) fn build_archetype(raw: RawArchetype) -> Archetype {
    let defaults = Archetype::default();
    Archetype {
        id: non_empty(raw.id),
        label: non_empty(raw.label).unwrap_or(defaults.label),
        confidence: raw
            .confidence
            .filter(|value| value.is_finite())
            .unwrap_or(defaults.confidence),
        one_liner: non_empty(raw.one_liner).unwrap_or(defaults.one_liner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ScoreKey;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn sample() -> Value {
        json!({
            "meta": {
                "generated_at": "2026-02-28T09:30:00Z",
                "settings_resolved": { "zodiac": "sidereal" }
            },
            "synastry": {
                "scores": { "overall": 72, "romance": 80 },
                "archetype": { "label": "Slow Burn", "confidence": 0.7, "one_liner": "Patience pays." },
                "bands": { "theme": "Devotion", "core": "Trust", "shadow": "Control" },
                "aspects": [
                    {
                        "id": "a1", "pair_key": "moon_venus", "strength": 0.9,
                        "strength_label": "strong", "polarity": "supportive",
                        "domains": ["romance"], "text_key": "k1"
                    },
                    {
                        "id": "a2", "pair_key": "mars_saturn", "strength": 0.6,
                        "strength_label": "moderate", "polarity": "friction",
                        "domains": ["tension", "stability", "career"], "text_key": "k2"
                    },
                    {
                        "id": "a3", "pair_key": "sun_jupiter", "strength": 0.4,
                        "polarity": "easy", "text_key": "missing"
                    }
                ]
            },
            "text": {
                "by_key": {
                    "k1": { "title": "Warmth", "summary": "Kind.", "detail": "Deep detail." },
                    "k2": { "title": "Pressure", "description": "Old patterns." }
                }
            }
        })
    }

    #[test]
    fn supportive_aspect_keeps_text_and_synthesizes_friction_block() {
        let report = normalize_synastry(sample(), now()).expect("normalizes");
        let aspect = &report.aspects[0];
        assert_eq!(aspect.key, "moon_venus");
        assert_eq!(aspect.aspect_id.as_deref(), Some("a1"));
        assert_eq!(aspect.rank, 90);
        assert_eq!(aspect.polarity_score, 0.9);
        assert!(aspect.dominant);
        assert_eq!(aspect.default_block, BlockSide::Supportive);
        assert_eq!(aspect.blocks.supportive.title, "Warmth");
        assert_eq!(aspect.blocks.challenging.title, "Potential Friction");
        assert_eq!(aspect.blocks.challenging.insight, "Deep detail.");
        assert_eq!(aspect.label, "Warmth");
    }

    #[test]
    fn friction_maps_to_challenging_with_negative_score() {
        let report = normalize_synastry(sample(), now()).expect("normalizes");
        let aspect = &report.aspects[1];
        assert_eq!(aspect.polarity, Polarity::Challenging);
        assert_eq!(aspect.polarity_score, -0.6);
        assert_eq!(aspect.abs_polarity, 0.6);
        assert_eq!(aspect.default_block, BlockSide::Challenging);
        assert_eq!(aspect.blocks.supportive.title, "Growth Opportunity");
        assert_eq!(aspect.blocks.challenging.title, "Pressure");
        assert_eq!(aspect.blocks.challenging.one_liner, NO_SUMMARY);
        assert_eq!(aspect.blocks.challenging.insight, "Old patterns.");
        assert_eq!(aspect.domains, vec![Domain::Tension, Domain::Stability]);
    }

    #[test]
    fn unresolved_text_falls_back_to_text_key() {
        let report = normalize_synastry(sample(), now()).expect("normalizes");
        let aspect = &report.aspects[2];
        assert_eq!(aspect.polarity, Polarity::Supportive);
        assert_eq!(aspect.blocks.supportive.title, "missing");
        assert_eq!(aspect.blocks.supportive.one_liner, NO_SUMMARY);
        assert_eq!(aspect.blocks.supportive.insight, NO_INSIGHT);
        assert_eq!(aspect.label, UNKNOWN_ASPECT);
        assert_eq!(aspect.strength, StrengthCategory::Moderate);
    }

    #[test]
    fn highlights_are_block_titles_of_strongest_aspects() {
        let report = normalize_synastry(sample(), now()).expect("normalizes");
        assert_eq!(report.summary.strengths, vec!["Warmth", "missing"]);
        assert_eq!(report.summary.challenges, vec!["Pressure"]);
    }

    #[test]
    fn summary_and_meta_use_upstream_values() {
        let report = normalize_synastry(sample(), now()).expect("normalizes");
        assert_eq!(report.summary.archetype.label, "Slow Burn");
        assert_eq!(report.summary.narrative, "Patience pays.");
        assert_eq!(
            report.summary.scores.iter().map(|s| s.key).collect::<Vec<_>>(),
            vec![ScoreKey::Overall, ScoreKey::Domain(Domain::Romance)]
        );
        assert_eq!(report.summary.bands.as_ref().map(|b| b.core.as_str()), Some("Trust"));
        assert!(report.summary.drivers_by_domain.is_none());
        assert_eq!(report.meta.calculation.zodiac, "sidereal");
        assert_eq!(report.meta.calculation.house_system, "placidus");
        assert_eq!(report.meta.generated_at, "2026-02-28T09:30:00Z");
    }

    #[test]
    fn sparse_payload_gets_documented_defaults() {
        let report = normalize_synastry(json!({ "synastry": {} }), now()).expect("normalizes");
        assert!(report.aspects.is_empty());
        assert!(report.summary.scores.is_empty());
        assert_eq!(report.summary.archetype, Archetype::default());
        assert_eq!(report.summary.archetype.one_liner, "A unique connection.");
        assert_eq!(report.summary.narrative, "");
        assert_eq!(report.meta.generated_at, "2026-03-01T12:00:00.000Z");
        assert_eq!(report.meta.calculation, Calculation::default());
    }

    #[test]
    fn mistyped_fields_fall_back_and_duplicates_are_dropped() {
        let body = json!({
            "synastry": {
                "aspects": [
                    { "pair_key": "sun_moon", "strength": 0.5, "polarity": "supportive" },
                    { "pair_key": "sun_moon", "strength": 0.9, "polarity": "challenging" },
                    { "pair_key": "venus_mars", "strength": "very" },
                    { "id": "only-id", "strength": 0.3 }
                ]
            }
        });
        let report = normalize_synastry(body, now()).expect("normalizes");
        let keys: Vec<&str> = report.aspects.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["sun_moon", "venus_mars", "only-id"]);
        assert_eq!(report.aspects[0].polarity, Polarity::Supportive);
        assert_eq!(report.aspects[1].strength_value, 0.0);
        assert_eq!(report.aspects[1].polarity, Polarity::Neutral);
        assert_eq!(report.aspects[2].polarity, Polarity::Neutral);
        assert!(report.summary.challenges.is_empty());
    }

    #[test]
    fn numeric_ids_and_null_domains_keep_the_aspect() {
        let body = json!({
            "synastry": {
                "aspects": [
                    { "id": 17, "pair_key": "moon_venus", "strength": 0.7,
                      "polarity": "supportive", "text_key": "k1" },
                    { "pair_key": "sun_mars", "strength": 0.6, "polarity": "challenging",
                      "domains": ["romance", null], "text_key": "k2" }
                ]
            },
            "text": { "by_key": { "k1": { "title": "Ease" }, "k2": { "title": "Heat" } } }
        });
        let report = normalize_synastry(body, now()).expect("normalizes");
        assert_eq!(report.aspects.len(), 2);
        assert_eq!(report.aspects[0].aspect_id.as_deref(), Some("17"));
        assert_eq!(report.aspects[1].domains, vec![Domain::Romance]);
        assert_eq!(report.summary.strengths, vec!["Ease"]);
        assert_eq!(report.summary.challenges, vec!["Heat"]);
    }

    #[test]
    fn missing_synastry_container_is_a_shape_error() {
        let error = normalize_synastry(json!({ "text": {} }), now()).expect_err("rejected");
        assert!(matches!(
            error,
            ShapeError::MissingContainer {
                field: "synastry",
                ..
            }
        ));

        let error = normalize_synastry(json!({ "synastry": "broken" }), now()).expect_err("rejected");
        assert!(matches!(error, ShapeError::Malformed { .. }));
    }
}
