use super::raw::{
    build_archetype, parse_domains, RawArchetype, FRICTION_TITLE, GROWTH_TITLE, NO_INSIGHT,
    NO_SUMMARY,
};
use super::{
    build_meta, dedupe_by_key, extract_scores, field, into_object, lenient, non_empty,
    parse_container, percent, take_container, unit_interval, ShapeError,
};
use crate::report::highlights::first_keys;
use crate::report::{
    Aspect, AspectBlocks, Bands, Block, BlockSide, Calculation, DisplayPolicy, DriverItem,
    Polarity, Report, StrengthCategory, Summary,
};
use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const SHAPE: &str = "cards";

/// Polarity vocabulary of the cards endpoint. Only the exact `supportive` and
/// `challenging` values feed highlights; synonyms still map canonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CardPolarity {
    Supportive,
    Challenging,
    Neutral,
    Easy,
    Friction,
    #[serde(other)]
    Other,
}

impl CardPolarity {
    fn canonical(self) -> Polarity {
        match self {
            Self::Supportive | Self::Easy => Polarity::Supportive,
            Self::Challenging | Self::Friction => Polarity::Challenging,
            Self::Neutral | Self::Other => Polarity::Neutral,
        }
    }

    fn highlight_side(self) -> Option<BlockSide> {
        match self {
            Self::Supportive => Some(BlockSide::Supportive),
            Self::Challenging => Some(BlockSide::Challenging),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CardsSummary {
    #[serde(default)]
    archetype: Option<Value>,
    #[serde(default)]
    scores: Option<Value>,
    #[serde(default)]
    narrative: Option<Value>,
    #[serde(default)]
    bands: Option<Value>,
    #[serde(default)]
    drivers_by_domain: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CardBlock {
    #[serde(default, deserialize_with = "field::text")]
    title: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    one_liner: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    insight: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CardBlocks {
    #[serde(default, deserialize_with = "field::tolerant")]
    supportive: Option<CardBlock>,
    #[serde(default, deserialize_with = "field::tolerant")]
    challenging: Option<CardBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
    Other(IgnoredAny),
}

impl Flag {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            Self::Other(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StrengthField {
    Category(String),
    Value(f64),
    Other(IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct CardAspect {
    #[serde(default, deserialize_with = "field::text")]
    key: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    aspect_id: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    label: Option<String>,
    #[serde(default, deserialize_with = "field::tolerant")]
    rank: Option<f64>,
    #[serde(default)]
    strength: Option<StrengthField>,
    #[serde(default, deserialize_with = "field::tolerant")]
    strength_value: Option<f64>,
    #[serde(default, deserialize_with = "field::tolerant")]
    polarity: Option<CardPolarity>,
    #[serde(default, deserialize_with = "field::tolerant")]
    polarity_score: Option<f64>,
    #[serde(default, deserialize_with = "field::tolerant")]
    abs_polarity: Option<f64>,
    #[serde(default)]
    dominant: Option<Flag>,
    #[serde(default, deserialize_with = "field::strings")]
    domains: Vec<String>,
    #[serde(default, deserialize_with = "field::text")]
    display_policy: Option<String>,
    #[serde(default, deserialize_with = "field::text")]
    default_block: Option<String>,
    #[serde(default, deserialize_with = "field::tolerant")]
    blocks: Option<CardBlocks>,
}

#[derive(Debug, Default, Deserialize)]
struct CardsCalculation {
    #[serde(default)]
    zodiac: Option<String>,
    #[serde(default)]
    house_system: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CardsMeta {
    #[serde(default)]
    calculation: Option<Value>,
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    report_id: Option<String>,
}

/// Normalizes a `/western/synastrycards` response body.
///
/// Aspects pass through nearly unchanged. Highlights are rebuilt from the
/// first exact `supportive`/`challenging` aspects in array order and stored as
/// keys; driver refs are resolved against the aspects.
pub fn normalize_cards(body: Value, now: DateTime<Utc>) -> Result<Report, ShapeError> {
    let mut root = into_object(body, SHAPE)?;
    let summary: CardsSummary =
        parse_container(take_container(&mut root, SHAPE, "summary")?, SHAPE, "summary")?;
    let raw_aspects: Vec<Value> =
        parse_container(take_container(&mut root, SHAPE, "aspects")?, SHAPE, "aspects")?;
    let meta: CardsMeta = lenient(root.remove("meta")).unwrap_or_default();

    let entries: Vec<(Aspect, CardPolarity)> = raw_aspects
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<CardAspect>(value) {
            Ok(card) => Some(normalize_aspect(index, card)),
            Err(err) => {
                warn!(shape = SHAPE, index, error = %err, "skipping unreadable aspect");
                None
            }
        })
        .collect();
    let (aspects, polarities): (Vec<Aspect>, Vec<CardPolarity>) =
        dedupe_by_key(entries, SHAPE).into_iter().unzip();

    let highlights = first_keys(&aspects, |index, _| polarities[index].highlight_side());
    let drivers_by_domain = summary
        .drivers_by_domain
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .map(|map| resolve_drivers(map, &aspects));

    let calculation: CardsCalculation = lenient(meta.calculation).unwrap_or_default();
    let defaults = Calculation::default();
    let calculation = Calculation {
        zodiac: non_empty(calculation.zodiac).unwrap_or(defaults.zodiac),
        house_system: non_empty(calculation.house_system).unwrap_or(defaults.house_system),
    };

    let archetype =
        build_archetype(lenient::<RawArchetype>(summary.archetype).unwrap_or_default());
    let narrative = summary
        .narrative
        .as_ref()
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let bands: Option<Bands> = lenient(summary.bands);
    let scores = extract_scores(summary.scores.as_ref());

    debug!(
        shape = SHAPE,
        aspects = aspects.len(),
        scores = scores.len(),
        "normalized cards payload"
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
            drivers_by_domain,
        },
        aspects,
    })
}

fn normalize_aspect(index: usize, card: CardAspect) -> (Aspect, CardPolarity) {
    let polarity = card.polarity.unwrap_or(CardPolarity::Neutral);
    let canonical = polarity.canonical();

    let (category, numeric_strength) = match card.strength {
        Some(StrengthField::Category(text)) => (StrengthCategory::parse(&text), None),
        Some(StrengthField::Value(value)) => (None, Some(value)),
        Some(StrengthField::Other(_)) | None => (None, None),
    };
    let strength_value = unit_interval(
        card.strength_value
            .or(numeric_strength)
            .or(card.rank.map(|rank| rank / 100.0)),
    );

    let polarity_score = match card.polarity_score {
        Some(score) if score.is_finite() => score.clamp(-1.0, 1.0),
        _ if canonical == Polarity::Challenging => -strength_value,
        _ => strength_value,
    };
    let abs_polarity = match card.abs_polarity {
        Some(value) if value.is_finite() => value.abs().min(1.0),
        _ => polarity_score.abs(),
    };
    let rank = match card.rank {
        Some(rank) if rank.is_finite() => rank.round().clamp(0.0, 100.0) as u8,
        _ => percent(strength_value),
    };

    let display_policy = match card.display_policy.as_deref().map(str::trim) {
        Some("both_sides") => DisplayPolicy::BothSides,
        _ => DisplayPolicy::Show,
    };
    let default_block = match card.default_block.as_deref().map(str::trim) {
        Some("challenging") => BlockSide::Challenging,
        Some("supportive") => BlockSide::Supportive,
        _ if canonical == Polarity::Challenging => BlockSide::Challenging,
        _ => BlockSide::Supportive,
    };

    let key = non_empty(card.key)
        .or_else(|| non_empty(card.aspect_id.clone()))
        .unwrap_or_else(|| format!("aspect-{}", index + 1));
    let label = non_empty(card.label).unwrap_or_else(|| key.clone());
    let blocks = complete_blocks(card.blocks.unwrap_or_default(), default_block, &label);

    let aspect = Aspect {
        key,
        aspect_id: non_empty(card.aspect_id),
        label,
        rank,
        strength: category.unwrap_or(StrengthCategory::Moderate),
        strength_value,
        polarity: canonical,
        polarity_score,
        abs_polarity,
        dominant: card
            .dominant
            .as_ref()
            .and_then(Flag::as_bool)
            .unwrap_or(strength_value > 0.8),
        domains: parse_domains(card.domains),
        display_policy,
        default_block,
        blocks,
    };

    (aspect, polarity)
}

/// Fills in whichever block upstream left out so both sides always render.
fn complete_blocks(blocks: CardBlocks, authoritative: BlockSide, label: &str) -> AspectBlocks {
    let fill = |block: CardBlock, fallback: Option<&Block>| Block {
        title: non_empty(block.title)
            .or_else(|| fallback.map(|b| b.title.clone()))
            .unwrap_or_else(|| label.to_string()),
        one_liner: non_empty(block.one_liner)
            .or_else(|| fallback.map(|b| b.one_liner.clone()))
            .unwrap_or_else(|| NO_SUMMARY.to_string()),
        insight: non_empty(block.insight)
            .or_else(|| fallback.map(|b| b.insight.clone()))
            .unwrap_or_else(|| NO_INSIGHT.to_string()),
    };

    let (primary, secondary) = match authoritative {
        BlockSide::Supportive => (blocks.supportive, blocks.challenging),
        BlockSide::Challenging => (blocks.challenging, blocks.supportive),
    };
    let (primary, secondary) = match (primary, secondary) {
        (None, Some(other)) => (other, None),
        (primary, secondary) => (primary.unwrap_or_default(), secondary),
    };

    let primary = fill(primary, None);
    let secondary = match secondary {
        Some(block) => fill(block, Some(&primary)),
        None => Block {
            title: match authoritative {
                BlockSide::Supportive => FRICTION_TITLE.to_string(),
                BlockSide::Challenging => GROWTH_TITLE.to_string(),
            },
            ..primary.clone()
        },
    };

    match authoritative {
        BlockSide::Supportive => AspectBlocks {
            supportive: primary,
            challenging: secondary,
        },
        BlockSide::Challenging => AspectBlocks {
            supportive: secondary,
            challenging: primary,
        },
    }
}

fn resolve_drivers(
    raw: Map<String, Value>,
    aspects: &[Aspect],
) -> BTreeMap<String, Vec<DriverItem>> {
    raw.into_iter()
        .filter_map(|(domain, refs)| match refs {
            Value::Array(items) => Some((domain, items)),
            _ => None,
        })
        .map(|(domain, items)| {
            let drivers = items
                .iter()
                .filter_map(driver_ref)
                .map(|reference| resolve_driver(reference, aspects))
                .collect();
            (domain, drivers)
        })
        .collect()
}

fn driver_ref(item: &Value) -> Option<String> {
    match item {
        Value::String(key) => non_empty(Some(key.clone())),
        Value::Object(map) => ["key", "id", "aspect_id"]
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

fn resolve_driver(reference: String, aspects: &[Aspect]) -> DriverItem {
    let found = aspects.iter().find(|aspect| {
        aspect.key == reference || aspect.aspect_id.as_deref() == Some(reference.as_str())
    });

    match found {
        Some(aspect) => DriverItem {
            label: aspect.label.clone(),
            contribution: percent(aspect.strength_value),
            key: reference,
        },
        None => {
            debug!(shape = SHAPE, key = %reference, "driver references an unknown aspect");
            DriverItem {
                label: reference.clone(),
                contribution: 0,
                key: reference,
            }
        }
    }
}
