use super::domain::{Aspect, Domain, StrengthCategory, Summary};
use serde::Serialize;

/// Scores at or beyond this magnitude lean one way.
pub const LEAN_THRESHOLD: f64 = 0.35;

pub const INTENSITY_LEVELS: u8 = 5;

pub const FALLBACK_DOMAIN_COLOR: &str = "#9b8ec4";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarityLean {
    Supportive,
    Challenging,
    Balanced,
}

impl PolarityLean {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Supportive => "Supportive",
            Self::Challenging => "Challenging",
            Self::Balanced => "Balanced",
        }
    }
}

pub fn polarity_lean(score: f64) -> PolarityLean {
    if score >= LEAN_THRESHOLD {
        PolarityLean::Supportive
    } else if score <= -LEAN_THRESHOLD {
        PolarityLean::Challenging
    } else {
        PolarityLean::Balanced
    }
}

/// Filled units of the five-step intensity bar. Never below one.
pub fn intensity_level(score: f64) -> u8 {
    let magnitude = score.abs();
    if !magnitude.is_finite() {
        return if magnitude.is_nan() { 1 } else { INTENSITY_LEVELS };
    }
    let filled = (magnitude * f64::from(INTENSITY_LEVELS)).ceil();
    filled.clamp(1.0, f64::from(INTENSITY_LEVELS)) as u8
}

pub fn domain_color(domain: &str) -> &'static str {
    match Domain::parse(domain) {
        Some(Domain::Romance) => "#d4726a",
        Some(Domain::Communication) => "#7aa2d4",
        Some(Domain::Stability) => "#8b9a6b",
        Some(Domain::Intimacy) => "#b07aab",
        Some(Domain::Growth) => "#c9a96e",
        Some(Domain::Tension) => "#c97a5a",
        None => FALLBACK_DOMAIN_COLOR,
    }
}

/// Display label for a strength category; unknown categories are echoed back.
pub fn strength_label(category: &str) -> String {
    match StrengthCategory::parse(category) {
        Some(known) => known.label().to_string(),
        None => category.to_string(),
    }
}

/// Scores are already on a 0-100 scale; this only guards the gauge.
pub fn display_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

pub fn format_polarity(score: f64) -> String {
    format!("{}%", (score.abs() * 100.0).round() as i64)
}

pub fn find_aspect<'a>(key: &str, aspects: &'a [Aspect]) -> Option<&'a Aspect> {
    aspects.iter().find(|aspect| aspect.key == key)
}

/// Resolves highlight keys to aspects, skipping entries that match nothing.
pub fn resolve_highlights<'a>(keys: &[String], aspects: &'a [Aspect]) -> Vec<&'a Aspect> {
    keys.iter()
        .filter_map(|key| find_aspect(key, aspects))
        .collect()
}

/// Presentation values for one aspect card.
#[derive(Debug, Clone, Serialize)]
pub struct AspectCardView<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub strength_label: String,
    pub lean: PolarityLean,
    pub intensity: u8,
    pub polarity_pct: String,
    pub domain_colors: Vec<&'static str>,
    pub domain_labels: Vec<&'static str>,
    pub title: &'a str,
    pub one_liner: &'a str,
    /// Title of the other side when the card can be flipped.
    pub flip_title: Option<&'a str>,
}

impl<'a> AspectCardView<'a> {
    pub fn new(aspect: &'a Aspect) -> Self {
        let block = aspect.primary_block();
        Self {
            key: &aspect.key,
            label: &aspect.label,
            strength_label: strength_label(aspect.strength.as_str()),
            lean: polarity_lean(aspect.polarity_score),
            intensity: intensity_level(aspect.polarity_score),
            polarity_pct: format_polarity(aspect.polarity_score),
            domain_colors: aspect
                .domains
                .iter()
                .map(|domain| domain_color(domain.as_str()))
                .collect(),
            domain_labels: aspect.domains.iter().map(|domain| domain.label()).collect(),
            title: &block.title,
            one_liner: &block.one_liner,
            flip_title: aspect
                .offers_toggle()
                .then(|| aspect.blocks.side(aspect.default_block.other()).title.as_str()),
        }
    }
}

/// Plain-text block the share poster copies to the clipboard.
pub fn share_summary_text(summary: &Summary) -> String {
    let mut lines = vec![
        format!("\u{2726} {}", summary.archetype.label),
        format!("\"{}\"", summary.archetype.one_liner),
        String::new(),
        format!("Overall Score: {}", summary.overall_score().round() as i64),
    ];
    lines.extend(
        summary
            .domain_scores()
            .map(|item| format!("{}: {}", item.key.as_str(), item.value.round() as i64)),
    );
    lines.push(String::new());
    lines.push(summary.narrative.clone());
    lines.push(String::new());
    lines.push(format!("Strengths: {}", summary.strengths.join(", ")));
    lines.push(format!("Challenges: {}", summary.challenges.join(", ")));
    lines.push(String::new());
    lines.push("\u{2014} Open Synastry".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::domain::{
        Archetype, AspectBlocks, Block, BlockSide, DisplayPolicy, Polarity, ScoreItem, ScoreKey,
    };

    #[test]
    fn lean_boundaries_are_inclusive() {
        assert_eq!(polarity_lean(0.35), PolarityLean::Supportive);
        assert_eq!(polarity_lean(0.34999), PolarityLean::Balanced);
        assert_eq!(polarity_lean(-0.35), PolarityLean::Challenging);
        assert_eq!(polarity_lean(-0.34999), PolarityLean::Balanced);
        assert_eq!(polarity_lean(0.0), PolarityLean::Balanced);
    }

    #[test]
    fn intensity_never_drops_below_one_unit() {
        assert_eq!(intensity_level(0.0), 1);
        assert_eq!(intensity_level(0.21), 2);
        assert_eq!(intensity_level(0.4), 2);
        assert_eq!(intensity_level(1.0), 5);
        assert_eq!(intensity_level(-0.9), 5);
        assert_eq!(intensity_level(3.2), 5);
        assert_eq!(intensity_level(f64::NAN), 1);
    }

    #[test]
    fn domain_colors_fall_back_for_unknown_domains() {
        assert_eq!(domain_color("romance"), "#d4726a");
        assert_eq!(domain_color("tension"), "#c97a5a");
        assert_eq!(domain_color("finance"), FALLBACK_DOMAIN_COLOR);
        assert_eq!(domain_color(""), FALLBACK_DOMAIN_COLOR);
    }

    #[test]
    fn strength_labels_echo_unknown_categories() {
        assert_eq!(strength_label("very_strong"), "Very Strong");
        assert_eq!(strength_label("weak"), "Weak");
        assert_eq!(strength_label("cosmic"), "cosmic");
    }

    #[test]
    fn display_score_clamps_to_gauge_range() {
        assert_eq!(display_score(-4.0), 0.0);
        assert_eq!(display_score(64.5), 64.5);
        assert_eq!(display_score(140.0), 100.0);
        assert_eq!(display_score(f64::NAN), 0.0);
    }

    #[test]
    fn polarity_is_formatted_as_unsigned_percent() {
        assert_eq!(format_polarity(-0.456), "46%");
        assert_eq!(format_polarity(0.9), "90%");
    }

    #[test]
    fn share_text_lists_scores_and_highlights() {
        let summary = Summary {
            archetype: Archetype {
                id: None,
                label: "Kindred Flames".to_string(),
                confidence: 0.8,
                one_liner: "Warm and bright.".to_string(),
            },
            scores: vec![
                ScoreItem {
                    key: ScoreKey::Overall,
                    value: 71.6,
                    direction: None,
                },
                ScoreItem {
                    key: ScoreKey::Domain(Domain::Romance),
                    value: 80.2,
                    direction: None,
                },
            ],
            strengths: vec!["Warmth".to_string(), "Ease".to_string()],
            challenges: vec!["Power plays".to_string()],
            narrative: "You light each other up.".to_string(),
            bands: None,
            drivers_by_domain: None,
        };

        let text = share_summary_text(&summary);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "\u{2726} Kindred Flames");
        assert_eq!(lines[1], "\"Warm and bright.\"");
        assert_eq!(lines[3], "Overall Score: 72");
        assert_eq!(lines[4], "romance: 80");
        assert!(text.contains("Strengths: Warmth, Ease"));
        assert!(text.contains("Challenges: Power plays"));
        assert!(text.ends_with("\u{2014} Open Synastry"));
    }

    fn card_aspect(display_policy: DisplayPolicy) -> Aspect {
        let block = |title: &str| Block {
            title: title.to_string(),
            one_liner: format!("{title} in brief"),
            insight: String::new(),
        };
        Aspect {
            key: "mars_saturn".to_string(),
            aspect_id: None,
            label: "Mars square Saturn".to_string(),
            rank: 60,
            strength: StrengthCategory::Strong,
            strength_value: 0.6,
            polarity: Polarity::Challenging,
            polarity_score: -0.6,
            abs_polarity: 0.6,
            dominant: false,
            domains: vec![Domain::Tension, Domain::Stability],
            display_policy,
            default_block: BlockSide::Challenging,
            blocks: AspectBlocks {
                supportive: block("Discipline"),
                challenging: block("Friction"),
            },
        }
    }

    #[test]
    fn card_view_opens_on_default_side_and_flips_when_allowed() {
        let aspect = card_aspect(DisplayPolicy::BothSides);
        let card = AspectCardView::new(&aspect);
        assert_eq!(card.title, "Friction");
        assert_eq!(card.one_liner, "Friction in brief");
        assert_eq!(card.flip_title, Some("Discipline"));
        assert_eq!(card.lean, PolarityLean::Challenging);
        assert_eq!(card.polarity_pct, "60%");
        assert_eq!(card.domain_labels, vec!["Tension", "Stability"]);
        assert_eq!(card.domain_colors, vec!["#c97a5a", domain_color("stability")]);

        let single = card_aspect(DisplayPolicy::Show);
        assert_eq!(AspectCardView::new(&single).flip_title, None);
    }
}
