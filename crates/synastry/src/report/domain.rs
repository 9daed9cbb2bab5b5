use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Romance,
    Communication,
    Stability,
    Intimacy,
    Growth,
    Tension,
}

impl Domain {
    pub const ALL: [Self; 6] = [
        Self::Romance,
        Self::Communication,
        Self::Stability,
        Self::Intimacy,
        Self::Growth,
        Self::Tension,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Romance => "romance",
            Self::Communication => "communication",
            Self::Stability => "stability",
            Self::Intimacy => "intimacy",
            Self::Growth => "growth",
            Self::Tension => "tension",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Romance => "Romance",
            Self::Communication => "Communication",
            Self::Stability => "Stability",
            Self::Intimacy => "Intimacy",
            Self::Growth => "Growth",
            Self::Tension => "Tension",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.as_str() == value.trim())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score keys: the overall score plus one per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKey {
    Overall,
    Domain(Domain),
}

impl ScoreKey {
    pub const ORDERED: [Self; 7] = [
        Self::Overall,
        Self::Domain(Domain::Romance),
        Self::Domain(Domain::Communication),
        Self::Domain(Domain::Stability),
        Self::Domain(Domain::Intimacy),
        Self::Domain(Domain::Growth),
        Self::Domain(Domain::Tension),
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Domain(domain) => domain.as_str(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value.trim() == "overall" {
            return Some(Self::Overall);
        }
        Domain::parse(value).map(Self::Domain)
    }
}

impl Serialize for ScoreKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ScoreKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown score key '{raw}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthCategory {
    VeryStrong,
    Strong,
    Moderate,
    Mild,
    Weak,
}

impl StrengthCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::VeryStrong => "very_strong",
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Mild => "mild",
            Self::Weak => "weak",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryStrong => "Very Strong",
            Self::Strong => "Strong",
            Self::Moderate => "Moderate",
            Self::Mild => "Mild",
            Self::Weak => "Weak",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "very_strong" => Some(Self::VeryStrong),
            "strong" => Some(Self::Strong),
            "moderate" => Some(Self::Moderate),
            "mild" => Some(Self::Mild),
            "weak" => Some(Self::Weak),
            _ => None,
        }
    }
}

/// Canonical polarity. Upstream synonyms never reach this type unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Supportive,
    Challenging,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayPolicy {
    Show,
    BothSides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSide {
    Supportive,
    Challenging,
}

impl BlockSide {
    pub const fn other(self) -> Self {
        match self {
            Self::Supportive => Self::Challenging,
            Self::Challenging => Self::Supportive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub title: String,
    pub one_liner: String,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectBlocks {
    pub supportive: Block,
    pub challenging: Block,
}

impl AspectBlocks {
    pub fn side(&self, side: BlockSide) -> &Block {
        match side {
            BlockSide::Supportive => &self.supportive,
            BlockSide::Challenging => &self.challenging,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_id: Option<String>,
    pub label: String,
    pub rank: u8,
    pub strength: StrengthCategory,
    pub strength_value: f64,
    pub polarity: Polarity,
    pub polarity_score: f64,
    pub abs_polarity: f64,
    pub dominant: bool,
    pub domains: Vec<Domain>,
    pub display_policy: DisplayPolicy,
    pub default_block: BlockSide,
    pub blocks: AspectBlocks,
}

impl Aspect {
    /// Block the report opens with for this aspect.
    pub fn primary_block(&self) -> &Block {
        self.blocks.side(self.default_block)
    }

    pub fn offers_toggle(&self) -> bool {
        self.display_policy == DisplayPolicy::BothSides
    }

    pub fn touches(&self, domain: Domain) -> bool {
        self.domains.contains(&domain)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreItem {
    pub key: ScoreKey,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    pub confidence: f64,
    pub one_liner: String,
}

impl Default for Archetype {
    fn default() -> Self {
        Self {
            id: None,
            label: "Cosmic Duo".to_string(),
            confidence: 0.5,
            one_liner: "A unique connection.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_version: Option<String>,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub core: String,
    #[serde(default)]
    pub shadow: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverItem {
    pub key: String,
    pub label: String,
    pub contribution: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub archetype: Archetype,
    pub scores: Vec<ScoreItem>,
    pub strengths: Vec<String>,
    pub challenges: Vec<String>,
    pub narrative: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bands: Option<Bands>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drivers_by_domain: Option<BTreeMap<String, Vec<DriverItem>>>,
}

impl Summary {
    pub fn score(&self, key: ScoreKey) -> Option<f64> {
        self.scores
            .iter()
            .find(|item| item.key == key)
            .map(|item| item.value)
    }

    pub fn overall_score(&self) -> f64 {
        self.score(ScoreKey::Overall).unwrap_or(0.0)
    }

    pub fn domain_scores(&self) -> impl Iterator<Item = &ScoreItem> {
        self.scores
            .iter()
            .filter(|item| item.key != ScoreKey::Overall)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub zodiac: String,
    pub house_system: String,
}

impl Default for Calculation {
    fn default() -> Self {
        Self {
            zodiac: "tropical".to_string(),
            house_system: "placidus".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub calculation: Calculation,
    pub generated_at: String,
    pub report_id: String,
}

/// Normalized synastry report. Built once per retrieval and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub meta: Meta,
    pub summary: Summary,
    pub aspects: Vec<Aspect>,
}
