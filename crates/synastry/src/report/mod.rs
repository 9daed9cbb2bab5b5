pub mod domain;
pub mod explorer;
pub mod highlights;
pub mod views;

pub use domain::{
    Archetype, Aspect, AspectBlocks, Bands, Block, BlockSide, Calculation, DisplayPolicy, Domain,
    DriverItem, Meta, Polarity, Report, ScoreItem, ScoreKey, StrengthCategory, Summary,
};
pub use explorer::{explore, ExplorerQuery, ExplorerView, SortKey};
pub use views::{
    display_score, domain_color, find_aspect, format_polarity, intensity_level, polarity_lean,
    resolve_highlights, share_summary_text, strength_label, AspectCardView, PolarityLean,
};
