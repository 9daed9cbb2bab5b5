//! Strength/challenge highlight selection, computed once at normalize time.

use super::domain::{Aspect, BlockSide};
use std::cmp::Ordering;

pub const HIGHLIGHT_LIMIT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlights {
    pub strengths: Vec<String>,
    pub challenges: Vec<String>,
}

/// Strongest-first selection storing block titles.
///
/// `side_of` classifies an aspect by its upstream polarity, returning `None`
/// for aspects that belong to neither list. Ties keep input order.
pub fn strongest_titles<F>(aspects: &[Aspect], side_of: F) -> Highlights
where
    F: Fn(usize, &Aspect) -> Option<BlockSide>,
{
    let mut ranked: Vec<(usize, &Aspect)> = aspects.iter().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| {
        b.strength_value
            .partial_cmp(&a.strength_value)
            .unwrap_or(Ordering::Equal)
    });

    let titles = |side: BlockSide| -> Vec<String> {
        ranked
            .iter()
            .filter(|(index, aspect)| side_of(*index, *aspect) == Some(side))
            .take(HIGHLIGHT_LIMIT)
            .map(|(_, aspect)| title_or_label(aspect, side))
            .collect()
    };

    Highlights {
        strengths: titles(BlockSide::Supportive),
        challenges: titles(BlockSide::Challenging),
    }
}

/// First-come selection in array order storing aspect keys.
pub fn first_keys<F>(aspects: &[Aspect], side_of: F) -> Highlights
where
    F: Fn(usize, &Aspect) -> Option<BlockSide>,
{
    let keys = |side: BlockSide| -> Vec<String> {
        aspects
            .iter()
            .enumerate()
            .filter(|(index, aspect)| side_of(*index, *aspect) == Some(side))
            .take(HIGHLIGHT_LIMIT)
            .map(|(_, aspect)| aspect.key.clone())
            .collect()
    };

    Highlights {
        strengths: keys(BlockSide::Supportive),
        challenges: keys(BlockSide::Challenging),
    }
}

fn title_or_label(aspect: &Aspect, side: BlockSide) -> String {
    let title = &aspect.blocks.side(side).title;
    if title.trim().is_empty() {
        aspect.label.clone()
    } else {
        title.clone()
    }
}
