//! Filtering and ordering for the aspect explorer list.

use super::domain::{Aspect, Domain};
use super::views::{polarity_lean, PolarityLean};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Below this many matches the collapsed view shows everything.
pub const PREVIEW_THRESHOLD: usize = 6;

const PREVIEW_PER_LEAN: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Rank ascending.
    #[default]
    Rank,
    /// `abs_polarity` descending.
    AbsPolarity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerQuery {
    #[serde(default)]
    pub domain: Option<Domain>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerView<'a> {
    pub displayed: Vec<&'a Aspect>,
    pub matching: usize,
}

impl ExplorerView<'_> {
    pub fn has_more(&self) -> bool {
        self.displayed.len() < self.matching
    }
}

pub fn explore(aspects: &[Aspect], query: ExplorerQuery) -> ExplorerView<'_> {
    let mut filtered: Vec<&Aspect> = aspects
        .iter()
        .filter(|aspect| query.domain.map_or(true, |domain| aspect.touches(domain)))
        .collect();
    sort_aspects(&mut filtered, query.sort);

    let matching = filtered.len();
    if query.expanded || matching <= PREVIEW_THRESHOLD {
        return ExplorerView {
            displayed: filtered,
            matching,
        };
    }

    let pick = |lean: PolarityLean| {
        filtered
            .iter()
            .copied()
            .filter(move |aspect| polarity_lean(aspect.polarity_score) == lean)
            .take(PREVIEW_PER_LEAN)
    };
    let mut displayed: Vec<&Aspect> = pick(PolarityLean::Supportive)
        .chain(pick(PolarityLean::Challenging))
        .collect();
    sort_aspects(&mut displayed, query.sort);

    ExplorerView {
        displayed,
        matching,
    }
}

fn sort_aspects(aspects: &mut [&Aspect], sort: SortKey) {
    match sort {
        SortKey::Rank => aspects.sort_by_key(|aspect| aspect.rank),
        SortKey::AbsPolarity => aspects.sort_by(|a, b| {
            b.abs_polarity
                .partial_cmp(&a.abs_polarity)
                .unwrap_or(Ordering::Equal)
        }),
    }
}
