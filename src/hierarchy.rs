//! Drill-down aggregation over the active category set.
//!
//! All read surfaces go through this module; nothing else re-derives path
//! parsing or distinct-child counting. Levels are always recomputed from the
//! stored path, never read from the `category_level` column.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::db::CategoryRecord;
use crate::taxonomy::{self, PathLevels};

/// Parent selection narrowing the visible set one level at a time. A deeper
/// field is only meaningful when the shallower ones are set.
#[derive(Debug, Clone, Default)]
pub struct Drilldown {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub small: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrilldownResult {
    /// Level the options belong to: "large", "medium", "small" or "smallest".
    pub level: String,
    /// Distinct values present at that level, locale-sorted.
    pub options: Vec<String>,
    /// Number of distinct values (not rows).
    pub count: usize,
    /// Root view only: observed large categories that match none of the
    /// canonical roots after whitespace/case normalization.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncatalogued: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStats {
    pub total: usize,
    pub large: usize,
    pub medium: usize,
    pub small: usize,
    pub smallest: usize,
    /// Rows whose stored level disagrees with the level recomputed from the
    /// path. Flagged for data-quality review, not rejected here.
    pub level_mismatches: usize,
}

fn parsed(records: &[CategoryRecord]) -> Vec<PathLevels> {
    records
        .iter()
        .map(|r| taxonomy::parse_path(&r.category_path))
        .collect()
}

/// Distinct child values one level below the deepest populated selector
/// level. Large-level matching is whitespace/case-insensitive; medium and
/// small match exact strings.
pub fn drilldown(
    records: &[CategoryRecord],
    selection: &Drilldown,
    descending: bool,
) -> DrilldownResult {
    let levels = parsed(records);

    let Some(sel_large) = selection.large.as_deref() else {
        return root_view(&levels, descending);
    };

    let matching_large = levels
        .iter()
        .filter(|l| taxonomy::matches_large(&l.large, sel_large));

    let (level, values): (&str, BTreeSet<String>) = match (
        selection.medium.as_deref(),
        selection.small.as_deref(),
    ) {
        (None, _) => (
            "medium",
            matching_large
                .filter(|l| !l.medium.is_empty())
                .map(|l| l.medium.clone())
                .collect(),
        ),
        (Some(sel_medium), None) => (
            "small",
            matching_large
                .filter(|l| l.medium == sel_medium && !l.small.is_empty())
                .map(|l| l.small.clone())
                .collect(),
        ),
        (Some(sel_medium), Some(sel_small)) => (
            "smallest",
            matching_large
                .filter(|l| {
                    l.medium == sel_medium && l.small == sel_small && !l.smallest.is_empty()
                })
                .map(|l| l.smallest.clone())
                .collect(),
        ),
    };

    let mut options: Vec<String> = values.into_iter().collect();
    taxonomy::sort_labels(&mut options, descending);
    DrilldownResult {
        level: level.to_string(),
        count: options.len(),
        options,
        uncatalogued: Vec::new(),
    }
}

/// The root reports the canonical taxonomy in its fixed order rather than
/// deriving the list from data; observed-but-uncatalogued large values are
/// surfaced separately so the caller can decide whether to render them.
fn root_view(levels: &[PathLevels], descending: bool) -> DrilldownResult {
    let mut options: Vec<String> = taxonomy::CANONICAL_LARGE
        .iter()
        .map(|s| s.to_string())
        .collect();
    if descending {
        options.reverse();
    }

    let uncatalogued_set: BTreeSet<String> = levels
        .iter()
        .filter(|l| !l.large.is_empty() && !taxonomy::is_canonical_large(&l.large))
        .map(|l| l.large.clone())
        .collect();
    let mut uncatalogued: Vec<String> = uncatalogued_set.into_iter().collect();
    taxonomy::sort_labels(&mut uncatalogued, descending);

    DrilldownResult {
        level: "large".to_string(),
        count: options.len(),
        options,
        uncatalogued,
    }
}

/// Distinct value counts per level across the active set. Large values are
/// deduplicated in normalized form so "패션의류" and "패션 의류" count once.
pub fn level_stats(records: &[CategoryRecord]) -> LevelStats {
    let levels = parsed(records);

    let mut large = BTreeSet::new();
    let mut medium = BTreeSet::new();
    let mut small = BTreeSet::new();
    let mut smallest = BTreeSet::new();
    for l in &levels {
        if !l.large.is_empty() {
            large.insert(taxonomy::normalize_large(&l.large));
        }
        if !l.medium.is_empty() {
            medium.insert(l.medium.clone());
        }
        if !l.small.is_empty() {
            small.insert(l.small.clone());
        }
        if !l.smallest.is_empty() {
            smallest.insert(l.smallest.clone());
        }
    }

    let level_mismatches = records
        .iter()
        .filter(|r| taxonomy::actual_level(&r.category_path) != r.category_level)
        .count();

    LevelStats {
        total: records.len(),
        large: large.len(),
        medium: medium.len(),
        small: small.len(),
        smallest: smallest.len(),
        level_mismatches,
    }
}
