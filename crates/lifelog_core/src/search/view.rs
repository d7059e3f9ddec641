//! Sorted and filtered achievement views.
//!
//! # Invariants
//! - Ordering is descending by `date` string; ties keep collection order.
//! - Matching is a case-folded substring test over title, description and date.
//! - Views borrow records; they never own or mutate the collection.

use crate::model::achievement::Achievement;
use std::cmp::Ordering;

/// Trims and case-folds search input; blank input means "no filter".
pub fn normalize_query(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Returns whether `record` matches an already-normalized needle.
pub fn matches_query(record: &Achievement, needle: &str) -> bool {
    record.search_haystack().to_lowercase().contains(needle)
}

/// Stable sort, newest date first.
pub fn sort_by_date_desc(records: &mut [&Achievement]) {
    records.sort_by(|a, b| newest_first(a, b));
}

fn newest_first(a: &Achievement, b: &Achievement) -> Ordering {
    b.date.cmp(&a.date)
}

/// Read-only projection over borrowed records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AchievementView<'a> {
    items: Vec<&'a Achievement>,
}

impl<'a> AchievementView<'a> {
    /// Builds the view for `text` over `records` in collection order.
    pub fn build(records: &'a [Achievement], text: &str) -> Self {
        let needle = normalize_query(text);
        Self::from_indices(records, &project_indices(records, needle.as_deref()))
    }

    fn from_indices(records: &'a [Achievement], indices: &[usize]) -> Self {
        Self {
            items: indices.iter().filter_map(|&idx| records.get(idx)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Achievement> {
        self.items.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Achievement> + '_ {
        self.items.iter().copied()
    }

    /// Ids in view order.
    pub fn ids(&self) -> Vec<&'a str> {
        self.items.iter().map(|record| record.id.as_str()).collect()
    }

    /// Owned copies, for callers that must outlive the store borrow.
    pub fn to_vec(&self) -> Vec<Achievement> {
        self.items.iter().map(|record| (*record).clone()).collect()
    }
}

impl<'a> IntoIterator for AchievementView<'a> {
    type Item = &'a Achievement;
    type IntoIter = std::vec::IntoIter<&'a Achievement>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Memoized projection keyed by collection revision and normalized query.
///
/// Holds indices only; call [`DerivedView::view`] with the same collection
/// the revision refers to.
#[derive(Debug, Default)]
pub struct DerivedView {
    needle: Option<String>,
    computed_for: Option<(u64, Option<String>)>,
    indices: Vec<usize>,
    recomputations: u64,
}

impl DerivedView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the search text. Recomputation is deferred to the next read.
    pub fn set_query(&mut self, text: &str) {
        self.needle = normalize_query(text);
    }

    /// Normalized search text currently applied.
    pub fn query(&self) -> Option<&str> {
        self.needle.as_deref()
    }

    /// Returns the projection, recomputing only when `revision` or the query changed.
    pub fn view<'a>(&mut self, records: &'a [Achievement], revision: u64) -> AchievementView<'a> {
        let key = (revision, self.needle.clone());
        if self.computed_for.as_ref() != Some(&key) {
            self.indices = project_indices(records, self.needle.as_deref());
            self.computed_for = Some(key);
            self.recomputations += 1;
        }
        AchievementView::from_indices(records, &self.indices)
    }

    /// Number of times the projection has been rebuilt.
    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

fn project_indices(records: &[Achievement], needle: Option<&str>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..records.len()).collect();
    indices.sort_by(|&a, &b| newest_first(&records[a], &records[b]));
    if let Some(needle) = needle {
        indices.retain(|&idx| matches_query(&records[idx], needle));
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::{normalize_query, sort_by_date_desc, AchievementView, DerivedView};
    use crate::model::achievement::{Achievement, AchievementId};

    fn record(id: &str, title: &str, description: Option<&str>, date: &str) -> Achievement {
        Achievement {
            id: AchievementId::from_raw(id),
            title: title.to_string(),
            description: description.map(ToString::to_string),
            date: date.to_string(),
        }
    }

    fn sample() -> Vec<Achievement> {
        vec![
            record("a", "Graduation", Some("finished degree"), "2023-01-01"),
            record("b", "Marathon", Some("ran 42km"), "2024-06-15"),
            record("c", "First job", None, "2020-12-31"),
        ]
    }

    #[test]
    fn blank_query_normalizes_to_none() {
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(" MaRa "), Some("mara".to_string()));
    }

    #[test]
    fn view_sorts_newest_first() {
        let records = sample();
        let view = AchievementView::build(&records, "");
        assert_eq!(view.ids(), vec!["b", "a", "c"]);
    }

    #[test]
    fn view_matches_case_insensitively_across_fields() {
        let records = sample();
        assert_eq!(AchievementView::build(&records, "DEGREE").ids(), vec!["a"]);
        assert_eq!(AchievementView::build(&records, "2020-12").ids(), vec!["c"]);
        assert_eq!(AchievementView::build(&records, "marathon ran").ids(), vec!["b"]);
        assert!(AchievementView::build(&records, "nothing").is_empty());
    }

    #[test]
    fn equal_dates_keep_collection_order() {
        let records = vec![
            record("new", "x", None, "2024-01-01"),
            record("old", "y", None, "2024-01-01"),
        ];
        let mut refs: Vec<&Achievement> = records.iter().collect();
        sort_by_date_desc(&mut refs);
        assert_eq!(refs[0].id.as_str(), "new");
        assert_eq!(AchievementView::build(&records, "").ids(), vec!["new", "old"]);
    }

    #[test]
    fn derived_view_recomputes_only_on_change() {
        let records = sample();
        let mut derived = DerivedView::new();

        assert_eq!(derived.view(&records, 1).len(), 3);
        assert_eq!(derived.view(&records, 1).len(), 3);
        assert_eq!(derived.recomputations(), 1);

        derived.set_query("42");
        assert_eq!(derived.view(&records, 1).ids(), vec!["b"]);
        assert_eq!(derived.recomputations(), 2);

        derived.set_query(" 42 ");
        derived.view(&records, 1);
        assert_eq!(derived.recomputations(), 2);

        derived.view(&records, 2);
        assert_eq!(derived.recomputations(), 3);
    }
}
