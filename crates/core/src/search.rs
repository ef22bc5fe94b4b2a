//! Patch search and year filtering.
//!
//! Both constraints are always evaluated against the full record set, so
//! applying them in either order gives the same result and filtering never
//! reorders records.

use std::collections::BTreeSet;

use crate::patch::PatchRecord;

/// Page-scoped search state.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    all_patches: Vec<PatchRecord>,
    filtered_patches: Vec<PatchRecord>,
    term: String,
    year: String,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the record set and reset the view to a full copy of it.
    ///
    /// Search text and year are dropped along with the old records.
    pub fn set_patches(&mut self, records: Vec<PatchRecord>) {
        self.filtered_patches = records.clone();
        self.all_patches = records;
        self.term.clear();
        self.year.clear();
    }

    /// Case-insensitive substring match against identifier and date.
    pub fn search(&mut self, term: &str) {
        self.term = term.trim().to_lowercase();
        self.apply();
    }

    /// Restrict to records whose date contains `year`. Empty means any year.
    pub fn filter_by_year(&mut self, year: &str) {
        self.year = year.trim().to_string();
        self.apply();
    }

    /// Drop both constraints.
    pub fn clear(&mut self) {
        self.term.clear();
        self.year.clear();
        self.apply();
    }

    pub fn all_patches(&self) -> &[PatchRecord] {
        &self.all_patches
    }

    pub fn filtered_patches(&self) -> &[PatchRecord] {
        &self.filtered_patches
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    /// Whether either constraint is set.
    pub fn is_filtering(&self) -> bool {
        !self.term.is_empty() || !self.year.is_empty()
    }

    /// Distinct years present in the record dates, newest first.
    pub fn years(&self) -> Vec<String> {
        let years: BTreeSet<u32> = self
            .all_patches
            .iter()
            .filter_map(|r| r.year())
            .filter_map(|y| y.parse().ok())
            .collect();
        years.into_iter().rev().map(|y| y.to_string()).collect()
    }

    /// The "latest" record: head of the unfiltered list.
    pub fn latest(&self) -> Option<&PatchRecord> {
        self.all_patches.first()
    }

    fn apply(&mut self) {
        self.filtered_patches = self
            .all_patches
            .iter()
            .filter(|r| matches_term(r, &self.term) && matches_year(r, &self.year))
            .cloned()
            .collect();

        tracing::debug!(
            term = %self.term,
            year = %self.year,
            shown = self.filtered_patches.len(),
            total = self.all_patches.len(),
            "applied patch filters"
        );
    }
}

/// `term` must already be lowercased.
pub fn matches_term(record: &PatchRecord, term: &str) -> bool {
    term.is_empty() || record.patch.to_lowercase().contains(term) || record.date.to_lowercase().contains(term)
}

pub fn matches_year(record: &PatchRecord, year: &str) -> bool {
    year.is_empty() || record.date.contains(year)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<PatchRecord> {
        vec![
            PatchRecord::new("4758", "pages/balance/4758.html", "August 21, 2025"),
            PatchRecord::new("4757", "pages/balance/4757.html", "August 1, 2025"),
            PatchRecord::new("3820", "pages/balance/3820.html", "December 3, 2024"),
            PatchRecord::new("3768", "pages/balance/3768.html", "May 30, 2024"),
            PatchRecord::new("3750", "pages/balance/3750.html", "April 2, 2023"),
        ]
    }

    fn ids(state: &SearchState) -> Vec<&str> {
        state.filtered_patches().iter().map(|r| r.patch.as_str()).collect()
    }

    #[test]
    fn test_set_patches_resets_view() {
        let mut state = SearchState::new();
        state.set_patches(records());
        assert_eq!(state.filtered_patches(), state.all_patches());
        assert_eq!(state.years(), vec!["2025", "2024", "2023"]);
    }

    #[test]
    fn test_set_patches_drops_constraints() {
        let mut state = SearchState::new();
        state.set_patches(records());
        state.search("4758");
        state.set_patches(records());
        assert!(!state.is_filtering());
        assert_eq!(state.filtered_patches().len(), 5);
    }

    #[test]
    fn test_search_case_insensitive_on_date() {
        let mut state = SearchState::new();
        state.set_patches(records());
        state.search("AUGUST");
        assert_eq!(ids(&state), vec!["4758", "4757"]);
    }

    #[test]
    fn test_search_on_identifier() {
        let mut state = SearchState::new();
        state.set_patches(records());
        state.search("37");
        assert_eq!(ids(&state), vec!["3768", "3750"]);
    }

    #[test]
    fn test_empty_search_restores_all() {
        let mut state = SearchState::new();
        state.set_patches(records());
        state.search("4758");
        assert_eq!(state.filtered_patches().len(), 1);
        state.search("");
        assert_eq!(state.filtered_patches(), records().as_slice());
        assert_eq!(state.all_patches().len(), 5);
    }

    #[test]
    fn test_search_and_year_commute() {
        let terms = ["", "a", "47", "may", "zzz"];
        let years = ["", "2025", "2024", "1999"];
        for term in terms {
            for year in years {
                let mut a = SearchState::new();
                a.set_patches(records());
                a.search(term);
                a.filter_by_year(year);

                let mut b = SearchState::new();
                b.set_patches(records());
                b.filter_by_year(year);
                b.search(term);

                let expected: Vec<PatchRecord> = records()
                    .into_iter()
                    .filter(|r| matches_term(r, &term.to_lowercase()) && matches_year(r, year))
                    .collect();
                assert_eq!(a.filtered_patches(), expected.as_slice(), "term={term} year={year}");
                assert_eq!(b.filtered_patches(), expected.as_slice(), "term={term} year={year}");
            }
        }
    }

    #[test]
    fn test_clear() {
        let mut state = SearchState::new();
        state.set_patches(records());
        state.search("august");
        state.filter_by_year("2024");
        assert!(state.filtered_patches().is_empty());
        assert!(state.is_filtering());

        state.clear();
        assert!(!state.is_filtering());
        assert_eq!(state.filtered_patches().len(), 5);
    }

    #[test]
    fn test_latest_is_unfiltered_head() {
        let mut state = SearchState::new();
        state.set_patches(records());
        state.filter_by_year("2024");
        assert_eq!(state.latest().unwrap().patch, "4758");
    }
}
