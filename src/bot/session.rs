//! Per-member search sessions.
//!
//! Holds each member's last search results so `/choose <n>` can refer back
//! to them. Overwritten by the next search, lost on restart; nothing here
//! needs persistence.

use crate::domain::WorkSummary;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct SearchSessions {
    results: DashMap<i64, Vec<WorkSummary>>,
}

impl SearchSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a member's search results
    pub fn set(&self, member_id: i64, results: Vec<WorkSummary>) {
        self.results.insert(member_id, results);
    }

    /// The member's last results, if they have searched
    pub fn get(&self, member_id: i64) -> Option<Vec<WorkSummary>> {
        self.results.get(&member_id).map(|r| r.clone())
    }

    /// Pick result `choice` (1-based) from the member's last search
    pub fn choose(&self, member_id: i64, choice: i64) -> ChoiceOutcome {
        let Some(results) = self.results.get(&member_id) else {
            return ChoiceOutcome::NoSearch;
        };
        if choice < 1 || choice as usize > results.len() {
            return ChoiceOutcome::OutOfRange {
                max: results.len(),
            };
        }
        ChoiceOutcome::Chosen(results[choice as usize - 1].clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    /// Member has not searched yet
    NoSearch,
    /// Choice outside 1..=max
    OutOfRange { max: usize },
    Chosen(WorkSummary),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work(id: &str) -> WorkSummary {
        WorkSummary {
            id: id.to_string(),
            title: id.to_uppercase(),
            subtitle: None,
            authors: vec![],
            categories: vec![],
            description: None,
            page_count: None,
            info_link: format!("https://books.google.com/books?id={}", id),
            image_link: None,
        }
    }

    #[test]
    fn choose_without_search() {
        let sessions = SearchSessions::new();
        assert_eq!(sessions.choose(1, 1), ChoiceOutcome::NoSearch);
    }

    #[test]
    fn choose_is_one_based_and_bounded() {
        let sessions = SearchSessions::new();
        sessions.set(1, vec![work("a"), work("b")]);

        assert_eq!(sessions.choose(1, 1), ChoiceOutcome::Chosen(work("a")));
        assert_eq!(sessions.choose(1, 2), ChoiceOutcome::Chosen(work("b")));
        assert_eq!(sessions.choose(1, 0), ChoiceOutcome::OutOfRange { max: 2 });
        assert_eq!(sessions.choose(1, 3), ChoiceOutcome::OutOfRange { max: 2 });
    }

    #[test]
    fn next_search_overwrites_the_last() {
        let sessions = SearchSessions::new();
        sessions.set(1, vec![work("a")]);
        sessions.set(1, vec![work("b"), work("c")]);
        assert_eq!(sessions.get(1).unwrap().len(), 2);
        assert_eq!(sessions.choose(1, 1), ChoiceOutcome::Chosen(work("b")));
    }

    #[test]
    fn sessions_are_per_member() {
        let sessions = SearchSessions::new();
        sessions.set(1, vec![work("a")]);
        assert_eq!(sessions.choose(2, 1), ChoiceOutcome::NoSearch);
    }
}
