//! Keyboard navigation over the merged suggestion list.

use crate::{model::SearchCandidate, resolver::Suggestions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Up,
    Down,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavOutcome {
    Moved(usize),
    Committed(SearchCandidate),
    Dismissed,
    Ignored,
}

/// One linear index across places, cities and stations. Moves clamp at both
/// ends; there is no wraparound.
#[derive(Debug, Clone, Default)]
pub struct SuggestionNavigator {
    suggestions: Suggestions,
    selected: Option<usize>,
    open: bool,
}

impl SuggestionNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the list (e.g. after a debounced search); selection resets.
    pub fn show(&mut self, suggestions: Suggestions) {
        self.open = !suggestions.is_empty();
        self.suggestions = suggestions;
        self.selected = None;
    }

    pub fn suggestions(&self) -> &Suggestions {
        &self.suggestions
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn handle(&mut self, key: NavKey) -> NavOutcome {
        if !self.open {
            return NavOutcome::Ignored;
        }

        match key {
            NavKey::Down => {
                let last = self.suggestions.len().saturating_sub(1);
                let next = self.selected.map_or(0, |index| (index + 1).min(last));
                self.selected = Some(next);
                NavOutcome::Moved(next)
            }
            NavKey::Up => match self.selected {
                None => NavOutcome::Ignored,
                Some(index) => {
                    let previous = index.saturating_sub(1);
                    self.selected = Some(previous);
                    NavOutcome::Moved(previous)
                }
            },
            NavKey::Enter => match self.selected {
                None => NavOutcome::Ignored,
                Some(index) => match self.commit_at(index) {
                    Some(candidate) => NavOutcome::Committed(candidate),
                    None => NavOutcome::Ignored,
                },
            },
            NavKey::Escape => {
                self.close();
                NavOutcome::Dismissed
            }
        }
    }

    /// Direct pick (click) of a row; closes the list.
    pub fn commit_at(&mut self, index: usize) -> Option<SearchCandidate> {
        let candidate = self.suggestions.get(index)?;
        self.close();
        Some(candidate)
    }

    fn close(&mut self) {
        self.open = false;
        self.selected = None;
    }
}
