//! Domain model for the per-scope search slice.

use serde::{Deserialize, Serialize};

use super::outcome::Outcome;

/// Search slice of a widget scope's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    /// Current query text; empty means browse mode.
    pub text: String,

    /// Requested result page, 1-based.
    pub page: u32,

    /// Total match count reported by the service.
    pub total: u32,

    /// Whether a search request is outstanding.
    pub is_loading: bool,

    /// Result outcomes for the committed query.
    pub entries: Vec<Outcome>,

    /// Ids of entries the service flagged as direct text matches.
    pub matches: Vec<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            text: String::new(),
            page: 1,
            total: 0,
            is_loading: false,
            entries: Vec::new(),
            matches: Vec::new(),
        }
    }
}

impl SearchState {
    /// Whether a completed request for (`text`, `page`) is still what this
    /// scope is asking for. Stale responses must be discarded, not applied.
    pub fn still_wants(&self, text: &str, page: u32) -> bool {
        self.text == text && self.page == page
    }
}
