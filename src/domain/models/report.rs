//! Domain models for the paginated student mastery report.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::outcome::Outcome;

/// One student in the report roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    /// Stable student identifier.
    pub uuid: String,

    /// Display name.
    #[serde(default)]
    pub full_name: String,
}

/// Aggregate mastery statistics for one outcome across a set of students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Rollup {
    /// Outcome the statistics aggregate over.
    pub outcome_id: String,

    /// Number of students with a result.
    pub count: u32,

    /// Number of students at or above mastery.
    pub mastery_count: u32,

    /// Mean score across scored students.
    pub average_score: f64,

    /// Number of child artifacts contributing to the aggregate.
    pub child_artifact_count: u32,

    /// Whether the outcome is assessed through an item bank.
    pub uses_bank: bool,
}

/// One student's score against one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutcomeResult {
    /// Student identifier.
    pub user_uuid: String,

    /// Score as a fraction of points possible.
    pub percent_score: f64,

    /// Points earned.
    pub points: f64,

    /// Points attainable.
    pub points_possible: f64,

    /// Attempt number, when the service reports one.
    #[serde(default)]
    pub attempt: Option<u32>,
}

/// Lifecycle of the "load all remaining pages" bulk operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemainingPagesStatus {
    /// No bulk load has been requested.
    #[default]
    NotFetching,
    /// A bulk load is running; re-entrant starts are no-ops.
    InProgress,
    /// Every page has been fetched.
    Completed,
    /// The bulk load failed partway; a retry resumes from the missing pages.
    Error,
}

/// Report slice of a widget scope's state.
///
/// `users` is keyed by page number so already-fetched pages survive a failed
/// bulk load and are never re-requested on retry. `results` is keyed by
/// outcome id, then student uuid; merges are additive and never clobber
/// results already seen for unrelated outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportState {
    /// Currently displayed page number.
    pub page_number: u32,

    /// Advisory re-entrancy guard for `load_page`.
    pub page_loading: bool,

    /// Page size reported by the service.
    pub per_page: u32,

    /// Total student count reported by the service.
    pub total: u32,

    /// Roster pages fetched so far, keyed by page number.
    pub users: HashMap<u32, Vec<User>>,

    /// Rollup rows for the whole artifact.
    pub rollups: Vec<Rollup>,

    /// Flat outcome map derived from the rollup rows.
    pub outcomes: HashMap<String, Outcome>,

    /// Per-outcome, per-student results.
    pub results: HashMap<String, HashMap<String, OutcomeResult>>,

    /// Bulk-load lifecycle state.
    pub remaining_pages: RemainingPagesStatus,
}

impl ReportState {
    /// Total number of pages implied by `total` and `per_page`, zero until a
    /// first page has recorded the metadata.
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }

    /// Page numbers not yet present in the roster map, ascending.
    pub fn missing_pages(&self) -> Vec<u32> {
        (1..=self.total_pages())
            .filter(|n| !self.users.contains_key(n))
            .collect()
    }

    /// All known student uuids across every fetched page, ascending by page.
    pub fn known_user_uuids(&self) -> Vec<String> {
        let mut pages: Vec<&u32> = self.users.keys().collect();
        pages.sort_unstable();
        pages
            .into_iter()
            .flat_map(|n| self.users[n].iter().map(|u| u.uuid.clone()))
            .collect()
    }

    /// Merges per-outcome results additively, never discarding results
    /// already seen for other outcomes or other students.
    pub fn merge_results(&mut self, outcome_id: &str, rows: Vec<OutcomeResult>) {
        let per_user = self.results.entry(outcome_id.to_string()).or_default();
        for row in rows {
            per_user.insert(row.user_uuid.clone(), row);
        }
    }
}
