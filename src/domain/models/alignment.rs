//! Domain models for alignment sets.
//!
//! An alignment set is the persisted binding between an artifact (e.g. a
//! quiz) and the outcomes it measures.

use serde::{Deserialize, Serialize};

use super::outcome::Outcome;

/// Persisted binding between an artifact and its measured outcomes.
///
/// `guid == None` means no alignment set exists yet (zero outcomes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSet {
    /// Server-assigned identifier, `None` while the set is empty/unsaved.
    pub guid: Option<String>,

    /// Outcomes bound to the artifact, in server order.
    pub outcomes: Vec<Outcome>,
}

impl AlignmentSet {
    /// The empty alignment set: no guid, no outcomes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Ids of the aligned outcomes, in order.
    pub fn outcome_ids(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.id.clone()).collect()
    }

    /// Looks up an aligned outcome by id.
    pub fn find(&self, id: &str) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    /// Whether the set contains no outcomes.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
