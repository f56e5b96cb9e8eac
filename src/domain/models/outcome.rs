//! Domain models for the hierarchical outcome tree.
//!
//! Outcomes form a partially-loaded graph: a node can be present with its
//! metadata known but its children not yet fetched (`is_partial`). The tree
//! store decides which nodes must be fetched next based on these flags.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of the synthetic wrapper node that parents the server-provided
/// root outcomes of a context.
pub const ROOT_ID: &str = "root";

/// Scoring metadata attached to a fully-detailed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoringMethod {
    /// Mastery calculation algorithm identifier (e.g. "highest", "latest").
    pub algorithm: String,

    /// Percentage score required for mastery.
    pub mastery_percent: f64,

    /// Maximum points attainable against this outcome.
    pub points_possible: f64,
}

/// One node in the outcome tree.
///
/// A node with `has_children == false` and no `child_ids` is a leaf.
/// `is_partial == true` means the node's metadata is known but its children
/// have not been fetched yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Unique outcome identifier within a context.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Rich description, empty when not provided by the service.
    #[serde(default)]
    pub description: String,

    /// Child outcome ids, `None` when children are unknown.
    #[serde(default)]
    pub child_ids: Option<Vec<String>>,

    /// Whether the service reports this node as a group.
    #[serde(default)]
    pub has_children: bool,

    /// Whether the node's children are still unfetched.
    #[serde(default)]
    pub is_partial: bool,

    /// Scoring metadata, present only after a full-detail fetch.
    #[serde(default)]
    pub scoring_method: Option<ScoringMethod>,
}

impl Outcome {
    /// Creates a minimal outcome with just an id and title.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            child_ids: None,
            has_children: false,
            is_partial: false,
            scoring_method: None,
        }
    }

    /// Synthesizes the root wrapper node from the server-provided root ids.
    pub fn root_wrapper(root_ids: Vec<String>) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            title: String::new(),
            description: String::new(),
            has_children: !root_ids.is_empty(),
            child_ids: Some(root_ids),
            is_partial: false,
            scoring_method: None,
        }
    }

    /// A node is a group when the service flags it as having children or it
    /// already carries a non-empty child list.
    pub fn is_group(&self) -> bool {
        self.has_children
            || self
                .child_ids
                .as_ref()
                .is_some_and(|ids| !ids.is_empty())
    }

    /// Whether full scoring metadata has been fetched for this node.
    pub fn has_scoring_data(&self) -> bool {
        self.scoring_method.is_some()
    }
}

/// Partially-loaded outcome tree for one context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextTree {
    /// Flat node map keyed by outcome id.
    pub outcomes: HashMap<String, Outcome>,

    /// Server-provided root-level outcome ids.
    pub root_ids: Vec<String>,
}

impl ContextTree {
    /// Whether any outcome has been loaded for this context.
    pub fn is_loaded(&self) -> bool {
        !self.outcomes.is_empty()
    }

    /// Computes the minimal set of node ids that must be fetched to expand
    /// `id`.
    ///
    /// Returns `[id]` when the node is missing or marked partial. Otherwise
    /// returns the subset of its children that are groups and still partial.
    /// Leaf children never need loading, so they are excluded; fetching a
    /// non-group child is wasted work.
    pub fn children_to_load(&self, id: &str) -> Vec<String> {
        let Some(node) = self.outcomes.get(id) else {
            return vec![id.to_string()];
        };
        if node.is_partial {
            return vec![id.to_string()];
        }

        let Some(child_ids) = &node.child_ids else {
            return Vec::new();
        };

        child_ids
            .iter()
            .filter(|child_id| {
                self.outcomes
                    .get(*child_id)
                    .is_some_and(|child| child.is_group() && child.is_partial)
            })
            .cloned()
            .collect()
    }

    /// Merges fetched outcomes into the tree.
    ///
    /// Existing fully-loaded nodes are never downgraded by a partial copy of
    /// the same node arriving alongside a sibling fetch; everything else is
    /// replaced by the fresher data.
    pub fn merge(&mut self, fetched: Vec<Outcome>) {
        for outcome in fetched {
            match self.outcomes.get(&outcome.id) {
                Some(existing) if !existing.is_partial && outcome.is_partial => {}
                _ => {
                    self.outcomes.insert(outcome.id.clone(), outcome);
                }
            }
        }
    }

    /// Looks up a node by id.
    pub fn get(&self, id: &str) -> Option<&Outcome> {
        self.outcomes.get(id)
    }
}
