//! Outcome picker state machine.
//!
//! Drives the `Closed -> Loading -> Choosing -> Saving -> Complete`
//! lifecycle, the pre-save selection set, and expansion tracking for the
//! picker tree.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::models::PickerState;
use crate::store::{Scope, ScopedStore};

use super::alignment::AlignmentService;
use super::outcome_tree::OutcomeTreeService;

/// Commands and selectors for one picker widget's lifecycle.
#[derive(Clone)]
pub struct PickerService {
    store: Arc<ScopedStore>,
    tree: OutcomeTreeService,
    alignment: AlignmentService,
}

impl PickerService {
    /// Creates the service over the shared store and sibling services.
    pub fn new(
        store: Arc<ScopedStore>,
        tree: OutcomeTreeService,
        alignment: AlignmentService,
    ) -> Self {
        Self {
            store,
            tree,
            alignment,
        }
    }

    /// Opens the picker: marks this scope active and enters `Loading`.
    ///
    /// A picker already in `Choosing` stays where it is; reopening must not
    /// restart the load.
    pub async fn open(&self, scope: &Scope) {
        let already_choosing = self
            .store
            .read(scope, |state| state.picker == PickerState::Choosing)
            .await;
        if already_choosing {
            debug!(scope = %scope, "picker already choosing, open is a no-op");
            return;
        }
        self.store.set_active_scope(scope).await;
        self.store
            .write(scope, |state| state.picker = PickerState::Loading)
            .await;
    }

    /// Runs the picker's initial load: registers the shared contexts, loads
    /// root outcomes, and seeds the selection from the currently aligned
    /// outcomes, then enters `Choosing`.
    ///
    /// Idempotent when already `Choosing`. On failure the picker stays in
    /// `Loading` with the error surfaced to scoped error state; the caller
    /// decides whether to retry or close.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn load_outcome_picker(&self, scope: &Scope) -> Result<()> {
        let already_choosing = self
            .store
            .read(scope, |state| state.picker == PickerState::Choosing)
            .await;
        if already_choosing {
            return Ok(());
        }

        let settings = self.store.settings(scope).await?;
        self.store
            .write(scope, |state| {
                state
                    .shared_context_uuids
                    .clone_from(&settings.shared_context_uuids);
            })
            .await;

        self.tree.load_root_outcomes(scope, None).await?;

        self.store
            .write(scope, |state| {
                state.selected_ids = state.alignment_set.outcome_ids();
                state.picker = PickerState::Choosing;
            })
            .await;
        Ok(())
    }

    /// Persists the selection and completes the picker.
    ///
    /// Transitions to `Saving` first; success adopts the new alignment set
    /// and enters `Complete`. Failure reverts to `Choosing` so the user can
    /// adjust and retry, with the error surfaced to scoped error state.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn save_outcome_picker_alignments(
        &self,
        scope: &Scope,
        create_new: bool,
    ) -> Result<()> {
        self.store
            .write(scope, |state| state.picker = PickerState::Saving)
            .await;

        match self.alignment.save_alignments(scope, create_new).await {
            Ok(()) => {
                self.store
                    .write(scope, |state| state.picker = PickerState::Complete)
                    .await;
                Ok(())
            }
            Err(err) => {
                self.store
                    .write(scope, |state| state.picker = PickerState::Choosing)
                    .await;
                Err(err)
            }
        }
    }

    /// Closes the picker from any state; clears the active-scope pointer
    /// when it points at this scope.
    pub async fn close(&self, scope: &Scope) {
        self.store
            .write(scope, |state| state.picker = PickerState::Closed)
            .await;
        if self.store.active_scope().await.as_ref() == Some(scope) {
            self.store.clear_active_scope().await;
        }
    }

    /// Hard reset to defaults: closed, empty selection, empty expansion set.
    pub async fn reset(&self, scope: &Scope) {
        self.store
            .write(scope, |state| {
                state.picker = PickerState::Closed;
                state.selected_ids.clear();
                state.expanded_ids.clear();
            })
            .await;
    }

    /// Adds ids to the selection (set union, insertion-ordered, no
    /// duplicates).
    pub async fn select_outcome_ids(&self, scope: &Scope, ids: &[String]) {
        self.store
            .write(scope, |state| {
                for id in ids {
                    if !state.selected_ids.contains(id) {
                        state.selected_ids.push(id.clone());
                    }
                }
            })
            .await;
    }

    /// Removes ids from the selection; absent ids are ignored.
    pub async fn deselect_outcome_ids(&self, scope: &Scope, ids: &[String]) {
        self.store
            .write(scope, |state| {
                state.selected_ids.retain(|id| !ids.contains(id));
            })
            .await;
    }

    /// Replaces the selection wholesale.
    pub async fn replace_selected_ids(&self, scope: &Scope, ids: Vec<String>) {
        self.store
            .write(scope, |state| {
                let mut deduped = Vec::with_capacity(ids.len());
                for id in ids {
                    if !deduped.contains(&id) {
                        deduped.push(id);
                    }
                }
                state.selected_ids = deduped;
            })
            .await;
    }

    /// Toggles expansion membership for each id. With `force_open` the ids
    /// are only ever added, so a node the user is drilling into cannot
    /// auto-collapse.
    pub async fn toggle_expanded_ids(&self, scope: &Scope, ids: &[String], force_open: bool) {
        self.store
            .write(scope, |state| {
                for id in ids {
                    if force_open {
                        state.expanded_ids.insert(id.clone());
                    } else if !state.expanded_ids.remove(id) {
                        state.expanded_ids.insert(id.clone());
                    }
                }
            })
            .await;
    }

    /// Current picker lifecycle state.
    pub async fn picker_state(&self, scope: &Scope) -> PickerState {
        self.store.read(scope, |state| state.picker).await
    }

    /// Current selection, in insertion order.
    pub async fn selected_ids(&self, scope: &Scope) -> Vec<String> {
        self.store
            .read(scope, |state| state.selected_ids.clone())
            .await
    }

    /// Whether a node is expanded.
    pub async fn is_expanded(&self, scope: &Scope, id: &str) -> bool {
        self.store
            .read(scope, |state| state.expanded_ids.contains(id))
            .await
    }
}
