//! Alignment manager: synchronizes selected outcomes with the persisted
//! alignment set bound to an artifact.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::models::{AlignmentSet, Outcome};
use crate::domain::ports::{AlignmentSetResponse, OutcomeService};
use crate::store::{Scope, ScopedStore};

use super::outcome_tree::OutcomeTreeService;

/// Creates, updates, and removes the alignment set for an artifact.
#[derive(Clone)]
pub struct AlignmentService {
    store: Arc<ScopedStore>,
    service: Arc<dyn OutcomeService>,
    tree: OutcomeTreeService,
}

impl AlignmentService {
    /// Creates the service over the shared store and remote provider.
    pub fn new(
        store: Arc<ScopedStore>,
        service: Arc<dyn OutcomeService>,
        tree: OutcomeTreeService,
    ) -> Self {
        Self { store, service, tree }
    }

    /// Marks an outcome as being viewed and fills in its full detail on
    /// demand.
    ///
    /// When the cached outcome already carries scoring metadata no fetch is
    /// issued; otherwise the detail is fetched and merged into the scope's
    /// tree and hot-lookup cache.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn view_alignment(&self, scope: &Scope, outcome_id: &str) -> Result<()> {
        self.store
            .write(scope, |state| {
                state.viewed_alignment_id = Some(outcome_id.to_string());
            })
            .await;

        if let Some(known) = self.tree.get_outcome(scope, outcome_id).await {
            if known.has_scoring_data() {
                debug!(outcome = outcome_id, "alignment detail already cached");
                return Ok(());
            }
        }

        let settings = self.store.settings(scope).await?;
        let detail = match self
            .service
            .get_outcome(
                &settings.host,
                &settings.jwt,
                outcome_id,
                Some(&settings.context_uuid),
            )
            .await
        {
            Ok(detail) => detail,
            Err(err) => {
                warn!(outcome = outcome_id, error = %err, "alignment detail fetch failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to fetch outcome detail"));
            }
        };

        self.tree.absorb_detail(scope, detail).await;
        Ok(())
    }

    /// Persists the current selection as the artifact's alignment set.
    ///
    /// Each selected id is resolved to a full outcome where one is already
    /// known; the service call then either creates a new alignment set or
    /// upserts into the existing artifact per `create_new`. The returned
    /// guid/outcome list is adopted as the new alignment set.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn save_alignments(&self, scope: &Scope, create_new: bool) -> Result<()> {
        let settings = self.store.settings(scope).await?;
        let selected_ids = self
            .store
            .read(scope, |state| state.selected_ids.clone())
            .await;

        let mut known: HashMap<String, Outcome> = HashMap::new();
        for id in &selected_ids {
            if let Some(outcome) = self.tree.get_outcome(scope, id).await {
                known.insert(id.clone(), outcome);
            }
        }

        let response = if create_new {
            self.service
                .create_alignment_set(
                    &settings.host,
                    &settings.jwt,
                    &selected_ids,
                    settings.launch_context_uuid.as_deref(),
                )
                .await
        } else {
            self.service
                .upsert_artifact(
                    &settings.host,
                    &settings.jwt,
                    &settings.artifact_type,
                    &settings.artifact_id,
                    &selected_ids,
                )
                .await
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "alignment save failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to save alignment set"));
            }
        };

        self.adopt(scope, response, &known).await;
        Ok(())
    }

    /// Removes one outcome from the alignment set.
    ///
    /// With outcomes remaining, a new alignment set is created from the
    /// reduced id list and its response adopted. Removing the last outcome
    /// clears to the empty set locally; an empty alignment set needs no
    /// round trip.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn remove_alignment(&self, scope: &Scope, outcome_id: &str) -> Result<()> {
        let remaining_ids: Vec<String> = self
            .store
            .read(scope, |state| {
                state
                    .alignment_set
                    .outcomes
                    .iter()
                    .filter(|o| o.id != outcome_id)
                    .map(|o| o.id.clone())
                    .collect()
            })
            .await;

        if remaining_ids.is_empty() {
            self.store
                .write(scope, |state| {
                    state.alignment_set = AlignmentSet::empty();
                    state.loaded_alignment_set_id = None;
                    state.alignment_loaded = true;
                })
                .await;
            return Ok(());
        }

        let settings = self.store.settings(scope).await?;
        let response = match self
            .service
            .create_alignment_set(
                &settings.host,
                &settings.jwt,
                &remaining_ids,
                settings.launch_context_uuid.as_deref(),
            )
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(outcome = outcome_id, error = %err, "alignment removal failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to remove alignment"));
            }
        };

        self.adopt(scope, response, &HashMap::new()).await;
        Ok(())
    }

    /// Loads a persisted alignment set by id.
    ///
    /// Idempotent when the requested id already matches the loaded set. A
    /// missing id resolves directly to the empty set without a network call.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn load_alignments(
        &self,
        scope: &Scope,
        alignment_set_id: Option<&str>,
    ) -> Result<()> {
        let (loaded, current_id) = self
            .store
            .read(scope, |state| {
                (state.alignment_loaded, state.loaded_alignment_set_id.clone())
            })
            .await;

        let Some(requested) = alignment_set_id else {
            if !loaded || current_id.is_some() {
                self.store
                    .write(scope, |state| {
                        state.alignment_set = AlignmentSet::empty();
                        state.loaded_alignment_set_id = None;
                        state.alignment_loaded = true;
                    })
                    .await;
            }
            return Ok(());
        };

        if loaded && current_id.as_deref() == Some(requested) {
            debug!(alignment_set = requested, "alignments already loaded");
            return Ok(());
        }

        let settings = self.store.settings(scope).await?;
        let response = match self
            .service
            .get_alignments(&settings.host, &settings.jwt, requested)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(alignment_set = requested, error = %err, "alignment load failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to load alignments"));
            }
        };

        self.adopt(scope, response, &HashMap::new()).await;
        Ok(())
    }

    /// Resolved outcomes for the current selection, preferring known detail
    /// and falling back to id-only stubs. Memoized for render stability.
    pub async fn selected_outcomes(&self, scope: &Scope) -> Arc<Vec<Outcome>> {
        let selected_ids = self
            .store
            .read(scope, |state| state.selected_ids.clone())
            .await;

        let mut resolved = Vec::with_capacity(selected_ids.len());
        for id in &selected_ids {
            match self.tree.get_outcome(scope, id).await {
                Some(outcome) => resolved.push(outcome),
                None => resolved.push(Outcome::new(id.clone(), String::new())),
            }
        }

        self.store
            .write(scope, |state| state.caches.selected_outcomes.memoize(resolved))
            .await
    }

    async fn adopt(
        &self,
        scope: &Scope,
        response: AlignmentSetResponse,
        known: &HashMap<String, Outcome>,
    ) {
        let outcomes: Vec<Outcome> = response
            .outcomes
            .into_iter()
            .map(|outcome| match known.get(&outcome.id) {
                Some(detail) if detail.has_scoring_data() && !outcome.has_scoring_data() => {
                    detail.clone()
                }
                _ => outcome,
            })
            .collect();

        self.store
            .write(scope, |state| {
                state.loaded_alignment_set_id = Some(response.guid.clone());
                state.alignment_loaded = true;
                state.alignment_set = AlignmentSet {
                    guid: Some(response.guid),
                    outcomes,
                };
            })
            .await;
    }
}
