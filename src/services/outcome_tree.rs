//! Outcome tree service: lazy loading of the hierarchical outcome graph.
//!
//! The tree is fetched a few nodes at a time. [`ContextTree::children_to_load`]
//! decides the minimal fetch set; this service executes the fetches, merges
//! responses into scope state, and resolves outcome reads across contexts.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::models::{ContextTree, Outcome};
use crate::domain::ports::OutcomeService;
use crate::store::{outcome_cache_key, Scope, ScopeState, ScopedStore};

/// Loads and resolves the partially-loaded outcome tree for each scope.
#[derive(Clone)]
pub struct OutcomeTreeService {
    store: Arc<ScopedStore>,
    service: Arc<dyn OutcomeService>,
}

impl OutcomeTreeService {
    /// Creates the service over the shared store and remote provider.
    pub fn new(store: Arc<ScopedStore>, service: Arc<dyn OutcomeService>) -> Self {
        Self { store, service }
    }

    /// Minimal set of node ids that must be fetched to expand `id` within a
    /// context. `[id]` when the context has never been loaded.
    pub async fn children_to_load(&self, scope: &Scope, context_uuid: &str, id: &str) -> Vec<String> {
        self.store
            .read(scope, |state| {
                state
                    .tree(context_uuid)
                    .map_or_else(|| vec![id.to_string()], |tree| tree.children_to_load(id))
            })
            .await
    }

    /// Loads the root-level outcomes for a context.
    ///
    /// Idempotent: a context that already has any outcome loaded issues no
    /// service call. On success the synthetic root wrapper node is stored
    /// alongside the fetched nodes.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn load_root_outcomes(&self, scope: &Scope, context_uuid: Option<&str>) -> Result<()> {
        let settings = self.store.settings(scope).await?;
        let context = context_uuid.unwrap_or(&settings.context_uuid).to_string();

        let already_loaded = self
            .store
            .read(scope, |state| {
                state.tree(&context).is_some_and(ContextTree::is_loaded)
            })
            .await;
        if already_loaded {
            debug!(context = %context, "root outcomes already loaded");
            return Ok(());
        }

        let response = match self
            .service
            .load_outcomes(&settings.host, &settings.jwt, &context, None)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(context = %context, error = %err, "root outcome load failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to load root outcomes"));
            }
        };

        self.store
            .write(scope, |state| {
                let tree = state.trees.entry(context.clone()).or_default();
                tree.merge(response.outcomes);
                tree.root_ids.clone_from(&response.root_ids);
                let root = Outcome::root_wrapper(response.root_ids);
                tree.outcomes.insert(root.id.clone(), root);
            })
            .await;

        Ok(())
    }

    /// Fetches the children needed to expand `id`, merging them into the
    /// existing tree. Resolves immediately when nothing needs loading.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn load_more_outcomes(
        &self,
        scope: &Scope,
        id: &str,
        context_uuid: Option<&str>,
    ) -> Result<()> {
        let settings = self.store.settings(scope).await?;
        let context = context_uuid.unwrap_or(&settings.context_uuid).to_string();

        let ids = self.children_to_load(scope, &context, id).await;
        if ids.is_empty() {
            return Ok(());
        }

        let response = match self
            .service
            .load_outcomes(&settings.host, &settings.jwt, &context, Some(&ids))
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(context = %context, node = id, error = %err, "outcome expansion failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to load outcome children"));
            }
        };

        self.store
            .write(scope, |state| {
                state
                    .trees
                    .entry(context)
                    .or_default()
                    .merge(response.outcomes);
            })
            .await;

        Ok(())
    }

    /// Resolves an outcome by id across every context the scope can see.
    ///
    /// Lookup order: the scope's own context, the alignment set's known
    /// outcomes, the launch context, then the shared contexts in stable
    /// first-match order. Outcomes that already appeared in cross-context
    /// reports resolve through the later tiers.
    pub async fn get_outcome(&self, scope: &Scope, id: &str) -> Option<Outcome> {
        self.store
            .write(scope, |state| {
                let own_context = state
                    .settings
                    .as_ref()
                    .map(|s| s.context_uuid.clone())
                    .unwrap_or_default();

                let cache_key = outcome_cache_key(&own_context, id);
                if let Some(hit) = state.caches.outcome_details.get(&cache_key) {
                    return Some(hit);
                }

                let (resolved, own_tier) = Self::resolve_outcome(state, &own_context, id)?;
                // Only detail-bearing nodes resolved from the scope's own
                // context are worth pinning; partial copies would go stale as
                // soon as their children load, and a fallback-tier hit must
                // not shadow a later own-context load of the same id.
                if own_tier && resolved.has_scoring_data() {
                    state.caches.outcome_details.put(cache_key, resolved.clone());
                }
                Some(resolved)
            })
            .await
    }

    /// Resolves an outcome, also reporting whether it came from the scope's
    /// own context (the only tier eligible for caching).
    fn resolve_outcome(state: &ScopeState, own_context: &str, id: &str) -> Option<(Outcome, bool)> {
        if let Some(outcome) = state.tree(own_context).and_then(|t| t.get(id)) {
            return Some((outcome.clone(), true));
        }
        if let Some(outcome) = state.alignment_set.find(id) {
            return Some((outcome.clone(), false));
        }
        let launch = state
            .settings
            .as_ref()
            .and_then(|s| s.launch_context_uuid.clone());
        if let Some(launch_context) = launch {
            if let Some(outcome) = state.tree(&launch_context).and_then(|t| t.get(id)) {
                return Some((outcome.clone(), false));
            }
        }
        for context in &state.shared_context_uuids {
            if let Some(outcome) = state.tree(context).and_then(|t| t.get(id)) {
                return Some((outcome.clone(), false));
            }
        }
        None
    }

    /// Merges a fully-detailed outcome into the scope's own context tree and
    /// the hot-lookup cache.
    pub(crate) async fn absorb_detail(&self, scope: &Scope, outcome: Outcome) {
        self.store
            .write(scope, |state| {
                let own_context = state
                    .settings
                    .as_ref()
                    .map(|s| s.context_uuid.clone())
                    .unwrap_or_default();
                if outcome.has_scoring_data() {
                    let key = outcome_cache_key(&own_context, &outcome.id);
                    state.caches.outcome_details.put(key, outcome.clone());
                }
                state
                    .trees
                    .entry(own_context)
                    .or_default()
                    .merge(vec![outcome]);
            })
            .await;
    }

    /// Root-level outcome ids for a context, empty until loaded.
    pub async fn root_ids(&self, scope: &Scope, context_uuid: &str) -> Vec<String> {
        self.store
            .read(scope, |state| {
                state
                    .tree(context_uuid)
                    .map(|t| t.root_ids.clone())
                    .unwrap_or_default()
            })
            .await
    }
}
