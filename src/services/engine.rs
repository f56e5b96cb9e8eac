//! Engine facade wiring the scoped store and the per-concern services.

use std::sync::Arc;

use crate::domain::models::EngineConfig;
use crate::domain::ports::OutcomeService;
use crate::store::{Scope, ScopeSettings, ScopedStore};

use super::alignment::AlignmentService;
use super::outcome_tree::OutcomeTreeService;
use super::picker::PickerService;
use super::report::ReportService;
use super::search::SearchController;

/// One engine instance serving any number of widget scopes.
///
/// The store is the only shared mutable state; every service holds a handle
/// to it and to the remote provider. Presentation code talks exclusively to
/// the services' scoped commands and selectors.
pub struct Engine {
    /// Scoped state container shared by every service.
    pub store: Arc<ScopedStore>,

    /// Outcome tree loading and resolution.
    pub tree: OutcomeTreeService,

    /// Picker lifecycle and selection.
    pub picker: PickerService,

    /// Alignment set synchronization.
    pub alignment: AlignmentService,

    /// Debounced search.
    pub search: SearchController,

    /// Paginated report loading.
    pub report: ReportService,
}

impl Engine {
    /// Wires up an engine over a remote provider with the given
    /// configuration.
    pub fn new(service: Arc<dyn OutcomeService>, config: &EngineConfig) -> Self {
        let store = Arc::new(ScopedStore::new(config.outcome_cache_capacity));
        let tree = OutcomeTreeService::new(Arc::clone(&store), Arc::clone(&service));
        let alignment =
            AlignmentService::new(Arc::clone(&store), Arc::clone(&service), tree.clone());
        let picker = PickerService::new(Arc::clone(&store), tree.clone(), alignment.clone());
        let search = SearchController::new(
            Arc::clone(&store),
            Arc::clone(&service),
            config.debounce_ms,
        );
        let report = ReportService::new(Arc::clone(&store), Arc::clone(&service));

        Self {
            store,
            tree,
            picker,
            alignment,
            search,
            report,
        }
    }

    /// Registers a new widget instance and returns its scope.
    pub async fn mount(&self, settings: ScopeSettings) -> Scope {
        let scope = Scope::generate();
        self.store.initialize(&scope, settings).await;
        scope
    }

    /// Registers a widget instance under a caller-chosen scope.
    pub async fn mount_as(&self, scope: &Scope, settings: ScopeSettings) {
        self.store.initialize(scope, settings).await;
    }
}
