//! Scope key space and the scoped state container.
//!
//! Every widget instance owns a [`Scope`]; all state reads, writes, and
//! command dispatches are namespaced by it so concurrently mounted instances
//! of the same widget never interfere. A separate "active scope" pointer
//! tracks the single instance that may be open system-wide (e.g. a modal
//! picker) and is managed independently of the per-scope maps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::{
    AlignmentSet, ContextTree, Outcome, PickerState, ReportState, SearchState,
};

use super::cache::{DeepMemo, LruCache};

const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Opaque identifier for one widget instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope(String);

impl Scope {
    /// Wraps a caller-supplied scope string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh unique scope.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The underlying scope string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Scope {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Launch parameters for one widget instance, captured at initialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopeSettings {
    /// Service host.
    pub host: String,

    /// Auth token forwarded to every service call.
    pub jwt: String,

    /// Primary outcome context for this instance.
    pub context_uuid: String,

    /// Artifact type the instance reports on (e.g. "quiz").
    pub artifact_type: String,

    /// Artifact identifier.
    pub artifact_id: String,

    /// Launch context, when the widget was opened from another course.
    pub launch_context_uuid: Option<String>,

    /// Shared contexts whose outcomes may appear in this instance.
    pub shared_context_uuids: Vec<String>,
}

impl ScopeSettings {
    /// Creates settings with the required service coordinates.
    pub fn new(
        host: impl Into<String>,
        jwt: impl Into<String>,
        context_uuid: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            jwt: jwt.into(),
            context_uuid: context_uuid.into(),
            ..Self::default()
        }
    }

    /// Sets the artifact coordinates.
    pub fn with_artifact(mut self, artifact_type: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        self.artifact_type = artifact_type.into();
        self.artifact_id = artifact_id.into();
        self
    }

    /// Sets the launch context.
    pub fn with_launch_context(mut self, context_uuid: impl Into<String>) -> Self {
        self.launch_context_uuid = Some(context_uuid.into());
        self
    }

    /// Sets the shared contexts, in fallback order.
    pub fn with_shared_contexts(mut self, context_uuids: Vec<String>) -> Self {
        self.shared_context_uuids = context_uuids;
        self
    }
}

/// Last surfaced error for a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,

    /// When the error was recorded.
    pub at: DateTime<Utc>,
}

impl ErrorRecord {
    /// Records an error happening now.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Memoization cells attached to one scope.
#[derive(Debug)]
pub struct ScopeCaches {
    /// Hot-path outcome lookups keyed by `context_uuid#outcome_id`.
    pub outcome_details: LruCache<String, Outcome>,

    /// Render-stable search result list.
    pub search_entries: DeepMemo<Vec<Outcome>>,

    /// Render-stable selected-outcome list.
    pub selected_outcomes: DeepMemo<Vec<Outcome>>,
}

impl ScopeCaches {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            outcome_details: LruCache::new(capacity),
            search_entries: DeepMemo::new(),
            selected_outcomes: DeepMemo::new(),
        }
    }
}

impl Default for ScopeCaches {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

/// Full state slice for one widget instance.
#[derive(Debug, Default)]
pub struct ScopeState {
    /// Launch parameters, set by `initialize`.
    pub settings: Option<ScopeSettings>,

    /// Picker lifecycle state.
    pub picker: PickerState,

    /// Selected outcome ids (pre-save), insertion-ordered and deduplicated.
    pub selected_ids: Vec<String>,

    /// Expanded tree node ids.
    pub expanded_ids: HashSet<String>,

    /// Outcome currently shown in the alignment detail view.
    pub viewed_alignment_id: Option<String>,

    /// Persisted alignment set for the artifact.
    pub alignment_set: AlignmentSet,

    /// Whether an alignment load has completed for this scope.
    pub alignment_loaded: bool,

    /// Alignment set id the loaded data corresponds to.
    pub loaded_alignment_set_id: Option<String>,

    /// Partially-loaded outcome trees keyed by context uuid.
    pub trees: HashMap<String, ContextTree>,

    /// Shared contexts available for fallback lookups, in stable order.
    pub shared_context_uuids: Vec<String>,

    /// Search slice.
    pub search: SearchState,

    /// Report slice.
    pub report: ReportState,

    /// Last surfaced error.
    pub last_error: Option<ErrorRecord>,

    /// Scope-local caches.
    pub caches: ScopeCaches,
}

impl ScopeState {
    fn with_cache_capacity(capacity: usize) -> Self {
        Self {
            caches: ScopeCaches::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Tree for a context, or an empty placeholder for unseen contexts.
    pub fn tree(&self, context_uuid: &str) -> Option<&ContextTree> {
        self.trees.get(context_uuid)
    }
}

/// Scoped state container shared by every service.
///
/// Reads against a scope that was never initialized observe empty default
/// state; they never fail. Mutations lazily create the scope entry.
#[derive(Debug)]
pub struct ScopedStore {
    scopes: RwLock<HashMap<Scope, ScopeState>>,
    active_scope: RwLock<Option<Scope>>,
    cache_capacity: usize,
}

impl ScopedStore {
    /// Creates a store whose per-scope LRU caches hold `cache_capacity`
    /// entries.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            scopes: RwLock::new(HashMap::new()),
            active_scope: RwLock::new(None),
            cache_capacity,
        }
    }

    /// Registers launch settings for a scope, creating its state slice.
    pub async fn initialize(&self, scope: &Scope, settings: ScopeSettings) {
        let capacity = self.cache_capacity;
        let mut scopes = self.scopes.write().await;
        let state = scopes
            .entry(scope.clone())
            .or_insert_with(|| ScopeState::with_cache_capacity(capacity));
        state
            .shared_context_uuids
            .clone_from(&settings.shared_context_uuids);
        state.settings = Some(settings);
    }

    /// Reads through a closure; uninitialized scopes observe default state.
    pub async fn read<R>(&self, scope: &Scope, f: impl FnOnce(&ScopeState) -> R) -> R {
        let scopes = self.scopes.read().await;
        match scopes.get(scope) {
            Some(state) => f(state),
            None => f(&ScopeState::default()),
        }
    }

    /// Mutates through a closure, creating the scope entry on first touch.
    pub async fn write<R>(&self, scope: &Scope, f: impl FnOnce(&mut ScopeState) -> R) -> R {
        let capacity = self.cache_capacity;
        let mut scopes = self.scopes.write().await;
        let state = scopes
            .entry(scope.clone())
            .or_insert_with(|| ScopeState::with_cache_capacity(capacity));
        f(state)
    }

    /// Returns a scope's launch settings, failing when it was never
    /// initialized with any.
    pub async fn settings(&self, scope: &Scope) -> EngineResult<ScopeSettings> {
        self.read(scope, |state| state.settings.clone())
            .await
            .ok_or_else(|| EngineError::MissingSettings(scope.to_string()))
    }

    /// Marks a scope as the single active instance.
    pub async fn set_active_scope(&self, scope: &Scope) {
        *self.active_scope.write().await = Some(scope.clone());
    }

    /// Clears the active instance pointer.
    pub async fn clear_active_scope(&self) {
        *self.active_scope.write().await = None;
    }

    /// Currently active scope, if any.
    pub async fn active_scope(&self) -> Option<Scope> {
        self.active_scope.read().await.clone()
    }

    /// Records an error against a scope.
    pub async fn set_error(&self, scope: &Scope, message: impl Into<String>) {
        let record = ErrorRecord::new(message);
        self.write(scope, |state| state.last_error = Some(record))
            .await;
    }

    /// Last error recorded against a scope.
    pub async fn last_error(&self, scope: &Scope) -> Option<ErrorRecord> {
        self.read(scope, |state| state.last_error.clone()).await
    }
}
