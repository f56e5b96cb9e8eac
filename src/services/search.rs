//! Debounced search controller.
//!
//! Rapid text/page changes within the debounce window coalesce into a single
//! outstanding service call carrying the latest arguments. Superseded calls
//! resolve without side effects, and a completed call commits its results
//! only if the scope still wants the query it answered (stale-response
//! guard). Cancellation is advisory: a superseded in-flight request is not
//! aborted, its effect is simply never applied.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::domain::models::Outcome;
use crate::domain::ports::OutcomeService;
use crate::store::{Scope, ScopedStore};

/// How a search dispatch resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDispatch {
    /// The call won its debounce window and its results were committed.
    Applied,
    /// A later call within the window superseded this one before it fired.
    Superseded,
    /// The call fired, but the scope's query changed while the request was
    /// in flight; the response was discarded. Correct operation, not an
    /// error.
    Stale,
}

/// Coalesces search input into debounced, stale-guarded service calls.
pub struct SearchController {
    store: Arc<ScopedStore>,
    service: Arc<dyn OutcomeService>,
    window: Duration,
    pending: Mutex<HashMap<String, u64>>,
    counter: AtomicU64,
}

impl SearchController {
    /// Creates the controller with the configured debounce window.
    pub fn new(
        store: Arc<ScopedStore>,
        service: Arc<dyn OutcomeService>,
        debounce_ms: u64,
    ) -> Self {
        Self {
            store,
            service,
            window: Duration::from_millis(debounce_ms),
            pending: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Debounced text search.
    ///
    /// Immediately records the requested text/page on the scope (marking the
    /// slice loading), then waits out the debounce window. Only the latest
    /// call per scope survives the window and issues the underlying service
    /// call; earlier callers resolve with [`SearchDispatch::Superseded`].
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn search(&self, scope: &Scope, text: &str, page: u32) -> Result<SearchDispatch> {
        self.store
            .write(scope, |state| {
                state.search.text = text.to_string();
                state.search.page = page;
                state.search.is_loading = true;
            })
            .await;

        let token = self.counter.fetch_add(1, Ordering::SeqCst);
        self.register(scope, token).await;

        tokio::time::sleep(self.window).await;

        if !self.still_pending(scope, token).await {
            debug!(text, page, "search superseded within debounce window");
            return Ok(SearchDispatch::Superseded);
        }

        let settings = match self.store.settings(scope).await {
            Ok(settings) => settings,
            Err(err) => {
                self.store
                    .write(scope, |state| state.search.is_loading = false)
                    .await;
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.into());
            }
        };
        let response = match self
            .service
            .get_search_results(&settings.host, &settings.jwt, text, page, &settings.context_uuid)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(text, page, error = %err, "search request failed");
                self.store
                    .write(scope, |state| state.search.is_loading = false)
                    .await;
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to fetch search results"));
            }
        };

        let dispatch = self
            .store
            .write(scope, |state| {
                if !state.search.still_wants(text, page) {
                    return SearchDispatch::Stale;
                }
                state.search.entries = response.outcomes;
                state.search.matches = response.matches;
                state.search.total = response.total;
                state.search.is_loading = false;
                SearchDispatch::Applied
            })
            .await;

        if dispatch == SearchDispatch::Stale {
            debug!(text, page, "discarding stale search response");
        }
        Ok(dispatch)
    }

    /// Non-debounced flat listing for browse mode (empty query), with the
    /// same stale-response guard on the page number.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn list(&self, scope: &Scope, page: u32) -> Result<SearchDispatch> {
        self.store
            .write(scope, |state| {
                state.search.text.clear();
                state.search.page = page;
                state.search.is_loading = true;
            })
            .await;

        let settings = match self.store.settings(scope).await {
            Ok(settings) => settings,
            Err(err) => {
                self.store
                    .write(scope, |state| state.search.is_loading = false)
                    .await;
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.into());
            }
        };
        let response = match self
            .service
            .list_outcomes(&settings.host, &settings.jwt, page, &settings.context_uuid)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(page, error = %err, "outcome listing failed");
                self.store
                    .write(scope, |state| state.search.is_loading = false)
                    .await;
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to list outcomes"));
            }
        };

        Ok(self
            .store
            .write(scope, |state| {
                if !state.search.still_wants("", page) {
                    return SearchDispatch::Stale;
                }
                state.search.entries = response.outcomes;
                state.search.matches.clear();
                state.search.total = response.total;
                state.search.is_loading = false;
                SearchDispatch::Applied
            })
            .await)
    }

    /// Records new query text without dispatching a fetch. A text change
    /// restarts paging from page 1.
    pub async fn update_search_text(&self, scope: &Scope, text: &str) {
        self.store
            .write(scope, |state| {
                state.search.text = text.to_string();
                state.search.page = 1;
            })
            .await;
    }

    /// Records a new result page without dispatching a fetch.
    pub async fn update_search_page(&self, scope: &Scope, page: u32) {
        self.store
            .write(scope, |state| state.search.page = page)
            .await;
    }

    /// Committed search entries, memoized so an unchanged result list hands
    /// back the same shared allocation.
    pub async fn search_entries(&self, scope: &Scope) -> Arc<Vec<Outcome>> {
        self.store
            .write(scope, |state| {
                let entries = state.search.entries.clone();
                state.caches.search_entries.memoize(entries)
            })
            .await
    }

    async fn register(&self, scope: &Scope, token: u64) {
        self.pending
            .lock()
            .await
            .insert(scope.as_str().to_string(), token);
    }

    async fn still_pending(&self, scope: &Scope, token: u64) -> bool {
        self.pending.lock().await.get(scope.as_str()) == Some(&token)
    }
}
