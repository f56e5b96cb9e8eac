//! Paginated report loader.
//!
//! Loads one report page (students, rollups, per-outcome results) and
//! supports a resumable "load all remaining pages" bulk operation. Pages
//! already fetched are preserved in the roster map and never re-requested
//! after a partial failure; result merges are additive and never clobber
//! results already seen for other outcomes.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::models::{
    Outcome, OutcomeResult, RemainingPagesStatus, ReportState, Rollup, User,
};
use crate::domain::ports::{OutcomeService, ResultRow, UsersPage};
use crate::store::{Scope, ScopeSettings, ScopedStore};

/// Caller-supplied replacement for the roster fetch.
///
/// Lets a consumer bring its own user source (e.g. a section-filtered
/// roster) while still delegating rollup and result loading to the engine.
#[async_trait]
pub trait UserPageLoader: Send + Sync {
    /// Fetches one roster page.
    async fn load_users(&self, page: u32) -> Result<UsersPage>;
}

/// Loads report pages and bulk-resumes the remaining roster.
#[derive(Clone)]
pub struct ReportService {
    store: Arc<ScopedStore>,
    service: Arc<dyn OutcomeService>,
}

impl ReportService {
    /// Creates the service over the shared store and remote provider.
    pub fn new(store: Arc<ScopedStore>, service: Arc<dyn OutcomeService>) -> Self {
        Self { store, service }
    }

    /// Loads one report page.
    ///
    /// Serialized by the scope's `page_loading` flag: a call arriving while
    /// another is in flight is a no-op. The sequence is set-loading, fetch
    /// users, record page metadata, load rollups and results for the whole
    /// artifact, mark loaded.
    #[instrument(skip(self, override_loader), fields(scope = %scope), err)]
    pub async fn load_page(
        &self,
        scope: &Scope,
        page_number: u32,
        override_loader: Option<&dyn UserPageLoader>,
    ) -> Result<()> {
        let already_loading = self
            .store
            .write(scope, |state| {
                if state.report.page_loading {
                    return true;
                }
                state.report.page_loading = true;
                state.report.page_number = page_number;
                false
            })
            .await;
        if already_loading {
            debug!(page = page_number, "page load already in flight");
            return Ok(());
        }

        let settings = match self.store.settings(scope).await {
            Ok(settings) => settings,
            Err(err) => {
                self.store
                    .write(scope, |state| state.report.page_loading = false)
                    .await;
                return Err(err.into());
            }
        };

        let result = self
            .load_page_inner(scope, &settings, page_number, override_loader)
            .await;

        self.store
            .write(scope, |state| state.report.page_loading = false)
            .await;
        result
    }

    async fn load_page_inner(
        &self,
        scope: &Scope,
        settings: &ScopeSettings,
        page_number: u32,
        override_loader: Option<&dyn UserPageLoader>,
    ) -> Result<()> {
        let page = match self
            .fetch_users_page(settings, page_number, override_loader)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                warn!(page = page_number, error = %err, "user page load failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to load report page users"));
            }
        };

        self.store
            .write(scope, |state| {
                state.report.per_page = page.per_page;
                state.report.total = page.total;
                state.report.users.insert(page_number, page.users);
            })
            .await;

        self.load_rollups(scope).await
    }

    /// Fetches rollup summaries for the artifact, derives the flat outcome
    /// map, and loads per-student results for every outcome concurrently.
    ///
    /// A single failed result fetch fails the whole batch; nothing is
    /// committed partially.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn load_rollups(&self, scope: &Scope) -> Result<()> {
        let settings = self.store.settings(scope).await?;

        let rows = match self
            .service
            .get_outcome_rollups(
                &settings.host,
                &settings.jwt,
                &settings.artifact_type,
                &settings.artifact_id,
            )
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                warn!(error = %err, "rollup load failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to load outcome rollups"));
            }
        };

        let mut outcomes: HashMap<String, Outcome> = HashMap::new();
        let mut rollups: Vec<Rollup> = Vec::with_capacity(rows.len());
        for row in rows {
            rollups.push(Rollup {
                outcome_id: row.outcome.id.clone(),
                count: row.count,
                mastery_count: row.mastery_count,
                average_score: row.average_score,
                child_artifact_count: row.child_artifact_count,
                uses_bank: row.uses_bank,
            });
            outcomes.insert(row.outcome.id.clone(), row.outcome);
        }

        let user_uuids = self
            .store
            .read(scope, |state| state.report.known_user_uuids())
            .await;
        let outcome_ids: Vec<String> = outcomes.keys().cloned().collect();

        let results = match self
            .fetch_results_batch(&settings, &outcome_ids, &user_uuids)
            .await
        {
            Ok(results) => results,
            Err(err) => {
                warn!(error = %err, "result batch load failed");
                self.store.set_error(scope, err.to_string()).await;
                return Err(err.context("Failed to load outcome results"));
            }
        };

        self.store
            .write(scope, |state| {
                state.report.outcomes = outcomes;
                state.report.rollups = rollups;
                for (outcome_id, rows) in results {
                    state
                        .report
                        .merge_results(&outcome_id, rows.into_iter().map(Into::into).collect());
                }
            })
            .await;

        Ok(())
    }

    /// Loads every roster page not yet present, then the results for the
    /// newly discovered students.
    ///
    /// Re-entrant starts while `InProgress` are no-ops. On failure the
    /// status becomes `Error` and a retry resumes from the still-missing
    /// pages; pages fetched before the failure are never re-requested.
    #[instrument(skip(self, override_loader), fields(scope = %scope), err)]
    pub async fn load_remaining_pages(
        &self,
        scope: &Scope,
        override_loader: Option<&dyn UserPageLoader>,
    ) -> Result<()> {
        let (already_running, missing) = self
            .store
            .write(scope, |state| {
                if state.report.remaining_pages == RemainingPagesStatus::InProgress {
                    return (true, Vec::new());
                }
                state.report.remaining_pages = RemainingPagesStatus::InProgress;
                (false, state.report.missing_pages())
            })
            .await;
        if already_running {
            debug!("bulk page load already in progress");
            return Ok(());
        }

        if missing.is_empty() {
            self.store
                .write(scope, |state| {
                    state.report.remaining_pages = RemainingPagesStatus::Completed;
                })
                .await;
            return Ok(());
        }

        let settings = match self.store.settings(scope).await {
            Ok(settings) => settings,
            Err(err) => {
                self.fail_bulk(scope, err.to_string()).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self
            .load_remaining_users(scope, &settings, &missing, override_loader)
            .await
        {
            self.fail_bulk(scope, err.to_string()).await;
            return Err(err.context("Failed to load remaining report pages"));
        }

        if let Err(err) = self.load_remaining_results(scope, &settings).await {
            self.fail_bulk(scope, err.to_string()).await;
            return Err(err.context("Failed to load remaining results"));
        }

        self.store
            .write(scope, |state| {
                state.report.remaining_pages = RemainingPagesStatus::Completed;
            })
            .await;
        Ok(())
    }

    /// Clears the report slice back to its initial empty state (widget
    /// unmount).
    pub async fn clear_report_store(&self, scope: &Scope) {
        self.store
            .write(scope, |state| state.report = ReportState::default())
            .await;
    }

    /// Fetches the opaque per-student detail payload.
    #[instrument(skip(self), fields(scope = %scope), err)]
    pub async fn load_individual_results(
        &self,
        scope: &Scope,
        user_uuid: &str,
    ) -> Result<serde_json::Value> {
        let settings = self.store.settings(scope).await?;
        match self
            .service
            .get_individual_results(
                &settings.host,
                &settings.jwt,
                &settings.artifact_type,
                &settings.artifact_id,
                user_uuid,
            )
            .await
        {
            Ok(payload) => Ok(payload),
            Err(err) => {
                warn!(user = user_uuid, error = %err, "individual result load failed");
                self.store.set_error(scope, err.to_string()).await;
                Err(err.context("Failed to load individual results"))
            }
        }
    }

    /// Current bulk-load status.
    pub async fn remaining_pages_status(&self, scope: &Scope) -> RemainingPagesStatus {
        self.store
            .read(scope, |state| state.report.remaining_pages)
            .await
    }

    /// Rollup statistics for one outcome.
    pub async fn rollup_for(&self, scope: &Scope, outcome_id: &str) -> Option<Rollup> {
        self.store
            .read(scope, |state| {
                state
                    .report
                    .rollups
                    .iter()
                    .find(|r| r.outcome_id == outcome_id)
                    .cloned()
            })
            .await
    }

    /// One student's result against one outcome.
    pub async fn result_for(
        &self,
        scope: &Scope,
        outcome_id: &str,
        user_uuid: &str,
    ) -> Option<OutcomeResult> {
        self.store
            .read(scope, |state| {
                state
                    .report
                    .results
                    .get(outcome_id)
                    .and_then(|per_user| per_user.get(user_uuid))
                    .cloned()
            })
            .await
    }

    /// Roster for one fetched page.
    pub async fn users_for_page(&self, scope: &Scope, page_number: u32) -> Vec<User> {
        self.store
            .read(scope, |state| {
                state
                    .report
                    .users
                    .get(&page_number)
                    .cloned()
                    .unwrap_or_default()
            })
            .await
    }

    async fn fetch_users_page(
        &self,
        settings: &ScopeSettings,
        page_number: u32,
        override_loader: Option<&dyn UserPageLoader>,
    ) -> Result<UsersPage> {
        match override_loader {
            Some(loader) => loader.load_users(page_number).await,
            None => {
                self.service
                    .get_users(
                        &settings.host,
                        &settings.jwt,
                        &settings.artifact_type,
                        &settings.artifact_id,
                        page_number,
                    )
                    .await
            }
        }
    }

    async fn load_remaining_users(
        &self,
        scope: &Scope,
        settings: &ScopeSettings,
        pages: &[u32],
        override_loader: Option<&dyn UserPageLoader>,
    ) -> Result<()> {
        for &page_number in pages {
            let page = self
                .fetch_users_page(settings, page_number, override_loader)
                .await?;
            // Committed page by page so a later failure leaves the fetched
            // pages behind for resume.
            self.store
                .write(scope, |state| {
                    state.report.per_page = page.per_page;
                    state.report.total = page.total;
                    state.report.users.insert(page_number, page.users);
                })
                .await;
        }
        Ok(())
    }

    /// Loads results for every student not yet fully covered across the
    /// rolled-up outcomes. After a resumed bulk load this picks up students
    /// whose pages landed before the failure as well as the newly fetched
    /// ones.
    async fn load_remaining_results(&self, scope: &Scope, settings: &ScopeSettings) -> Result<()> {
        let (outcome_ids, user_uuids) = self
            .store
            .read(scope, |state| {
                let outcome_ids: Vec<String> =
                    state.report.outcomes.keys().cloned().collect();
                let uncovered: Vec<String> = state
                    .report
                    .known_user_uuids()
                    .into_iter()
                    .filter(|uuid| {
                        !outcome_ids.iter().all(|oid| {
                            state
                                .report
                                .results
                                .get(oid)
                                .is_some_and(|per_user| per_user.contains_key(uuid))
                        })
                    })
                    .collect();
                (outcome_ids, uncovered)
            })
            .await;

        if user_uuids.is_empty() || outcome_ids.is_empty() {
            return Ok(());
        }

        let results = self
            .fetch_results_batch(settings, &outcome_ids, &user_uuids)
            .await?;

        self.store
            .write(scope, |state| {
                for (outcome_id, rows) in results {
                    state
                        .report
                        .merge_results(&outcome_id, rows.into_iter().map(Into::into).collect());
                }
            })
            .await;
        Ok(())
    }

    /// Fetches per-student results for every outcome concurrently; a single
    /// rejection fails the batch with nothing committed.
    async fn fetch_results_batch(
        &self,
        settings: &ScopeSettings,
        outcome_ids: &[String],
        user_uuids: &[String],
    ) -> Result<Vec<(String, Vec<ResultRow>)>> {
        let fetches = outcome_ids.iter().map(|outcome_id| {
            let service = Arc::clone(&self.service);
            async move {
                let rows = service
                    .get_outcome_results(
                        &settings.host,
                        &settings.jwt,
                        &settings.artifact_type,
                        &settings.artifact_id,
                        outcome_id,
                        user_uuids,
                    )
                    .await?;
                Ok::<_, anyhow::Error>((outcome_id.clone(), rows))
            }
        });
        try_join_all(fetches).await
    }

    async fn fail_bulk(&self, scope: &Scope, message: String) {
        self.store
            .write(scope, |state| {
                state.report.remaining_pages = RemainingPagesStatus::Error;
            })
            .await;
        self.store.set_error(scope, message).await;
    }
}
