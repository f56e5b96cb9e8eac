//! Common test utilities for integration tests
//!
//! Provides a programmable fake of the `OutcomeService` port plus fixture
//! builders shared across the integration test files. The fake records every
//! call so tests can assert on idempotency and zero-call properties.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use rollup_engine::{
    AlignmentSetResponse, Engine, EngineConfig, ListResponse, Outcome, OutcomeService,
    OutcomesResponse, ResultRow, RollupRow, ScopeSettings, ScoringMethod, SearchResponse, User,
    UsersPage,
};

/// Programmable in-memory stand-in for the remote provider.
#[derive(Default)]
pub struct FakeOutcomeService {
    calls: Mutex<Vec<String>>,
    /// Root-load responses keyed by context uuid.
    pub roots: Mutex<HashMap<String, OutcomesResponse>>,
    /// Child-load responses keyed by requested node id.
    pub children: Mutex<HashMap<String, Vec<Outcome>>>,
    /// Full-detail outcomes keyed by id.
    pub details: Mutex<HashMap<String, Outcome>>,
    /// Persisted alignment sets keyed by set id.
    pub alignments: Mutex<HashMap<String, AlignmentSetResponse>>,
    /// Response for create/upsert calls; synthesized when unset.
    pub save_response: Mutex<Option<AlignmentSetResponse>>,
    /// Force create/upsert calls to fail.
    pub fail_save: Mutex<bool>,
    /// Roster pages keyed by page number.
    pub users_pages: Mutex<HashMap<u32, UsersPage>>,
    /// Pages whose next fetch fails (consumed on failure).
    pub fail_users_once: Mutex<HashSet<u32>>,
    /// Rollup rows for the artifact.
    pub rollups: Mutex<Vec<RollupRow>>,
    /// Result rows keyed by outcome id.
    pub results: Mutex<HashMap<String, Vec<ResultRow>>>,
    /// Outcomes whose result fetch always fails.
    pub fail_results: Mutex<HashSet<String>>,
    /// Search responses keyed by query text.
    pub searches: Mutex<HashMap<String, SearchResponse>>,
    /// Listing responses keyed by page number.
    pub lists: Mutex<HashMap<u32, ListResponse>>,
    /// Query texts whose response is delayed by 500ms of (test) time.
    pub slow_searches: Mutex<HashSet<String>>,
    /// Roster pages whose response is delayed by 500ms of (test) time.
    pub slow_users: Mutex<HashSet<u32>>,
}

impl FakeOutcomeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls whose label starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl OutcomeService for FakeOutcomeService {
    async fn load_outcomes(
        &self,
        _host: &str,
        _jwt: &str,
        context_uuid: &str,
        ids: Option<&[String]>,
    ) -> Result<OutcomesResponse> {
        match ids {
            None => {
                self.record(format!("load_outcomes:{context_uuid}:root"));
                self.roots
                    .lock()
                    .unwrap()
                    .get(context_uuid)
                    .cloned()
                    .ok_or_else(|| anyhow!("no root fixture for context {context_uuid}"))
            }
            Some(ids) => {
                self.record(format!("load_outcomes:{context_uuid}:{}", ids.join(",")));
                let children = self.children.lock().unwrap();
                let mut outcomes = Vec::new();
                for id in ids {
                    let fetched = children
                        .get(id)
                        .cloned()
                        .ok_or_else(|| anyhow!("no child fixture for node {id}"))?;
                    outcomes.extend(fetched);
                }
                Ok(OutcomesResponse {
                    outcomes,
                    root_ids: Vec::new(),
                })
            }
        }
    }

    async fn get_outcome(
        &self,
        _host: &str,
        _jwt: &str,
        id: &str,
        _context_uuid: Option<&str>,
    ) -> Result<Outcome> {
        self.record(format!("get_outcome:{id}"));
        self.details
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("no detail fixture for outcome {id}"))
    }

    async fn get_alignments(
        &self,
        _host: &str,
        _jwt: &str,
        alignment_set_id: &str,
    ) -> Result<AlignmentSetResponse> {
        self.record(format!("get_alignments:{alignment_set_id}"));
        self.alignments
            .lock()
            .unwrap()
            .get(alignment_set_id)
            .cloned()
            .ok_or_else(|| anyhow!("no alignment fixture for set {alignment_set_id}"))
    }

    async fn create_alignment_set(
        &self,
        _host: &str,
        _jwt: &str,
        outcome_ids: &[String],
        _launch_context_uuid: Option<&str>,
    ) -> Result<AlignmentSetResponse> {
        self.record(format!("create_alignment_set:{}", outcome_ids.join(",")));
        if *self.fail_save.lock().unwrap() {
            return Err(anyhow!("alignment save rejected"));
        }
        Ok(self.saved_set(outcome_ids))
    }

    async fn upsert_artifact(
        &self,
        _host: &str,
        _jwt: &str,
        _artifact_type: &str,
        _artifact_id: &str,
        outcome_ids: &[String],
    ) -> Result<AlignmentSetResponse> {
        self.record(format!("upsert_artifact:{}", outcome_ids.join(",")));
        if *self.fail_save.lock().unwrap() {
            return Err(anyhow!("alignment save rejected"));
        }
        Ok(self.saved_set(outcome_ids))
    }

    async fn get_users(
        &self,
        _host: &str,
        _jwt: &str,
        _artifact_type: &str,
        _artifact_id: &str,
        page: u32,
    ) -> Result<UsersPage> {
        self.record(format!("get_users:{page}"));
        let slow = self.slow_users.lock().unwrap().contains(&page);
        if slow {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        if self.fail_users_once.lock().unwrap().remove(&page) {
            return Err(anyhow!("user page {page} unavailable"));
        }
        self.users_pages
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .ok_or_else(|| anyhow!("no roster fixture for page {page}"))
    }

    async fn get_outcome_rollups(
        &self,
        _host: &str,
        _jwt: &str,
        _artifact_type: &str,
        _artifact_id: &str,
    ) -> Result<Vec<RollupRow>> {
        self.record("get_outcome_rollups".to_string());
        Ok(self.rollups.lock().unwrap().clone())
    }

    async fn get_outcome_results(
        &self,
        _host: &str,
        _jwt: &str,
        _artifact_type: &str,
        _artifact_id: &str,
        outcome_id: &str,
        user_uuids: &[String],
    ) -> Result<Vec<ResultRow>> {
        self.record(format!(
            "get_outcome_results:{outcome_id}:{}",
            user_uuids.join(",")
        ));
        if self.fail_results.lock().unwrap().contains(outcome_id) {
            return Err(anyhow!("results for outcome {outcome_id} unavailable"));
        }
        let rows = self
            .results
            .lock()
            .unwrap()
            .get(outcome_id)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|row| user_uuids.contains(&row.user_uuid))
            .collect())
    }

    async fn get_search_results(
        &self,
        _host: &str,
        _jwt: &str,
        text: &str,
        page: u32,
        _context_uuid: &str,
    ) -> Result<SearchResponse> {
        self.record(format!("get_search_results:{text}:{page}"));
        let slow = self.slow_searches.lock().unwrap().contains(text);
        if slow {
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        Ok(self
            .searches
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_outcomes(
        &self,
        _host: &str,
        _jwt: &str,
        page: u32,
        _context_uuid: &str,
    ) -> Result<ListResponse> {
        self.record(format!("list_outcomes:{page}"));
        Ok(self
            .lists
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_individual_results(
        &self,
        _host: &str,
        _jwt: &str,
        _artifact_type: &str,
        _artifact_id: &str,
        user_uuid: &str,
    ) -> Result<serde_json::Value> {
        self.record(format!("get_individual_results:{user_uuid}"));
        Ok(json!({ "user_uuid": user_uuid }))
    }
}

impl FakeOutcomeService {
    fn saved_set(&self, outcome_ids: &[String]) -> AlignmentSetResponse {
        if let Some(response) = self.save_response.lock().unwrap().clone() {
            return response;
        }
        let details = self.details.lock().unwrap();
        AlignmentSetResponse {
            guid: format!("set-{}", outcome_ids.len()),
            outcomes: outcome_ids
                .iter()
                .map(|id| {
                    details
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| Outcome::new(id.clone(), format!("Outcome {id}")))
                })
                .collect(),
        }
    }
}

/// Engine wired over a fake provider with default configuration.
#[allow(dead_code)]
pub fn engine_with(service: Arc<FakeOutcomeService>) -> Engine {
    Engine::new(service, &EngineConfig::default())
}

/// Standard launch settings used by most tests.
#[allow(dead_code)]
pub fn settings() -> ScopeSettings {
    ScopeSettings::new("outcomes.test", "jwt", "ctx-1").with_artifact("quiz", "quiz-1")
}

/// Leaf outcome fixture.
#[allow(dead_code)]
pub fn leaf(id: &str) -> Outcome {
    Outcome::new(id, format!("Outcome {id}"))
}

/// Group outcome fixture.
#[allow(dead_code)]
pub fn group(id: &str, child_ids: &[&str], is_partial: bool) -> Outcome {
    Outcome {
        child_ids: Some(child_ids.iter().map(ToString::to_string).collect()),
        has_children: true,
        is_partial,
        ..Outcome::new(id, format!("Group {id}"))
    }
}

/// Fully-detailed outcome fixture with scoring metadata.
#[allow(dead_code)]
pub fn scored(id: &str) -> Outcome {
    Outcome {
        scoring_method: Some(ScoringMethod {
            algorithm: "highest".to_string(),
            mastery_percent: 0.6,
            points_possible: 5.0,
        }),
        ..Outcome::new(id, format!("Outcome {id}"))
    }
}

/// Student fixture.
#[allow(dead_code)]
pub fn user(uuid: &str) -> User {
    User {
        uuid: uuid.to_string(),
        full_name: format!("Student {uuid}"),
    }
}

/// Roster page fixture.
#[allow(dead_code)]
pub fn users_page(uuids: &[&str], per_page: u32, total: u32) -> UsersPage {
    UsersPage {
        users: uuids.iter().map(|u| user(u)).collect(),
        per_page,
        total,
    }
}

/// Rollup row fixture.
#[allow(dead_code)]
pub fn rollup_row(outcome_id: &str, count: u32, mastery_count: u32) -> RollupRow {
    RollupRow {
        outcome: leaf(outcome_id),
        count,
        mastery_count,
        average_score: 0.75,
        child_artifact_count: 1,
        uses_bank: false,
    }
}

/// Result row fixture.
#[allow(dead_code)]
pub fn result_row(user_uuid: &str, percent_score: f64) -> ResultRow {
    ResultRow {
        user_uuid: user_uuid.to_string(),
        percent_score,
        points: percent_score * 4.0,
        points_possible: 4.0,
        attempt: Some(1),
    }
}
