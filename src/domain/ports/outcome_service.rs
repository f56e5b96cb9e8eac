//! Port for the remote outcome data provider.
//!
//! The engine treats the provider as a single collaborator with typed
//! request/response contracts. Transport (HTTP, auth refresh, retries) lives
//! behind this trait and is out of the engine's scope.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::models::{Outcome, OutcomeResult, User};

/// Response to a root or by-id outcome load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OutcomesResponse {
    /// Fetched nodes, including the requested nodes and their children.
    pub outcomes: Vec<Outcome>,

    /// Root-level outcome ids; populated only for root loads.
    #[serde(default)]
    pub root_ids: Vec<String>,
}

/// Response to alignment-set reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AlignmentSetResponse {
    /// Server-assigned alignment set identifier.
    pub guid: String,

    /// Outcomes bound to the artifact.
    pub outcomes: Vec<Outcome>,
}

/// One page of the student roster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UsersPage {
    /// Students on this page.
    pub users: Vec<User>,

    /// Page size.
    pub per_page: u32,

    /// Total students across all pages.
    pub total: u32,
}

/// One rollup row as returned by the service: the outcome object plus its
/// aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RollupRow {
    /// The aggregated outcome.
    pub outcome: Outcome,

    /// Number of students with a result.
    pub count: u32,

    /// Number of students at or above mastery.
    pub mastery_count: u32,

    /// Mean score across scored students.
    pub average_score: f64,

    /// Number of child artifacts contributing to the aggregate.
    pub child_artifact_count: u32,

    /// Whether the outcome is assessed through an item bank.
    pub uses_bank: bool,
}

/// One per-student result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResultRow {
    /// Student identifier.
    pub user_uuid: String,

    /// Score as a fraction of points possible.
    pub percent_score: f64,

    /// Points earned.
    pub points: f64,

    /// Points attainable.
    pub points_possible: f64,

    /// Attempt number, when reported.
    #[serde(default)]
    pub attempt: Option<u32>,
}

impl From<ResultRow> for OutcomeResult {
    fn from(row: ResultRow) -> Self {
        Self {
            user_uuid: row.user_uuid,
            percent_score: row.percent_score,
            points: row.points,
            points_possible: row.points_possible,
            attempt: row.attempt,
        }
    }
}

/// Response to a text search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchResponse {
    /// Result outcomes for the page.
    pub outcomes: Vec<Outcome>,

    /// Ids of outcomes that matched the query text directly.
    #[serde(default)]
    pub matches: Vec<String>,

    /// Total match count across all pages.
    pub total: u32,
}

/// Response to a flat outcome listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListResponse {
    /// Outcomes on this page.
    pub outcomes: Vec<Outcome>,

    /// Total outcome count across all pages.
    pub total: u32,
}

/// Remote outcome data provider.
///
/// Every method may reject; callers route rejections into scoped error state
/// rather than letting them escape unrecorded.
#[async_trait]
pub trait OutcomeService: Send + Sync {
    /// Fetches outcomes for a context. `ids = None` fetches root-level
    /// outcomes and populates `root_ids`.
    async fn load_outcomes(
        &self,
        host: &str,
        jwt: &str,
        context_uuid: &str,
        ids: Option<&[String]>,
    ) -> Result<OutcomesResponse>;

    /// Fetches one outcome with full detail, including scoring method.
    async fn get_outcome(
        &self,
        host: &str,
        jwt: &str,
        id: &str,
        context_uuid: Option<&str>,
    ) -> Result<Outcome>;

    /// Fetches a persisted alignment set by id.
    async fn get_alignments(
        &self,
        host: &str,
        jwt: &str,
        alignment_set_id: &str,
    ) -> Result<AlignmentSetResponse>;

    /// Creates a new alignment set from outcome ids.
    async fn create_alignment_set(
        &self,
        host: &str,
        jwt: &str,
        outcome_ids: &[String],
        launch_context_uuid: Option<&str>,
    ) -> Result<AlignmentSetResponse>;

    /// Upserts the alignment list into an existing artifact.
    async fn upsert_artifact(
        &self,
        host: &str,
        jwt: &str,
        artifact_type: &str,
        artifact_id: &str,
        outcome_ids: &[String],
    ) -> Result<AlignmentSetResponse>;

    /// Fetches one page of the student roster for an artifact.
    async fn get_users(
        &self,
        host: &str,
        jwt: &str,
        artifact_type: &str,
        artifact_id: &str,
        page: u32,
    ) -> Result<UsersPage>;

    /// Fetches rollup summaries for the whole artifact.
    async fn get_outcome_rollups(
        &self,
        host: &str,
        jwt: &str,
        artifact_type: &str,
        artifact_id: &str,
    ) -> Result<Vec<RollupRow>>;

    /// Fetches per-student results for one outcome.
    async fn get_outcome_results(
        &self,
        host: &str,
        jwt: &str,
        artifact_type: &str,
        artifact_id: &str,
        outcome_id: &str,
        user_uuids: &[String],
    ) -> Result<Vec<ResultRow>>;

    /// Fetches one page of text-search results.
    async fn get_search_results(
        &self,
        host: &str,
        jwt: &str,
        text: &str,
        page: u32,
        context_uuid: &str,
    ) -> Result<SearchResponse>;

    /// Fetches one page of the flat outcome listing (browse mode).
    async fn list_outcomes(
        &self,
        host: &str,
        jwt: &str,
        page: u32,
        context_uuid: &str,
    ) -> Result<ListResponse>;

    /// Fetches the opaque per-student result payload for detail views.
    async fn get_individual_results(
        &self,
        host: &str,
        jwt: &str,
        artifact_type: &str,
        artifact_id: &str,
        user_uuid: &str,
    ) -> Result<serde_json::Value>;
}
