//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interface the transport adapter must
//! implement:
//! - `OutcomeService`: remote reads/writes for outcomes, alignments, rosters,
//!   rollups, results, and search
//!
//! The trait defines the contract that lets the engine stay independent of
//! any concrete HTTP client.

pub mod outcome_service;

pub use outcome_service::{
    AlignmentSetResponse, ListResponse, OutcomeService, OutcomesResponse, ResultRow, RollupRow,
    SearchResponse, UsersPage,
};
