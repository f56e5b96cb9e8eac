//! Rollup Engine - Scoped Asynchronous Mastery State Engine
//!
//! The engine underlying outcome picker, alignment manager, and student
//! report widgets in a learning-management product. It supports multiple
//! independently-scoped widget instances on one page, lazily loads a large
//! hierarchical outcome tree a few nodes at a time, debounces and
//! stale-guards search requests, and resumes bulk roster pagination after
//! partial failure. Presentation is an external collaborator: it dispatches
//! scoped commands and renders whatever the scoped selectors return.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure models, errors, and the
//!   `OutcomeService` port the transport adapter implements
//! - **Store Layer** (`store`): Scoped state container and cache primitives
//! - **Service Layer** (`services`): Scoped commands and selectors
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rollup_engine::{Engine, EngineConfig, ScopeSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = Arc::new(MyHttpOutcomeService::new());
//!     let engine = Engine::new(service, &EngineConfig::default());
//!     let scope = engine
//!         .mount(ScopeSettings::new("outcomes.example.com", "jwt", "ctx-1"))
//!         .await;
//!     engine.picker.open(&scope).await;
//!     engine.picker.load_outcome_picker(&scope).await?;
//!     Ok(())
//! }
//! ```

pub mod domain;
pub mod infrastructure;
pub mod services;
pub mod store;

// Re-export commonly used types for convenience
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    AlignmentSet, ContextTree, EngineConfig, LoggingConfig, Outcome, OutcomeResult, PickerState,
    RemainingPagesStatus, ReportState, Rollup, ScoringMethod, SearchState, User, ROOT_ID,
};
pub use domain::ports::{
    AlignmentSetResponse, ListResponse, OutcomeService, OutcomesResponse, ResultRow, RollupRow,
    SearchResponse, UsersPage,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AlignmentService, Engine, OutcomeTreeService, PickerService, ReportService, SearchController,
    SearchDispatch, UserPageLoader,
};
pub use store::{ErrorRecord, Scope, ScopeSettings, ScopedStore};
