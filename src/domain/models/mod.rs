//! Domain models: pure data structures with no service or store dependencies.

pub mod alignment;
pub mod config;
pub mod outcome;
pub mod picker;
pub mod report;
pub mod search;

pub use alignment::AlignmentSet;
pub use config::{EngineConfig, LoggingConfig};
pub use outcome::{ContextTree, Outcome, ScoringMethod, ROOT_ID};
pub use picker::PickerState;
pub use report::{OutcomeResult, RemainingPagesStatus, ReportState, Rollup, User};
pub use search::SearchState;
