//! Domain errors for the rollup engine.

use thiserror::Error;

/// Domain-level errors that can occur in the engine.
///
/// Remote-call failures are carried as `anyhow` errors at the service
/// boundaries and routed into scoped error state; only conditions the engine
/// itself detects live here.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Scope has no launch settings: {0}")]
    MissingSettings(String),
}

/// Convenience alias for domain results.
pub type EngineResult<T> = Result<T, EngineError>;
