//! Scoped state container and cache primitives.

pub mod cache;
pub mod scope;

pub use cache::{outcome_cache_key, DeepMemo, LruCache};
pub use scope::{ErrorRecord, Scope, ScopeCaches, ScopeSettings, ScopeState, ScopedStore};
