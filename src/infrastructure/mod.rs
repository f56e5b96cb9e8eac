//! Infrastructure layer: configuration and logging adapters.

pub mod config;
pub mod logging;
