//! Tracing subscriber initialization.

pub mod logger;

pub use logger::init;
