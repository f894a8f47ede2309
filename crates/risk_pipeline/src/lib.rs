//! Insurance Risk Pipeline
//!
//! Scores unstructured customer text with a trained classifier and writes
//! risk labels and premium adjustment suggestions back to the operational
//! store.

pub mod commands;
mod error;

pub use error::PipelineError;
