// Clippy allows for reasonable defaults
// These suppress warnings where the suggested change doesn't improve readability
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::single_char_add_str)] // push_str("\n") reads better than push('\n')
#![allow(clippy::manual_strip)] // Manual prefix stripping can be clearer
#![allow(clippy::collapsible_if)] // Separate ifs can be more readable

// Module declarations
pub mod ai;
pub mod config;
pub mod database;
pub mod error;
pub mod ingest;
pub mod models;
pub mod parsers;
pub mod scheduler;

// Re-export models for use by the CLI and integration tests
pub use error::IngestError;
pub use models::*;
