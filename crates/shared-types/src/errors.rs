//! # Error Types
//!
//! Errors shared across crates. Component-specific errors live with their
//! components; only the datastore contract error is shared.

use thiserror::Error;

/// Errors surfaced by the document datastore ports.
///
/// The datastore is specified as a CRUD interface; adapters translate their
/// backend failures into these variants.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// No record matched the query.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint would be violated.
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: String, value: String },

    /// Backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}
