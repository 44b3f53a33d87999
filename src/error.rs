//! Error types for the Stockload import/export engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SniffError`] - format sniffing failures (fatal, whole-file)
//! - [`ImportError`] - import orchestration failures (fatal, whole-file)
//! - [`ExportError`] - export request failures (rejected before streaming)
//! - [`MutationError`] - per-row storage failures (recovered row-locally)
//! - [`ServerError`] - HTTP layer failures
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Note the split in spec terms: everything here except [`MutationError`]
//! is *fatal* and propagates to the caller. A `MutationError` is captured
//! as a row-level entry in the import report and never aborts the file.

use thiserror::Error;

// =============================================================================
// Format Sniffing Errors
// =============================================================================

/// Errors while inspecting raw file bytes.
///
/// All variants are fatal: they are raised before any row-level
/// processing begins and no report is produced.
#[derive(Debug, Error)]
pub enum SniffError {
    /// Zero-byte upload. Distinct from a file with a header and no rows.
    #[error("uploaded file is empty")]
    EmptyFile,

    /// No candidate encoding decoded the byte stream cleanly.
    #[error("failed to decode file content: {0}")]
    Encoding(String),

    /// The first line does not look like a usable header row.
    #[error("no header row found: {0}")]
    MalformedHeader(String),

    /// The csv reader rejected the content outright.
    #[error("invalid CSV content: {0}")]
    Parse(String),
}

impl From<csv::Error> for SniffError {
    fn from(e: csv::Error) -> Self {
        SniffError::Parse(e.to_string())
    }
}

// =============================================================================
// Import Errors (fatal, whole-file)
// =============================================================================

/// Fatal import failures.
///
/// Row-level problems never show up here; they are aggregated into the
/// [`crate::models::ImportReport`] instead.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Sniffing failed before any row was parsed.
    #[error("sniff error: {0}")]
    Sniff(#[from] SniffError),

    /// The header is readable but lacks required columns.
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Export request failures, surfaced before any CSV byte is emitted.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Unrecognized sort field or direction.
    #[error("invalid sort key '{0}' (expected field:direction, direction asc|desc)")]
    InvalidSortKey(String),
}

// =============================================================================
// Mutation Errors (row-level)
// =============================================================================

/// Failures from the storage collaborator for a single row.
///
/// These are recovered locally: the offending row is recorded in the
/// report and the import continues with the next row.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Uniqueness or similar constraint conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The record to update disappeared between the id snapshot and the write.
    #[error("record not found: id {0}")]
    NotFound(u64),

    /// Anything else the storage layer wants to surface.
    #[error("storage error: {0}")]
    Storage(String),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Import failed before producing a report.
    #[error("import error: {0}")]
    Import(#[from] ImportError),

    /// Export request rejected.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// Invalid request.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for sniffing operations.
pub type SniffResult<T> = Result<T, SniffError>;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for storage mutations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
