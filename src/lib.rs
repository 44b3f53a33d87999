//! # Stockload - CSV bulk import/export for inventory records
//!
//! Stockload validates and reconciles uploaded CSV files against an
//! inventory store (dry-run or committing upsert) and streams filtered
//! exports back out, without materializing full result sets.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────┐   ┌───────────┐   ┌───────────┐   ┌────────┐
//! │ CSV file │──▶│ Sniffer │──▶│ Validator │──▶│ Reconcile │──▶│ Report │
//! │ (bytes)  │   │ (enc/   │   │ (field    │   │ (create/  │   │ (+ mut │
//! │          │   │  delim) │   │  rules)   │   │  update/  │   │  ations│
//! └──────────┘   └─────────┘   └───────────┘   │  skip)    │   │  )     │
//!                                              └───────────┘   └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use stockload::{run_import, ImportOptions, MemoryStore};
//!
//! let csv = b"id,name,inventory,category_id\n,Apple,50,0\n";
//! let mut store = MemoryStore::new();
//! let report = run_import(csv, None, ImportOptions::default(), &mut store).unwrap();
//! assert_eq!(report.created, 1); // dry run: projection only
//! assert!(store.is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - hierarchical error types
//! - [`models`] - domain models (RawRow, ValidatedRecord, Plan, ImportReport)
//! - [`sniffer`] - encoding/delimiter/header detection and row parsing
//! - [`rules`] - field rules and row validation
//! - [`reconcile`] - create/update/skip planning
//! - [`import`] - import orchestration
//! - [`export`] - export spec and streaming CSV output
//! - [`store`] - storage collaborator traits + in-memory reference store
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod sniffer;

// Validation & reconciliation
pub mod reconcile;
pub mod rules;

// Orchestration
pub mod import;

// Export
pub mod export;

// Storage collaborators
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExportError, ImportError, MutationError, ServerError, SniffError,
    ExportResult, ImportResult, MutationResult, ServerResult, SniffResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    ErrorCode, ImportOptions, ImportReport, Plan, RawRow, SkipReason, StockRecord,
    ValidatedRecord, ValidationError,
};

// =============================================================================
// Re-exports - Sniffing
// =============================================================================

pub use sniffer::{decode_auto, detect_delimiter, inspect, parse_bytes, FormatInfo, ParsedCsv};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use rules::{missing_columns, validate_row, MAX_DESC_LEN, MAX_NAME_LEN, REQUIRED_COLUMNS};

// =============================================================================
// Re-exports - Reconciliation
// =============================================================================

pub use reconcile::Planner;

// =============================================================================
// Re-exports - Import
// =============================================================================

pub use import::run_import;

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{
    export_filename, ExportSpec, ExportStream, SortDirection, SortField, SortKey, CSV_HEADERS,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{MemoryStore, RecordSource, StockStore};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ExportQuery, ImportQuery, ImportResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
