//! Domain models for the Stockload import/export engine.
//!
//! This module contains the core data structures used throughout the engine:
//!
//! - [`RawRow`] - one parsed CSV row before validation
//! - [`ValidatedRecord`] - the typed result of a row that passed all rules
//! - [`ValidationError`] / [`ErrorCode`] - row-level failures for the report
//! - [`Plan`] / [`SkipReason`] - the storage action chosen for a record
//! - [`ImportReport`] - the aggregate result of one import invocation
//! - [`StockRecord`] - the stored shape, as seen by export

use std::collections::HashMap;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest value echoed back into an error message.
const VALUE_ECHO_MAX: usize = 64;

// =============================================================================
// Raw Row
// =============================================================================

/// One data row as parsed from the CSV, before validation.
///
/// `row` is the 1-based data row number; the header counts as row 0.
/// Values are whitespace-trimmed at parse time. Immutable once built.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based data row number.
    pub row: usize,
    /// Header name -> raw value.
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(row: usize, fields: HashMap<String, String>) -> Self {
        Self { row, fields }
    }

    /// Value for a column, or `""` when the column is absent.
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Whether the column is present and non-blank.
    pub fn has(&self, name: &str) -> bool {
        !self.get(name).is_empty()
    }
}

// =============================================================================
// Validated Record
// =============================================================================

/// The normalized, typed result of a row that passed every field rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRecord {
    /// 1-based source row, kept for report ordering.
    pub row: usize,
    /// Explicit identifier; absent means "new record".
    pub id: Option<u64>,
    pub name: String,
    /// Non-negative by rule.
    pub inventory: i64,
    pub category_id: Option<u64>,
    pub description: Option<String>,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Machine-readable error codes for row-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidId,
    MissingName,
    NameTooLong,
    MissingInventory,
    InvalidInventory,
    InvalidCategory,
    DescriptionTooLong,
    /// Storage rejected this row during a committing import.
    MutationFailed,
}

/// One row-level failure, keyed by row number and field.
///
/// Carries a short echo of the offending raw value for error-table
/// display. Never holds a reference back into storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// 1-based data row number.
    pub row: usize,
    /// Offending field name.
    pub field: String,
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Echo of the raw value, truncated for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(row: usize, field: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            code,
            message: message.into(),
            value: None,
        }
    }

    /// Attach a truncated echo of the raw value.
    pub fn with_value(mut self, value: &str) -> Self {
        let mut echo = value.to_string();
        if echo.chars().count() > VALUE_ECHO_MAX {
            echo = echo.chars().take(VALUE_ECHO_MAX).collect();
        }
        self.value = Some(echo);
        self
    }
}

// =============================================================================
// Reconciliation Plan
// =============================================================================

/// Why a row was skipped instead of created or updated.
///
/// Skips are classification outcomes, not errors: they are counted in the
/// report but never appear in its error list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Same id appeared earlier in this file.
    DuplicateInFile,
    /// Id exists in storage and upsert is disabled.
    ExistsUpsertDisabled,
    /// Explicit id unknown to storage and upsert is disabled.
    UnknownIdUpsertDisabled,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::DuplicateInFile => "duplicate id in file",
            SkipReason::ExistsUpsertDisabled => "exists, upsert disabled",
            SkipReason::UnknownIdUpsertDisabled => "unknown id, upsert disabled",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The storage action chosen for one validated record.
///
/// Produced only for rows without validation errors, one per record,
/// in row order.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// New record, with or without an explicit id.
    Create(ValidatedRecord),
    /// Update of an existing record.
    Update(u64, ValidatedRecord),
    /// No storage action; counted in the report.
    Skip {
        row: usize,
        id: u64,
        reason: SkipReason,
    },
}

// =============================================================================
// Import Report
// =============================================================================

/// Options carried by an import request.
///
/// Both flags default to `true`, matching the wire contract: a bare
/// upload is a validation-only dry run with upsert semantics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportOptions {
    pub dry_run: bool,
    pub upsert: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { dry_run: true, upsert: true }
    }
}

/// Aggregate result of one import invocation.
///
/// Assembled once per call, never partially flushed. When `dry_run` is
/// set the `created`/`updated`/`skipped` counters are projections of what
/// a committing run would do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub dry_run: bool,
    pub upsert: bool,
    /// Number of non-blank data rows in the file.
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Distinct rows with at least one error (not the raw error count).
    pub errored_rows: usize,
    /// Row-level failures, ordered by row number.
    pub errors: Vec<ValidationError>,
    /// Error table as a base64 CSV attachment, present when errors exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors_csv_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors_csv_filename: Option<String>,
}

impl ImportReport {
    pub fn new(options: ImportOptions, total_rows: usize) -> Self {
        Self {
            dry_run: options.dry_run,
            upsert: options.upsert,
            total_rows,
            created: 0,
            updated: 0,
            skipped: 0,
            errored_rows: 0,
            errors: Vec::new(),
            errors_csv_b64: None,
            errors_csv_filename: None,
        }
    }

    /// Finalize the report: order errors by row, count distinct errored
    /// rows, and build the error-table attachment when needed.
    pub fn finalize(&mut self) {
        self.errors.sort_by_key(|e| e.row);
        let mut rows: Vec<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.dedup();
        self.errored_rows = rows.len();

        if !self.errors.is_empty() {
            let ts = Utc::now().format("%Y%m%d_%H%M%S");
            self.errors_csv_filename = Some(format!("stocks_import_errors_{}.csv", ts));
            self.errors_csv_b64 = Some(errors_to_csv_b64(&self.errors));
        }
    }
}

/// Serialize the error list to CSV (`row,field,code,message`) and
/// base64-encode it for attachment-style transport.
fn errors_to_csv_b64(errors: &[ValidationError]) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());
    // Header row; ignore write errors, Vec<u8> cannot fail.
    let _ = writer.write_record(["row", "field", "code", "message"]);
    for e in errors {
        let code = serde_json::to_value(e.code)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let _ = writer.write_record([e.row.to_string(), e.field.clone(), code, e.message.clone()]);
    }
    let raw = writer.into_inner().unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(raw)
}

// =============================================================================
// Stored Record
// =============================================================================

/// A stored inventory record, as supplied to the export streamer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: u64,
    pub name: String,
    pub inventory: i64,
    pub category_id: Option<u64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Tests
// =============================================================================
