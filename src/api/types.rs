//! REST API request/response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::ImportReport;

fn default_true() -> bool {
    true
}

/// Query parameters of an import request. Both flags default to true:
/// a bare upload is a validation-only dry run with upsert semantics.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportQuery {
    #[serde(default = "default_true")]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub upsert: bool,
}

/// Query parameters of an export request.
///
/// `categoryId=0` is a meaningful filter and distinct from omitting the
/// parameter entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    pub keyword: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<u64>,
    pub sort: Option<String>,
}

/// Response envelope for an import: the report plus a job id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub job_id: String,
    /// "ok" when every row resolved cleanly, "warning" otherwise.
    pub status: String,
    pub report: ImportReport,
}

impl From<ImportReport> for ImportResponse {
    fn from(report: ImportReport) -> Self {
        ImportResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if report.errors.is_empty() { "ok" } else { "warning" }.to_string(),
            report,
        }
    }
}

/// Create an error response body for fatal failures.
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}
