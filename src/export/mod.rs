//! Streaming CSV export of inventory records.
//!
//! [`ExportSpec`] validates the request (notably the sort key) before any
//! output exists, so a bad request is a whole-request error and never a
//! broken mid-stream file. [`ExportStream`] then lazily turns whatever
//! record iterator the storage collaborator supplies into CSV lines:
//! header first, one line per record, nothing buffered beyond the current
//! line. Dropping the stream (or calling [`ExportStream::cancel`])
//! releases the underlying source immediately, which is what lets a
//! disconnected consumer free a database cursor without draining it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, ExportResult};
use crate::models::StockRecord;

/// Fixed column order of the exported CSV.
pub const CSV_HEADERS: [&str; 7] = [
    "id",
    "name",
    "inventory",
    "category_id",
    "description",
    "created_at",
    "updated_at",
];

// =============================================================================
// Export Spec
// =============================================================================

/// Sortable export columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Name,
    Inventory,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "inventory" => Some(Self::Inventory),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Validated sort key, parsed from a `field:direction` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    /// Parse `"name:desc"`, `"id:asc"`, or bare `"id"` (direction
    /// defaults to ascending). Unknown fields or directions are rejected.
    pub fn parse(raw: &str) -> ExportResult<Self> {
        let (field_raw, direction_raw) = match raw.split_once(':') {
            Some((f, d)) => (f, d),
            None => (raw, "asc"),
        };

        let field = SortField::parse(field_raw.trim())
            .ok_or_else(|| ExportError::InvalidSortKey(raw.to_string()))?;
        let direction = match direction_raw.trim().to_lowercase().as_str() {
            "asc" | "" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            _ => return Err(ExportError::InvalidSortKey(raw.to_string())),
        };

        Ok(Self { field, direction })
    }
}

/// Read-only export request: filters plus an optional sort.
///
/// `category_id: Some(0)` is a meaningful filter (records with category 0
/// exactly) and is never coalesced with `None` (no category filter).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSpec {
    /// Case-insensitive substring match on `name`.
    pub keyword: Option<String>,
    pub category_id: Option<u64>,
    pub sort: Option<SortKey>,
}

impl ExportSpec {
    /// Build and validate a spec from raw request parameters.
    pub fn from_params(
        keyword: Option<String>,
        category_id: Option<u64>,
        sort: Option<&str>,
    ) -> ExportResult<Self> {
        let sort = match sort {
            Some(raw) if !raw.trim().is_empty() => Some(SortKey::parse(raw)?),
            _ => None,
        };
        Ok(Self {
            keyword: keyword.filter(|k| !k.is_empty()),
            category_id,
            sort,
        })
    }

    /// Whether a record passes the keyword and category filters.
    pub fn matches(&self, record: &StockRecord) -> bool {
        if let Some(keyword) = &self.keyword {
            if !record.name.to_lowercase().contains(&keyword.to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = self.category_id {
            if record.category_id != Some(category) {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Export Stream
// =============================================================================

/// Lazy CSV line stream over a record source.
///
/// Yields the header line first, then one encoded CSV line per record.
/// Finite and not restartable once consumed.
pub struct ExportStream {
    source: Option<Box<dyn Iterator<Item = StockRecord> + Send>>,
    header_sent: bool,
}

impl ExportStream {
    pub fn new(source: Box<dyn Iterator<Item = StockRecord> + Send>) -> Self {
        Self {
            source: Some(source),
            header_sent: false,
        }
    }

    /// Release the underlying source without draining it.
    ///
    /// After cancellation the stream yields nothing further. Dropping the
    /// stream has the same effect; this hook exists for callers that keep
    /// the stream alive but want the cursor gone now.
    pub fn cancel(&mut self) {
        self.source = None;
    }

    /// Whether the source is still attached.
    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }
}

impl Iterator for ExportStream {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.header_sent {
            // Emit the header even for an empty result set.
            self.source.as_ref()?;
            self.header_sent = true;
            return Some(csv_line(CSV_HEADERS.iter().map(|s| s.to_string())));
        }

        let record = self.source.as_mut()?.next();
        match record {
            Some(record) => Some(record_line(&record)),
            None => {
                // Exhausted: drop the source eagerly.
                self.source = None;
                None
            }
        }
    }
}

/// Encode one CSV line (with trailing newline) from field values.
fn csv_line(fields: impl IntoIterator<Item = String>) -> Vec<u8> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    let _ = writer.write_record(fields);
    writer.into_inner().unwrap_or_default()
}

fn record_line(record: &StockRecord) -> Vec<u8> {
    csv_line([
        record.id.to_string(),
        record.name.clone(),
        record.inventory.to_string(),
        record.category_id.map(|c| c.to_string()).unwrap_or_default(),
        record.description.clone().unwrap_or_default(),
        iso_seconds(record.created_at),
        iso_seconds(record.updated_at),
    ])
}

fn iso_seconds(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Timestamped download filename hint for the Content-Disposition header.
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("stocks_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
