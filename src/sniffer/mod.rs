//! Format sniffing: encoding, delimiter and header detection for uploads.
//!
//! Pure inspection, no side effects. The import orchestrator calls
//! [`parse_bytes`] once per file; [`inspect`] serves pre-flight
//! diagnostics (CLI and the `/api/stocks/inspect` endpoint) with a small
//! sample of data rows.
//!
//! Encoding is resolved by a short candidate ladder: UTF-8 with BOM,
//! plain UTF-8, EUC-KR as the regional fallback, then a chardet hint.
//! The first encoding that decodes the full byte stream without errors
//! wins; if none do, the file is rejected whole.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{SniffError, SniffResult};
use crate::models::RawRow;

/// Data rows included in a diagnostic sample.
pub const SAMPLE_ROW_LIMIT: usize = 5;

/// Delimiters considered during detection, comma first so it wins ties.
const CANDIDATE_DELIMITERS: [char; 3] = [',', ';', '\t'];

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

// =============================================================================
// Results
// =============================================================================

/// Diagnostic summary of an uploaded file's shape.
#[derive(Debug, Clone, Serialize)]
pub struct FormatInfo {
    /// Detected or explicitly supplied encoding label.
    pub encoding: String,
    /// Detected or explicitly supplied field delimiter.
    pub delimiter: char,
    /// Normalized header names, in file order.
    pub headers: Vec<String>,
    /// Up to [`SAMPLE_ROW_LIMIT`] data rows, values in header order.
    pub sample_rows: Vec<Vec<String>>,
    /// Total number of data rows seen.
    pub row_count: usize,
}

/// Fully parsed CSV content with detection metadata.
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

// =============================================================================
// Encoding
// =============================================================================

/// Decode bytes with an explicit encoding label, strictly.
///
/// Labels are resolved by `encoding_rs`; `utf-8-sig` is accepted as an
/// alias for BOM-prefixed UTF-8.
pub fn decode_with(bytes: &[u8], label: &str) -> SniffResult<String> {
    let normalized = label.trim().to_lowercase();
    let lookup = if normalized == "utf-8-sig" { "utf-8" } else { normalized.as_str() };

    let encoding = encoding_rs::Encoding::for_label(lookup.as_bytes())
        .ok_or_else(|| SniffError::Encoding(format!("unknown encoding label '{}'", label)))?;

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(SniffError::Encoding(format!(
            "content is not valid {}",
            encoding.name()
        )));
    }
    Ok(text.into_owned())
}

/// Decode bytes by trying the candidate ladder in order.
///
/// Returns the decoded text and the name of the winning encoding.
pub fn decode_auto(bytes: &[u8]) -> SniffResult<(String, String)> {
    // UTF-8 with byte-order mark
    if bytes.starts_with(&UTF8_BOM) {
        if let Ok(text) = std::str::from_utf8(&bytes[UTF8_BOM.len()..]) {
            return Ok((text.to_string(), "utf-8-sig".to_string()));
        }
    }

    // Plain UTF-8
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok((text.to_string(), "utf-8".to_string()));
    }

    // Regional fallback, tried before the generic guess: single-byte
    // encodings like windows-1252 decode anything, so a chardet hint for
    // them would shadow legacy Korean exports.
    let (text, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
    if !had_errors {
        return Ok((text.into_owned(), "euc-kr".to_string()));
    }

    // chardet hint as the last net
    let (charset, _, _) = chardet::detect(bytes);
    if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return Ok((text.into_owned(), encoding.name().to_lowercase()));
        }
    }

    Err(SniffError::Encoding(format!(
        "no candidate encoding decoded the content (chardet guessed '{}')",
        charset
    )))
}

// =============================================================================
// Delimiter
// =============================================================================

/// Choose the delimiter by frequency in the first non-empty line.
///
/// Ties and all-zero counts fall back to comma.
pub fn detect_delimiter(text: &str) -> char {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");

    let mut best = ',';
    let mut best_count = first_line.matches(',').count();
    for &candidate in &CANDIDATE_DELIMITERS[1..] {
        let count = first_line.matches(candidate).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }
    best
}

// =============================================================================
// Parsing
// =============================================================================

/// Normalize a header cell: trim, strip BOM remnants, lowercase.
fn normalize_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').to_lowercase()
}

/// Parse decoded text into headers and raw rows.
///
/// Rows are numbered 1..N in file order (the header is row 0). Blank
/// lines are skipped and do not consume a row number. Missing trailing
/// cells become empty strings; cells beyond the header width are ignored.
pub fn read_rows(text: &str, delimiter: char) -> SniffResult<(Vec<String>, Vec<RawRow>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SniffError::MalformedHeader("header row is blank".into()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }
        let mut fields = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = record.get(i).unwrap_or("");
            fields.insert(header.clone(), value.to_string());
        }
        rows.push(RawRow::new(rows.len() + 1, fields));
    }

    Ok((headers, rows))
}

/// Sniff and fully parse an uploaded file.
///
/// This is the orchestrator's single entry into the sniffer. Overrides
/// bypass the corresponding detection step.
pub fn parse_bytes(
    bytes: &[u8],
    delimiter: Option<char>,
    encoding: Option<&str>,
) -> SniffResult<ParsedCsv> {
    if bytes.is_empty() {
        return Err(SniffError::EmptyFile);
    }

    let (text, encoding) = match encoding {
        Some(label) => (decode_with(bytes, label)?, label.trim().to_lowercase()),
        None => decode_auto(bytes)?,
    };

    if text.lines().all(|l| l.trim().is_empty()) {
        return Err(SniffError::MalformedHeader("file contains no header line".into()));
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&text));
    let (headers, rows) = read_rows(&text, delimiter)?;

    Ok(ParsedCsv { encoding, delimiter, headers, rows })
}

/// Pre-flight inspection: detection metadata plus a small row sample.
///
/// `filename` is advisory only and is used to contextualize failures.
pub fn inspect(
    bytes: &[u8],
    filename: Option<&str>,
    delimiter: Option<char>,
    encoding: Option<&str>,
) -> SniffResult<FormatInfo> {
    let parsed = parse_bytes(bytes, delimiter, encoding).map_err(|e| match (e, filename) {
        (SniffError::Encoding(msg), Some(name)) => {
            SniffError::Encoding(format!("{}: {}", name, msg))
        }
        (SniffError::MalformedHeader(msg), Some(name)) => {
            SniffError::MalformedHeader(format!("{}: {}", name, msg))
        }
        (e, _) => e,
    })?;

    let sample_rows = parsed
        .rows
        .iter()
        .take(SAMPLE_ROW_LIMIT)
        .map(|row| parsed.headers.iter().map(|h| row.get(h).to_string()).collect())
        .collect();

    Ok(FormatInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.headers,
        sample_rows,
        row_count: parsed.rows.len(),
    })
}
