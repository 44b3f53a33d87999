//! Import orchestration: one pass over one uploaded file.
//!
//! [`run_import`] drives sniff → parse → validate → reconcile → apply and
//! assembles the [`ImportReport`]. Dry-run and committing imports share
//! this single path; `dry_run` only decides whether the storage
//! collaborator is invoked. A storage failure for one row is recorded
//! against that row and never aborts the rest of the file.

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{ImportError, ImportResult};
use crate::models::{ErrorCode, ImportOptions, ImportReport, Plan, ValidationError};
use crate::reconcile::Planner;
use crate::rules;
use crate::sniffer;
use crate::store::StockStore;

/// Run one import over raw upload bytes.
///
/// Fatal conditions (empty file, undecodable encoding, malformed header,
/// missing required columns) return `Err` and no report exists. Anything
/// row-level lands in the report.
pub fn run_import(
    bytes: &[u8],
    filename: Option<&str>,
    options: ImportOptions,
    store: &mut dyn StockStore,
) -> ImportResult<ImportReport> {
    log_info(format!(
        "Importing {} ({} bytes, dry_run={}, upsert={})",
        filename.unwrap_or("upload"),
        bytes.len(),
        options.dry_run,
        options.upsert
    ));

    let parsed = sniffer::parse_bytes(bytes, None, None)?;
    log_success(format!(
        "Detected encoding {}, delimiter '{}', {} data rows",
        parsed.encoding,
        if parsed.delimiter == '\t' { "TAB".to_string() } else { parsed.delimiter.to_string() },
        parsed.rows.len()
    ));

    let missing = rules::missing_columns(&parsed.headers);
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut report = ImportReport::new(options, parsed.rows.len());

    // Validate every row; survivors keep their row order.
    let mut valid = Vec::new();
    for raw in &parsed.rows {
        match rules::validate_row(raw) {
            Ok(record) => valid.push(record),
            Err(row_errors) => report.errors.extend(row_errors),
        }
    }

    // Snapshot the id set once, then plan in row order.
    let mut planner = Planner::new(store.existing_ids(), options.upsert);
    for plan in planner.plan_all(valid) {
        match plan {
            Plan::Create(record) => {
                if options.dry_run {
                    report.created += 1;
                } else {
                    match store.create(&record) {
                        Ok(_) => report.created += 1,
                        Err(e) => report.errors.push(mutation_failure(record.row, e.to_string())),
                    }
                }
            }
            Plan::Update(id, record) => {
                if options.dry_run {
                    report.updated += 1;
                } else {
                    match store.update(id, &record) {
                        Ok(()) => report.updated += 1,
                        Err(e) => report.errors.push(mutation_failure(record.row, e.to_string())),
                    }
                }
            }
            Plan::Skip { row, id, reason } => {
                report.skipped += 1;
                log_warning(format!("row {}: id {} skipped ({})", row, id, reason));
            }
        }
    }

    report.finalize();
    log_success(format!(
        "Import done: {} created, {} updated, {} skipped, {} rows with errors",
        report.created, report.updated, report.skipped, report.errored_rows
    ));

    Ok(report)
}

fn mutation_failure(row: usize, message: String) -> ValidationError {
    ValidationError::new(row, "id", ErrorCode::MutationFailed, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MutationError, MutationResult, SniffError};
    use crate::models::ValidatedRecord;
    use crate::store::MemoryStore;
    use std::collections::HashSet;

    const HEADER: &str = "id,name,inventory,category_id,description\n";

    fn csv(rows: &[&str]) -> Vec<u8> {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
        out.into_bytes()
    }

    #[test]
    fn test_empty_file_is_fatal() {
        let mut store = MemoryStore::new();
        let err = run_import(b"", None, ImportOptions::default(), &mut store).unwrap_err();
        assert!(matches!(err, ImportError::Sniff(SniffError::EmptyFile)));
    }

    #[test]
    fn test_missing_required_columns_is_fatal() {
        let mut store = MemoryStore::new();
        let bytes = b"id,name\n1,Apple\n";
        let err = run_import(bytes, None, ImportOptions::default(), &mut store).unwrap_err();
        match err {
            ImportError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["inventory", "category_id"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_does_not_mutate() {
        let mut store = MemoryStore::new();
        let bytes = csv(&[",Apple,3,,", ",Pear,5,,"]);
        let report = run_import(&bytes, None, ImportOptions::default(), &mut store).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.created, 2);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_commit_creates_and_updates() {
        let mut store = MemoryStore::new();
        store
            .create(&ValidatedRecord {
                row: 0,
                id: Some(2),
                name: "Old Keyboard".into(),
                inventory: 10,
                category_id: None,
                description: None,
            })
            .unwrap();

        let bytes = csv(&[",New Apple,50,0,first stock", "2,Keyboard,120,1,restock"]);
        let options = ImportOptions { dry_run: false, upsert: true };
        let report = run_import(&bytes, None, options, &mut store).unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(report.errors.len(), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(2).unwrap().name, "Keyboard");
        assert_eq!(store.get(2).unwrap().inventory, 120);
    }

    #[test]
    fn test_counts_sum_to_total_rows() {
        let mut store = MemoryStore::new();
        store
            .create(&ValidatedRecord {
                row: 0,
                id: Some(1),
                name: "Seed".into(),
                inventory: 1,
                category_id: None,
                description: None,
            })
            .unwrap();

        // create, update, duplicate-skip, error
        let bytes = csv(&[",A,1,,", "1,B,2,,", "1,C,3,,", ",D,nope,,"]);
        let report = run_import(&bytes, None, ImportOptions::default(), &mut store).unwrap();

        assert_eq!(report.total_rows, 4);
        assert_eq!(
            report.created + report.updated + report.skipped + report.errored_rows,
            report.total_rows
        );
    }

    #[test]
    fn test_mutation_failure_is_row_partial() {
        /// Store that rejects every create but accepts updates.
        struct RejectingStore {
            inner: MemoryStore,
        }
        impl StockStore for RejectingStore {
            fn existing_ids(&self) -> HashSet<u64> {
                self.inner.existing_ids()
            }
            fn create(&mut self, _: &ValidatedRecord) -> MutationResult<u64> {
                Err(MutationError::Conflict("unique constraint".into()))
            }
            fn update(&mut self, id: u64, record: &ValidatedRecord) -> MutationResult<()> {
                self.inner.update(id, record)
            }
        }

        let mut inner = MemoryStore::new();
        inner
            .create(&ValidatedRecord {
                row: 0,
                id: Some(2),
                name: "Seed".into(),
                inventory: 1,
                category_id: None,
                description: None,
            })
            .unwrap();
        let mut store = RejectingStore { inner };

        let bytes = csv(&[",A,1,,", "2,B,2,,"]);
        let options = ImportOptions { dry_run: false, upsert: true };
        let report = run_import(&bytes, None, options, &mut store).unwrap();

        // Row 1 failed at the store, row 2 still went through.
        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[0].code, ErrorCode::MutationFailed);
        assert!(report.errors[0].message.contains("unique constraint"));
    }

    #[test]
    fn test_errors_ordered_by_row_across_kinds() {
        struct RejectingStore;
        impl StockStore for RejectingStore {
            fn existing_ids(&self) -> HashSet<u64> {
                HashSet::new()
            }
            fn create(&mut self, _: &ValidatedRecord) -> MutationResult<u64> {
                Err(MutationError::Storage("disk full".into()))
            }
            fn update(&mut self, _: u64, _: &ValidatedRecord) -> MutationResult<()> {
                Ok(())
            }
        }

        // Row 1 fails at the store, row 2 fails validation.
        let bytes = csv(&[",A,1,,", ",B,zzz,,"]);
        let options = ImportOptions { dry_run: false, upsert: true };
        let report = run_import(&bytes, None, options, &mut RejectingStore).unwrap();

        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].row, 1);
        assert_eq!(report.errors[0].code, ErrorCode::MutationFailed);
        assert_eq!(report.errors[1].row, 2);
        assert_eq!(report.errors[1].code, ErrorCode::InvalidInventory);
    }

    #[test]
    fn test_upsert_disabled_skips_explicit_ids() {
        let mut store = MemoryStore::new();
        store
            .create(&ValidatedRecord {
                row: 0,
                id: Some(1),
                name: "Seed".into(),
                inventory: 1,
                category_id: None,
                description: None,
            })
            .unwrap();

        let bytes = csv(&["1,Known,5,,", "9,Unknown,5,,", ",Fresh,5,,"]);
        let options = ImportOptions { dry_run: false, upsert: false };
        let report = run_import(&bytes, None, options, &mut store).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);
        assert!(report.errors.is_empty());
    }
}
