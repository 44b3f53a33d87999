//! Storage collaborator interfaces and the in-memory reference store.
//!
//! The engine never talks to a datastore directly. Imports go through
//! [`StockStore`] (id snapshot + create/update), exports pull from
//! [`RecordSource`]. The surrounding persistence layer implements these;
//! [`MemoryStore`] is the reference implementation used by the demo
//! server, the CLI and the tests.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::error::{MutationError, MutationResult};
use crate::export::{ExportSpec, SortDirection, SortField};
use crate::models::{StockRecord, ValidatedRecord};

// =============================================================================
// Collaborator traits
// =============================================================================

/// Mutating storage interface driven by a committing import.
///
/// `existing_ids` is queried exactly once per import; create/update are
/// applied row by row and must fail per-row, never per-file.
pub trait StockStore {
    fn existing_ids(&self) -> HashSet<u64>;

    /// Create a record, honoring an explicit id when the record carries one.
    fn create(&mut self, record: &ValidatedRecord) -> MutationResult<u64>;

    fn update(&mut self, id: u64, record: &ValidatedRecord) -> MutationResult<()>;
}

/// Read side: an ordered, possibly large sequence of records already
/// filtered and sorted for the given spec. The iterator is pulled lazily
/// by the export stream and must release its resources on drop.
pub trait RecordSource {
    fn records(&self, spec: &ExportSpec) -> Box<dyn Iterator<Item = StockRecord> + Send>;
}

// =============================================================================
// In-memory store
// =============================================================================

/// BTreeMap-backed store: id order by default, auto-increment ids,
/// Utc timestamps assigned on write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<u64, StockRecord>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { records: BTreeMap::new(), next_id: 1 }
    }

    /// Seed the store, e.g. for tests or the demo server.
    pub fn with_records(records: impl IntoIterator<Item = StockRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            store.next_id = store.next_id.max(record.id + 1);
            store.records.insert(record.id, record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&StockRecord> {
        self.records.get(&id)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl StockStore for MemoryStore {
    fn existing_ids(&self) -> HashSet<u64> {
        self.records.keys().copied().collect()
    }

    fn create(&mut self, record: &ValidatedRecord) -> MutationResult<u64> {
        let id = match record.id {
            Some(explicit) => {
                if self.records.contains_key(&explicit) {
                    return Err(MutationError::Conflict(format!("id {} already exists", explicit)));
                }
                self.next_id = self.next_id.max(explicit + 1);
                explicit
            }
            None => self.allocate_id(),
        };

        let now = Utc::now();
        self.records.insert(
            id,
            StockRecord {
                id,
                name: record.name.clone(),
                inventory: record.inventory,
                category_id: record.category_id,
                description: record.description.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn update(&mut self, id: u64, record: &ValidatedRecord) -> MutationResult<()> {
        let stored = self
            .records
            .get_mut(&id)
            .ok_or(MutationError::NotFound(id))?;
        stored.name = record.name.clone();
        stored.inventory = record.inventory;
        stored.category_id = record.category_id;
        stored.description = record.description.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }
}

impl RecordSource for MemoryStore {
    /// The snapshot is materialized here because the backing map lives in
    /// memory anyway; the returned iterator is still pulled lazily by the
    /// export stream.
    fn records(&self, spec: &ExportSpec) -> Box<dyn Iterator<Item = StockRecord> + Send> {
        let mut matches: Vec<StockRecord> = self
            .records
            .values()
            .filter(|r| spec.matches(r))
            .cloned()
            .collect();

        if let Some(sort) = spec.sort {
            matches.sort_by(|a, b| {
                let ordering = match sort.field {
                    SortField::Id => a.id.cmp(&b.id),
                    SortField::Name => a.name.cmp(&b.name),
                    SortField::Inventory => a.inventory.cmp(&b.inventory),
                    SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                    SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                };
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Box::new(matches.into_iter())
    }
}
