use std::sync::{PoisonError, RwLock};

use recon_types::ChangeRecord;

use crate::error::StoreResult;
use crate::traits::{ChangeStore, LoadedRecords};

/// In-memory change store.
///
/// Intended for tests and embedding. Records are cloned on save and load.
#[derive(Debug, Default)]
pub struct InMemoryChangeStore {
    records: RwLock<Vec<ChangeRecord>>,
}

impl InMemoryChangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rewrite stored records in place, as a reviewer would.
    pub fn update(&self, f: impl FnOnce(&mut Vec<ChangeRecord>)) {
        f(&mut self.records.write().unwrap_or_else(PoisonError::into_inner));
    }
}

impl ChangeStore for InMemoryChangeStore {
    fn save(&self, records: &[ChangeRecord]) -> StoreResult<()> {
        *self.records.write().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        Ok(())
    }

    fn load(&self) -> StoreResult<LoadedRecords> {
        Ok(LoadedRecords {
            records: self.records.read().unwrap_or_else(PoisonError::into_inner).clone(),
            malformed: Vec::new(),
        })
    }
}
