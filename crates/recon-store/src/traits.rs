use recon_types::{Approval, ChangeRecord};
use serde::Serialize;

use crate::error::StoreResult;

/// Persistent home of a batch's change records.
///
/// Implementations must satisfy these invariants:
/// - `save` replaces the stored set; records are kept in the given order.
/// - `load` returns every decodable record in stored order, reporting
///   undecodable rows instead of failing on them.
/// - Approval values that are not a recognised state load as pending.
pub trait ChangeStore: Send + Sync {
    /// Replace the stored records.
    fn save(&self, records: &[ChangeRecord]) -> StoreResult<()>;

    /// Read the stored records back.
    fn load(&self) -> StoreResult<LoadedRecords>;
}

/// A row that could not be turned into a record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    /// 1-based line number in the source, where known.
    pub line: u64,
    pub reason: String,
}

/// Records read from a store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadedRecords {
    pub records: Vec<ChangeRecord>,
    pub malformed: Vec<MalformedRow>,
}

impl LoadedRecords {
    pub fn approval_counts(&self) -> ApprovalCounts {
        let mut counts = ApprovalCounts::default();
        for record in &self.records {
            counts.add(record.approval);
        }
        counts
    }

    /// Returns `true` if at least one record is approved.
    pub fn has_approved(&self) -> bool {
        self.records.iter().any(|r| r.approval.is_approved())
    }
}

/// How many records carry each reviewer decision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalCounts {
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl ApprovalCounts {
    pub fn add(&mut self, approval: Approval) {
        match approval {
            Approval::Approved => self.approved += 1,
            Approval::Rejected => self.rejected += 1,
            Approval::Pending => self.pending += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.approved + self.rejected + self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_types::LocationPath;

    #[test]
    fn counts_each_decision() {
        let record = ChangeRecord::modify("doc", LocationPath::new("/v"), "1", "2");
        let loaded = LoadedRecords {
            records: vec![
                record.clone().with_approval(Approval::Approved),
                record.clone().with_approval(Approval::Rejected),
                record.clone(),
                record,
            ],
            malformed: Vec::new(),
        };
        let counts = loaded.approval_counts();
        assert_eq!((counts.approved, counts.rejected, counts.pending), (1, 1, 2));
        assert_eq!(counts.total(), 4);
        assert!(loaded.has_approved());
        assert!(!LoadedRecords::default().has_approved());
    }
}
