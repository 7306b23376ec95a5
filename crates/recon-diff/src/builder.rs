//! Change record assembly.
//!
//! Turns the alignment of one document pair into typed records, and
//! finishes a batch by folding cross-file moves and dropping duplicates.

use std::collections::HashSet;

use recon_doc::Document;
use recon_types::{ChangeRecord, LocationPath};
use tracing::debug;

use crate::address::PathAddresser;
use crate::align::{Alignment, TreeAligner};
use crate::config::DiffConfig;
use crate::error::DiffResult;
use crate::moves::MoveDetector;
use crate::token_diff::TokenSummarizer;

/// Builds change records for document pairs and batches.
#[derive(Clone, Debug)]
pub struct ChangeRecordBuilder {
    config: DiffConfig,
    aligner: TreeAligner,
    summarizer: TokenSummarizer,
    moves: MoveDetector,
}

impl Default for ChangeRecordBuilder {
    fn default() -> Self {
        Self::new(DiffConfig::default())
    }
}

impl ChangeRecordBuilder {
    pub fn new(config: DiffConfig) -> Self {
        Self {
            aligner: TreeAligner::new(PathAddresser::from_config(&config)),
            summarizer: TokenSummarizer::from_config(&config),
            moves: MoveDetector::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Records describing how `revised` differs from `original`.
    ///
    /// Identical trees yield no records. Roots with different tags yield a
    /// whole-file DELETE and ADD.
    pub fn diff_documents(
        &self,
        file_id: &str,
        original: &Document,
        revised: &Document,
    ) -> DiffResult<Vec<ChangeRecord>> {
        let alignment = self.aligner.align(&original.root, &revised.root);
        let records = if alignment.matched.is_empty() {
            let mut records = self.removed_file(file_id, original)?;
            records.extend(self.added_file(file_id, revised)?);
            records
        } else {
            self.records_from_alignment(file_id, &alignment)?
        };

        let records = dedup(records);
        debug!(file = %file_id, records = records.len(), "compared documents");
        Ok(records)
    }

    /// The single record for a document present only in the revised set.
    pub fn added_file(&self, file_id: &str, revised: &Document) -> DiffResult<Vec<ChangeRecord>> {
        let content = revised.to_xml()?;
        let summary = self.summarizer.summarize("", &content);
        Ok(vec![ChangeRecord::add(file_id, LocationPath::root(), content).with_summary(summary)])
    }

    /// The single record for a document present only in the original set.
    pub fn removed_file(&self, file_id: &str, original: &Document) -> DiffResult<Vec<ChangeRecord>> {
        let content = original.to_xml()?;
        let summary = self.summarizer.summarize(&content, "");
        Ok(vec![ChangeRecord::delete(file_id, LocationPath::root(), content).with_summary(summary)])
    }

    fn records_from_alignment(&self, file_id: &str, alignment: &Alignment<'_>) -> DiffResult<Vec<ChangeRecord>> {
        let mut records = Vec::new();

        for pair in alignment.modified() {
            if pair.text_changed() {
                let old = pair.original.text().unwrap_or_default();
                let new = pair.revised.text().unwrap_or_default();
                let summary = self.summarizer.summarize(&old, &new);
                records.push(ChangeRecord::modify(file_id, pair.path.clone(), old, new).with_summary(summary));
            }
            for (name, old, new) in pair.attribute_changes() {
                let (old, new) = (old.unwrap_or_default(), new.unwrap_or_default());
                let summary = self.summarizer.summarize(old, new);
                records.push(
                    ChangeRecord::modify(file_id, pair.path.attribute(name), old, new).with_summary(summary),
                );
            }
        }

        for removed in &alignment.removed {
            let content = removed.element.to_xml()?;
            let summary = self.summarizer.summarize(&content, "");
            records.push(ChangeRecord::delete(file_id, removed.path.clone(), content).with_summary(summary));
        }

        for added in &alignment.added {
            let content = added.element.to_xml()?;
            let summary = self.summarizer.summarize("", &content);
            records.push(ChangeRecord::add(file_id, added.path.clone(), content).with_summary(summary));
        }

        Ok(records)
    }

    /// Finish a batch: fold cross-file moves (when enabled) and drop
    /// duplicate records, keeping the first of each.
    pub fn finalize(&self, mut records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        if self.config.detect_moves {
            let moves = self.moves.reclassify(&mut records);
            debug!(moves, "move detection finished");
        }
        dedup(records)
    }
}

/// Drop records sharing (file, type, path, old, new) with an earlier one.
pub fn dedup(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records.into_iter().filter(|r| seen.insert(r.key())).collect()
}
