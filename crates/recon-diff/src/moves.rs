//! Cross-file move detection.
//!
//! A DELETE in one file and an ADD in another are reclassified as a MOVE
//! pair when they describe the same kind of element and their contents are
//! near-identical. Matching is greedy by descending similarity, so every
//! record takes part in at most one move.

use recon_types::{ChangeRecord, ChangeType, MoveLink};
use similar::TextDiff;
use tracing::debug;

use crate::config::DiffConfig;
use crate::token_diff::TokenSummarizer;

/// Both halves of a detected move.
#[derive(Clone, Debug, PartialEq)]
pub struct MovePair {
    /// Record in the file the element left.
    pub source: ChangeRecord,
    /// Record in the file the element arrived in.
    pub target: ChangeRecord,
    pub similarity: f64,
}

/// Result of [`MoveDetector::detect_moves`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MoveDetection {
    pub moves: Vec<MovePair>,
    /// DELETE records that stayed deletions.
    pub removed: Vec<ChangeRecord>,
    /// ADD records that stayed additions.
    pub added: Vec<ChangeRecord>,
}

#[derive(Clone, Debug)]
pub struct MoveDetector {
    threshold: f64,
    summarizer: TokenSummarizer,
}

impl Default for MoveDetector {
    fn default() -> Self {
        Self::from_config(&DiffConfig::default())
    }
}

impl MoveDetector {
    pub fn from_config(config: &DiffConfig) -> Self {
        Self {
            threshold: config.move_threshold,
            summarizer: TokenSummarizer::from_config(config),
        }
    }

    /// Word-level similarity of two contents in `0.0..=1.0`.
    pub fn similarity(a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        f64::from(TextDiff::from_words(a, b).ratio())
    }

    /// Split removed and added records into moves and leftovers.
    pub fn detect_moves(&self, removed: Vec<ChangeRecord>, added: Vec<ChangeRecord>) -> MoveDetection {
        let matches = {
            let removed_refs: Vec<&ChangeRecord> = removed.iter().collect();
            let added_refs: Vec<&ChangeRecord> = added.iter().collect();
            self.matches(&removed_refs, &added_refs)
        };

        let mut removed: Vec<Option<ChangeRecord>> = removed.into_iter().map(Some).collect();
        let mut added: Vec<Option<ChangeRecord>> = added.into_iter().map(Some).collect();
        let mut moves = Vec::with_capacity(matches.len());
        for (r, a, similarity) in matches {
            if let (Some(source), Some(target)) = (removed[r].take(), added[a].take()) {
                let (source, target) = self.pair_up(&source, &target);
                moves.push(MovePair {
                    source,
                    target,
                    similarity,
                });
            }
        }

        MoveDetection {
            moves,
            removed: removed.into_iter().flatten().collect(),
            added: added.into_iter().flatten().collect(),
        }
    }

    /// Reclassify moves within a combined record list.
    ///
    /// Each matched DELETE is replaced by the source half and each matched
    /// ADD by the target half, so records keep their positions. Returns the
    /// number of moves found.
    pub fn reclassify(&self, records: &mut [ChangeRecord]) -> usize {
        let removed_at: Vec<usize> = (0..records.len())
            .filter(|&i| records[i].change_type == ChangeType::Delete)
            .collect();
        let added_at: Vec<usize> = (0..records.len())
            .filter(|&i| records[i].change_type == ChangeType::Add)
            .collect();

        let matches = {
            let removed: Vec<&ChangeRecord> = removed_at.iter().map(|&i| &records[i]).collect();
            let added: Vec<&ChangeRecord> = added_at.iter().map(|&i| &records[i]).collect();
            self.matches(&removed, &added)
        };

        for &(r, a, _) in &matches {
            let (source, target) = self.pair_up(&records[removed_at[r]], &records[added_at[a]]);
            records[removed_at[r]] = source;
            records[added_at[a]] = target;
        }
        matches.len()
    }

    /// One-to-one matches as `(removed index, added index, similarity)`.
    fn matches(&self, removed: &[&ChangeRecord], added: &[&ChangeRecord]) -> Vec<(usize, usize, f64)> {
        let mut candidates = Vec::new();
        for (r, del) in removed.iter().enumerate() {
            let Some(tag) = candidate_tag(del, ChangeType::Delete) else {
                continue;
            };
            for (a, add) in added.iter().enumerate() {
                if add.file_id == del.file_id || candidate_tag(add, ChangeType::Add).as_deref() != Some(tag.as_str()) {
                    continue;
                }
                if similarity_bound(&del.old_content, &add.new_content) < self.threshold {
                    continue;
                }
                let score = Self::similarity(&del.old_content, &add.new_content);
                if score >= self.threshold {
                    candidates.push((r, a, score));
                }
            }
        }

        candidates.sort_by(|&(r1, a1, s1), &(r2, a2, s2)| {
            s2.total_cmp(&s1).then_with(|| {
                let key = |r: usize, a: usize| {
                    (
                        &removed[r].file_id,
                        &removed[r].xml_path,
                        &added[a].file_id,
                        &added[a].xml_path,
                    )
                };
                key(r1, a1).cmp(&key(r2, a2))
            })
        });

        let mut removed_used = vec![false; removed.len()];
        let mut added_used = vec![false; added.len()];
        let mut matches = Vec::new();
        for (r, a, score) in candidates {
            if removed_used[r] || added_used[a] {
                continue;
            }
            removed_used[r] = true;
            added_used[a] = true;
            debug!(
                from = %removed[r].file_id,
                to = %added[a].file_id,
                path = %removed[r].xml_path,
                similarity = score,
                "detected move"
            );
            matches.push((r, a, score));
        }
        matches.sort_by_key(|&(r, a, _)| (r, a));
        matches
    }

    fn pair_up(&self, removed: &ChangeRecord, added: &ChangeRecord) -> (ChangeRecord, ChangeRecord) {
        let link = MoveLink::correlate(
            &removed.file_id,
            &removed.xml_path,
            &added.file_id,
            &added.xml_path,
        );

        let mut summary = format!(
            "MOVED: '{}{}' → '{}{}'",
            removed.file_id, removed.xml_path, added.file_id, added.xml_path
        );
        let delta = self.summarizer.summarize(&removed.old_content, &added.new_content);
        if !delta.is_empty() {
            summary.push_str(", ");
            summary.push_str(&delta);
        }

        let source = ChangeRecord::moved(
            removed.file_id.clone(),
            removed.xml_path.clone(),
            removed.old_content.clone(),
            added.new_content.clone(),
            &link,
        )
        .with_summary(summary.clone())
        .with_approval(removed.approval);
        let target = ChangeRecord::moved(
            added.file_id.clone(),
            added.xml_path.clone(),
            removed.old_content.clone(),
            added.new_content.clone(),
            &link.target(),
        )
        .with_summary(summary)
        .with_approval(added.approval);
        (source, target)
    }
}

/// Tag of the element a DELETE/ADD record carries, if it may take part in
/// a move. Whole-file records never do.
fn candidate_tag(record: &ChangeRecord, expected: ChangeType) -> Option<String> {
    if record.change_type != expected || record.is_whole_file() {
        return None;
    }
    let parsed = record.xml_path.parse().ok()?;
    if parsed.attribute.is_some() {
        return None;
    }
    parsed.last().map(|segment| segment.tag.clone())
}

/// Upper bound of [`MoveDetector::similarity`] from token counts alone.
fn similarity_bound(a: &str, b: &str) -> f64 {
    let (x, y) = (word_tokens(a), word_tokens(b));
    if x + y == 0 {
        return 1.0;
    }
    (2 * x.min(y)) as f64 / (x + y) as f64
}

/// Number of alternating word and whitespace runs.
fn word_tokens(s: &str) -> usize {
    let mut count = 0;
    let mut last: Option<bool> = None;
    for c in s.chars() {
        let ws = c.is_whitespace();
        if last != Some(ws) {
            count += 1;
            last = Some(ws);
        }
    }
    count
}
