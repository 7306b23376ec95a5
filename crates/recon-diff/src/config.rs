use serde::{Deserialize, Serialize};

use crate::error::{DiffError, DiffResult};

/// Tuning knobs for analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Attributes that identify an element among same-tag siblings, in
    /// priority order.
    pub key_attributes: Vec<String>,
    /// Unchanged words shown on each side of a focused change.
    pub context_words: usize,
    /// Texts longer than this get no focused summary.
    pub max_input_chars: usize,
    /// Focused summaries are cut to this many characters.
    pub max_summary_chars: usize,
    /// Minimum word-level similarity for a DELETE/ADD pair to become a move.
    pub move_threshold: f64,
    /// Whether cross-file move detection runs at all.
    pub detect_moves: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            key_attributes: vec!["id".into(), "name".into(), "type".into()],
            context_words: 3,
            max_input_chars: 10_000,
            max_summary_chars: 500,
            move_threshold: 0.9,
            detect_moves: true,
        }
    }
}

impl DiffConfig {
    /// Check the values for consistency.
    pub fn validate(&self) -> DiffResult<()> {
        if !(0.0..=1.0).contains(&self.move_threshold) {
            return Err(DiffError::InvalidConfig(format!(
                "move_threshold must be within 0.0..=1.0, got {}",
                self.move_threshold
            )));
        }
        if self.max_summary_chars < 4 {
            return Err(DiffError::InvalidConfig(
                "max_summary_chars must be at least 4".into(),
            ));
        }
        if self.key_attributes.iter().any(|k| k.trim().is_empty()) {
            return Err(DiffError::InvalidConfig(
                "key_attributes must not contain empty names".into(),
            ));
        }
        Ok(())
    }
}
