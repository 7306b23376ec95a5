//! Focused summaries: word-level descriptions of a text change.
//!
//! Both texts are split on whitespace and aligned with an LCS diff over the
//! tokens. Each changed run is rendered with a few unchanged words of
//! context on either side and the run itself in brackets:
//!
//! ```text
//! CHANGED: 'the quick [brown] fox jumps' → 'the quick [red] fox jumps'
//! ```

use std::ops::Range;

use similar::{capture_diff_slices, Algorithm, DiffTag};

use crate::config::DiffConfig;

/// Renders focused summaries with fixed limits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSummarizer {
    context_words: usize,
    max_input_chars: usize,
    max_summary_chars: usize,
}

impl Default for TokenSummarizer {
    fn default() -> Self {
        Self::from_config(&DiffConfig::default())
    }
}

impl TokenSummarizer {
    pub fn from_config(config: &DiffConfig) -> Self {
        Self {
            context_words: config.context_words,
            max_input_chars: config.max_input_chars,
            max_summary_chars: config.max_summary_chars,
        }
    }

    /// Describe how `new` differs from `old`.
    ///
    /// Returns an empty string when the token sequences are identical or
    /// when either input is longer than the input limit.
    pub fn summarize(&self, old: &str, new: &str) -> String {
        if old.chars().count() > self.max_input_chars || new.chars().count() > self.max_input_chars {
            return String::new();
        }

        let old_tokens: Vec<&str> = old.split_whitespace().collect();
        let new_tokens: Vec<&str> = new.split_whitespace().collect();
        if old_tokens == new_tokens {
            return String::new();
        }

        let runs: Vec<String> = changed_runs(&old_tokens, &new_tokens)
            .into_iter()
            .map(|(o, n)| match (o.is_empty(), n.is_empty()) {
                (false, false) => format!(
                    "CHANGED: '{}' → '{}'",
                    self.context(&old_tokens, o),
                    self.context(&new_tokens, n)
                ),
                (false, true) => format!("REMOVED: '{}'", self.context(&old_tokens, o)),
                _ => format!("ADDED: '{}'", self.context(&new_tokens, n)),
            })
            .collect();

        truncate(runs.join(", "), self.max_summary_chars)
    }

    fn context(&self, tokens: &[&str], run: Range<usize>) -> String {
        let before = &tokens[run.start.saturating_sub(self.context_words)..run.start];
        let after = &tokens[run.end..(run.end + self.context_words).min(tokens.len())];
        format!("{} [{}] {}", before.join(" "), tokens[run].join(" "), after.join(" "))
            .trim()
            .to_string()
    }
}

/// Summarize with the default limits.
pub fn summarize(old: &str, new: &str) -> String {
    TokenSummarizer::default().summarize(old, new)
}

/// Maximal runs of non-equal operations as `(old range, new range)`.
fn changed_runs(old: &[&str], new: &[&str]) -> Vec<(Range<usize>, Range<usize>)> {
    let mut runs: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    let mut open = false;
    for op in capture_diff_slices(Algorithm::Lcs, old, new) {
        let (tag, o, n) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            open = false;
            continue;
        }
        match runs.last_mut() {
            Some((ro, rn)) if open => {
                ro.end = ro.end.max(o.end);
                rn.end = rn.end.max(n.end);
            }
            _ => runs.push((o, n)),
        }
        open = true;
    }
    runs
}

fn truncate(summary: String, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        return summary;
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = summary.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
