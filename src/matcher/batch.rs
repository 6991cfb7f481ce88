//! Pattern batching
//!
//! One alternation over thousands of terms is slow to compile and can hit
//! the regex size limit. Terms are cut into bounded batches and each batch
//! becomes its own case-insensitive, word-bounded pattern.

use regex::{Regex, RegexBuilder};

use crate::config::TERM_BATCH_SIZE;
use crate::error::GlossError;
use crate::matcher::terms::Term;

/// Compiled pattern for one batch of terms
#[derive(Debug, Clone)]
pub struct TermPattern {
    regex: Regex,
}

impl TermPattern {
    /// Escape every term and join them, in input order, into
    /// `\b(?:t1|t2|...)\b`. Alternation is leftmost-first, so earlier terms
    /// win over later ones starting at the same position.
    pub fn compile(batch: &[Term]) -> Result<Self, GlossError> {
        if batch.is_empty() {
            return Err(GlossError::InvalidPattern("empty term batch".to_string()));
        }

        let alternation = batch
            .iter()
            .map(|t| regex::escape(&t.text))
            .collect::<Vec<_>>()
            .join("|");

        let regex = RegexBuilder::new(&format!(r"\b(?:{})\b", alternation))
            .case_insensitive(true)
            .build()?;

        Ok(Self { regex })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Partition terms into consecutive batches of at most `size`
pub fn split_into_batches(terms: &[Term], size: usize) -> Vec<&[Term]> {
    terms.chunks(size.max(1)).collect()
}

/// Batch with the default size and compile each batch.
/// A batch that fails to compile is skipped, the rest still run.
pub fn compile_batches(terms: &[Term]) -> Vec<TermPattern> {
    split_into_batches(terms, TERM_BATCH_SIZE)
        .into_iter()
        .enumerate()
        .filter_map(|(idx, batch)| match TermPattern::compile(batch) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                crate::log_warn!("[PatternBatcher] Batch {} skipped: {}", idx, e);
                None
            }
        })
        .collect()
}
