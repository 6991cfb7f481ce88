//! Term extraction and category gating
//!
//! `Gate` is the shared predicate used twice per pass: once here to decide
//! which entries contribute terms, and again by the resolver for every match.

use crate::config::{ContentTypeFilters, OUTCOMES_MARKER};
use crate::glossary::{ContentType, GlossaryEntry};

// ==================== GATE ====================

/// Snapshot of the category filters taken at pass start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    filters: ContentTypeFilters,
}

impl Gate {
    pub fn new(filters: ContentTypeFilters) -> Self {
        Self { filters }
    }

    /// Unknown categories fail closed
    pub fn is_content_type_enabled(&self, kind: ContentType) -> bool {
        match kind {
            ContentType::Interventions => self.filters.interventions,
            ContentType::Topics => self.filters.topics,
            ContentType::Glossary => self.filters.glossary,
            ContentType::Other => false,
        }
    }

    /// Outcome pages are hidden while the outcomes flag is off
    pub fn is_outcomes_suppressed(&self, url: &str) -> bool {
        !self.filters.outcomes && url.contains(OUTCOMES_MARKER)
    }

    /// Both checks together; what final resolution requires
    pub fn admits(&self, entry: &GlossaryEntry) -> bool {
        self.is_content_type_enabled(entry.kind()) && !self.is_outcomes_suppressed(&entry.url)
    }
}

// ==================== EXTRACTION ====================

/// A matchable string and the index of the entry that contributed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub entry: usize,
}

/// Flatten enabled entries into their names and synonyms, in list order.
///
/// Only the category filter applies here; the outcomes check happens at
/// resolution time. Blank strings are dropped because an empty alternative
/// would match between every pair of word characters.
pub fn extract_terms(entries: &[GlossaryEntry], gate: &Gate) -> Vec<Term> {
    let mut terms = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        if !gate.is_content_type_enabled(entry.kind()) {
            continue;
        }
        for text in entry.terms() {
            if text.trim().is_empty() {
                continue;
            }
            terms.push(Term {
                text: text.to_string(),
                entry: idx,
            });
        }
    }
    terms
}

// ==================== TESTS ====================
