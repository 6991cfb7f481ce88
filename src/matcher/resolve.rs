//! Lookup resolution: matched text back to its glossary entry
//!
//! Comparison is case-insensitive and exact against the name and each
//! synonym. When several entries share a term, the first one in list order
//! that passes the gate wins.

use std::collections::HashMap;
use std::rc::Rc;

use crate::glossary::GlossaryEntry;
use crate::matcher::terms::Gate;

pub struct Resolver {
    entries: Rc<[GlossaryEntry]>,
    /// lowercased term -> entry indices in list order
    index: HashMap<String, Vec<usize>>,
    gate: Gate,
}

impl Resolver {
    pub fn new(entries: Rc<[GlossaryEntry]>, gate: Gate) -> Self {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            for term in entry.terms() {
                let owners = index.entry(term.to_lowercase()).or_default();
                if owners.last() != Some(&idx) {
                    owners.push(idx);
                }
            }
        }
        Self { entries, index, gate }
    }

    /// Both the category and the outcomes check are applied here, even for
    /// terms that already passed extraction.
    pub fn resolve(&self, matched: &str) -> Option<&GlossaryEntry> {
        self.index
            .get(&matched.to_lowercase())?
            .iter()
            .map(|&idx| &self.entries[idx])
            .find(|entry| self.gate.admits(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentTypeFilters;

    fn entries() -> Rc<[GlossaryEntry]> {
        vec![
            GlossaryEntry::new("Vitamin D", vec!["Vit D".into()], "glossary", "", "/vitamin-d"),
            GlossaryEntry::new("Fat Loss", vec![], "topics", "", "/topics/fat-loss/outcomes"),
            GlossaryEntry::new("Fat Loss", vec![], "topics", "", "/topics/fat-loss"),
            GlossaryEntry::new("Iron", vec![], "interventions", "", "/supplements/iron"),
        ]
        .into()
    }

    #[test]
    fn test_resolves_name_and_synonym_case_insensitively() {
        let resolver = Resolver::new(entries(), Gate::new(ContentTypeFilters::default()));

        assert_eq!(resolver.resolve("VITAMIN d").unwrap().url, "/vitamin-d");
        assert_eq!(resolver.resolve("vit D").unwrap().url, "/vitamin-d");
        assert!(resolver.resolve("Vitamin").is_none());
    }

    #[test]
    fn test_first_admitted_entry_wins() {
        let resolver = Resolver::new(entries(), Gate::new(ContentTypeFilters::default()));
        // outcome entry is listed first but suppressed while outcomes is off
        assert_eq!(resolver.resolve("fat loss").unwrap().url, "/topics/fat-loss");

        let with_outcomes = Gate::new(ContentTypeFilters {
            outcomes: true,
            ..ContentTypeFilters::default()
        });
        let resolver = Resolver::new(entries(), with_outcomes);
        assert_eq!(resolver.resolve("fat loss").unwrap().url, "/topics/fat-loss/outcomes");
    }

    #[test]
    fn test_disabled_category_does_not_resolve() {
        let gate = Gate::new(ContentTypeFilters {
            interventions: false,
            ..ContentTypeFilters::default()
        });
        let resolver = Resolver::new(entries(), gate);
        assert!(resolver.resolve("Iron").is_none());
    }
}
