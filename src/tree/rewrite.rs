//! MatchRewriter: turns one text node into plain spans and annotations
//!
//! Planning is pure: `plan()` walks the matches of a batch pattern and
//! produces a `ReplacementPlan`. Only `rewrite()` touches the document, with
//! a single replacement per node.
//!
//! Guarantees of a plan:
//! - spans cover the original text exactly, no gaps, no overlaps, same order
//! - every match gets its own span, annotated or not, so a later batch never
//!   matches across it; only the text between matches is plain filler
//! - under `LinkOption::First`, an entry url is annotated at most once per
//!   `FirstMentionSet`, across every node of the pass

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::{LinkOption, LINK_BASE, LINK_TRACKING};
use crate::error::GlossError;
use crate::glossary::GlossaryEntry;
use crate::matcher::{Resolver, TermPattern};
use crate::tree::DocumentMut;

// =============================================================================
// Types
// =============================================================================

/// Data carried by an annotation element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Literal matched text, original casing
    pub text: String,
    pub description: String,
    pub content_type: String,
    pub url: String,
}

impl Annotation {
    pub fn new(text: &str, entry: &GlossaryEntry) -> Self {
        Self {
            text: text.to_string(),
            description: entry.overview.clone(),
            content_type: entry.content_type.clone(),
            url: entry.url.clone(),
        }
    }

    /// Absolute link target with campaign parameters
    pub fn href(&self) -> String {
        format!("{}{}?{}", LINK_BASE, self.url, LINK_TRACKING)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Span {
    Text(String),
    Annotation(Annotation),
}

impl Span {
    pub fn as_str(&self) -> &str {
        match self {
            Span::Text(text) => text,
            Span::Annotation(a) => &a.text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementPlan {
    pub spans: Vec<Span>,
}

impl ReplacementPlan {
    fn push_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.spans.push(Span::Text(text.to_string()));
        }
    }

    pub fn annotation_count(&self) -> usize {
        self.spans
            .iter()
            .filter(|s| matches!(s, Span::Annotation(_)))
            .count()
    }

    /// Text of all spans joined; equals the source text
    pub fn flatten(&self) -> String {
        self.spans.iter().map(Span::as_str).collect()
    }
}

/// Entry urls already annotated in the current pass
#[derive(Debug, Clone, Default)]
pub struct FirstMentionSet {
    seen: HashSet<String>,
}

impl FirstMentionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Returns false when the url was already present
    pub fn insert(&mut self, url: &str) -> bool {
        self.seen.insert(url.to_string())
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Record of one committed node replacement, kept so revert can restore
/// the original node exactly
#[derive(Debug, Clone, PartialEq)]
pub struct Splice<N> {
    pub original: N,
    pub inserted: Vec<N>,
    pub annotations: usize,
}

// =============================================================================
// MatchRewriter
// =============================================================================

pub struct MatchRewriter<'a> {
    resolver: &'a Resolver,
    link_option: LinkOption,
}

impl<'a> MatchRewriter<'a> {
    pub fn new(resolver: &'a Resolver, link_option: LinkOption) -> Self {
        Self {
            resolver,
            link_option,
        }
    }

    /// Build the replacement for `text`. `None` when the pattern does not
    /// match at all. Matches that do not resolve, or whose entry was already
    /// mentioned, stay plain text but keep a span of their own.
    pub fn plan(
        &self,
        text: &str,
        pattern: &TermPattern,
        mentions: &mut FirstMentionSet,
    ) -> Option<ReplacementPlan> {
        let mut plan = ReplacementPlan::default();
        let mut last = 0;
        let mut matched_any = false;

        for m in pattern.regex().find_iter(text) {
            matched_any = true;
            plan.push_text(&text[last..m.start()]);

            let matched = m.as_str();
            match self.accept(matched, mentions) {
                Some(entry) => plan.spans.push(Span::Annotation(Annotation::new(matched, entry))),
                None => plan.push_text(matched),
            }
            last = m.end();
        }

        if !matched_any {
            return None;
        }
        plan.push_text(&text[last..]);
        Some(plan)
    }

    fn accept(&self, matched: &str, mentions: &mut FirstMentionSet) -> Option<&'a GlossaryEntry> {
        let entry = self.resolver.resolve(matched)?;
        if self.link_option == LinkOption::First && !mentions.insert(&entry.url) {
            return None;
        }
        Some(entry)
    }

    /// Plan and commit for one candidate node. A node the pattern does not
    /// match is left untouched; any match splits it, even one that ends up
    /// unannotated.
    pub fn rewrite<D: DocumentMut>(
        &self,
        doc: &mut D,
        node: &D::Node,
        pattern: &TermPattern,
        mentions: &mut FirstMentionSet,
    ) -> Result<Option<Splice<D::Node>>, GlossError> {
        let text = match doc.text(node) {
            Some(text) => text,
            None => return Ok(None),
        };

        let plan = match self.plan(&text, pattern, mentions) {
            Some(plan) => plan,
            None => return Ok(None),
        };

        let inserted = doc.replace_text(node, &plan.spans)?;
        Ok(Some(Splice {
            original: node.clone(),
            inserted,
            annotations: plan.annotation_count(),
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentTypeFilters;
    use crate::matcher::{extract_terms, Gate};
    use std::rc::Rc;

    fn setup(entries: Vec<GlossaryEntry>) -> (Resolver, TermPattern) {
        let entries: Rc<[GlossaryEntry]> = entries.into();
        let gate = Gate::new(ContentTypeFilters::default());
        let terms = extract_terms(&entries, &gate);
        let pattern = TermPattern::compile(&terms).unwrap();
        (Resolver::new(entries, gate), pattern)
    }

    fn vitamin_d() -> GlossaryEntry {
        GlossaryEntry::new(
            "Vitamin D",
            vec!["Vit D".into()],
            "glossary",
            "A secosteroid hormone.",
            "/vitamin-d",
        )
    }

    fn annotated(plan: &ReplacementPlan) -> Vec<&str> {
        plan.spans
            .iter()
            .filter_map(|s| match s {
                Span::Annotation(a) => Some(a.text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_first_mention_only() {
        let (resolver, pattern) = setup(vec![vitamin_d()]);
        let rewriter = MatchRewriter::new(&resolver, LinkOption::First);
        let mut mentions = FirstMentionSet::new();

        let text = "Vitamin D and Vit D are related.";
        let plan = rewriter.plan(text, &pattern, &mut mentions).unwrap();

        assert_eq!(annotated(&plan), vec!["Vitamin D"]);
        assert_eq!(plan.flatten(), text);
        assert_eq!(plan.spans.len(), 4);
        assert_eq!(plan.spans[2], Span::Text("Vit D".to_string()));
        assert!(mentions.contains("/vitamin-d"));
    }

    #[test]
    fn test_all_mentions() {
        let (resolver, pattern) = setup(vec![vitamin_d()]);
        let rewriter = MatchRewriter::new(&resolver, LinkOption::All);
        let mut mentions = FirstMentionSet::new();

        let text = "Vitamin D and Vit D are related.";
        let plan = rewriter.plan(text, &pattern, &mut mentions).unwrap();

        assert_eq!(annotated(&plan), vec!["Vitamin D", "Vit D"]);
        assert_eq!(plan.flatten(), text);
        assert!(mentions.is_empty());
    }

    #[test]
    fn test_mentions_persist_across_calls() {
        let (resolver, pattern) = setup(vec![vitamin_d()]);
        let rewriter = MatchRewriter::new(&resolver, LinkOption::First);
        let mut mentions = FirstMentionSet::new();

        let first = rewriter.plan("Vitamin D first.", &pattern, &mut mentions).unwrap();
        let second = rewriter.plan("Then vit d again.", &pattern, &mut mentions).unwrap();

        assert_eq!(first.annotation_count(), 1);
        assert_eq!(second.annotation_count(), 0);
        assert_eq!(
            second.spans,
            vec![
                Span::Text("Then ".to_string()),
                Span::Text("vit d".to_string()),
                Span::Text(" again.".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_match_returns_none() {
        let (resolver, pattern) = setup(vec![vitamin_d()]);
        let rewriter = MatchRewriter::new(&resolver, LinkOption::All);
        let mut mentions = FirstMentionSet::new();

        assert!(rewriter.plan("Nothing here", &pattern, &mut mentions).is_none());
    }

    #[test]
    fn test_preserves_matched_casing_and_edges() {
        let (resolver, pattern) = setup(vec![vitamin_d()]);
        let rewriter = MatchRewriter::new(&resolver, LinkOption::All);
        let mut mentions = FirstMentionSet::new();

        let plan = rewriter.plan("VITAMIN D", &pattern, &mut mentions).unwrap();
        assert_eq!(plan.spans.len(), 1);
        match &plan.spans[0] {
            Span::Annotation(a) => {
                assert_eq!(a.text, "VITAMIN D");
                assert_eq!(a.url, "/vitamin-d");
                assert_eq!(a.description, "A secosteroid hormone.");
            }
            other => panic!("expected annotation, got {:?}", other),
        }
    }

    #[test]
    fn test_suppressed_outcome_passes_through() {
        let (resolver, pattern) = setup(vec![GlossaryEntry::new(
            "Muscle Gain",
            vec![],
            "topics",
            "",
            "/topics/muscle-gain/outcomes",
        )]);
        let rewriter = MatchRewriter::new(&resolver, LinkOption::All);
        let mut mentions = FirstMentionSet::new();

        let plan = rewriter.plan("Aids muscle gain.", &pattern, &mut mentions).unwrap();
        assert_eq!(plan.annotation_count(), 0);
        assert_eq!(
            plan.spans,
            vec![
                Span::Text("Aids ".to_string()),
                Span::Text("muscle gain".to_string()),
                Span::Text(".".to_string()),
            ]
        );
    }

    #[test]
    fn test_href_has_tracking() {
        let a = Annotation::new("Zinc", &GlossaryEntry::new("Zinc", vec![], "interventions", "", "/supplements/zinc"));
        assert_eq!(
            a.href(),
            "https://examine.com/supplements/zinc?utm_source=browser-extension-chrome&utm_medium=external&utm_campaign=browser-extension"
        );
    }
}
