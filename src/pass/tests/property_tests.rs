use super::fixtures::*;
use crate::config::{ContentTypeFilters, LinkOption};
use crate::glossary::GlossaryEntry;
use crate::matcher::{compile_batches, extract_terms, Gate, Resolver};
use crate::tree::{text_nodes, DocumentMut, DocumentTree, FirstMentionSet, MatchRewriter, PageTree};
use std::collections::HashMap;
use std::rc::Rc;

fn flattened(page: &PageTree) -> String {
    page.text_content(&page.root())
}

// -----------------------------------------------------------------------------
// Annotating never adds, drops or reorders characters
// -----------------------------------------------------------------------------
#[test]
fn test_content_preserved() {
    for option in [LinkOption::First, LinkOption::All] {
        let page = mixed_page();
        let before = flattened(&page);

        let mut annotator = annotator(page, mixed_entries(), option);
        annotator.run_pass().unwrap();

        assert_eq!(flattened(annotator.doc()), before);
        assert!(!annotator.doc().annotations().is_empty());
    }
}

// -----------------------------------------------------------------------------
// Each text node's plan flattens back to that node's text
// -----------------------------------------------------------------------------
#[test]
fn test_each_plan_flattens_to_original() {
    let page = mixed_page();
    let entries: Rc<[GlossaryEntry]> = mixed_entries().into();
    let gate = Gate::new(ContentTypeFilters::default());
    let terms = extract_terms(&entries, &gate);
    let resolver = Resolver::new(Rc::clone(&entries), gate);

    for option in [LinkOption::First, LinkOption::All] {
        let rewriter = MatchRewriter::new(&resolver, option);
        let mut mentions = FirstMentionSet::new();
        for pattern in compile_batches(&terms) {
            for node in text_nodes(&page, &page.root()) {
                let text = page.text(&node).unwrap();
                if let Some(plan) = rewriter.plan(&text, &pattern, &mut mentions) {
                    assert_eq!(plan.flatten(), text);
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// No two annotations cover the same text, none is nested
// -----------------------------------------------------------------------------
#[test]
fn test_annotations_never_nest() {
    let mut annotator = annotator(mixed_page(), mixed_entries(), LinkOption::All);
    annotator.run_pass().unwrap();
    annotator.run_pass().unwrap();

    let page = annotator.doc();
    for a in page.annotations() {
        let children = page.children(&a);
        assert_eq!(children.len(), 1);
        assert!(page.text(&children[0]).is_some());
    }
}

// -----------------------------------------------------------------------------
// Revert restores the exact original structure
// -----------------------------------------------------------------------------
#[test]
fn test_revert_restores_structure() {
    let page = mixed_page();
    let before = page.render(page.root());

    let mut annotator = annotator(page, mixed_entries(), LinkOption::All);
    annotator.run_pass().unwrap();
    assert_ne!(annotator.doc().render(annotator.doc().root()), before);

    let restored = annotator.revert();
    assert_eq!(restored, 5);
    assert_eq!(annotator.doc().render(annotator.doc().root()), before);
}

// -----------------------------------------------------------------------------
// Revert-then-rescan twice yields the same tree
// -----------------------------------------------------------------------------
#[test]
fn test_rescan_is_idempotent() {
    for option in [LinkOption::First, LinkOption::All] {
        let mut annotator = annotator(mixed_page(), mixed_entries(), option);

        annotator.run_pass().unwrap();
        let first = annotator.doc().render(annotator.doc().root());

        annotator.run_pass().unwrap();
        let second = annotator.doc().render(annotator.doc().root());

        assert_eq!(first, second);
    }
}

// -----------------------------------------------------------------------------
// First-mention: at most one annotation per url after a full pass
// -----------------------------------------------------------------------------
#[test]
fn test_first_mention_at_most_once_per_url() {
    let mut annotator = annotator(mixed_page(), mixed_entries(), LinkOption::First);
    annotator.run_pass().unwrap();
    annotator.run_pass().unwrap();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for (_, url) in annotations(annotator.doc()) {
        *counts.entry(url).or_default() += 1;
    }
    assert!(counts.values().all(|&c| c == 1));
    assert_eq!(counts.len(), 3);
}

// -----------------------------------------------------------------------------
// Stray annotations (not in the journal) are unwrapped too
// -----------------------------------------------------------------------------
#[test]
fn test_revert_unwraps_foreign_annotations() {
    let mut page = PageTree::new();
    let p = page.element(page.root(), "p");
    let link = page.element_with(p, "a", &[("class", "glossary-highlight"), ("data-url", "/old")]);
    page.add_text(link, "Vitamin D");
    page.add_text(p, " from a previous instance");

    let mut annotator = annotator(page, vec![vitamin_d()], LinkOption::All);
    annotator.run_pass().unwrap();

    // the stale annotation was unwrapped, then its text annotated afresh
    assert_eq!(
        annotations(annotator.doc()),
        vec![("Vitamin D".to_string(), "/vitamin-d".to_string())]
    );
    assert_eq!(
        flattened(annotator.doc()),
        "Vitamin D from a previous instance"
    );
}
