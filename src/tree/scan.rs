//! TreeScanner: finds text nodes eligible for matching
//!
//! Pre-order, document-order walk over text leaves. Read-only; the same tree
//! and pattern always yield the same candidates.
//!
//! A text node is skipped when
//! - its parent is `script`, `style` or `a`, or
//! - any ancestor up to the document root is an interactive control, a
//!   link-like widget (class `r` or `role="link"`), or a subtree added by
//!   this extension (annotation or panel).

use crate::config::{ANNOTATION_CLASS, LINK_WIDGET_CLASS, PANEL_CLASS};
use crate::matcher::TermPattern;
use crate::tree::DocumentTree;

/// Containers whose direct text is never prose
const NON_PROSE_PARENTS: &[&str] = &["script", "style", "a"];

/// Controls that exclude their whole subtree
const INTERACTIVE_TAGS: &[&str] = &["a", "button", "input", "select", "textarea"];

/// Text leaves under `root` in document order
pub fn text_nodes<D: DocumentTree>(doc: &D, root: &D::Node) -> Vec<D::Node> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        if doc.text(&node).is_some() {
            out.push(node);
            continue;
        }
        let mut children = doc.children(&node);
        children.reverse();
        stack.extend(children);
    }
    out
}

fn is_excluded_ancestor<D: DocumentTree>(doc: &D, node: &D::Node) -> bool {
    if let Some(tag) = doc.tag_name(node) {
        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            return true;
        }
    }
    doc.has_class(node, LINK_WIDGET_CLASS)
        || doc.has_class(node, ANNOTATION_CLASS)
        || doc.has_class(node, PANEL_CLASS)
        || doc.attribute(node, "role").as_deref() == Some("link")
}

/// Whether a text node may be annotated at all
pub fn is_eligible<D: DocumentTree>(doc: &D, node: &D::Node) -> bool {
    let parent = match doc.parent(node) {
        Some(parent) => parent,
        None => return false,
    };
    if let Some(tag) = doc.tag_name(&parent) {
        if NON_PROSE_PARENTS.contains(&tag.as_str()) {
            return false;
        }
    }

    let mut current = Some(parent);
    while let Some(ancestor) = current {
        if is_excluded_ancestor(doc, &ancestor) {
            return false;
        }
        current = doc.parent(&ancestor);
    }
    true
}

/// Eligible text nodes under `root` that match `pattern` at least once
pub fn collect_candidates<D: DocumentTree>(doc: &D, root: &D::Node, pattern: &TermPattern) -> Vec<D::Node> {
    text_nodes(doc, root)
        .into_iter()
        .filter(|node| is_eligible(doc, node))
        .filter(|node| doc.text(node).map(|t| pattern.is_match(&t)).unwrap_or(false))
        .collect()
}

/// Whether a node inserted by the page warrants a rescan. Text nodes and
/// this extension's own elements never do.
pub fn is_relevant_addition<D: DocumentTree>(doc: &D, node: &D::Node) -> bool {
    doc.tag_name(node).is_some()
        && !doc.has_class(node, ANNOTATION_CLASS)
        && !doc.has_class(node, PANEL_CLASS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Term;
    use crate::tree::PageTree;

    fn pattern(texts: &[&str]) -> TermPattern {
        let terms: Vec<Term> = texts
            .iter()
            .map(|t| Term {
                text: t.to_string(),
                entry: 0,
            })
            .collect();
        TermPattern::compile(&terms).unwrap()
    }

    #[test]
    fn test_document_order() {
        let mut page = PageTree::new();
        let root = page.root();
        let p1 = page.element(root, "p");
        let a = page.add_text(p1, "zinc one");
        let em = page.element(p1, "em");
        let b = page.add_text(em, "zinc two");
        let c = page.add_text(p1, "zinc three");
        let p2 = page.element(root, "p");
        let d = page.add_text(p2, "zinc four");

        let found = collect_candidates(&page, &root, &pattern(&["zinc"]));
        assert_eq!(found, vec![a, b, c, d]);
    }

    #[test]
    fn test_skips_non_prose_parents() {
        let mut page = PageTree::new();
        let root = page.root();
        let script = page.element(root, "script");
        page.add_text(script, "var zinc = 1;");
        let style = page.element(root, "style");
        page.add_text(style, ".zinc {}");
        let link = page.element_with(root, "a", &[("href", "/zinc")]);
        page.add_text(link, "zinc");
        let ok = page.add_text(root, "zinc in prose");

        let found = collect_candidates(&page, &root, &pattern(&["zinc"]));
        assert_eq!(found, vec![ok]);
    }

    #[test]
    fn test_skips_deep_interactive_ancestors() {
        let mut page = PageTree::new();
        let root = page.root();
        let button = page.element(root, "button");
        let span = page.element(button, "span");
        let b = page.element(span, "b");
        page.add_text(b, "zinc");

        let link = page.element(root, "a");
        let strong = page.element(link, "strong");
        page.add_text(strong, "zinc");

        let widget = page.element_with(root, "div", &[("role", "link")]);
        let inner = page.element(widget, "span");
        page.add_text(inner, "zinc");

        let styled = page.element_with(root, "div", &[("class", "card r")]);
        page.add_text(styled, "zinc");

        let select = page.element(root, "select");
        let option = page.element(select, "option");
        page.add_text(option, "zinc");

        assert!(collect_candidates(&page, &root, &pattern(&["zinc"])).is_empty());
    }

    #[test]
    fn test_ancestor_walk_goes_past_content_root() {
        let mut page = PageTree::new();
        let button = page.element(page.root(), "button");
        let main = page.element(button, "main");
        let p = page.element(main, "p");
        page.add_text(p, "zinc");

        let root = page.content_root().unwrap();
        assert_eq!(root, main);
        assert!(collect_candidates(&page, &root, &pattern(&["zinc"])).is_empty());
    }

    #[test]
    fn test_skips_extension_panel() {
        let mut page = PageTree::new();
        let panel = page.element_with(page.root(), "div", &[("class", "glossary-tooltip")]);
        page.add_text(panel, "zinc is a mineral");

        let root = page.root();
        assert!(collect_candidates(&page, &root, &pattern(&["zinc"])).is_empty());
    }

    #[test]
    fn test_scan_is_read_only_and_repeatable() {
        let mut page = PageTree::new();
        let root = page.root();
        let p = page.element(root, "p");
        page.add_text(p, "Zinc and iron");
        page.add_text(p, "nothing");
        let before = page.render(root);

        let pat = pattern(&["zinc", "iron"]);
        let first = collect_candidates(&page, &root, &pat);
        let second = collect_candidates(&page, &root, &pat);

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(page.render(root), before);
    }

    #[test]
    fn test_relevant_additions() {
        let mut page = PageTree::new();
        let root = page.root();
        let card = page.element(root, "div");
        let text = page.add_text(root, "late text");
        let ours = page.element_with(root, "a", &[("class", "glossary-highlight")]);
        let panel = page.element_with(root, "div", &[("class", "glossary-tooltip visible")]);

        assert!(is_relevant_addition(&page, &card));
        assert!(!is_relevant_addition(&page, &text));
        assert!(!is_relevant_addition(&page, &ours));
        assert!(!is_relevant_addition(&page, &panel));
    }
}
