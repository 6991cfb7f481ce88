//! Document tree abstraction
//!
//! The scanner and rewriter only talk to the page through these two traits.
//! `PageTree` is an arena implementation for native use and tests;
//! `web::WebDocument` implements the same traits over the live DOM.

pub mod page;
pub mod rewrite;
pub mod scan;

pub use page::*;
pub use rewrite::*;
pub use scan::*;

use std::fmt::Debug;

use crate::error::GlossError;

/// Read-only view of a document
pub trait DocumentTree {
    type Node: Clone + PartialEq + Debug;

    /// Child nodes in document order
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Character data, for text nodes only
    fn text(&self, node: &Self::Node) -> Option<String>;

    /// Lowercase tag name, for element nodes only
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    fn has_class(&self, node: &Self::Node, class: &str) -> bool;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// The primary content container (`main`) if present, else the body
    fn content_root(&self) -> Option<Self::Node>;

    /// Concatenated text of every descendant text node
    fn text_content(&self, node: &Self::Node) -> String {
        let mut out = String::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(&current) {
                out.push_str(&text);
                continue;
            }
            let mut children = self.children(&current);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

/// Mutations the annotator is allowed to make
pub trait DocumentMut: DocumentTree {
    /// Swap a text node for the spans of a plan in one operation.
    /// Returns the inserted nodes in order.
    fn replace_text(&mut self, node: &Self::Node, spans: &[Span]) -> Result<Vec<Self::Node>, GlossError>;

    /// Put `original` back where `inserted` currently sit and drop them
    fn restore(&mut self, original: &Self::Node, inserted: &[Self::Node]) -> Result<(), GlossError>;

    /// Every annotation element currently attached
    fn annotations(&self) -> Vec<Self::Node>;

    /// Replace an annotation element with a text node of its content
    fn unwrap_annotation(&mut self, node: &Self::Node) -> Result<(), GlossError>;
}
