//! WebDocument: the live DOM behind the tree traits

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

use crate::config::ANNOTATION_CLASS;
use crate::error::GlossError;
use crate::tree::{Annotation, DocumentMut, DocumentTree, Span};

fn dom_err(e: JsValue) -> GlossError {
    GlossError::Dom(format!("{:?}", e))
}

pub struct WebDocument {
    document: Document,
}

impl WebDocument {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn from_window() -> Option<Self> {
        web_sys::window()?.document().map(Self::new)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn build_annotation(&self, annotation: &Annotation) -> Result<Node, GlossError> {
        let link = self.document.create_element("a").map_err(dom_err)?;
        link.set_class_name(ANNOTATION_CLASS);
        link.set_attribute("data-description", &annotation.description).map_err(dom_err)?;
        link.set_attribute("data-url", &annotation.url).map_err(dom_err)?;
        link.set_attribute("data-type", &annotation.content_type).map_err(dom_err)?;
        link.set_attribute("href", &annotation.href()).map_err(dom_err)?;
        link.set_attribute("target", "_blank").map_err(dom_err)?;
        link.append_child(&self.document.create_text_node(&annotation.text))
            .map_err(dom_err)?;
        Ok(link.into())
    }

    fn build_span(&self, span: &Span) -> Result<Node, GlossError> {
        match span {
            Span::Text(text) => Ok(self.document.create_text_node(text).into()),
            Span::Annotation(annotation) => self.build_annotation(annotation),
        }
    }
}

impl DocumentTree for WebDocument {
    type Node = Node;

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() == Node::TEXT_NODE {
            node.node_value()
        } else {
            None
        }
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>()
            .map(|e| e.tag_name().to_ascii_lowercase())
    }

    fn has_class(&self, node: &Node, class: &str) -> bool {
        node.dyn_ref::<Element>()
            .map(|e| e.class_list().contains(class))
            .unwrap_or(false)
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn content_root(&self) -> Option<Node> {
        match self.document.query_selector("main") {
            Ok(Some(main)) => Some(main.into()),
            _ => self.document.body().map(Into::into),
        }
    }

    fn text_content(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }
}

impl DocumentMut for WebDocument {
    fn replace_text(&mut self, node: &Node, spans: &[Span]) -> Result<Vec<Node>, GlossError> {
        let parent = node
            .parent_node()
            .ok_or_else(|| GlossError::Dom("text node has no parent".to_string()))?;

        let fragment = self.document.create_document_fragment();
        let mut inserted = Vec::with_capacity(spans.len());
        for span in spans {
            let child = self.build_span(span)?;
            fragment.append_child(&child).map_err(dom_err)?;
            inserted.push(child);
        }

        parent.replace_child(&fragment, node).map_err(dom_err)?;
        Ok(inserted)
    }

    fn restore(&mut self, original: &Node, inserted: &[Node]) -> Result<(), GlossError> {
        let (parent, first) = inserted
            .iter()
            .find_map(|n| n.parent_node().map(|p| (p, n.clone())))
            .ok_or_else(|| GlossError::Dom("replacement nodes are detached".to_string()))?;

        parent.insert_before(original, Some(&first)).map_err(dom_err)?;
        for node in inserted {
            if node.parent_node().as_ref() == Some(&parent) {
                parent.remove_child(node).map_err(dom_err)?;
            }
        }
        Ok(())
    }

    fn annotations(&self) -> Vec<Node> {
        match self.document.query_selector_all(&format!(".{}", ANNOTATION_CLASS)) {
            Ok(list) => (0..list.length()).filter_map(|i| list.item(i)).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn unwrap_annotation(&mut self, node: &Node) -> Result<(), GlossError> {
        let parent = node
            .parent_node()
            .ok_or_else(|| GlossError::Dom("annotation has no parent".to_string()))?;
        let text = self.document.create_text_node(&node.text_content().unwrap_or_default());
        parent.replace_child(&text, node).map_err(dom_err)?;
        Ok(())
    }
}
