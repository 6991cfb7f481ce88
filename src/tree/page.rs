//! PageTree: arena-backed document used natively
//!
//! Nodes are never freed. A replaced text node keeps its slot (detached, no
//! parent) so revert can reattach the very same node.

use crate::config::ANNOTATION_CLASS;
use crate::error::GlossError;
use crate::tree::{DocumentMut, DocumentTree, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct PageNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct PageTree {
    nodes: Vec<PageNode>,
    root: NodeId,
}

impl Default for PageTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTree {
    /// New document whose root is an empty `body`
    pub fn new() -> Self {
        Self {
            nodes: vec![PageNode {
                data: NodeData::Element {
                    tag: "body".to_string(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(PageNode {
            data,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.alloc(data, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.element_with(parent, tag, &[])
    }

    pub fn element_with(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        self.append(
            parent,
            NodeData::Element {
                tag: tag.to_ascii_lowercase(),
                attrs: attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        )
    }

    pub fn add_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeData::Text(text.to_string()))
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn detach_from_parent(&mut self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.nodes[node.0].parent?;
        let pos = self.nodes[parent.0].children.iter().position(|&c| c == node)?;
        self.nodes[parent.0].children.remove(pos);
        self.nodes[node.0].parent = None;
        Some((parent, pos))
    }

    fn build_span(&mut self, parent: NodeId, span: &Span) -> NodeId {
        match span {
            Span::Text(text) => self.alloc(NodeData::Text(text.clone()), Some(parent)),
            Span::Annotation(a) => {
                let link = self.alloc(
                    NodeData::Element {
                        tag: "a".to_string(),
                        attrs: vec![
                            ("class".to_string(), ANNOTATION_CLASS.to_string()),
                            ("data-description".to_string(), a.description.clone()),
                            ("data-url".to_string(), a.url.clone()),
                            ("data-type".to_string(), a.content_type.clone()),
                            ("href".to_string(), a.href()),
                            ("target".to_string(), "_blank".to_string()),
                        ],
                    },
                    Some(parent),
                );
                let text = self.alloc(NodeData::Text(a.text.clone()), Some(link));
                self.nodes[link.0].children.push(text);
                link
            }
        }
    }

    /// Markup-like rendering of a subtree, used to compare documents
    pub fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.render_into(node, &mut out);
        out
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => {
                out.push('"');
                out.push_str(text);
                out.push('"');
            }
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (k, v) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", k, v));
                }
                out.push('>');
                for &child in &self.nodes[node.0].children {
                    self.render_into(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    fn find_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.tag_name(&id).as_deref() == Some(tag))
    }
}

impl DocumentTree for PageTree {
    type Node = NodeId;

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text.clone()),
            NodeData::Element { .. } => None,
        }
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text(_) => None,
        }
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            NodeData::Text(_) => None,
        }
    }

    fn content_root(&self) -> Option<NodeId> {
        self.find_tag("main").or(Some(self.root))
    }
}

impl DocumentMut for PageTree {
    fn replace_text(&mut self, node: &NodeId, spans: &[Span]) -> Result<Vec<NodeId>, GlossError> {
        if self.text(node).is_none() {
            return Err(GlossError::Dom(format!("{:?} is not a text node", node)));
        }
        let (parent, pos) = self
            .detach_from_parent(*node)
            .ok_or_else(|| GlossError::Dom(format!("{:?} has no parent", node)))?;

        let inserted: Vec<NodeId> = spans.iter().map(|s| self.build_span(parent, s)).collect();
        let children = &mut self.nodes[parent.0].children;
        children.splice(pos..pos, inserted.iter().copied());
        Ok(inserted)
    }

    fn restore(&mut self, original: &NodeId, inserted: &[NodeId]) -> Result<(), GlossError> {
        let (parent, pos) = inserted
            .iter()
            .find_map(|&id| {
                let parent = self.nodes[id.0].parent?;
                let pos = self.nodes[parent.0].children.iter().position(|&c| c == id)?;
                Some((parent, pos))
            })
            .ok_or_else(|| GlossError::Dom("replacement nodes are detached".to_string()))?;

        for &id in inserted {
            if self.nodes[id.0].parent == Some(parent) {
                self.detach_from_parent(id);
            }
        }

        let pos = pos.min(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(pos, *original);
        self.nodes[original.0].parent = Some(parent);
        Ok(())
    }

    fn annotations(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.has_class(id, ANNOTATION_CLASS))
            .collect()
    }

    fn unwrap_annotation(&mut self, node: &NodeId) -> Result<(), GlossError> {
        let text = self.text_content(node);
        let (parent, pos) = self
            .detach_from_parent(*node)
            .ok_or_else(|| GlossError::Dom(format!("{:?} has no parent", node)))?;
        let replacement = self.alloc(NodeData::Text(text), Some(parent));
        self.nodes[parent.0].children.insert(pos, replacement);
        Ok(())
    }
}
