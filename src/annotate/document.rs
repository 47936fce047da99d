//! A small mutable text tree standing in for a live page.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Replaced or
//! removed nodes stay in the arena detached from the tree, so stale ids held
//! by a caller are detectable through [`Document::is_attached`].

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document with a `body` root.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            body: NodeId(0),
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// Builds a document with one `p` element per line of `input`.
    pub fn from_text(input: &str) -> Self {
        let mut doc = Self::new();
        for line in input.lines() {
            let paragraph = doc.create_element("p");
            doc.attach(doc.body, paragraph);
            if !line.is_empty() {
                let text = doc.create_text(line);
                doc.attach(paragraph, text);
            }
        }
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if !matches!(self.node(parent).kind, NodeKind::Element { .. }) {
            bail!("Cannot append to a text node");
        }
        if self.node(child).parent.is_some() {
            bail!("Node already has a parent");
        }
        if child == parent || self.ancestors(parent).contains(&child) {
            bail!("Cannot append a node to its own subtree");
        }
        self.attach(parent, child);
        Ok(())
    }

    /// Puts `new` in place of `old`; `old` becomes detached.
    pub fn replace_child(&mut self, new: NodeId, old: NodeId) -> Result<()> {
        let Some(parent) = self.node(old).parent else {
            bail!("Node to replace is not in the document");
        };
        if self.node(new).parent.is_some() {
            bail!("Replacement node already has a parent");
        }
        let Some(index) = self.nodes[parent.0].children.iter().position(|c| *c == old) else {
            bail!("Node to replace is not a child of its parent");
        };
        self.nodes[parent.0].children[index] = new;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.node(id).parent else {
            bail!("Node is not in the document");
        };
        self.nodes[parent.0].children.retain(|c| *c != id);
        self.nodes[id.0].parent = None;
        Ok(())
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Parent first, up to the root of whatever tree `id` belongs to.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).parent;
        }
        chain
    }

    /// True when `id` is reachable from the body.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.body || self.ancestors(id).last() == Some(&self.body)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => {
                attributes.insert(name.to_string(), value.to_string());
                Ok(())
            }
            NodeKind::Text(_) => bail!("Text nodes have no attributes"),
        }
    }

    /// Replaces the contents of `id`: a text node's text, or an element's
    /// children with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(current) = &mut self.nodes[id.0].kind {
            *current = text.to_string();
            return;
        }
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.attach(id, node);
        }
    }

    /// Attached nodes below `root` in document order, `root` excluded.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(root).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }
        out
    }

    /// Text nodes of the document in document order.
    pub fn text_nodes(&self) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| matches!(self.node(*id).kind, NodeKind::Text(_)))
            .collect()
    }

    /// Elements of the document carrying attribute `name`, in document order.
    pub fn elements_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| self.has_attribute(*id, name))
            .collect()
    }

    /// Concatenated text of `id` and everything below it.
    pub fn text_content(&self, id: NodeId) -> String {
        match &self.node(id).kind {
            NodeKind::Text(text) => text.clone(),
            NodeKind::Element { .. } => self
                .descendants(id)
                .into_iter()
                .filter_map(|d| match &self.node(d).kind {
                    NodeKind::Text(text) => Some(text.as_str()),
                    NodeKind::Element { .. } => None,
                })
                .collect(),
        }
    }

    /// Plain text of the body, one line per top-level child.
    pub fn to_text(&self) -> String {
        self.children(self.body)
            .iter()
            .map(|child| self.text_content(*child))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Markup rendering of the body's children, one line per top-level child.
    pub fn to_markup(&self) -> String {
        self.children(self.body)
            .iter()
            .map(|child| self.markup(*child))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Markup rendering of `id` and everything below it.
    pub fn markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                for child in self.children(id) {
                    self.write_markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_round_trip() {
        let input = "first $1\n\nthird line";
        let doc = Document::from_text(input);
        assert_eq!(doc.children(doc.body()).len(), 3);
        assert_eq!(doc.text_nodes().len(), 2);
        assert_eq!(doc.to_text(), input);
    }

    #[test]
    fn test_replace_child_detaches_old() {
        let mut doc = Document::from_text("hello");
        let old = doc.text_nodes()[0];
        let span = doc.create_element("span");
        doc.set_text(span, "bye");

        doc.replace_child(span, old).unwrap();
        assert!(!doc.is_attached(old));
        assert!(doc.is_attached(span));
        assert_eq!(doc.to_text(), "bye");

        // A detached node can no longer be replaced
        let other = doc.create_text("again");
        assert!(doc.replace_child(other, old).is_err());
    }

    #[test]
    fn test_attributes_and_queries() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.append_child(doc.body(), div).unwrap();
        doc.set_attribute(div, "data-x", "1").unwrap();
        let text = doc.create_text("inside");
        doc.append_child(div, text).unwrap();

        assert_eq!(doc.attribute(div, "data-x"), Some("1"));
        assert!(doc.set_attribute(text, "data-x", "1").is_err());
        assert_eq!(doc.elements_with_attribute("data-x"), vec![div]);
        assert_eq!(doc.ancestors(text), vec![div, doc.body()]);
        assert_eq!(doc.to_markup(), "<div data-x=\"1\">inside</div>");
    }

    #[test]
    fn test_append_child_rejects_cycles_and_reparenting() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append_child(doc.body(), outer).unwrap();
        doc.append_child(outer, inner).unwrap();

        assert!(doc.append_child(inner, outer).is_err());
        assert!(doc.append_child(doc.body(), inner).is_err());
    }

    #[test]
    fn test_remove() {
        let mut doc = Document::from_text("a\nb");
        let first = doc.children(doc.body())[0];
        doc.remove(first).unwrap();
        assert_eq!(doc.to_text(), "b");
        assert!(doc.remove(first).is_err());
    }
}
