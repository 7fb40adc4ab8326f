/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Handle of a node inside a [Tree].
///
/// Handles are only meaningful for the tree which created them. Trees
/// built by the parser hand out ids in document order, so comparing two
/// ids compares their positions in the document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeKind {
    /// The document node, parent of the document element.
    Root,
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An XML document tree.
///
/// Nodes live in a single vector and refer to each other by [NodeId].
/// Dropping the tree frees every node at once; there is no way to hold
/// on to a node after its tree is gone.
#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

const ROOT: NodeId = NodeId(0);

impl Tree {
    pub fn new() -> Tree {
        Tree {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Returns the top level element, if the tree has one.
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(ROOT).iter().copied().find(|id| self.is_element(*id))
    }

    /// Number of nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT.0].children.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    /// Returns the qualified name of an element.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenation of all text in the subtree.
    pub fn string_value(&self, id: NodeId) -> String {
        let mut value = String::new();
        for node in self.descendant_or_self(id) {
            if let NodeKind::Text(text) = &self.nodes[node.0].kind {
                value.push_str(text);
            }
        }
        value
    }

    /// Iterates over the node and all of its descendants in document order.
    pub fn descendant_or_self(&self, id: NodeId) -> DescendantOrSelf<'_> {
        DescendantOrSelf {
            tree: self,
            stack: vec![id],
        }
    }

    /// Resolves a namespace prefix in the scope of the given node.
    ///
    /// An empty prefix looks up the default namespace.
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        let mut current = Some(id);
        while let Some(node) = current {
            for attr in self.attributes(node) {
                let declared = match attr.name.strip_prefix("xmlns") {
                    Some("") => "",
                    Some(rest) => match rest.strip_prefix(':') {
                        Some(p) => p,
                        None => continue,
                    },
                    None => continue,
                };
                if declared == prefix {
                    return Some(&attr.value);
                }
            }
            current = self.parent(node);
        }
        None
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                name: name.to_string(),
                attributes: Vec::new(),
            },
        )
    }

    /// Appends text to a node, merging it into a trailing text child.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.0].kind {
                existing.push_str(text);
                return last;
            }
        }
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    /// Sets an attribute, replacing the value of an existing one.
    ///
    /// Returns false if the node is not an element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => {
                if let Some(attr) = attributes.iter_mut().find(|attr| attr.name == name) {
                    attr.value = value.to_string();
                } else {
                    attributes.push(Attribute {
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                }
                true
            }
            _ => false,
        }
    }

    /// Deep copies a node of another tree under the given parent.
    ///
    /// Copying a root node copies its children.
    pub fn copy_from(&mut self, parent: NodeId, source: &Tree, node: NodeId) {
        let mut stack = vec![(node, parent)];
        while let Some((node, parent)) = stack.pop() {
            match source.kind(node) {
                NodeKind::Root => {
                    stack.extend(source.children(node).iter().rev().map(|child| (*child, parent)));
                }
                NodeKind::Text(text) => {
                    self.append_text(parent, text);
                }
                NodeKind::Element { name, attributes } => {
                    let copy = self.push(
                        parent,
                        NodeKind::Element {
                            name: name.clone(),
                            attributes: attributes.clone(),
                        },
                    );
                    stack.extend(source.children(node).iter().rev().map(|child| (*child, copy)));
                }
            }
        }
    }

    /// Returns a copy of the tree without the text nodes rejected by the filter.
    ///
    /// Node ids of the copy still follow document order.
    pub fn filtered_copy(&self, mut keep_text: impl FnMut(&Tree, NodeId) -> bool) -> Tree {
        let mut copy = Tree::new();
        let mut stack: Vec<(NodeId, NodeId)> = self
            .children(ROOT)
            .iter()
            .rev()
            .map(|child| (*child, ROOT))
            .collect();
        while let Some((node, parent)) = stack.pop() {
            match self.kind(node) {
                NodeKind::Root => (),
                NodeKind::Text(text) => {
                    if keep_text(self, node) {
                        copy.append_text(parent, text);
                    }
                }
                NodeKind::Element { name, attributes } => {
                    let new = copy.push(
                        parent,
                        NodeKind::Element {
                            name: name.clone(),
                            attributes: attributes.clone(),
                        },
                    );
                    stack.extend(self.children(node).iter().rev().map(|child| (*child, new)));
                }
            }
        }
        copy
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

pub struct DescendantOrSelf<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantOrSelf<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev());
        Some(id)
    }
}

/// Splits a qualified name into its prefix and local part.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
