/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::cmp::Ordering;

use crate::document::NodeId;
use crate::document::Tree;

use super::error::XPathError;

/// A node as seen by XPath.
///
/// Attributes are not nodes of the [Tree], so they are addressed by their
/// element and their index in its attribute list.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum XNode {
    Node(NodeId),
    Attribute(NodeId, usize),
}

impl XNode {
    // Attributes come right after their element in document order.
    fn order_key(self) -> (NodeId, usize) {
        match self {
            XNode::Node(id) => (id, 0),
            XNode::Attribute(id, index) => (id, index + 1),
        }
    }

    /// The tree node itself, or the element owning the attribute.
    pub fn node_id(self) -> NodeId {
        match self {
            XNode::Node(id) | XNode::Attribute(id, _) => id,
        }
    }

    pub fn is_attribute(self) -> bool {
        matches!(self, XNode::Attribute(..))
    }

    pub fn parent(self, tree: &Tree) -> Option<XNode> {
        match self {
            XNode::Node(id) => tree.parent(id).map(XNode::Node),
            XNode::Attribute(id, _) => Some(XNode::Node(id)),
        }
    }

    /// Qualified name of an element or attribute.
    pub fn name(self, tree: &Tree) -> Option<&str> {
        match self {
            XNode::Node(id) => tree.name(id),
            XNode::Attribute(id, index) => tree.attributes(id).get(index).map(|attr| attr.name.as_str()),
        }
    }

    pub fn string_value(self, tree: &Tree) -> String {
        match self {
            XNode::Node(id) => tree.string_value(id),
            XNode::Attribute(id, index) => tree
                .attributes(id)
                .get(index)
                .map(|attr| attr.value.clone())
                .unwrap_or_default(),
        }
    }
}

impl Ord for XNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

impl PartialOrd for XNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of an XPath expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Nodes in document order, without duplicates.
    NodeSet(Vec<XNode>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    /// Builds a node-set, putting the nodes into document order.
    pub fn node_set(mut nodes: Vec<XNode>) -> Value {
        nodes.sort();
        nodes.dedup();
        Value::NodeSet(nodes)
    }

    pub fn nodes(&self) -> Option<&[XNode]> {
        match self {
            Value::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodes(self) -> Result<Vec<XNode>, XPathError> {
        match self {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::NotANodeSet),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::NodeSet(nodes) => !nodes.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self, tree: &Tree) -> f64 {
        match self {
            Value::NodeSet(_) => string_to_number(&self.to_string_value(tree)),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
        }
    }

    pub fn to_string_value(&self, tree: &Tree) -> String {
        match self {
            Value::NodeSet(nodes) => nodes
                .first()
                .map(|node| node.string_value(tree))
                .unwrap_or_default(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
        }
    }
}

pub(crate) fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Converts a string with the strict XPath number syntax.
pub fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(is_xml_space);
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut seen_digit = false;
    let mut seen_dot = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// Formats a number the way XPath `string()` does.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}
