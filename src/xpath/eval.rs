/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::document::NodeId;
use crate::document::NodeKind;
use crate::document::Tree;

use super::error::XPathError;
use super::functions;
use super::parser::ArithOp;
use super::parser::Axis;
use super::parser::CompareOp;
use super::parser::Expr;
use super::parser::NodeTest;
use super::parser::Step;
use super::value::Value;
use super::value::XNode;

/// Source of variable bindings for an evaluation.
pub trait Variables {
    fn variable(&self, name: &str) -> Option<Value>;
}

/// No variables are bound.
pub struct NoVariables;

impl Variables for NoVariables {
    fn variable(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl Variables for BTreeMap<String, Value> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl Variables for HashMap<String, Value> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// Evaluation context of an expression.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub tree: &'a Tree,
    pub node: XNode,
    pub position: usize,
    pub size: usize,
    pub variables: &'a dyn Variables,
    /// Node returned by `current()`.
    pub current: XNode,
}

impl<'a> Context<'a> {
    pub fn new(tree: &'a Tree, node: XNode, variables: &'a dyn Variables) -> Context<'a> {
        Context {
            tree,
            node,
            position: 1,
            size: 1,
            variables,
            current: node,
        }
    }

    fn focus(&self, node: XNode, position: usize, size: usize) -> Context<'a> {
        Context {
            node,
            position,
            size,
            ..*self
        }
    }
}

pub(crate) fn evaluate(expr: &Expr, ctx: &Context<'_>) -> Result<Value, XPathError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Literal(s) => Ok(Value::String(s.clone())),
        Expr::Variable(name) => ctx
            .variables
            .variable(name)
            .ok_or_else(|| XPathError::UnknownVariable(name.clone())),
        Expr::Function(name, args) => functions::call(name, args, ctx),
        Expr::Path { absolute, steps } => {
            let start = if *absolute {
                XNode::Node(ctx.tree.root())
            } else {
                ctx.node
            };
            apply_steps(vec![start], steps, ctx)
        }
        Expr::Filter {
            primary,
            predicates,
            steps,
        } => {
            let mut nodes = evaluate(primary, ctx)?.into_nodes()?;
            for predicate in predicates {
                nodes = filter(nodes, predicate, ctx)?;
            }
            apply_steps(nodes, steps, ctx)
        }
        Expr::Union(left, right) => {
            let mut nodes = evaluate(left, ctx)?.into_nodes()?;
            nodes.extend(evaluate(right, ctx)?.into_nodes()?);
            Ok(Value::node_set(nodes))
        }
        Expr::Or(left, right) => {
            if evaluate(left, ctx)?.to_boolean() {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(evaluate(right, ctx)?.to_boolean()))
        }
        Expr::And(left, right) => {
            if !evaluate(left, ctx)?.to_boolean() {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(evaluate(right, ctx)?.to_boolean()))
        }
        Expr::Compare(op, left, right) => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            Ok(Value::Boolean(compare(*op, &left, &right, ctx.tree)))
        }
        Expr::Arith(op, left, right) => {
            let a = evaluate(left, ctx)?.to_number(ctx.tree);
            let b = evaluate(right, ctx)?.to_number(ctx.tree);
            let n = match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Mod => a % b,
            };
            Ok(Value::Number(n))
        }
        Expr::Negate(operand) => Ok(Value::Number(-evaluate(operand, ctx)?.to_number(ctx.tree))),
    }
}

fn apply_steps(mut nodes: Vec<XNode>, steps: &[Step], ctx: &Context<'_>) -> Result<Value, XPathError> {
    for step in steps {
        let mut selected = Vec::new();
        for node in &nodes {
            let mut candidates: Vec<XNode> = axis_nodes(ctx.tree, *node, step.axis)
                .into_iter()
                .filter(|candidate| node_test(ctx.tree, *candidate, &step.test, step.axis))
                .collect();
            for predicate in &step.predicates {
                candidates = filter(candidates, predicate, ctx)?;
            }
            selected.extend(candidates);
        }
        selected.sort();
        selected.dedup();
        nodes = selected;
    }
    Ok(Value::NodeSet(nodes))
}

// Positions follow the order of the nodes as given.
fn filter(nodes: Vec<XNode>, predicate: &Expr, ctx: &Context<'_>) -> Result<Vec<XNode>, XPathError> {
    let size = nodes.len();
    let mut kept = Vec::new();
    for (i, node) in nodes.into_iter().enumerate() {
        let inner = ctx.focus(node, i + 1, size);
        let keep = match evaluate(predicate, &inner)? {
            Value::Number(n) => n == (i + 1) as f64,
            value => value.to_boolean(),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

// Id of the last node in the subtree of the given node.
fn subtree_end(tree: &Tree, id: NodeId) -> NodeId {
    let mut last = id;
    while let Some(child) = tree.children(last).last() {
        last = *child;
    }
    last
}

/// Nodes of an axis in axis order, nearest first for reverse axes.
pub(crate) fn axis_nodes(tree: &Tree, node: XNode, axis: Axis) -> Vec<XNode> {
    match axis {
        Axis::Self_ => vec![node],
        Axis::Child => match node {
            XNode::Node(id) => tree.children(id).iter().map(|child| XNode::Node(*child)).collect(),
            XNode::Attribute(..) => Vec::new(),
        },
        Axis::Descendant | Axis::DescendantOrSelf => {
            let mut nodes = Vec::new();
            if axis == Axis::DescendantOrSelf {
                nodes.push(node);
            }
            if let XNode::Node(id) = node {
                nodes.extend(tree.descendant_or_self(id).skip(1).map(XNode::Node));
            }
            nodes
        }
        Axis::Parent => node.parent(tree).into_iter().collect(),
        Axis::Ancestor | Axis::AncestorOrSelf => {
            let mut nodes = Vec::new();
            if axis == Axis::AncestorOrSelf {
                nodes.push(node);
            }
            let mut current = node.parent(tree);
            while let Some(parent) = current {
                nodes.push(parent);
                current = parent.parent(tree);
            }
            nodes
        }
        Axis::Attribute => match node {
            XNode::Node(id) => tree
                .attributes(id)
                .iter()
                .enumerate()
                .filter(|(_, attr)| !is_namespace_declaration(&attr.name))
                .map(|(index, _)| XNode::Attribute(id, index))
                .collect(),
            XNode::Attribute(..) => Vec::new(),
        },
        Axis::FollowingSibling | Axis::PrecedingSibling => {
            let XNode::Node(id) = node else {
                return Vec::new();
            };
            let Some(parent) = tree.parent(id) else {
                return Vec::new();
            };
            let siblings = tree.children(parent);
            let Some(index) = siblings.iter().position(|sibling| *sibling == id) else {
                return Vec::new();
            };
            if axis == Axis::FollowingSibling {
                siblings[index + 1..].iter().map(|sibling| XNode::Node(*sibling)).collect()
            } else {
                siblings[..index].iter().rev().map(|sibling| XNode::Node(*sibling)).collect()
            }
        }
        Axis::Following => {
            // An attribute is followed by the content of its element.
            let end = match node {
                XNode::Node(id) => subtree_end(tree, id),
                XNode::Attribute(id, _) => id,
            };
            tree.descendant_or_self(tree.root())
                .filter(|id| *id > end)
                .map(XNode::Node)
                .collect()
        }
        Axis::Preceding => {
            let id = node.node_id();
            let ancestors: Vec<NodeId> = axis_nodes(tree, XNode::Node(id), Axis::Ancestor)
                .into_iter()
                .map(XNode::node_id)
                .collect();
            let mut nodes: Vec<XNode> = tree
                .descendant_or_self(tree.root())
                .filter(|other| *other < id && !ancestors.contains(other))
                .map(XNode::Node)
                .collect();
            nodes.reverse();
            nodes
        }
    }
}

pub(crate) fn node_test(tree: &Tree, node: XNode, test: &NodeTest, axis: Axis) -> bool {
    // Name tests select the principal node type of the axis.
    let principal = match node {
        XNode::Attribute(..) => axis == Axis::Attribute,
        XNode::Node(id) => axis != Axis::Attribute && tree.is_element(id),
    };
    match test {
        NodeTest::Node => true,
        NodeTest::Text => matches!(node, XNode::Node(id) if tree.is_text(id)),
        NodeTest::Comment | NodeTest::ProcessingInstruction => false,
        NodeTest::Any => principal,
        NodeTest::Name(name) => principal && node.name(tree) == Some(name.as_str()),
        NodeTest::PrefixAny(prefix) => {
            principal
                && node
                    .name(tree)
                    .and_then(|name| name.split_once(':'))
                    .is_some_and(|(p, _)| p == prefix)
        }
    }
}

pub(super) fn compare(op: CompareOp, left: &Value, right: &Value, tree: &Tree) -> bool {
    match (left, right) {
        (Value::NodeSet(a), Value::NodeSet(b)) => {
            let others: Vec<Value> = b.iter().map(|node| Value::String(node.string_value(tree))).collect();
            a.iter().any(|node| {
                let value = Value::String(node.string_value(tree));
                others.iter().any(|other| compare_scalar(op, &value, other, tree))
            })
        }
        (Value::NodeSet(_), Value::Boolean(_)) => {
            compare_scalar(op, &Value::Boolean(left.to_boolean()), right, tree)
        }
        (Value::Boolean(_), Value::NodeSet(_)) => {
            compare_scalar(op, left, &Value::Boolean(right.to_boolean()), tree)
        }
        (Value::NodeSet(a), _) => a
            .iter()
            .any(|node| compare_scalar(op, &Value::String(node.string_value(tree)), right, tree)),
        (_, Value::NodeSet(b)) => b
            .iter()
            .any(|node| compare_scalar(op, left, &Value::String(node.string_value(tree)), tree)),
        _ => compare_scalar(op, left, right, tree),
    }
}

fn compare_scalar(op: CompareOp, left: &Value, right: &Value, tree: &Tree) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Neq => {
            let equal = match (left, right) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => left.to_boolean() == right.to_boolean(),
                (Value::Number(_), _) | (_, Value::Number(_)) => left.to_number(tree) == right.to_number(tree),
                _ => left.to_string_value(tree) == right.to_string_value(tree),
            };
            (op == CompareOp::Eq) == equal
        }
        _ => {
            let a = left.to_number(tree);
            let b = right.to_number(tree);
            match op {
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                _ => a >= b,
            }
        }
    }
}

/// Text of the `xml:lang` in scope, if any.
pub(super) fn language(tree: &Tree, node: XNode) -> Option<&str> {
    let mut current = Some(node.node_id());
    while let Some(id) = current {
        if let NodeKind::Element { .. } = tree.kind(id) {
            if let Some(lang) = tree.attribute(id, "xml:lang") {
                return Some(lang);
            }
        }
        current = tree.parent(id);
    }
    None
}
