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
use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;
use std::thread;

use crate::document::NodeId;
use crate::document::NodeKind;
use crate::document::Tree;
use crate::document::guarded;
use crate::document::split_qname;
use crate::xpath::Context;
use crate::xpath::Expr;
use crate::xpath::Value;
use crate::xpath::Variables;
use crate::xpath::XNode;
use crate::xpath::XPath;
use crate::xpath::XPathError;
use crate::xpath::string_to_number;

use super::compile::Avt;
use super::compile::AvtPart;
use super::compile::Binding;
use super::compile::BindingValue;
use super::compile::Instruction;
use super::compile::Program;
use super::compile::Rule;
use super::compile::Sort;
use super::compile::SpaceTest;
use super::compile::in_scope_namespaces;

const MAX_DEPTH: usize = 3000;

// Nested templates recurse on the executor's stack, a few frames each.
const STACK_SIZE: usize = 128 * 1024 * 1024;

/// Receives the errors of a transformation.
///
/// The transformation runs on a thread of its own, so the handler has to
/// be sendable.
pub trait TransformErrorHandler: Send {
    /// Returning `Break` stops the transformation at the next instruction.
    fn transform_error(&mut self, message: fmt::Arguments<'_>) -> ControlFlow<()>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransformState {
    Ok,
    /// Stopped on request of the error handler. The partial result is
    /// still returned.
    Stopped,
    /// Failed, no result is produced.
    Error,
}

/// State of one transformation of an input tree by a program.
pub struct TransformContext<'a> {
    program: &'a Program,
    input: &'a Tree,
    handler: Option<&'a mut dyn TransformErrorHandler>,
    state: TransformState,
}

impl<'a> TransformContext<'a> {
    pub fn new(program: &'a Program, input: &'a Tree) -> TransformContext<'a> {
        TransformContext {
            program,
            input,
            handler: None,
            state: TransformState::Ok,
        }
    }

    /// Installs the handler which receives the errors of the transformation.
    ///
    /// Without a handler, errors are logged.
    pub fn set_error_handler(&mut self, handler: &'a mut dyn TransformErrorHandler) {
        self.handler = Some(handler);
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    fn report(&mut self, message: fmt::Arguments<'_>) {
        let flow = match self.handler.as_deref_mut() {
            Some(handler) => guarded(ControlFlow::Break(()), || handler.transform_error(message)),
            None => {
                log::warn!("{}", message);
                ControlFlow::Continue(())
            }
        };
        if flow.is_break() && self.state == TransformState::Ok {
            self.state = TransformState::Stopped;
        }
    }

    fn fail(&mut self, message: fmt::Arguments<'_>) {
        self.report(message);
        self.state = TransformState::Error;
    }
}

/// Value bound to a variable.
#[derive(Clone, Debug)]
enum Bound {
    Value(Value),
    Fragment(Tree),
}

impl Bound {
    fn value(&self) -> Value {
        match self {
            Bound::Value(value) => value.clone(),
            Bound::Fragment(tree) => Value::String(tree.string_value(tree.root())),
        }
    }
}

struct Scope<'s> {
    locals: &'s [(String, Bound)],
    globals: &'s BTreeMap<String, Bound>,
}

impl Variables for Scope<'_> {
    fn variable(&self, name: &str) -> Option<Value> {
        self.locals
            .iter()
            .rev()
            .find(|(local, _)| local == name)
            .map(|(_, bound)| bound)
            .or_else(|| self.globals.get(name))
            .map(Bound::value)
    }
}

struct Frame {
    node: XNode,
    position: usize,
    size: usize,
    locals: Vec<(String, Bound)>,
}

impl Frame {
    fn new(node: XNode, position: usize, size: usize) -> Frame {
        Frame {
            node,
            position,
            size,
            locals: Vec::new(),
        }
    }
}

struct Executor<'c, 'a> {
    ctxt: &'c mut TransformContext<'a>,
    program: &'a Program,
    input: &'c Tree,
    globals: BTreeMap<String, Bound>,
    depth: usize,
}

fn declaration_name(prefix: &str) -> String {
    if prefix.is_empty() {
        "xmlns".to_string()
    } else {
        format!("xmlns:{}", prefix)
    }
}

// Declares the namespace on the element unless it is already in scope.
fn declare_namespace(out: &mut Tree, element: NodeId, prefix: &str, uri: &str) {
    if prefix == "xml" {
        return;
    }
    let current = out.lookup_namespace(element, prefix).unwrap_or("");
    if current != uri {
        out.set_attribute(element, &declaration_name(prefix), uri);
    }
}

/// Runs a transformation.
///
/// Parameters are pairs of names and XPath expressions; when a name is
/// given more than once, the first one is used. Returns `None` when the
/// transformation failed, and the partial result when it was stopped.
pub fn apply_stylesheet_user(ctxt: &mut TransformContext<'_>, params: Option<&[&str]>) -> Option<Tree> {
    log::debug!("transformation started");
    let outcome = thread::scope(|scope| {
        let worker = thread::Builder::new()
            .name("xslt".to_string())
            .stack_size(STACK_SIZE)
            .spawn_scoped(scope, || execute_program(ctxt, params));
        match worker {
            Ok(worker) => worker.join().map_err(|_| "the transformation panicked".to_string()),
            Err(err) => Err(format!("cannot start the transformation: {}", err)),
        }
    });

    let result = match outcome {
        Ok(result) => result,
        Err(message) => {
            ctxt.fail(format_args!("{}", message));
            None
        }
    };
    log::debug!("transformation finished in state {:?}", ctxt.state);
    result
}

fn execute_program(ctxt: &mut TransformContext<'_>, params: Option<&[&str]>) -> Option<Tree> {
    let program = ctxt.program;
    let source = ctxt.input;

    let stripped;
    let input = if program.strip_space.is_empty() {
        source
    } else {
        stripped = source.filtered_copy(|tree, id| keep_text(program, tree, id));
        &stripped
    };

    let mut executor = Executor {
        ctxt,
        program,
        input,
        globals: BTreeMap::new(),
        depth: 0,
    };
    executor.bind_globals(params.unwrap_or(&[]));

    let mut result = Tree::new();
    if executor.ctxt.state == TransformState::Ok {
        let root = XNode::Node(input.root());
        let result_root = result.root();
        executor.apply_templates(vec![root], None, Vec::new(), &mut result, result_root);
    }

    match executor.ctxt.state {
        TransformState::Error => None,
        TransformState::Ok | TransformState::Stopped => Some(result),
    }
}

fn keep_text(program: &Program, tree: &Tree, id: NodeId) -> bool {
    let blank = tree
        .text(id)
        .is_some_and(|text| text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n')));
    if !blank {
        return true;
    }
    let Some(parent) = tree.parent(id) else {
        return true;
    };
    let Some(name) = tree.name(parent) else {
        return true;
    };
    let mut ancestor = Some(parent);
    while let Some(node) = ancestor {
        match tree.attribute(node, "xml:space") {
            Some("preserve") => return true,
            Some("default") => break,
            _ => ancestor = tree.parent(node),
        }
    }
    let best = |tests: &[SpaceTest]| tests.iter().filter_map(|test| test.score(name)).max();
    match (best(&program.strip_space), best(&program.preserve_space)) {
        (Some(strip), Some(preserve)) => preserve >= strip,
        (Some(_), None) => false,
        _ => true,
    }
}

impl Executor<'_, '_> {
    fn running(&self) -> bool {
        self.ctxt.state == TransformState::Ok
    }

    fn bind_globals(&mut self, params: &[&str]) {
        if params.len() % 2 != 0 {
            self.ctxt.report(format_args!(
                "parameter {} has no value",
                params[params.len() - 1]
            ));
        }
        for pair in params.chunks_exact(2) {
            let (name, source) = (pair[0], pair[1]);
            if self.globals.contains_key(name) {
                continue;
            }
            let value = XPath::new(source).and_then(|xpath| {
                let scope = Scope {
                    locals: &[],
                    globals: &self.globals,
                };
                let context = Context::new(self.input, XNode::Node(self.input.root()), &scope);
                xpath.evaluate(&context)
            });
            match value {
                Ok(value) => {
                    self.globals.insert(name.to_string(), Bound::Value(value));
                }
                Err(err) => {
                    self.ctxt.fail(format_args!("failed to evaluate parameter {}: {}", name, err));
                    return;
                }
            }
        }

        let program = self.program;
        for global in &program.globals {
            let name = &global.binding.name;
            if global.is_param && self.globals.contains_key(name) {
                continue;
            }
            let mut frame = Frame::new(XNode::Node(self.input.root()), 1, 1);
            let Some(bound) = self.bind(&global.binding, &mut frame) else {
                self.ctxt.fail(format_args!("failed to evaluate global variable {}", name));
                return;
            };
            self.globals.insert(name.clone(), bound);
        }
    }

    fn evaluate(&self, xpath: &XPath, frame: &Frame) -> Result<Value, XPathError> {
        let scope = Scope {
            locals: &frame.locals,
            globals: &self.globals,
        };
        let context = Context {
            tree: self.input,
            node: frame.node,
            position: frame.position,
            size: frame.size,
            variables: &scope,
            current: frame.node,
        };
        xpath.evaluate(&context)
    }

    fn evaluate_or_report(&mut self, xpath: &XPath, frame: &Frame) -> Option<Value> {
        match self.evaluate(xpath, frame) {
            Ok(value) => Some(value),
            Err(err) => {
                self.ctxt.report(format_args!("{}: {}", xpath, err));
                None
            }
        }
    }

    fn nodes_or_report(&mut self, xpath: &XPath, frame: &Frame) -> Option<Vec<XNode>> {
        match self.evaluate(xpath, frame).and_then(Value::into_nodes) {
            Ok(nodes) => Some(nodes),
            Err(err) => {
                self.ctxt.report(format_args!("{}: {}", xpath, err));
                None
            }
        }
    }

    fn string(&self, value: &Value) -> String {
        value.to_string_value(self.input)
    }

    fn avt(&mut self, avt: &Avt, frame: &Frame) -> Option<String> {
        let mut text = String::new();
        for part in &avt.0 {
            match part {
                AvtPart::Text(s) => text.push_str(s),
                AvtPart::Expr(xpath) => {
                    let value = self.evaluate_or_report(xpath, frame)?;
                    text.push_str(&self.string(&value));
                }
            }
        }
        Some(text)
    }

    // Runs a sequence constructor into a fresh tree.
    fn fragment(&mut self, body: &[Instruction], frame: &mut Frame) -> Tree {
        let mut tree = Tree::new();
        let root = tree.root();
        self.execute(body, frame, &mut tree, root);
        tree
    }

    fn bind(&mut self, binding: &Binding, frame: &mut Frame) -> Option<Bound> {
        match &binding.value {
            BindingValue::Select(xpath) => self.evaluate_or_report(xpath, frame).map(Bound::Value),
            BindingValue::Content(body) => Some(Bound::Fragment(self.fragment(body, frame))),
            BindingValue::Empty => Some(Bound::Value(Value::String(String::new()))),
        }
    }

    fn bind_all(&mut self, bindings: &[Binding], frame: &mut Frame) -> Vec<(String, Bound)> {
        let mut bound = Vec::new();
        for binding in bindings {
            if let Some(value) = self.bind(binding, frame) {
                bound.push((binding.name.clone(), value));
            }
        }
        bound
    }

    fn sorted(&mut self, nodes: Vec<XNode>, sorts: &[Sort]) -> Vec<XNode> {
        if sorts.is_empty() {
            return nodes;
        }
        let size = nodes.len();
        let mut keyed: Vec<(XNode, Vec<Value>)> = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let frame = Frame::new(node, i + 1, size);
            let mut keys = Vec::new();
            for sort in sorts {
                let value = self.evaluate_or_report(&sort.select, &frame).unwrap_or(Value::String(String::new()));
                let key = if sort.numeric {
                    Value::Number(string_to_number(&self.string(&value)))
                } else {
                    Value::String(self.string(&value))
                };
                keys.push(key);
            }
            keyed.push((node, keys));
        }
        keyed.sort_by(|(_, a), (_, b)| {
            for ((left, right), sort) in a.iter().zip(b.iter()).zip(sorts) {
                let order = match (left, right) {
                    (Value::Number(x), Value::Number(y)) => match (x.is_nan(), y.is_nan()) {
                        (true, true) => Ordering::Equal,
                        (true, false) => Ordering::Less,
                        (false, true) => Ordering::Greater,
                        (false, false) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
                    },
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => Ordering::Equal,
                };
                let order = if sort.descending { order.reverse() } else { order };
                if order != Ordering::Equal {
                    return order;
                }
            }
            Ordering::Equal
        });
        keyed.into_iter().map(|(node, _)| node).collect()
    }

    fn find_rule(&mut self, node: XNode, mode: Option<&str>) -> Option<usize> {
        let program = self.program;
        let scope = Scope {
            locals: &[],
            globals: &self.globals,
        };
        let mut best: Option<&Rule> = None;
        let mut failure = None;
        for rule in &program.rules {
            if rule.mode.as_deref() != mode {
                continue;
            }
            if best.is_some_and(|best| best.priority > rule.priority) {
                continue;
            }
            match rule.pattern.matches(self.input, node, &scope) {
                // Later rules win ties.
                Ok(true) => best = Some(rule),
                Ok(false) => (),
                Err(err) => failure = Some(err),
            }
        }
        if let Some(err) = failure {
            self.ctxt.report(format_args!("template pattern: {}", err));
        }
        best.map(|rule| rule.template)
    }

    fn apply_templates(
        &mut self,
        nodes: Vec<XNode>,
        mode: Option<&str>,
        params: Vec<(String, Bound)>,
        out: &mut Tree,
        parent: NodeId,
    ) {
        let size = nodes.len();
        for (i, node) in nodes.into_iter().enumerate() {
            if !self.running() {
                return;
            }
            match self.find_rule(node, mode) {
                Some(template) => {
                    self.invoke(template, Frame::new(node, i + 1, size), params.clone(), out, parent);
                }
                None => self.builtin(node, mode, params.clone(), out, parent),
            }
        }
    }

    fn builtin(&mut self, node: XNode, mode: Option<&str>, params: Vec<(String, Bound)>, out: &mut Tree, parent: NodeId) {
        let input = self.input;
        match node {
            XNode::Attribute(..) => {
                out.append_text(parent, &node.string_value(input));
            }
            XNode::Node(id) => match input.kind(id) {
                NodeKind::Text(text) => {
                    out.append_text(parent, text);
                }
                NodeKind::Root | NodeKind::Element { .. } => {
                    if self.depth >= MAX_DEPTH {
                        self.ctxt.fail(format_args!("maximum template depth exceeded in built-in template"));
                        return;
                    }
                    self.depth += 1;
                    let children = input.children(id).iter().map(|child| XNode::Node(*child)).collect();
                    self.apply_templates(children, mode, params, out, parent);
                    self.depth -= 1;
                }
            },
        }
    }

    fn invoke(&mut self, index: usize, mut frame: Frame, mut passed: Vec<(String, Bound)>, out: &mut Tree, parent: NodeId) {
        let program = self.program;
        let template = &program.templates[index];
        if self.depth >= MAX_DEPTH {
            self.ctxt.fail(format_args!(
                "maximum template depth exceeded in template {}",
                template.name.as_deref().unwrap_or("(unnamed)")
            ));
            return;
        }
        self.depth += 1;
        for param in &template.params {
            let value = match passed.iter().position(|(name, _)| *name == param.name) {
                Some(i) => Some(passed.swap_remove(i).1),
                None => self.bind(param, &mut frame),
            };
            if let Some(value) = value {
                frame.locals.push((param.name.clone(), value));
            }
        }
        self.execute(&template.body, &mut frame, out, parent);
        self.depth -= 1;
    }

    fn execute(&mut self, body: &[Instruction], frame: &mut Frame, out: &mut Tree, parent: NodeId) {
        let scope_start = frame.locals.len();
        for instruction in body {
            if !self.running() {
                break;
            }
            self.instruction(instruction, frame, out, parent);
        }
        frame.locals.truncate(scope_start);
    }

    fn instruction(&mut self, instruction: &Instruction, frame: &mut Frame, out: &mut Tree, parent: NodeId) {
        match instruction {
            Instruction::Literal {
                name,
                namespaces,
                attributes,
                body,
            } => {
                let element = out.append_element(parent, name);
                for (attr, avt) in attributes {
                    if let Some(value) = self.avt(avt, frame) {
                        out.set_attribute(element, attr, &value);
                    }
                }
                for (prefix, uri) in namespaces {
                    declare_namespace(out, element, prefix, uri);
                }
                self.execute(body, frame, out, element);
            }
            Instruction::Text(text) => {
                out.append_text(parent, text);
            }
            Instruction::ValueOf(xpath) => {
                if let Some(value) = self.evaluate_or_report(xpath, frame) {
                    let text = self.string(&value);
                    if !text.is_empty() {
                        out.append_text(parent, &text);
                    }
                }
            }
            Instruction::CopyOf(xpath) => self.copy_of(xpath, frame, out, parent),
            Instruction::ApplyTemplates {
                select,
                mode,
                params,
                sorts,
            } => {
                let nodes = match select {
                    Some(xpath) => match self.nodes_or_report(xpath, frame) {
                        Some(nodes) => nodes,
                        None => return,
                    },
                    None => match frame.node {
                        XNode::Node(id) => self.input.children(id).iter().map(|child| XNode::Node(*child)).collect(),
                        XNode::Attribute(..) => Vec::new(),
                    },
                };
                let nodes = self.sorted(nodes, sorts);
                let params = self.bind_all(params, frame);
                self.apply_templates(nodes, mode.as_deref(), params, out, parent);
            }
            Instruction::CallTemplate { name, params } => {
                let Some(index) = self.program.named.get(name).copied() else {
                    self.ctxt.fail(format_args!("call-template: no template named {}", name));
                    return;
                };
                let params = self.bind_all(params, frame);
                let inner = Frame::new(frame.node, frame.position, frame.size);
                self.invoke(index, inner, params, out, parent);
            }
            Instruction::ForEach { select, sorts, body } => {
                let Some(nodes) = self.nodes_or_report(select, frame) else {
                    return;
                };
                let nodes = self.sorted(nodes, sorts);
                let size = nodes.len();
                for (i, node) in nodes.into_iter().enumerate() {
                    if !self.running() {
                        return;
                    }
                    let mut inner = Frame {
                        node,
                        position: i + 1,
                        size,
                        locals: frame.locals.clone(),
                    };
                    self.execute(body, &mut inner, out, parent);
                }
            }
            Instruction::If { test, body } => {
                if self.evaluate_or_report(test, frame).is_some_and(|value| value.to_boolean()) {
                    self.execute(body, frame, out, parent);
                }
            }
            Instruction::Choose { branches, otherwise } => {
                for (test, body) in branches {
                    match self.evaluate_or_report(test, frame) {
                        Some(value) if value.to_boolean() => {
                            self.execute(body, frame, out, parent);
                            return;
                        }
                        Some(_) => (),
                        None => return,
                    }
                }
                self.execute(otherwise, frame, out, parent);
            }
            Instruction::Copy { body } => self.copy(body, frame, out, parent),
            Instruction::Element {
                name,
                namespace,
                scope,
                body,
            } => {
                let Some((name, uri)) = self.qualified_name(name, namespace.as_ref(), scope, frame) else {
                    return;
                };
                let element = out.append_element(parent, &name);
                if let Some(uri) = uri {
                    declare_namespace(out, element, split_qname(&name).0.unwrap_or(""), &uri);
                }
                self.execute(body, frame, out, element);
            }
            Instruction::Attribute {
                name,
                namespace,
                scope,
                body,
            } => {
                let Some((name, uri)) = self.qualified_name(name, namespace.as_ref(), scope, frame) else {
                    return;
                };
                let value = self.fragment(body, frame);
                if !out.is_element(parent) {
                    self.ctxt.report(format_args!("attribute {} cannot be added outside of an element", name));
                    return;
                }
                out.set_attribute(parent, &name, &value.string_value(value.root()));
                if let (Some(prefix), Some(uri)) = (split_qname(&name).0, uri) {
                    declare_namespace(out, parent, prefix, &uri);
                }
            }
            Instruction::Variable(binding) => {
                if let Some(bound) = self.bind(binding, frame) {
                    frame.locals.push((binding.name.clone(), bound));
                }
            }
            Instruction::Message { body, terminate } => {
                let text = self.fragment(body, frame);
                let text = text.string_value(text.root());
                if *terminate {
                    self.ctxt.fail(format_args!("{}", text));
                } else {
                    log::info!("xsl:message: {}", text);
                }
            }
        }
    }

    // Evaluates the name of xsl:element or xsl:attribute with its namespace.
    fn qualified_name(
        &mut self,
        name: &Avt,
        namespace: Option<&Avt>,
        scope: &[(String, String)],
        frame: &Frame,
    ) -> Option<(String, Option<String>)> {
        let name = self.avt(name, frame)?;
        let valid = !name.is_empty()
            && !name.starts_with(':')
            && !name.ends_with(':')
            && !name.chars().any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '&' | '"' | '\''));
        if !valid {
            self.ctxt.report(format_args!("invalid element or attribute name '{}'", name));
            return None;
        }
        let uri = match namespace {
            Some(avt) => Some(self.avt(avt, frame)?),
            None => match split_qname(&name).0 {
                Some(prefix) => match scope.iter().find(|(p, _)| p == prefix) {
                    Some((_, uri)) => Some(uri.clone()),
                    None => {
                        self.ctxt.report(format_args!("namespace prefix {} is not defined", prefix));
                        return None;
                    }
                },
                None => None,
            },
        };
        Some((name, uri))
    }

    fn copy(&mut self, body: &[Instruction], frame: &mut Frame, out: &mut Tree, parent: NodeId) {
        let input = self.input;
        match frame.node {
            XNode::Attribute(id, index) => {
                if let Some(attr) = input.attributes(id).get(index) {
                    if out.is_element(parent) {
                        out.set_attribute(parent, &attr.name, &attr.value);
                    }
                }
            }
            XNode::Node(id) => match input.kind(id) {
                NodeKind::Root => self.execute(body, frame, out, parent),
                NodeKind::Text(text) => {
                    out.append_text(parent, text);
                }
                NodeKind::Element { name, .. } => {
                    let element = out.append_element(parent, name);
                    for (prefix, uri) in in_scope_namespaces(input, id) {
                        declare_namespace(out, element, &prefix, &uri);
                    }
                    self.execute(body, frame, out, element);
                }
            },
        }
    }

    fn copy_of(&mut self, xpath: &XPath, frame: &Frame, out: &mut Tree, parent: NodeId) {
        if let Expr::Variable(name) = xpath.expr() {
            let fragment = frame
                .locals
                .iter()
                .rev()
                .find(|(local, _)| local == name)
                .map(|(_, bound)| bound)
                .or_else(|| self.globals.get(name));
            if let Some(Bound::Fragment(tree)) = fragment {
                out.copy_from(parent, tree, tree.root());
                return;
            }
        }

        let Some(value) = self.evaluate_or_report(xpath, frame) else {
            return;
        };
        let input = self.input;
        match value {
            Value::NodeSet(nodes) => {
                for node in nodes {
                    match node {
                        XNode::Attribute(id, index) => {
                            if let (Some(attr), true) = (input.attributes(id).get(index), out.is_element(parent)) {
                                out.set_attribute(parent, &attr.name, &attr.value);
                            }
                        }
                        XNode::Node(id) => {
                            out.copy_from(parent, input, id);
                            if input.is_element(id) {
                                if let Some(copy) = out.children(parent).last().copied() {
                                    for (prefix, uri) in in_scope_namespaces(input, id) {
                                        declare_namespace(out, copy, &prefix, &uri);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            value => {
                let text = self.string(&value);
                if !text.is_empty() {
                    out.append_text(parent, &text);
                }
            }
        }
    }
}
