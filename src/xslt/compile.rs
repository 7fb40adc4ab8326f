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
use std::sync::Arc;

use crate::document::NodeId;
use crate::document::NodeKind;
use crate::document::OutputMethod;
use crate::document::OutputSettings;
use crate::document::Tree;
use crate::document::split_qname;
use crate::xpath::XPath;

use super::XSLT_NAMESPACE;
use super::error::CompileError;
use super::error::description;
use super::pattern::Pattern;

/// Attribute value template, literal text mixed with `{expression}` parts.
#[derive(Debug)]
pub(crate) enum AvtPart {
    Text(String),
    Expr(XPath),
}

#[derive(Debug)]
pub(crate) struct Avt(pub(crate) Vec<AvtPart>);

#[derive(Debug)]
pub(crate) enum BindingValue {
    Select(XPath),
    Content(Vec<Instruction>),
    Empty,
}

#[derive(Debug)]
pub(crate) struct Binding {
    pub(crate) name: String,
    pub(crate) value: BindingValue,
}

#[derive(Debug)]
pub(crate) struct Sort {
    pub(crate) select: XPath,
    pub(crate) numeric: bool,
    pub(crate) descending: bool,
}

#[derive(Debug)]
pub(crate) enum Instruction {
    Literal {
        name: String,
        namespaces: Vec<(String, String)>,
        attributes: Vec<(String, Avt)>,
        body: Vec<Instruction>,
    },
    Text(String),
    ValueOf(XPath),
    ApplyTemplates {
        select: Option<XPath>,
        mode: Option<String>,
        params: Vec<Binding>,
        sorts: Vec<Sort>,
    },
    CallTemplate {
        name: String,
        params: Vec<Binding>,
    },
    ForEach {
        select: XPath,
        sorts: Vec<Sort>,
        body: Vec<Instruction>,
    },
    If {
        test: XPath,
        body: Vec<Instruction>,
    },
    Choose {
        branches: Vec<(XPath, Vec<Instruction>)>,
        otherwise: Vec<Instruction>,
    },
    Copy {
        body: Vec<Instruction>,
    },
    CopyOf(XPath),
    Element {
        name: Avt,
        namespace: Option<Avt>,
        scope: Vec<(String, String)>,
        body: Vec<Instruction>,
    },
    Attribute {
        name: Avt,
        namespace: Option<Avt>,
        scope: Vec<(String, String)>,
        body: Vec<Instruction>,
    },
    Variable(Binding),
    Message {
        body: Vec<Instruction>,
        terminate: bool,
    },
}

#[derive(Debug)]
pub(crate) struct Template {
    pub(crate) name: Option<String>,
    pub(crate) params: Vec<Binding>,
    pub(crate) body: Vec<Instruction>,
}

/// A match pattern alternative pointing at its template.
#[derive(Debug)]
pub(crate) struct Rule {
    pub(crate) pattern: Pattern,
    pub(crate) priority: f64,
    pub(crate) mode: Option<String>,
    pub(crate) template: usize,
}

#[derive(Debug)]
pub(crate) struct Global {
    pub(crate) binding: Binding,
    pub(crate) is_param: bool,
}

/// Name test of `xsl:strip-space` and `xsl:preserve-space`.
#[derive(Debug)]
pub(crate) enum SpaceTest {
    Any,
    Prefix(String),
    Name(String),
}

impl SpaceTest {
    // Higher is more specific.
    pub(crate) fn score(&self, name: &str) -> Option<u8> {
        match self {
            SpaceTest::Any => Some(0),
            SpaceTest::Prefix(prefix) => {
                (split_qname(name).0 == Some(prefix.as_str())).then_some(1)
            }
            SpaceTest::Name(test) => (test == name).then_some(2),
        }
    }
}

/// A compiled stylesheet.
#[derive(Debug)]
pub struct Program {
    pub(crate) templates: Vec<Template>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) named: BTreeMap<String, usize>,
    pub(crate) globals: Vec<Global>,
    pub(crate) strip_space: Vec<SpaceTest>,
    pub(crate) preserve_space: Vec<SpaceTest>,
    pub(crate) output: Arc<OutputSettings>,
}

impl Program {
    /// Serialization settings from `xsl:output`.
    pub fn output(&self) -> &Arc<OutputSettings> {
        &self.output
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Names of the global parameters, in stylesheet order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.globals
            .iter()
            .filter(|global| global.is_param)
            .map(|global| global.binding.name.as_str())
    }
}

fn xsl_name(tree: &Tree, id: NodeId) -> Option<&str> {
    let name = tree.name(id)?;
    let (prefix, local) = split_qname(name);
    let uri = tree.lookup_namespace(id, prefix.unwrap_or(""))?;
    (uri == XSLT_NAMESPACE).then_some(local)
}

fn is_xsl_attribute(tree: &Tree, id: NodeId, name: &str) -> bool {
    match split_qname(name) {
        (Some("xmlns"), _) => false,
        (Some(prefix), _) => tree.lookup_namespace(id, prefix) == Some(XSLT_NAMESPACE),
        (None, _) => false,
    }
}

fn declaration_prefix(name: &str) -> Option<&str> {
    match name.strip_prefix("xmlns") {
        Some("") => Some(""),
        Some(rest) => rest.strip_prefix(':'),
        None => None,
    }
}

/// Namespace declarations in scope of a node, innermost first.
pub(crate) fn in_scope_namespaces(tree: &Tree, id: NodeId) -> Vec<(String, String)> {
    let mut namespaces: Vec<(String, String)> = Vec::new();
    let mut current = Some(id);
    while let Some(node) = current {
        for attr in tree.attributes(node) {
            if let Some(prefix) = declaration_prefix(&attr.name) {
                if !namespaces.iter().any(|(seen, _)| seen == prefix) {
                    namespaces.push((prefix.to_string(), attr.value.clone()));
                }
            }
        }
        current = tree.parent(node);
    }
    namespaces
}

fn is_blank(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn expression(source: &str) -> Result<XPath, CompileError> {
    XPath::new(source).map_err(|error| CompileError::BadExpression {
        expression: source.to_string(),
        error,
    })
}

/// Parses an attribute value template.
pub(crate) fn parse_avt(source: &str) -> Result<Avt, CompileError> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '}' => return Err(CompileError::BadStylesheet(description::BAD_AVT_BRACE)),
            '{' => {
                let mut expr = String::new();
                let mut quote: Option<char> = None;
                loop {
                    let Some(c) = chars.next() else {
                        return Err(CompileError::BadStylesheet(description::UNTERMINATED_AVT));
                    };
                    match (quote, c) {
                        (None, '}') => break,
                        (None, '"' | '\'') => quote = Some(c),
                        (Some(q), c) if q == c => quote = None,
                        _ => (),
                    }
                    expr.push(c);
                }
                if !text.is_empty() {
                    parts.push(AvtPart::Text(std::mem::take(&mut text)));
                }
                parts.push(AvtPart::Expr(expression(&expr)?));
            }
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        parts.push(AvtPart::Text(text));
    }
    Ok(Avt(parts))
}

struct Compiler<'t> {
    tree: &'t Tree,
    program: Program,
    // Called template names, checked once all templates are known.
    calls: Vec<String>,
}

/// Compiles a stylesheet tree into a program.
pub fn compile(tree: &Tree) -> Result<Program, CompileError> {
    let root = tree
        .document_element()
        .ok_or(CompileError::BadStylesheet(description::EMPTY_DOCUMENT))?;
    let mut compiler = Compiler {
        tree,
        program: Program {
            templates: Vec::new(),
            rules: Vec::new(),
            named: BTreeMap::new(),
            globals: Vec::new(),
            strip_space: Vec::new(),
            preserve_space: Vec::new(),
            output: Arc::new(OutputSettings::default()),
        },
        calls: Vec::new(),
    };

    match xsl_name(tree, root) {
        Some("stylesheet" | "transform") => compiler.top_level(root)?,
        Some(_) => return Err(CompileError::BadStylesheet(description::NOT_A_STYLESHEET)),
        None => {
            let simplified = tree
                .attributes(root)
                .iter()
                .any(|attr| is_xsl_attribute(tree, root, &attr.name) && split_qname(&attr.name).1 == "version");
            if !simplified {
                return Err(CompileError::BadStylesheet(description::NOT_A_STYLESHEET));
            }
            let body = vec![compiler.literal(root)?];
            compiler.add_template(Template {
                name: None,
                params: Vec::new(),
                body,
            });
            let patterns = Pattern::parse("/")?;
            for pattern in patterns {
                compiler.program.rules.push(Rule {
                    priority: pattern.default_priority(),
                    pattern,
                    mode: None,
                    template: 0,
                });
            }
        }
    }

    for name in &compiler.calls {
        if !compiler.program.named.contains_key(name) {
            return Err(CompileError::UnknownTemplate(name.clone()));
        }
    }
    log::debug!(
        "compiled stylesheet with {} templates and {} rules",
        compiler.program.templates.len(),
        compiler.program.rules.len()
    );
    Ok(compiler.program)
}

impl<'t> Compiler<'t> {
    fn element_name(&self, id: NodeId) -> String {
        self.tree.name(id).unwrap_or_default().to_string()
    }

    fn required(&self, id: NodeId, attribute: &'static str) -> Result<&'t str, CompileError> {
        self.tree
            .attribute(id, attribute)
            .ok_or_else(|| CompileError::MissingAttribute {
                element: self.element_name(id),
                attribute,
            })
    }

    fn yes_no(&self, id: NodeId, attribute: &'static str) -> Result<Option<bool>, CompileError> {
        match self.tree.attribute(id, attribute) {
            None => Ok(None),
            Some("yes") => Ok(Some(true)),
            Some("no") => Ok(Some(false)),
            Some(value) => Err(CompileError::BadAttributeValue {
                element: self.element_name(id),
                attribute,
                value: value.to_string(),
            }),
        }
    }

    fn add_template(&mut self, template: Template) -> usize {
        self.program.templates.push(template);
        self.program.templates.len() - 1
    }

    fn top_level(&mut self, root: NodeId) -> Result<(), CompileError> {
        let tree = self.tree;
        for child in tree.children(root) {
            let child = *child;
            match tree.kind(child) {
                NodeKind::Text(text) if is_blank(text) => continue,
                NodeKind::Text(_) => {
                    return Err(CompileError::UnexpectedChild {
                        element: self.element_name(root),
                        child: "text".to_string(),
                    });
                }
                _ => (),
            }
            // Elements of other namespaces are user data.
            let Some(local) = xsl_name(tree, child) else {
                continue;
            };
            match local {
                "output" => self.output(child)?,
                "param" | "variable" => {
                    let binding = self.binding(child)?;
                    self.program.globals.push(Global {
                        binding,
                        is_param: local == "param",
                    });
                }
                "template" => self.template(child)?,
                "strip-space" | "preserve-space" => {
                    let tests = self
                        .required(child, "elements")?
                        .split_whitespace()
                        .map(|test| match test {
                            "*" => SpaceTest::Any,
                            _ => match test.strip_suffix(":*") {
                                Some(prefix) => SpaceTest::Prefix(prefix.to_string()),
                                None => SpaceTest::Name(test.to_string()),
                            },
                        });
                    if local == "strip-space" {
                        self.program.strip_space.extend(tests);
                    } else {
                        self.program.preserve_space.extend(tests);
                    }
                }
                _ => return Err(CompileError::UnsupportedElement(self.element_name(child))),
            }
        }
        Ok(())
    }

    fn output(&mut self, id: NodeId) -> Result<(), CompileError> {
        let tree = self.tree;
        let mut settings = OutputSettings::clone(&self.program.output);
        if let Some(method) = tree.attribute(id, "method") {
            settings.method = Some(match method {
                "xml" => OutputMethod::Xml,
                "html" => OutputMethod::Html,
                "text" => OutputMethod::Text,
                _ => {
                    return Err(CompileError::BadAttributeValue {
                        element: self.element_name(id),
                        attribute: "method",
                        value: method.to_string(),
                    });
                }
            });
        }
        if let Some(encoding) = tree.attribute(id, "encoding") {
            settings.encoding = Some(encoding.to_string());
        }
        if let Some(omit) = self.yes_no(id, "omit-xml-declaration")? {
            settings.omit_xml_declaration = omit;
        }
        if let Some(standalone) = self.yes_no(id, "standalone")? {
            settings.standalone = Some(standalone);
        }
        if let Some(indent) = self.yes_no(id, "indent")? {
            settings.indent = indent;
        }
        if let Some(public) = tree.attribute(id, "doctype-public") {
            settings.doctype_public = Some(public.to_string());
        }
        if let Some(system) = tree.attribute(id, "doctype-system") {
            settings.doctype_system = Some(system.to_string());
        }
        if let Some(media_type) = tree.attribute(id, "media-type") {
            settings.media_type = Some(media_type.to_string());
        }
        self.program.output = Arc::new(settings);
        Ok(())
    }

    fn binding(&mut self, id: NodeId) -> Result<Binding, CompileError> {
        let name = self.required(id, "name")?.to_string();
        let value = match self.tree.attribute(id, "select") {
            Some(select) => BindingValue::Select(expression(select)?),
            None => {
                let body = self.body(id)?;
                if body.is_empty() {
                    BindingValue::Empty
                } else {
                    BindingValue::Content(body)
                }
            }
        };
        Ok(Binding { name, value })
    }

    fn template(&mut self, id: NodeId) -> Result<(), CompileError> {
        let tree = self.tree;
        let pattern = tree.attribute(id, "match");
        let name = tree.attribute(id, "name");
        if pattern.is_none() && name.is_none() {
            return Err(CompileError::MissingAttribute {
                element: self.element_name(id),
                attribute: "match",
            });
        }
        let priority = match tree.attribute(id, "priority") {
            Some(value) => Some(value.trim().parse::<f64>().map_err(|_| CompileError::BadAttributeValue {
                element: self.element_name(id),
                attribute: "priority",
                value: value.to_string(),
            })?),
            None => None,
        };
        let mode = tree.attribute(id, "mode").map(str::to_string);

        let mut params = Vec::new();
        let mut rest = Vec::new();
        for child in tree.children(id) {
            let leading = rest.iter().all(|node| tree.text(*node).is_some_and(is_blank));
            if leading && xsl_name(tree, *child) == Some("param") {
                params.push(self.binding(*child)?);
            } else {
                rest.push(*child);
            }
        }
        let body = self.instructions(id, &rest)?;

        let index = self.add_template(Template {
            name: name.map(str::to_string),
            params,
            body,
        });
        if let Some(name) = name {
            if self.program.named.insert(name.to_string(), index).is_some() {
                return Err(CompileError::BadStylesheet(description::DUPLICATE_TEMPLATE));
            }
        }
        if let Some(pattern) = pattern {
            for pattern in Pattern::parse(pattern)? {
                self.program.rules.push(Rule {
                    priority: priority.unwrap_or_else(|| pattern.default_priority()),
                    pattern,
                    mode: mode.clone(),
                    template: index,
                });
            }
        }
        Ok(())
    }

    fn body(&mut self, id: NodeId) -> Result<Vec<Instruction>, CompileError> {
        let children = self.tree.children(id).to_vec();
        self.instructions(id, &children)
    }

    fn instructions(&mut self, parent: NodeId, children: &[NodeId]) -> Result<Vec<Instruction>, CompileError> {
        let tree = self.tree;
        let mut body = Vec::new();
        for child in children {
            match tree.kind(*child) {
                NodeKind::Text(text) => {
                    if !is_blank(text) || preserves_space(tree, parent) {
                        body.push(Instruction::Text(text.clone()));
                    }
                }
                NodeKind::Element { .. } => body.push(self.instruction(*child)?),
                NodeKind::Root => (),
            }
        }
        Ok(body)
    }

    // Leading xsl:with-param and xsl:sort children, then the rest.
    fn parameters_and_sorts(&mut self, id: NodeId) -> Result<(Vec<Binding>, Vec<Sort>, Vec<NodeId>), CompileError> {
        let tree = self.tree;
        let mut params = Vec::new();
        let mut sorts = Vec::new();
        let mut rest = Vec::new();
        for child in tree.children(id) {
            let child = *child;
            match xsl_name(tree, child) {
                Some("with-param") => params.push(self.binding(child)?),
                Some("sort") => sorts.push(self.sort(child)?),
                _ => rest.push(child),
            }
        }
        Ok((params, sorts, rest))
    }

    fn sort(&mut self, id: NodeId) -> Result<Sort, CompileError> {
        let tree = self.tree;
        let select = expression(tree.attribute(id, "select").unwrap_or("."))?;
        let numeric = match tree.attribute(id, "data-type") {
            None | Some("text") => false,
            Some("number") => true,
            Some(value) => {
                return Err(CompileError::BadAttributeValue {
                    element: self.element_name(id),
                    attribute: "data-type",
                    value: value.to_string(),
                });
            }
        };
        let descending = match tree.attribute(id, "order") {
            None | Some("ascending") => false,
            Some("descending") => true,
            Some(value) => {
                return Err(CompileError::BadAttributeValue {
                    element: self.element_name(id),
                    attribute: "order",
                    value: value.to_string(),
                });
            }
        };
        Ok(Sort {
            select,
            numeric,
            descending,
        })
    }

    fn unexpected(&self, parent: NodeId, child: NodeId) -> CompileError {
        CompileError::UnexpectedChild {
            element: self.element_name(parent),
            child: self.element_name(child),
        }
    }

    fn instruction(&mut self, id: NodeId) -> Result<Instruction, CompileError> {
        let tree = self.tree;
        let Some(local) = xsl_name(tree, id) else {
            return self.literal(id);
        };
        let instruction = match local {
            "text" => {
                let mut text = String::new();
                for child in tree.children(id) {
                    match tree.text(*child) {
                        Some(part) => text.push_str(part),
                        None => return Err(self.unexpected(id, *child)),
                    }
                }
                Instruction::Text(text)
            }
            "value-of" => Instruction::ValueOf(expression(self.required(id, "select")?)?),
            "copy-of" => Instruction::CopyOf(expression(self.required(id, "select")?)?),
            "apply-templates" => {
                let select = tree.attribute(id, "select").map(expression).transpose()?;
                let (params, sorts, rest) = self.parameters_and_sorts(id)?;
                if let Some(other) = rest.iter().find(|child| tree.is_element(**child)) {
                    return Err(self.unexpected(id, *other));
                }
                Instruction::ApplyTemplates {
                    select,
                    mode: tree.attribute(id, "mode").map(str::to_string),
                    params,
                    sorts,
                }
            }
            "call-template" => {
                let name = self.required(id, "name")?.to_string();
                let (params, sorts, rest) = self.parameters_and_sorts(id)?;
                if let Some(other) = rest.iter().find(|child| tree.is_element(**child)) {
                    return Err(self.unexpected(id, *other));
                }
                if !sorts.is_empty() {
                    return Err(CompileError::UnexpectedChild {
                        element: self.element_name(id),
                        child: "xsl:sort".to_string(),
                    });
                }
                self.calls.push(name.clone());
                Instruction::CallTemplate { name, params }
            }
            "for-each" => {
                let select = expression(self.required(id, "select")?)?;
                let (params, sorts, rest) = self.parameters_and_sorts(id)?;
                if !params.is_empty() {
                    return Err(CompileError::UnexpectedChild {
                        element: self.element_name(id),
                        child: "xsl:with-param".to_string(),
                    });
                }
                let body = self.instructions(id, &rest)?;
                Instruction::ForEach { select, sorts, body }
            }
            "if" => Instruction::If {
                test: expression(self.required(id, "test")?)?,
                body: self.body(id)?,
            },
            "choose" => {
                let mut branches = Vec::new();
                let mut otherwise = Vec::new();
                for child in tree.children(id) {
                    let child = *child;
                    if tree.text(child).is_some_and(is_blank) {
                        continue;
                    }
                    match xsl_name(tree, child) {
                        Some("when") => {
                            let test = expression(self.required(child, "test")?)?;
                            branches.push((test, self.body(child)?));
                        }
                        Some("otherwise") => otherwise = self.body(child)?,
                        _ => return Err(self.unexpected(id, child)),
                    }
                }
                Instruction::Choose { branches, otherwise }
            }
            "copy" => Instruction::Copy { body: self.body(id)? },
            "element" | "attribute" => {
                let name = parse_avt(self.required(id, "name")?)?;
                let namespace = tree.attribute(id, "namespace").map(parse_avt).transpose()?;
                let scope = in_scope_namespaces(tree, id);
                let body = self.body(id)?;
                if local == "element" {
                    Instruction::Element {
                        name,
                        namespace,
                        scope,
                        body,
                    }
                } else {
                    Instruction::Attribute {
                        name,
                        namespace,
                        scope,
                        body,
                    }
                }
            }
            "variable" => Instruction::Variable(self.binding(id)?),
            "message" => Instruction::Message {
                terminate: self.yes_no(id, "terminate")?.unwrap_or(false),
                body: self.body(id)?,
            },
            _ => return Err(CompileError::UnsupportedElement(self.element_name(id))),
        };
        Ok(instruction)
    }

    fn literal(&mut self, id: NodeId) -> Result<Instruction, CompileError> {
        let tree = self.tree;
        let name = self.element_name(id);
        let mut attributes = Vec::new();
        let mut prefixes = vec![split_qname(&name).0.unwrap_or("")];
        for attr in tree.attributes(id) {
            if is_xsl_attribute(tree, id, &attr.name) {
                continue;
            }
            if declaration_prefix(&attr.name).is_some() {
                if attr.value == XSLT_NAMESPACE {
                    continue;
                }
            } else if let (Some(prefix), _) = split_qname(&attr.name) {
                prefixes.push(prefix);
            }
            attributes.push((attr.name.clone(), parse_avt(&attr.value)?));
        }

        let mut namespaces: Vec<(String, String)> = Vec::new();
        for prefix in prefixes {
            if prefix == "xml" || namespaces.iter().any(|(seen, _)| seen == prefix) {
                continue;
            }
            let uri = tree.lookup_namespace(id, prefix).unwrap_or("");
            if uri == XSLT_NAMESPACE {
                continue;
            }
            namespaces.push((prefix.to_string(), uri.to_string()));
        }

        Ok(Instruction::Literal {
            name,
            namespaces,
            attributes,
            body: self.body(id)?,
        })
    }
}

fn preserves_space(tree: &Tree, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current {
        match tree.attribute(node, "xml:space") {
            Some("preserve") => return true,
            Some("default") => return false,
            _ => current = tree.parent(node),
        }
    }
    false
}
