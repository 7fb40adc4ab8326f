/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::entities::EscapeContext;
use crate::entities::escape;

use super::NodeId;
use super::NodeKind;
use super::OutputMethod;
use super::OutputSettings;
use super::Tree;

const HTML_VOID_ELEMENTS: [&str; 11] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
];

enum Step {
    Visit(NodeId, usize),
    Newline(usize),
    Close(NodeId),
}

pub(super) struct Writer<'a> {
    tree: &'a Tree,
    buf: &'a mut String,
    ascii_only: bool,
    html: bool,
    indent: bool,
}

impl<'a> Writer<'a> {
    pub(super) fn compact(tree: &'a Tree, buf: &'a mut String) -> Self {
        Writer {
            tree,
            buf,
            ascii_only: false,
            html: false,
            indent: false,
        }
    }

    pub(super) fn top_level(&mut self, separator: &str) {
        let tree = self.tree;
        for child in tree.children(tree.root()) {
            self.node(*child, 0);
            self.buf.push_str(separator);
        }
    }

    fn newline(&mut self, depth: usize) {
        self.buf.push('\n');
        for _ in 0..depth {
            self.buf.push_str("  ");
        }
    }

    // Walks the subtree with an explicit stack, trees built in memory
    // can be nested deeper than the call stack allows.
    fn node(&mut self, id: NodeId, depth: usize) {
        let mut steps = vec![Step::Visit(id, depth)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Visit(id, depth) => self.open(id, depth, &mut steps),
                Step::Newline(depth) => self.newline(depth),
                Step::Close(id) => {
                    self.buf.push_str("</");
                    self.buf.push_str(self.tree.name(id).unwrap_or_default());
                    self.buf.push('>');
                }
            }
        }
    }

    fn open(&mut self, id: NodeId, depth: usize, steps: &mut Vec<Step>) {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Root => {
                steps.extend(tree.children(id).iter().rev().map(|child| Step::Visit(*child, depth)));
            }
            NodeKind::Text(text) => {
                let raw = self.html
                    && tree
                        .parent(id)
                        .and_then(|parent| tree.name(parent))
                        .is_some_and(|name| {
                            name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
                        });
                if raw {
                    self.buf.push_str(text);
                } else {
                    let context = if self.html {
                        EscapeContext::HtmlText
                    } else {
                        EscapeContext::Text
                    };
                    escape(text, context, self.ascii_only, self.buf);
                }
            }
            NodeKind::Element { name, attributes } => {
                self.buf.push('<');
                self.buf.push_str(name);
                for attr in attributes {
                    self.buf.push(' ');
                    self.buf.push_str(&attr.name);
                    self.buf.push_str("=\"");
                    escape(&attr.value, EscapeContext::Attribute, self.ascii_only, self.buf);
                    self.buf.push('"');
                }

                let children = tree.children(id);
                if children.is_empty() {
                    if !self.html {
                        self.buf.push_str("/>");
                    } else if HTML_VOID_ELEMENTS.iter().any(|void| name.eq_ignore_ascii_case(void)) {
                        self.buf.push('>');
                    } else {
                        self.buf.push_str("></");
                        self.buf.push_str(name);
                        self.buf.push('>');
                    }
                    return;
                }

                self.buf.push('>');
                let format = self.indent && children.iter().all(|child| tree.is_element(*child));
                steps.push(Step::Close(id));
                if format {
                    steps.push(Step::Newline(depth));
                }
                for child in children.iter().rev() {
                    steps.push(Step::Visit(*child, depth + 1));
                    if format {
                        steps.push(Step::Newline(depth + 1));
                    }
                }
            }
        }
    }
}

impl Tree {
    /// Renders a node and its subtree as compact XML.
    pub fn xml_string(&self, id: NodeId) -> String {
        let mut buf = String::new();
        Writer::compact(self, &mut buf).node(id, 0);
        buf
    }
}

fn is_utf8(encoding: &str) -> bool {
    encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8")
}

fn resolve_method(tree: &Tree, settings: &OutputSettings) -> OutputMethod {
    if let Some(method) = settings.method {
        return method;
    }
    let html_root = tree
        .document_element()
        .and_then(|id| tree.name(id))
        .is_some_and(|name| name.eq_ignore_ascii_case("html"));
    if html_root {
        OutputMethod::Html
    } else {
        OutputMethod::Xml
    }
}

pub(super) fn save_plain(tree: &Tree) -> String {
    let mut buf = String::from("<?xml version=\"1.0\"?>\n");
    Writer::compact(tree, &mut buf).top_level("\n");
    buf
}

pub(super) fn save_with_settings(tree: &Tree, settings: &OutputSettings) -> String {
    let mut buf = String::new();
    let encoding = settings.encoding.as_deref().unwrap_or("UTF-8");
    let method = resolve_method(tree, settings);

    if method == OutputMethod::Text {
        buf.push_str(&tree.string_value(tree.root()));
        return buf;
    }

    let html = method == OutputMethod::Html;
    if !html && !settings.omit_xml_declaration {
        buf.push_str("<?xml version=\"1.0\" encoding=\"");
        buf.push_str(encoding);
        buf.push('"');
        if let Some(standalone) = settings.standalone {
            buf.push_str(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        buf.push_str("?>\n");
    }

    if settings.doctype_system.is_some() || (html && settings.doctype_public.is_some()) {
        let root_name = tree
            .document_element()
            .and_then(|id| tree.name(id))
            .unwrap_or(if html { "html" } else { "" });
        buf.push_str("<!DOCTYPE ");
        buf.push_str(root_name);
        match (&settings.doctype_public, &settings.doctype_system) {
            (Some(public), Some(system)) => {
                buf.push_str(&format!(" PUBLIC \"{}\" \"{}\"", public, system));
            }
            (Some(public), None) => buf.push_str(&format!(" PUBLIC \"{}\"", public)),
            (None, Some(system)) => buf.push_str(&format!(" SYSTEM \"{}\"", system)),
            (None, None) => (),
        }
        buf.push_str(">\n");
    }

    let mut writer = Writer {
        tree,
        buf: &mut buf,
        ascii_only: !is_utf8(encoding),
        html,
        indent: settings.indent,
    };
    writer.top_level("\n");
    buf
}
