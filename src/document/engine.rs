/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::path::Path;

use crate::Location;
use crate::SaxElement;
use crate::SaxError;
use crate::SaxHandler;
use crate::SaxParser;

use super::error::ParseAborted;
use super::error::description;
use super::tree::NodeId;
use super::tree::Tree;
use super::tree::split_qname;

/// Deepest element nesting the engine accepts.
pub const MAX_DEPTH: usize = 256;

/// Decision of an [ignorable_whitespace](SaxCallbacks::ignorable_whitespace) callback.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Whitespace {
    /// Put the whitespace into the tree as a text node.
    Keep,
    /// Drop the whitespace.
    Ignore,
}

/// Callback table of the tree building engine.
///
/// The engine reports diagnostics and asks about ignorable whitespace
/// through these methods while it builds the tree. The implementor is
/// the per-operation state the caller wants to collect results in; it is
/// handed to the engine as a mutable reference for the duration of one
/// parse.
///
/// Messages are passed preformatted. The default methods form the
/// engine's built-in table: they log and keep going.
pub trait SaxCallbacks {
    fn warning(&mut self, message: fmt::Arguments<'_>) {
        log::warn!("XML warning: {}", message);
    }

    /// A recoverable error. Returning `Break` stops the parser.
    fn error(&mut self, message: fmt::Arguments<'_>) -> ControlFlow<()> {
        log::warn!("XML error: {}", message);
        ControlFlow::Continue(())
    }

    /// An unrecoverable error. The parser always stops after this call.
    fn fatal_error(&mut self, message: fmt::Arguments<'_>) {
        log::warn!("XML fatal error: {}", message);
    }

    fn ignorable_whitespace(&mut self, _text: &str) -> Whitespace {
        Whitespace::Keep
    }
}

/// The engine's default callback table.
#[derive(Debug, Default)]
pub struct DefaultCallbacks;

impl SaxCallbacks for DefaultCallbacks {}

// Callbacks are foreign code from the engine's point of view. A panic
// must not unwind through the builder, so it is turned into a status.
pub(crate) fn guarded<R>(fallback: R, callback: impl FnOnce() -> R) -> R {
    match catch_unwind(AssertUnwindSafe(callback)) {
        Ok(result) => result,
        Err(_) => {
            log::error!("a callback panicked, the panic is suppressed");
            fallback
        }
    }
}

struct TreeBuilder<'c> {
    callbacks: &'c mut dyn SaxCallbacks,
    tree: Tree,
    current: NodeId,
    // Element whose start tag is still receiving attributes.
    open: Option<NodeId>,
    text: String,
    text_has_section: bool,
    preserve_space: Vec<bool>,
    depth: usize,
    seen_event: bool,
    fatal: Option<String>,
    stopped: bool,
}

impl<'c> TreeBuilder<'c> {
    fn new(callbacks: &'c mut dyn SaxCallbacks) -> Self {
        let tree = Tree::new();
        let root = tree.root();
        TreeBuilder {
            callbacks,
            tree,
            current: root,
            open: None,
            text: String::new(),
            text_has_section: false,
            preserve_space: vec![false],
            depth: 0,
            seen_event: false,
            fatal: None,
            stopped: false,
        }
    }

    fn warning(&mut self, message: fmt::Arguments<'_>) {
        let callbacks = &mut *self.callbacks;
        guarded((), || callbacks.warning(message));
    }

    fn error(&mut self, message: fmt::Arguments<'_>) -> Result<(), SaxError> {
        let callbacks = &mut *self.callbacks;
        let flow = guarded(ControlFlow::Break(()), || callbacks.error(message));
        if flow.is_break() {
            self.stopped = true;
            return Err(SaxError::HandlerAbort);
        }
        Ok(())
    }

    // Fatal errors are reported by the context once the tokenizer has
    // returned, so that the message can carry the location.
    fn fatal(&mut self, message: String) -> Result<(), SaxError> {
        self.fatal = Some(message);
        Err(SaxError::HandlerAbort)
    }

    fn finish_start_tag(&mut self) -> Result<(), SaxError> {
        let Some(node) = self.open.take() else {
            return Ok(());
        };

        let parent_preserve = self.preserve_space.last().copied().unwrap_or(false);
        let preserve = match self.tree.attribute(node, "xml:space") {
            Some("preserve") => true,
            Some("default") => false,
            _ => parent_preserve,
        };
        self.preserve_space.push(preserve);

        let name = self.tree.name(node).unwrap_or_default().to_string();
        if let (Some(prefix), _) = split_qname(&name) {
            if self.tree.lookup_namespace(node, prefix).is_none() {
                self.error(format_args!(
                    "{} {} on {} is not defined",
                    description::NAMESPACE_UNDEFINED,
                    prefix,
                    name
                ))?;
            }
        }
        let prefixed: Vec<String> = self
            .tree
            .attributes(node)
            .iter()
            .filter_map(|attr| match split_qname(&attr.name) {
                (Some("xmlns"), _) => None,
                (Some(prefix), _) if self.tree.lookup_namespace(node, prefix).is_none() => {
                    Some(prefix.to_string())
                }
                _ => None,
            })
            .collect();
        for prefix in prefixed {
            self.error(format_args!(
                "{} {} on {} is not defined",
                description::NAMESPACE_UNDEFINED,
                prefix,
                name
            ))?;
        }
        Ok(())
    }

    fn flush_text(&mut self, before_start_tag: bool) -> Result<(), SaxError> {
        if self.text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.text);
        let has_section = std::mem::replace(&mut self.text_has_section, false);

        let preserve = self.preserve_space.last().copied().unwrap_or(false);
        if !has_section && !preserve && text.bytes().all(|c| c.is_ascii_whitespace()) {
            let children = self.tree.children(self.current);
            let has_text_child = children.iter().any(|child| self.tree.is_text(*child));
            let ignorable = if before_start_tag {
                !has_text_child
            } else {
                !children.is_empty() && !has_text_child
            };
            if ignorable {
                let callbacks = &mut *self.callbacks;
                let decision = guarded(Whitespace::Keep, || callbacks.ignorable_whitespace(&text));
                if decision == Whitespace::Ignore {
                    return Ok(());
                }
            }
        }
        self.tree.append_text(self.current, &text);
        Ok(())
    }

    fn xml_declaration(&mut self, content: &str) -> Result<(), SaxError> {
        if self.seen_event {
            return self.fatal(description::XML_DECL_NOT_AT_START.to_string());
        }
        let Some(version) = pseudo_attribute(content, "version") else {
            return self.fatal(description::XML_DECL_NO_VERSION.to_string());
        };
        if version != "1.0" {
            self.warning(format_args!("{} '{}'", description::UNSUPPORTED_VERSION, version));
        }
        if let Some(encoding) = pseudo_attribute(content, "encoding") {
            let utf8 = ["utf-8", "utf8", "us-ascii", "ascii"]
                .iter()
                .any(|known| encoding.eq_ignore_ascii_case(known));
            if !utf8 {
                self.warning(format_args!(
                    "{} '{}', reading input as UTF-8",
                    description::UNSUPPORTED_ENCODING,
                    encoding
                ));
            }
        }
        Ok(())
    }
}

impl SaxHandler for TreeBuilder<'_> {
    fn handle_element(&mut self, element: &SaxElement) -> Result<(), SaxError> {
        if self.stopped {
            return Err(SaxError::HandlerAbort);
        }
        match element {
            SaxElement::StartTag(name) => {
                self.finish_start_tag()?;
                if self.depth >= MAX_DEPTH {
                    return self.fatal(format!("{}: {}", description::EXCESSIVE_DEPTH, MAX_DEPTH));
                }
                self.depth += 1;
                self.flush_text(true)?;
                let node = self.tree.append_element(self.current, name);
                self.current = node;
                self.open = Some(node);
            }
            SaxElement::Attribute(name, value) => {
                if let Some(node) = self.open {
                    if self.tree.attribute(node, name).is_some() {
                        return self.fatal(format!("{} {}", description::ATTRIBUTE_REDEFINED, name));
                    }
                    if (*name == "xmlns" || name.starts_with("xmlns:"))
                        && !value.is_empty()
                        && !value.contains(':')
                    {
                        self.warning(format_args!(
                            "{} {} is not absolute",
                            description::NAMESPACE_NOT_ABSOLUTE,
                            value
                        ));
                    }
                    self.tree.set_attribute(node, name, value);
                }
            }
            SaxElement::EmptyElementTag => {
                self.finish_start_tag()?;
                self.depth = self.depth.saturating_sub(1);
                self.preserve_space.pop();
                if let Some(parent) = self.tree.parent(self.current) {
                    self.current = parent;
                }
            }
            SaxElement::EndTag(name) => {
                self.finish_start_tag()?;
                self.flush_text(false)?;
                let open_name = self.tree.name(self.current).unwrap_or_default();
                if open_name != *name {
                    let message =
                        format!("{}: {} and {}", description::TAG_MISMATCH, open_name, name);
                    return self.fatal(message);
                }
                self.depth = self.depth.saturating_sub(1);
                self.preserve_space.pop();
                if let Some(parent) = self.tree.parent(self.current) {
                    self.current = parent;
                }
            }
            SaxElement::CData(text) => {
                self.finish_start_tag()?;
                self.text.push_str(text);
            }
            SaxElement::CDataSection(text) => {
                self.finish_start_tag()?;
                self.text.push_str(text);
                self.text_has_section = true;
            }
            SaxElement::ProcessingInstruction(content) => {
                self.finish_start_tag()?;
                let (target, rest) = match content.split_once(|c: char| c.is_ascii_whitespace()) {
                    Some((target, rest)) => (target, rest),
                    None => (*content, ""),
                };
                if target == "xml" {
                    self.xml_declaration(rest)?;
                }
            }
        }
        self.seen_event = true;
        Ok(())
    }
}

// Finds a `name="value"` pair in the content of an XML declaration.
fn pseudo_attribute<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = content;
    while let Some(pos) = rest.find(name) {
        let after = rest[pos + name.len()..].trim_start();
        rest = &rest[pos + name.len()..];
        let Some(after) = after.strip_prefix('=') else {
            continue;
        };
        let after = after.trim_start();
        let quote = after.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let value = &after[1..];
        return value.find(quote).map(|end| &value[..end]);
    }
    None
}

/// A parsing context over an in-memory buffer.
///
/// The context owns the tree while it is being built. A caller claims it
/// with [take_document()](ParserContext::take_document); a tree left in
/// the context is freed with the context.
pub struct ParserContext<'a> {
    input: &'a [u8],
    tree: Option<Tree>,
    well_formed: bool,
    location: Location,
}

impl<'a> ParserContext<'a> {
    /// Creates a context for parsing the given buffer.
    ///
    /// Returns `None` when no context can be set up, which is the case for
    /// an empty buffer.
    pub fn from_memory(input: &'a [u8]) -> Option<ParserContext<'a>> {
        if input.is_empty() {
            log::debug!("cannot create a parser context for an empty buffer");
            return None;
        }
        Some(ParserContext::new(input))
    }

    fn new(input: &'a [u8]) -> ParserContext<'a> {
        ParserContext {
            input,
            tree: None,
            well_formed: false,
            location: Location::new(),
        }
    }

    /// Parses the whole buffer, reporting through the given callbacks.
    ///
    /// Returns an error when parsing stopped early, because of a fatal
    /// error or because a callback asked for it.
    pub fn parse_document(&mut self, callbacks: &mut dyn SaxCallbacks) -> Result<(), ParseAborted> {
        let mut parser = SaxParser::new();
        let mut builder = TreeBuilder::new(callbacks);
        let result = parser.parse_bytes_finish(&mut builder, self.input);
        self.location = parser.location();

        let fatal = match result {
            Ok(()) => None,
            Err(SaxError::BadXml(message)) => Some(message.to_string()),
            Err(SaxError::HandlerAbort) => builder.fatal.take(),
        };
        if let Some(message) = &fatal {
            let location = self.location;
            let callbacks = &mut *builder.callbacks;
            guarded((), || callbacks.fatal_error(format_args!("{}: {}", location, message)));
        }

        let aborted = result.is_err();
        self.well_formed = fatal.is_none() && !aborted;
        self.tree = Some(builder.tree);
        log::debug!(
            "parsed {} bytes, well formed: {}, aborted: {}",
            self.location.bytes,
            self.well_formed,
            aborted
        );
        if aborted { Err(ParseAborted) } else { Ok(()) }
    }

    /// Whether the document passed the structural checks.
    pub fn well_formed(&self) -> bool {
        self.well_formed
    }

    /// Hands the built tree over to the caller.
    pub fn take_document(&mut self) -> Option<Tree> {
        self.tree.take()
    }

    pub fn location(&self) -> Location {
        self.location
    }
}

impl Drop for ParserContext<'_> {
    fn drop(&mut self) {
        if self.tree.is_some() {
            log::debug!("freeing an unclaimed document tree with the parser context");
        }
    }
}

/// Parses a file with the given callbacks.
///
/// A tree is returned only for a well-formed document. When the file
/// cannot be read no callback is invoked.
pub fn parse_file_with_data(path: &Path, callbacks: &mut dyn SaxCallbacks) -> Option<Tree> {
    let input = match std::fs::read(path) {
        Ok(input) => input,
        Err(err) => {
            log::debug!("cannot read {}: {}", path.display(), err);
            return None;
        }
    };
    let mut context = ParserContext::new(&input);
    // Errors were reported through the callbacks already.
    let _ = context.parse_document(callbacks);
    if context.well_formed() {
        context.take_document()
    } else {
        None
    }
}
