/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

pub use error::Rejected;
pub use error::StylesheetError;

use crate::Document;
use crate::ErrorChannel;
use crate::ParserConfig;
use crate::TreeParser;
use crate::document::OutputSettings;
use crate::xslt::Program;
use crate::xslt::TransformContext;
use crate::xslt::TransformErrorHandler;
use crate::xslt::apply_stylesheet_user;
use crate::xslt::compile;
use error::description;

/// Named stylesheet parameters.
///
/// Values are XPath expressions, so a string value must carry its own
/// quotes: `'text'`.
pub type ParamSet = BTreeMap<String, String>;

// The channel is the back-reference of a transform context. The first
// error stops the transformation.
impl TransformErrorHandler for ErrorChannel {
    fn transform_error(&mut self, message: fmt::Arguments<'_>) -> ControlFlow<()> {
        self.append_error(message);
        ControlFlow::Break(())
    }
}

fn flatten_params(params: &ParamSet) -> Vec<&str> {
    let mut flat = Vec::with_capacity(params.len() * 2);
    for (name, value) in params {
        flat.push(name.as_str());
        flat.push(value.as_str());
    }
    flat
}

/// A compiled stylesheet.
///
/// The stylesheet owns its source document, the compiled program, the
/// error channel of the last transformation, and a result document used
/// by [apply](Stylesheet::apply).
///
/// # Examples
///
/// ```
/// use xmlwrap::{Document, ParamSet, Stylesheet};
///
/// let source: Document = r#"<xsl:stylesheet version="1.0"
///     xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
///   <xsl:param name="x"/>
///   <xsl:template match="/"><r x="{$x}"/></xsl:template>
/// </xsl:stylesheet>"#.parse().unwrap();
/// let mut style = Stylesheet::from_document(source).unwrap();
///
/// let input: Document = "<a/>".parse().unwrap();
/// let mut params = ParamSet::new();
/// params.insert("x".to_string(), "1".to_string());
/// let result = style.apply_with_params(&input, &params).unwrap();
/// assert_eq!(result.to_string(), "<r x=\"1\"/>");
/// ```
#[derive(Debug)]
pub struct Stylesheet {
    program: Program,
    source: Document,
    channel: ErrorChannel,
    result: Document,
}

impl Stylesheet {
    /// Parses and compiles a stylesheet file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Stylesheet, StylesheetError> {
        let parser = TreeParser::parse_file(path, &ParserConfig::default())?;
        let document = parser.into_document()?;
        Ok(Stylesheet::from_document(document)?)
    }

    /// Compiles a parsed document, taking ownership of it.
    ///
    /// On failure the document is returned inside the error.
    pub fn from_document(document: Document) -> Result<Stylesheet, Rejected> {
        match compile(document.tree()) {
            Ok(program) => {
                log::debug!("compiled stylesheet with {} templates", program.template_count());
                Ok(Stylesheet {
                    program,
                    source: document,
                    channel: ErrorChannel::new(""),
                    result: Document::new(),
                })
            }
            Err(err) => {
                let mut message = err.to_string();
                if message.is_empty() {
                    message = description::UNKNOWN_COMPILE_ERROR.to_string();
                }
                log::debug!("stylesheet rejected: {}", message);
                Err(Rejected { message, document })
            }
        }
    }

    pub fn source(&self) -> &Document {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Settings from `xsl:output`, used to save result documents.
    pub fn output_settings(&self) -> &OutputSettings {
        self.program.output()
    }

    /// Messages of the last transformation, or an empty string.
    pub fn error_message(&self) -> &str {
        self.channel.message()
    }

    /// Transforms `input` into `result`.
    ///
    /// Returns false on failure, leaving `result` untouched; the reason is
    /// available from [error_message](Stylesheet::error_message).
    pub fn apply_to(&mut self, input: &Document, result: &mut Document) -> bool {
        self.apply_to_inner(input, result, None)
    }

    pub fn apply_to_with_params(&mut self, input: &Document, result: &mut Document, params: &ParamSet) -> bool {
        self.apply_to_inner(input, result, Some(params))
    }

    /// Transforms `input` into the stylesheet's own result document.
    ///
    /// The previous result is replaced only when the transformation
    /// succeeds.
    pub fn apply(&mut self, input: &Document) -> Result<&Document, StylesheetError> {
        self.apply_inner(input, None)
    }

    pub fn apply_with_params(&mut self, input: &Document, params: &ParamSet) -> Result<&Document, StylesheetError> {
        self.apply_inner(input, Some(params))
    }

    fn apply_to_inner(&mut self, input: &Document, result: &mut Document, params: Option<&ParamSet>) -> bool {
        match self.run(input, params) {
            Some(document) => {
                *result = document;
                true
            }
            None => false,
        }
    }

    fn apply_inner(&mut self, input: &Document, params: Option<&ParamSet>) -> Result<&Document, StylesheetError> {
        match self.run(input, params) {
            Some(document) => {
                self.result = document;
                Ok(&self.result)
            }
            None => Err(StylesheetError::Transform(self.channel.message().to_string())),
        }
    }

    fn run(&mut self, input: &Document, params: Option<&ParamSet>) -> Option<Document> {
        let flat = params.map(flatten_params);
        self.channel.reset();

        let tree = {
            let mut ctxt = TransformContext::new(&self.program, input.tree());
            ctxt.set_error_handler(&mut self.channel);
            apply_stylesheet_user(&mut ctxt, flat.as_deref())
        };

        match tree {
            Some(tree) if self.channel.is_ok() => {
                Some(Document::from_transform(tree, Arc::clone(self.program.output())))
            }
            Some(_) => {
                log::debug!("discarding the result of a failed transformation");
                None
            }
            None => {
                if self.channel.message().is_empty() {
                    self.channel
                        .set_message(description::UNKNOWN_TRANSFORM_ERROR.to_string());
                }
                self.channel.mark_failed();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests;
