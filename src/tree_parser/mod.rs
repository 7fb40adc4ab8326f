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

use std::fmt;
use std::fs::File;
use std::ops::ControlFlow;
use std::path::Path;

pub use error::ParseError;

use crate::ErrorChannel;
use crate::document::Document;
use crate::document::ParserContext;
use crate::document::SaxCallbacks;
use crate::document::Whitespace;
use crate::document::parse_file_with_data;

/// Settings of a parse session.
///
/// `keep_blanks` decides whether ignorable whitespace becomes text in the
/// tree. `raise_on_error` selects between the two failure modes: returning
/// an error, or returning a failed session which can be inspected.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ParserConfig {
    pub keep_blanks: bool,
    pub raise_on_error: bool,
}

impl ParserConfig {
    pub fn new() -> ParserConfig {
        ParserConfig::default()
    }

    pub fn with_keep_blanks(mut self, keep_blanks: bool) -> ParserConfig {
        self.keep_blanks = keep_blanks;
        self
    }

    pub fn with_raise_on_error(mut self, raise_on_error: bool) -> ParserConfig {
        self.raise_on_error = raise_on_error;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            keep_blanks: true,
            raise_on_error: true,
        }
    }
}

// The per-parse state the engine calls back into.
struct Session<'a> {
    channel: &'a mut ErrorChannel,
    keep_blanks: bool,
}

impl SaxCallbacks for Session<'_> {
    fn warning(&mut self, message: fmt::Arguments<'_>) {
        self.channel.record_warning(message);
    }

    fn error(&mut self, message: fmt::Arguments<'_>) -> ControlFlow<()> {
        self.channel.record_error(message);
        ControlFlow::Break(())
    }

    fn fatal_error(&mut self, message: fmt::Arguments<'_>) {
        self.channel.record_error(message);
    }

    fn ignorable_whitespace(&mut self, _text: &str) -> Whitespace {
        if self.keep_blanks {
            Whitespace::Keep
        } else {
            Whitespace::Ignore
        }
    }
}

/// A parse session and its outcome.
///
/// A session either holds a complete document or is failed; a failed
/// session never exposes a tree, only its diagnostics.
///
/// # Examples
///
/// ```
/// use xmlwrap::{ParserConfig, TreeParser};
///
/// let parser = TreeParser::parse_bytes(b"<a><b/></a>", &ParserConfig::default()).unwrap();
/// assert!(!parser.failed());
/// let doc = parser.document().unwrap();
/// assert_eq!(doc.to_string(), "<a><b/></a>");
///
/// let config = ParserConfig::default().with_raise_on_error(false);
/// let parser = TreeParser::parse_bytes(b"<a><b></a>", &config).unwrap();
/// assert!(parser.failed());
/// assert!(parser.error_message().contains("mismatch"));
/// ```
#[derive(Debug)]
pub struct TreeParser {
    channel: ErrorChannel,
    document: Option<Document>,
    failure: Option<ParseError>,
}

impl TreeParser {
    /// Parses a file.
    pub fn parse_file(path: impl AsRef<Path>, config: &ParserConfig) -> Result<TreeParser, ParseError> {
        let path = path.as_ref();
        log::debug!("parsing file {}", path.display());

        let mut channel = ErrorChannel::default();
        let mut session = Session {
            channel: &mut channel,
            keep_blanks: config.keep_blanks,
        };
        let tree = parse_file_with_data(path, &mut session);

        match tree {
            Some(tree) if channel.is_ok() => Ok(TreeParser::succeeded(channel, Document::from_tree(tree))),
            _ => {
                // Only a message which no callback touched is worth a second
                // look; an engine diagnostic is kept as it is.
                let mut unavailable = false;
                if channel.is_default_message() && File::open(path).is_err() {
                    channel.set_message(format!("failed to open file \"{}\"", path.display()));
                    unavailable = true;
                }
                channel.mark_failed();
                let failure = if unavailable {
                    ParseError::SourceUnavailable(channel.message().to_string())
                } else {
                    TreeParser::classify(&channel)
                };
                TreeParser::failed_with(channel, failure, config)
            }
        }
    }

    /// Parses an in-memory buffer.
    ///
    /// An empty buffer gives [ParseError::NoContext] in both failure modes.
    pub fn parse_bytes(data: &[u8], config: &ParserConfig) -> Result<TreeParser, ParseError> {
        log::debug!("parsing {} bytes from memory", data.len());
        let Some(mut context) = ParserContext::from_memory(data) else {
            return Err(ParseError::NoContext);
        };

        let mut channel = ErrorChannel::default();
        let mut session = Session {
            channel: &mut channel,
            keep_blanks: config.keep_blanks,
        };
        let result = context.parse_document(&mut session);

        if result.is_ok() && context.well_formed() && channel.is_ok() {
            if let Some(tree) = context.take_document() {
                return Ok(TreeParser::succeeded(channel, Document::from_tree(tree)));
            }
        }

        // The context frees whatever tree it still holds.
        drop(context);
        channel.mark_failed();
        let failure = TreeParser::classify(&channel);
        TreeParser::failed_with(channel, failure, config)
    }

    fn succeeded(channel: ErrorChannel, document: Document) -> TreeParser {
        log::debug!("parse succeeded");
        TreeParser {
            channel,
            document: Some(document),
            failure: None,
        }
    }

    fn classify(channel: &ErrorChannel) -> ParseError {
        let message = channel.message().to_string();
        if channel.is_default_message() {
            ParseError::Unknown(message)
        } else {
            ParseError::Malformed(message)
        }
    }

    fn failed_with(
        channel: ErrorChannel,
        failure: ParseError,
        config: &ParserConfig,
    ) -> Result<TreeParser, ParseError> {
        log::debug!("parse failed: {}", failure);
        if config.raise_on_error {
            return Err(failure);
        }
        Ok(TreeParser {
            channel,
            document: None,
            failure: Some(failure),
        })
    }

    /// Whether the parse failed.
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }

    /// The diagnostic of a failed parse.
    ///
    /// For a successful parse this is the generic default message.
    pub fn error_message(&self) -> &str {
        self.channel.message()
    }

    /// Whether the engine reported warnings, independent of success.
    pub fn had_warnings(&self) -> bool {
        self.channel.had_warnings()
    }

    /// The parsed document, or `None` for a failed parse.
    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    /// Moves the parsed document out of the session.
    pub fn into_document(self) -> Result<Document, ParseError> {
        match (self.document, self.failure) {
            (Some(document), None) => Ok(document),
            (_, Some(failure)) => Err(failure),
            (None, None) => Err(ParseError::Unknown(self.channel.message().to_string())),
        }
    }
}
