/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod engine;
mod error;
mod serialize;
mod tree;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub use engine::DefaultCallbacks;
pub use engine::MAX_DEPTH;
pub use engine::ParserContext;
pub use engine::SaxCallbacks;
pub use engine::Whitespace;
pub use engine::parse_file_with_data;
pub(crate) use engine::guarded;
pub use error::DocumentError;
pub use error::ParseAborted;
pub use tree::Attribute;
pub use tree::DescendantOrSelf;
pub use tree::NodeId;
pub use tree::NodeKind;
pub use tree::Tree;
pub use tree::XML_NAMESPACE;
pub use tree::split_qname;

use serialize::Writer;

use crate::tree_parser::ParserConfig;
use crate::tree_parser::TreeParser;

/// Output method selected by `xsl:output`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutputMethod {
    Xml,
    Html,
    Text,
}

/// Serialization settings of a stylesheet.
///
/// `method` is `None` when the stylesheet did not choose one; the method
/// is then picked from the result document, html for an `html` document
/// element and xml otherwise.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OutputSettings {
    pub method: Option<OutputMethod>,
    pub encoding: Option<String>,
    pub omit_xml_declaration: bool,
    pub standalone: Option<bool>,
    pub doctype_public: Option<String>,
    pub doctype_system: Option<String>,
    pub indent: bool,
    pub media_type: Option<String>,
}

/// How a document renders itself when saved.
#[derive(Clone, Debug, Default)]
pub enum Serialization {
    /// Generic XML output.
    #[default]
    Plain,
    /// Output controlled by the settings of the stylesheet which produced
    /// the document.
    Stylesheet(Arc<OutputSettings>),
}

/// An owned XML document.
///
/// A document exclusively owns its tree. It can be moved around and its
/// tree can be moved out, but it cannot be cloned, so a tree always has a
/// single owner which frees it.
///
/// # Examples
///
/// ```
/// use xmlwrap::Document;
///
/// let doc: Document = "<a><b/>text</a>".parse().unwrap();
/// let tree = doc.tree();
/// let a = tree.document_element().unwrap();
/// assert_eq!(tree.name(a), Some("a"));
/// assert_eq!(doc.to_string(), "<a><b/>text</a>");
/// ```
#[derive(Debug, Default)]
pub struct Document {
    tree: Tree,
    serialization: Serialization,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Document {
        Document::default()
    }

    pub fn from_tree(tree: Tree) -> Document {
        Document {
            tree,
            serialization: Serialization::Plain,
        }
    }

    pub(crate) fn from_transform(tree: Tree, settings: Arc<OutputSettings>) -> Document {
        Document {
            tree,
            serialization: Serialization::Stylesheet(settings),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn into_tree(self) -> Tree {
        self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.document_element()
    }

    pub fn serialization(&self) -> &Serialization {
        &self.serialization
    }

    /// Returns true if the document has no content.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Renders the document with its serialization strategy.
    pub fn save_to_string(&self) -> String {
        match &self.serialization {
            Serialization::Plain => serialize::save_plain(&self.tree),
            Serialization::Stylesheet(settings) => serialize::save_with_settings(&self.tree, settings),
        }
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        std::fs::write(path.as_ref(), self.save_to_string())?;
        log::debug!("saved document to {}", path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        Writer::compact(&self.tree, &mut buf).top_level("");
        f.write_str(&buf)
    }
}

impl FromStr for Document {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TreeParser::parse_bytes(s.as_bytes(), &ParserConfig::default())
            .and_then(TreeParser::into_document)
            .map_err(|err| DocumentError::BadXml(err.message()))
    }
}

#[cfg(test)]
mod tests;
