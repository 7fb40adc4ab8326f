/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid XML syntax: {0}")]
    BadXml(String),

    #[error("cannot write the document: {0}")]
    Io(#[from] std::io::Error),
}

/// The tree building engine stopped before the end of the input.
///
/// Either a fatal error was reported or a callback asked to stop. The
/// diagnostics themselves were delivered through the callbacks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("parsing was aborted")]
pub struct ParseAborted;

pub(super) mod description {
    pub(in super::super) const TAG_MISMATCH: &str = "Opening and ending tag mismatch";
    pub(in super::super) const ATTRIBUTE_REDEFINED: &str = "Attribute redefined";
    pub(in super::super) const XML_DECL_NOT_AT_START: &str =
        "XML declaration allowed only at the start of the document";
    pub(in super::super) const XML_DECL_NO_VERSION: &str = "Malformed declaration expecting version";
    pub(in super::super) const UNSUPPORTED_VERSION: &str = "Unsupported version";
    pub(in super::super) const UNSUPPORTED_ENCODING: &str = "Unsupported encoding";
    pub(in super::super) const NAMESPACE_UNDEFINED: &str = "Namespace prefix";
    pub(in super::super) const NAMESPACE_NOT_ABSOLUTE: &str = "xmlns: URI";
    pub(in super::super) const EXCESSIVE_DEPTH: &str = "Excessive depth in document";
}
