/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::Document;
use crate::ParseError;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StylesheetError {
    /// The stylesheet source could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Compile(String),

    /// The transformation failed; carries every message it reported.
    #[error("{0}")]
    Transform(String),
}

/// A document which could not be compiled into a stylesheet.
///
/// The document is handed back untouched.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct Rejected {
    pub message: String,
    pub document: Document,
}

impl From<Rejected> for StylesheetError {
    fn from(rejected: Rejected) -> Self {
        StylesheetError::Compile(rejected.message)
    }
}

pub(super) mod description {
    pub(in super::super) const UNKNOWN_COMPILE_ERROR: &str = "unknown XSLT parser error";
    pub(in super::super) const UNKNOWN_TRANSFORM_ERROR: &str = "unknown XSLT transformation error";
}
