/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

/// Failure of a parse session.
///
/// Except for [NoContext](ParseError::NoContext), every variant carries the
/// message of the session's error channel unchanged.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The parser context could not be created.
    #[error("could not create parser context")]
    NoContext,

    /// The source file could not be opened.
    #[error("{0}")]
    SourceUnavailable(String),

    /// The engine reported a specific diagnostic.
    #[error("{0}")]
    Malformed(String),

    /// The engine failed without saying why.
    #[error("{0}")]
    Unknown(String),
}

impl ParseError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}
