/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Display;

/// A position in the tokenizer input byte stream.
///
/// Lines and columns are one based, the way diagnostics print them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Location {
    /// Number of bytes consumed so far.
    pub bytes: usize,
    /// Current line number.
    pub line: usize,
    /// Current column, counted in bytes after the last newline.
    pub column: usize,
}

impl Location {
    pub fn new() -> Self {
        Location {
            bytes: 0,
            line: 1,
            column: 1,
        }
    }

    pub(super) fn advance(&mut self, c: u8) {
        self.bytes += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::new()
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
