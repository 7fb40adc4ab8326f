/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::fmt::Write;

pub mod predefined {
    pub const LT: &str = "&lt;";
    pub const GT: &str = "&gt;";
    pub const AMP: &str = "&amp;";
    pub const QUOT: &str = "&quot;";
}

/// Where the escaped text ends up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EscapeContext {
    /// Character data of an element.
    Text,
    /// A double quoted attribute value.
    Attribute,
    /// HTML character data, where only the markup characters are escaped.
    HtmlText,
}

/// Appends an escaped copy of the text to the buffer.
///
/// With `ascii_only` set, characters outside ASCII are written as
/// numeric character references, for output encodings other than UTF-8.
pub fn escape(s: &str, context: EscapeContext, ascii_only: bool, buf: &mut String) {
    for c in s.chars() {
        match c {
            '<' => buf.push_str(predefined::LT),
            '>' => buf.push_str(predefined::GT),
            '&' => buf.push_str(predefined::AMP),
            '"' if context == EscapeContext::Attribute => buf.push_str(predefined::QUOT),
            '\r' if context != EscapeContext::HtmlText => buf.push_str("&#13;"),
            '\n' | '\t' if context == EscapeContext::Attribute => {
                let _ = write!(buf, "&#{};", u32::from(c));
            }
            c if ascii_only && !c.is_ascii() => {
                let _ = write!(buf, "&#{};", u32::from(c));
            }
            c => buf.push(c),
        }
    }
}
