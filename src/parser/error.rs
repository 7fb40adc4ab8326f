/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

/// Type of the error which happened during the XML SAX tokenizing.
///
/// The categories are kept as few as possible. A syntax problem carries
/// a short static description of the offending construct; the position
/// is available from [location()](super::SaxParser::location).
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SaxError {
    /// A syntax error is encountered in the XML input.
    #[error("{0}")]
    BadXml(&'static str),

    /// The element handler asked the parser to stop.
    ///
    /// This lets a handler abort the processing while signalling to the
    /// caller that the interruption did not come from the tokenizer.
    #[error("parsing stopped by the handler")]
    HandlerAbort,
}

pub(super) mod description {
    pub(in super::super) const UTF8_INVALID_CONT_BYTE: &str = "Invalid UTF-8 continuation byte";
    pub(in super::super) const UTF8_OVERLONG_SEQUENCE: &str = "Overlong UTF-8 sequence";
    pub(in super::super) const UTF8_INVALID_PREFIX_BYTE: &str = "Invalid UTF-8 prefix byte";
    pub(in super::super) const UTF8_INCOMPLETE: &str = "Input ends inside a UTF-8 sequence";
    pub(in super::super) const CHAR_INVALID: &str = "Invalid XML character";
    pub(in super::super) const DOC_NO_CONTENT: &str = "Document is empty";
    pub(in super::super) const DOC_OPEN_TAGS: &str = "Premature end of data, document has unclosed tags";
    pub(in super::super) const DOC_OPEN_MARKUP: &str = "Document ends inside a PI, comment or markup";
    pub(in super::super) const DOC_CDATA_WITHOUT_PARENT: &str = "Extra content at the start or end of the document";
    pub(in super::super) const TAG_CLOSE_WITHOUT_OPEN: &str = "Close tag without open";
    pub(in super::super) const TAG_WHITESPACE_START: &str = "Tag cannot start with whitespace";
    pub(in super::super) const TAG_OUTSIDE_ROOT: &str = "Extra content at the end of the document";
    pub(in super::super) const TAG_EMPTY_NAME: &str = "Tag has no name";
    pub(in super::super) const TAG_DOUBLE_END: &str = "End tag has standalone ending too";
    pub(in super::super) const TAG_END_TAG_ATTRIBUTES: &str = "End tag cannot have attributes";
    pub(in super::super) const TAG_EMPTY_TAG_MISSING_END: &str = "Empty element tags must end after the '/'";
    pub(in super::super) const TAG_ATTRIBUTE_WITHOUT_EQUAL: &str = "Specification mandates value for attribute";
    pub(in super::super) const TAG_ATTRIBUTE_WITHOUT_QUOTE: &str = "AttValue: \" or ' expected";
    pub(in super::super) const TAG_ATTRIBUTE_BAD_NAME: &str = "Attribute names cannot have '/', '<' or '>'";
    pub(in super::super) const TAG_ATTRIBUTE_BAD_VALUE: &str = "Unescaped '<' not allowed in attributes values";
    pub(in super::super) const REFERENCE_INVALID_DECIMAL: &str = "Invalid decimal character reference";
    pub(in super::super) const REFERENCE_INVALID_HEX: &str = "Invalid hexadecimal character reference";
    pub(in super::super) const REFERENCE_EMPTY: &str = "Empty entity reference";
    pub(in super::super) const REFERENCE_CUSTOM_ENTITY: &str = "Entity references other than the predefined ones are not supported";
    pub(in super::super) const COMMENT_MISSING_DASH: &str = "Comment must start with '<!--'";
    pub(in super::super) const COMMENT_MISSING_END: &str = "Double hyphen within comment";
    pub(in super::super) const MARKUP_CDATA_SECTION_BAD_START: &str = "CDATA section must start with '<![CDATA['";
    pub(in super::super) const MARKUP_DOCTYPE_BAD_START: &str = "Doctype must start with '<!DOCTYPE '";
    pub(in super::super) const MARKUP_CDATA_SECTION_OUTSIDE_ROOT: &str = "CDATA section outside of the root element";
    pub(in super::super) const MARKUP_UNRECOGNIZED: &str = "Markup is not a comment, CDATA section, or document type declaration";
}
