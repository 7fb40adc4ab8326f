/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::xpath::XPathError;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    BadStylesheet(&'static str),

    #[error("{element}: missing required attribute {attribute}")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    #[error("unsupported XSLT element {0}")]
    UnsupportedElement(String),

    #[error("{element}: unexpected element {child}")]
    UnexpectedChild { element: String, child: String },

    #[error("{element}: invalid value '{value}' for attribute {attribute}")]
    BadAttributeValue {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("invalid expression '{expression}': {error}")]
    BadExpression { expression: String, error: XPathError },

    #[error("invalid pattern '{0}'")]
    BadPattern(String),

    #[error("call-template: no template named {0}")]
    UnknownTemplate(String),
}

pub(super) mod description {
    pub(in super::super) const NOT_A_STYLESHEET: &str = "document is not a stylesheet";
    pub(in super::super) const EMPTY_DOCUMENT: &str = "stylesheet document is empty";
    pub(in super::super) const UNTERMINATED_AVT: &str = "unterminated attribute value template";
    pub(in super::super) const BAD_AVT_BRACE: &str = "unmatched '}' in attribute value template";
    pub(in super::super) const DUPLICATE_TEMPLATE: &str = "duplicate named template";
}
