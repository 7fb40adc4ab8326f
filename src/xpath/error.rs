/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum XPathError {
    #[error("XPath syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: &'static str },

    #[error("unregistered XPath function {0}()")]
    UnknownFunction(String),

    #[error("invalid number of arguments for {0}()")]
    Arity(String),

    #[error("undefined variable ${0}")]
    UnknownVariable(String),

    #[error("XPath expression does not evaluate to a node-set")]
    NotANodeSet,

    #[error("XPath {0} is not supported")]
    Unsupported(&'static str),
}

pub(super) mod description {
    pub(in super::super) const UNTERMINATED_LITERAL: &str = "unterminated string literal";
    pub(in super::super) const BAD_CHARACTER: &str = "unexpected character";
    pub(in super::super) const BAD_VARIABLE: &str = "expected a variable name after '$'";
    pub(in super::super) const BAD_NAME: &str = "expected a name";
    pub(in super::super) const EXPECTED_EXPRESSION: &str = "expected an expression";
    pub(in super::super) const EXPECTED_RPAREN: &str = "expected ')'";
    pub(in super::super) const EXPECTED_RBRACKET: &str = "expected ']'";
    pub(in super::super) const EXPECTED_STEP: &str = "expected a location step";
    pub(in super::super) const UNKNOWN_AXIS: &str = "unknown axis name";
    pub(in super::super) const TRAILING_INPUT: &str = "unexpected token after the expression";
}
