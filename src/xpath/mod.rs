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
mod eval;
mod functions;
mod lexer;
mod parser;
mod value;

use std::fmt;
use std::str::FromStr;

use crate::Document;

pub use error::XPathError;
pub use eval::Context;
pub use eval::NoVariables;
pub use eval::Variables;
pub use value::Value;
pub use value::XNode;
pub use value::number_to_string;
pub use value::string_to_number;

pub(crate) use eval::evaluate as evaluate_expr;
pub(crate) use eval::node_test;
pub(crate) use parser::Axis;
pub(crate) use parser::Expr;
pub(crate) use parser::NodeTest;

/// A compiled XPath 1.0 expression.
///
/// # Examples
///
/// ```
/// use xmlwrap::Document;
/// use xmlwrap::xpath::XPath;
///
/// let doc: Document = "<a><b>1</b><b>2</b></a>".parse().unwrap();
/// let path = XPath::new("sum(/a/b) * 2").unwrap();
/// let value = path.apply(&doc).unwrap();
/// assert_eq!(value.to_string_value(doc.tree()), "6");
/// ```
#[derive(Clone, Debug)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    pub fn new(expression: &str) -> Result<Self, XPathError> {
        let expr = parser::parse(expression)?;
        Ok(XPath {
            source: expression.to_string(),
            expr,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn evaluate(&self, context: &Context<'_>) -> Result<Value, XPathError> {
        eval::evaluate(&self.expr, context)
    }

    /// Evaluates the expression with the document root as the context node.
    pub fn apply(&self, document: &Document) -> Result<Value, XPathError> {
        let tree = document.tree();
        let context = Context::new(tree, XNode::Node(tree.root()), &NoVariables);
        self.evaluate(&context)
    }
}

impl FromStr for XPath {
    type Err = XPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        XPath::new(s)
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests;
