/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use crate::document::Tree;
use crate::xpath::Axis;
use crate::xpath::Context;
use crate::xpath::Expr;
use crate::xpath::NodeTest;
use crate::xpath::Variables;
use crate::xpath::XNode;
use crate::xpath::XPath;
use crate::xpath::XPathError;
use crate::xpath::evaluate_expr;
use crate::xpath::node_test;

use super::error::CompileError;

/// One alternative of a match pattern.
#[derive(Debug)]
pub(crate) struct Pattern {
    path: Expr,
    absolute: bool,
}

impl Pattern {
    /// Splits a pattern into its union alternatives.
    pub(crate) fn parse(source: &str) -> Result<Vec<Pattern>, CompileError> {
        let bad = || CompileError::BadPattern(source.to_string());
        let xpath = XPath::new(source).map_err(|_| bad())?;
        let mut patterns = Vec::new();
        for branch in xpath.expr().union_branches() {
            let Expr::Path { absolute, steps } = branch else {
                return Err(bad());
            };
            let allowed = steps.iter().all(|step| {
                matches!(step.axis, Axis::Child | Axis::Attribute | Axis::DescendantOrSelf)
            });
            if !allowed {
                return Err(bad());
            }
            patterns.push(Pattern {
                path: branch.clone(),
                absolute: *absolute,
            });
        }
        Ok(patterns)
    }

    /// Priority of the pattern when the template does not give one.
    pub(crate) fn default_priority(&self) -> f64 {
        let Expr::Path { absolute, steps } = &self.path else {
            return 0.5;
        };
        match steps.as_slice() {
            [step] if !*absolute && step.predicates.is_empty() => match step.test {
                NodeTest::Name(_) => 0.0,
                NodeTest::PrefixAny(_) => -0.25,
                _ => -0.5,
            },
            _ => 0.5,
        }
    }

    /// A node matches when the pattern selects it from one of its ancestors.
    pub(crate) fn matches(&self, tree: &Tree, node: XNode, variables: &dyn Variables) -> Result<bool, XPathError> {
        if let Expr::Path { steps, .. } = &self.path {
            match steps.last() {
                Some(last) => {
                    if !node_test(tree, node, &last.test, last.axis) {
                        return Ok(false);
                    }
                }
                None => return Ok(node == XNode::Node(tree.root())),
            }
        }

        let mut contexts = Vec::new();
        if self.absolute {
            contexts.push(XNode::Node(tree.root()));
        } else {
            let mut current = node.parent(tree);
            while let Some(parent) = current {
                contexts.push(parent);
                current = parent.parent(tree);
            }
        }

        for start in contexts {
            let context = Context::new(tree, start, variables);
            let selected = evaluate_expr(&self.path, &context)?.into_nodes()?;
            if selected.contains(&node) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
