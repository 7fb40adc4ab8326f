/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::ops::RangeInclusive;

use crate::document::split_qname;

use super::error::XPathError;
use super::eval::Context;
use super::eval::evaluate;
use super::eval::language;
use super::parser::Expr;
use super::value::Value;
use super::value::XNode;
use super::value::is_xml_space;

const MANY: usize = usize::MAX;

fn arity(name: &str) -> Option<RangeInclusive<usize>> {
    let range = match name {
        "last" | "position" | "true" | "false" | "current" => 0..=0,
        "count" | "id" | "boolean" | "not" | "lang" | "sum" | "floor" | "ceiling" | "round" => 1..=1,
        "local-name" | "namespace-uri" | "name" | "string" | "string-length" | "normalize-space"
        | "number" | "generate-id" => 0..=1,
        "starts-with" | "contains" | "substring-before" | "substring-after" => 2..=2,
        "substring" => 2..=3,
        "translate" => 3..=3,
        "concat" => 2..=MANY,
        _ => return None,
    };
    Some(range)
}

/// Checks that a function exists and accepts the given argument count.
pub(super) fn check_arity(name: &str, count: usize) -> Result<(), XPathError> {
    match arity(name) {
        None => Err(XPathError::UnknownFunction(name.to_string())),
        Some(range) if !range.contains(&count) => Err(XPathError::Arity(name.to_string())),
        Some(_) => Ok(()),
    }
}

struct Args<'e, 'c, 'a> {
    exprs: &'e [Expr],
    ctx: &'c Context<'a>,
}

impl Args<'_, '_, '_> {
    fn value(&self, i: usize) -> Result<Value, XPathError> {
        evaluate(&self.exprs[i], self.ctx)
    }

    fn string(&self, i: usize) -> Result<String, XPathError> {
        Ok(self.value(i)?.to_string_value(self.ctx.tree))
    }

    fn number(&self, i: usize) -> Result<f64, XPathError> {
        Ok(self.value(i)?.to_number(self.ctx.tree))
    }

    // The optional argument, or the context node.
    fn string_or_context(&self) -> Result<String, XPathError> {
        if self.exprs.is_empty() {
            Ok(self.ctx.node.string_value(self.ctx.tree))
        } else {
            self.string(0)
        }
    }

    fn node_or_context(&self) -> Result<Option<XNode>, XPathError> {
        if self.exprs.is_empty() {
            Ok(Some(self.ctx.node))
        } else {
            Ok(self.value(0)?.into_nodes()?.first().copied())
        }
    }
}

pub(super) fn call(name: &str, exprs: &[Expr], ctx: &Context<'_>) -> Result<Value, XPathError> {
    let args = Args { exprs, ctx };
    let tree = ctx.tree;
    let value = match name {
        "last" => Value::Number(ctx.size as f64),
        "position" => Value::Number(ctx.position as f64),
        "count" => Value::Number(args.value(0)?.into_nodes()?.len() as f64),
        "id" => {
            let ids = match args.value(0)? {
                Value::NodeSet(nodes) => nodes
                    .iter()
                    .map(|node| node.string_value(tree))
                    .collect::<Vec<_>>()
                    .join(" "),
                value => value.to_string_value(tree),
            };
            let wanted: Vec<&str> = ids.split(is_xml_space).filter(|id| !id.is_empty()).collect();
            let nodes = tree
                .descendant_or_self(tree.root())
                .filter(|id| {
                    let value = tree.attribute(*id, "xml:id").or_else(|| tree.attribute(*id, "id"));
                    value.is_some_and(|value| wanted.contains(&value))
                })
                .map(XNode::Node)
                .collect();
            Value::node_set(nodes)
        }
        "local-name" => {
            let node = args.node_or_context()?;
            let name = node.and_then(|node| node.name(tree)).map(|name| split_qname(name).1);
            Value::String(name.unwrap_or_default().to_string())
        }
        "namespace-uri" => {
            let uri = args.node_or_context()?.and_then(|node| {
                let (prefix, _) = split_qname(node.name(tree)?);
                // Unprefixed attributes have no namespace.
                if prefix.is_none() && node.is_attribute() {
                    return None;
                }
                tree.lookup_namespace(node.node_id(), prefix.unwrap_or(""))
            });
            Value::String(uri.unwrap_or_default().to_string())
        }
        "name" => {
            let node = args.node_or_context()?;
            Value::String(node.and_then(|node| node.name(tree)).unwrap_or_default().to_string())
        }
        "string" => Value::String(args.string_or_context()?),
        "concat" => {
            let mut text = String::new();
            for i in 0..exprs.len() {
                text.push_str(&args.string(i)?);
            }
            Value::String(text)
        }
        "starts-with" => Value::Boolean(args.string(0)?.starts_with(&args.string(1)?)),
        "contains" => Value::Boolean(args.string(0)?.contains(&args.string(1)?)),
        "substring-before" => {
            let s = args.string(0)?;
            let before = s.split_once(&args.string(1)?).map(|(before, _)| before);
            Value::String(before.unwrap_or_default().to_string())
        }
        "substring-after" => {
            let s = args.string(0)?;
            let after = s.split_once(&args.string(1)?).map(|(_, after)| after);
            Value::String(after.unwrap_or_default().to_string())
        }
        "substring" => {
            let s = args.string(0)?;
            let start = round(args.number(1)?);
            let end = if exprs.len() == 3 {
                start + round(args.number(2)?)
            } else {
                f64::INFINITY
            };
            let text = s
                .chars()
                .enumerate()
                .filter(|(i, _)| {
                    let position = (*i + 1) as f64;
                    position >= start && position < end
                })
                .map(|(_, c)| c)
                .collect();
            Value::String(text)
        }
        "string-length" => Value::Number(args.string_or_context()?.chars().count() as f64),
        "normalize-space" => {
            let s = args.string_or_context()?;
            let words: Vec<&str> = s.split(is_xml_space).filter(|word| !word.is_empty()).collect();
            Value::String(words.join(" "))
        }
        "translate" => {
            let s = args.string(0)?;
            let from: Vec<char> = args.string(1)?.chars().collect();
            let to: Vec<char> = args.string(2)?.chars().collect();
            let text = s
                .chars()
                .filter_map(|c| match from.iter().position(|f| *f == c) {
                    Some(i) => to.get(i).copied(),
                    None => Some(c),
                })
                .collect();
            Value::String(text)
        }
        "boolean" => Value::Boolean(args.value(0)?.to_boolean()),
        "not" => Value::Boolean(!args.value(0)?.to_boolean()),
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "lang" => {
            let wanted = args.string(0)?;
            let matched = language(tree, ctx.node).is_some_and(|lang| {
                lang.eq_ignore_ascii_case(&wanted)
                    || lang
                        .get(..wanted.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&wanted))
                        && lang[wanted.len()..].starts_with('-')
            });
            Value::Boolean(matched)
        }
        "number" => {
            if exprs.is_empty() {
                Value::Number(Value::NodeSet(vec![ctx.node]).to_number(tree))
            } else {
                Value::Number(args.number(0)?)
            }
        }
        "sum" => {
            let nodes = args.value(0)?.into_nodes()?;
            let sum = nodes
                .iter()
                .map(|node| Value::String(node.string_value(tree)).to_number(tree))
                .sum();
            Value::Number(sum)
        }
        "floor" => Value::Number(args.number(0)?.floor()),
        "ceiling" => Value::Number(args.number(0)?.ceil()),
        "round" => Value::Number(round(args.number(0)?)),
        "current" => Value::NodeSet(vec![ctx.current]),
        "generate-id" => {
            let id = args.node_or_context()?.map(|node| match node {
                XNode::Node(id) => format!("id{}", id.index()),
                XNode::Attribute(id, index) => format!("id{}a{}", id.index(), index),
            });
            Value::String(id.unwrap_or_default())
        }
        _ => return Err(XPathError::UnknownFunction(name.to_string())),
    };
    Ok(value)
}

// XPath rounding goes towards positive infinity on a tie.
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        return n;
    }
    if (-0.5..0.0).contains(&n) {
        return -0.0;
    }
    (n + 0.5).floor()
}
