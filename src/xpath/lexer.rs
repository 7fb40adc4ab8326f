/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::error::XPathError;
use super::error::description;

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Token {
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Pipe,
    Plus,
    Minus,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    // A `*` in name test position.
    Star,
    Multiply,
    And,
    Or,
    Mod,
    Div,
    Number(f64),
    Literal(String),
    Variable(String),
    // NCName, QName, or `prefix:*`.
    Name(String),
}

impl Token {
    // A `*` or an operator name following one of these tokens is a name
    // test rather than an operator.
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::At
                | Token::ColonColon
                | Token::LParen
                | Token::LBracket
                | Token::Comma
                | Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Eq
                | Token::Neq
                | Token::Lt
                | Token::Le
                | Token::Gt
                | Token::Ge
                | Token::Multiply
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
        )
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

fn syntax(offset: usize, message: &'static str) -> XPathError {
    XPathError::Syntax { offset, message }
}

/// Splits an expression into tokens with their byte offsets.
pub(super) fn tokenize(expression: &str) -> Result<Vec<(Token, usize)>, XPathError> {
    let chars: Vec<(usize, char)> = expression.char_indices().collect();
    let mut tokens: Vec<(Token, usize)> = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).map(|(_, c)| *c);

    while i < chars.len() {
        let (offset, c) = chars[i];
        let operator_position = match tokens.last() {
            Some((prev, _)) => !prev.starts_operand(),
            None => false,
        };

        let token = match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
                continue;
            }
            '/' => {
                if peek(i + 1) == Some('/') {
                    i += 2;
                    Token::DoubleSlash
                } else {
                    i += 1;
                    Token::Slash
                }
            }
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '!' => {
                if peek(i + 1) != Some('=') {
                    return Err(syntax(offset, description::BAD_CHARACTER));
                }
                i += 2;
                Token::Neq
            }
            '<' => {
                if peek(i + 1) == Some('=') {
                    i += 2;
                    Token::Le
                } else {
                    i += 1;
                    Token::Lt
                }
            }
            '>' => {
                if peek(i + 1) == Some('=') {
                    i += 2;
                    Token::Ge
                } else {
                    i += 1;
                    Token::Gt
                }
            }
            ':' => {
                if peek(i + 1) != Some(':') {
                    return Err(syntax(offset, description::BAD_CHARACTER));
                }
                i += 2;
                Token::ColonColon
            }
            '*' => {
                i += 1;
                if operator_position {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '"' | '\'' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].1 != c {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(syntax(offset, description::UNTERMINATED_LITERAL));
                }
                let text: String = chars[start..end].iter().map(|(_, c)| *c).collect();
                i = end + 1;
                Token::Literal(text)
            }
            '.' => {
                if peek(i + 1) == Some('.') {
                    i += 2;
                    Token::DotDot
                } else if peek(i + 1).is_some_and(|c| c.is_ascii_digit()) {
                    let (number, next) = read_number(&chars, i);
                    i = next;
                    Token::Number(number)
                } else {
                    i += 1;
                    Token::Dot
                }
            }
            '0'..='9' => {
                let (number, next) = read_number(&chars, i);
                i = next;
                Token::Number(number)
            }
            '$' => {
                let Some((name, next)) = read_qname(&chars, i + 1, false) else {
                    return Err(syntax(offset, description::BAD_VARIABLE));
                };
                i = next;
                Token::Variable(name)
            }
            c if is_name_start(c) => {
                let Some((name, next)) = read_qname(&chars, i, true) else {
                    return Err(syntax(offset, description::BAD_NAME));
                };
                i = next;
                if operator_position {
                    match name.as_str() {
                        "and" => Token::And,
                        "or" => Token::Or,
                        "mod" => Token::Mod,
                        "div" => Token::Div,
                        _ => Token::Name(name),
                    }
                } else {
                    Token::Name(name)
                }
            }
            _ => return Err(syntax(offset, description::BAD_CHARACTER)),
        };
        tokens.push((token, offset));
    }

    Ok(tokens)
}

fn read_number(chars: &[(usize, char)], start: usize) -> (f64, usize) {
    let mut end = start;
    let mut text = String::new();
    let mut seen_dot = false;
    while end < chars.len() {
        let c = chars[end].1;
        if c.is_ascii_digit() || (c == '.' && !seen_dot) {
            seen_dot |= c == '.';
            text.push(c);
            end += 1;
        } else {
            break;
        }
    }
    (text.parse().unwrap_or(f64::NAN), end)
}

fn read_ncname(chars: &[(usize, char)], start: usize) -> Option<(String, usize)> {
    let first = chars.get(start)?.1;
    if !is_name_start(first) {
        return None;
    }
    let mut end = start + 1;
    while end < chars.len() && is_name_char(chars[end].1) {
        end += 1;
    }
    Some((chars[start..end].iter().map(|(_, c)| *c).collect(), end))
}

// Reads `NCName`, `NCName:NCName` and, if allowed, `NCName:*`.
fn read_qname(chars: &[(usize, char)], start: usize, allow_star: bool) -> Option<(String, usize)> {
    let (mut name, end) = read_ncname(chars, start)?;
    let colon = chars.get(end).map(|(_, c)| *c);
    let after = chars.get(end + 1).map(|(_, c)| *c);
    if colon != Some(':') || after == Some(':') {
        return Some((name, end));
    }
    if allow_star && after == Some('*') {
        name.push_str(":*");
        return Some((name, end + 2));
    }
    match read_ncname(chars, end + 1) {
        Some((local, next)) => {
            name.push(':');
            name.push_str(&local);
            Some((name, next))
        }
        None => Some((name, end)),
    }
}
