/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

mod channel;
pub mod document;
mod entities;
mod parser;
mod stylesheet;
mod tree_parser;
pub mod xpath;
pub mod xslt;

pub use parser::Location;
pub use parser::SaxElement;
pub use parser::SaxError;
pub use parser::SaxHandler;
pub use parser::SaxParser;

pub use channel::DEFAULT_PARSE_MESSAGE;
pub use channel::ErrorChannel;

pub use document::Document;
pub use document::DocumentError;

pub use tree_parser::ParseError;
pub use tree_parser::ParserConfig;
pub use tree_parser::TreeParser;

pub use stylesheet::ParamSet;
pub use stylesheet::Rejected;
pub use stylesheet::Stylesheet;
pub use stylesheet::StylesheetError;

pub use xpath::XPath;
