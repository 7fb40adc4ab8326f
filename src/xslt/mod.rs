/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

//! A compact XSLT 1.0 processor.
//!
//! Stylesheets are compiled into a [Program] which can be applied any
//! number of times. Each application runs inside a [TransformContext]
//! which reports errors to an installed [TransformErrorHandler].
//!
//! # Examples
//!
//! ```
//! use xmlwrap::Document;
//! use xmlwrap::xslt::TransformContext;
//! use xmlwrap::xslt::apply_stylesheet_user;
//! use xmlwrap::xslt::compile;
//!
//! let style: Document = r#"<xsl:stylesheet version="1.0"
//!     xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
//!   <xsl:param name="who" select="'nobody'"/>
//!   <xsl:template match="/">
//!     <hello><xsl:value-of select="$who"/></hello>
//!   </xsl:template>
//! </xsl:stylesheet>"#.parse().unwrap();
//! let program = compile(style.tree()).unwrap();
//!
//! let input: Document = "<a/>".parse().unwrap();
//! let mut ctxt = TransformContext::new(&program, input.tree());
//! let result = apply_stylesheet_user(&mut ctxt, Some(&["who", "'world'"])).unwrap();
//! assert_eq!(result.xml_string(result.root()), "<hello>world</hello>");
//! ```

mod compile;
mod error;
mod pattern;
mod transform;

pub use compile::Program;
pub use compile::compile;
pub use error::CompileError;
pub use transform::TransformContext;
pub use transform::TransformErrorHandler;
pub use transform::TransformState;
pub use transform::apply_stylesheet_user;

pub const XSLT_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";
