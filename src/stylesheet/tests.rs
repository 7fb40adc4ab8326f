/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::Write;
use std::str::FromStr;

use super::*;
use crate::ParseError;
use crate::document::MAX_DEPTH;
use crate::document::Serialization;

const IDENTITY: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:param name="x" select="0"/>
  <xsl:template match="/">
    <out x="{$x}"><xsl:apply-templates/></out>
  </xsl:template>
  <xsl:template match="@*|node()">
    <xsl:copy><xsl:apply-templates select="@*|node()"/></xsl:copy>
  </xsl:template>
</xsl:stylesheet>"#;

fn stylesheet(source: &str) -> Stylesheet {
    Stylesheet::from_document(Document::from_str(source).unwrap()).unwrap()
}

fn doc(source: &str) -> Document {
    Document::from_str(source).unwrap()
}

fn params(pairs: &[(&str, &str)]) -> ParamSet {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn fixture(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn identity_with_parameter() {
    let mut style = stylesheet(IDENTITY);
    let input = doc("<a k=\"v\"><b/>t</a>");

    let result = style.apply_with_params(&input, &params(&[("x", "1")])).unwrap();
    assert_eq!(result.to_string(), "<out x=\"1\"><a k=\"v\"><b/>t</a></out>");
    assert!(matches!(result.serialization(), Serialization::Stylesheet(_)));
    assert_eq!(style.error_message(), "");

    let result = style.apply(&input).unwrap();
    assert_eq!(result.to_string(), "<out x=\"0\"><a k=\"v\"><b/>t</a></out>");
}

#[test]
fn identity_on_deep_documents() {
    let mut style = stylesheet(IDENTITY);
    for depth in [200, MAX_DEPTH] {
        let input = doc(&format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth)));
        let result = style.apply(&input).unwrap();
        let expected = format!(
            "<out x=\"0\">{}<a/>{}</out>",
            "<a>".repeat(depth - 1),
            "</a>".repeat(depth - 1)
        );
        assert_eq!(result.to_string(), expected);
    }
}

#[test]
fn parameters_are_expressions() {
    let mut style = stylesheet(IDENTITY);
    let input = doc("<a n=\"20\"/>");
    let result = style
        .apply_with_params(&input, &params(&[("x", "/a/@n + 1"), ("unused", "'u'")]))
        .unwrap();
    assert_eq!(result.to_string(), "<out x=\"21\"><a n=\"20\"/></out>");
}

#[test]
fn apply_into_caller_document() {
    let mut style = stylesheet(IDENTITY);
    let mut result = Document::new();
    assert!(style.apply_to(&doc("<a/>"), &mut result));
    assert_eq!(result.to_string(), "<out x=\"0\"><a/></out>");

    assert!(style.apply_to_with_params(&doc("<b/>"), &mut result, &params(&[("x", "'y'")])));
    assert_eq!(result.to_string(), "<out x=\"y\"><b/></out>");

    assert!(!style.apply_to_with_params(&doc("<c/>"), &mut result, &params(&[("x", "1 +")])));
    assert!(style.error_message().starts_with("failed to evaluate parameter x"));
    assert_eq!(result.to_string(), "<out x=\"y\"><b/></out>");
}

#[test]
fn errors_discard_the_result() {
    let mut style = stylesheet(
        r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
             <xsl:template match="/"><r><xsl:value-of select="$nope"/><after/></r></xsl:template>
           </xsl:stylesheet>"#,
    );
    let input = doc("<a/>");

    let mut result = doc("<previous/>");
    assert!(!style.apply_to(&input, &mut result));
    assert_eq!(result.to_string(), "<previous/>");
    assert_eq!(style.error_message(), "$nope: undefined variable $nope");

    assert_eq!(
        style.apply(&input).unwrap_err(),
        StylesheetError::Transform("$nope: undefined variable $nope".to_string())
    );
}

#[test]
fn no_state_between_calls() {
    let mut style = stylesheet(IDENTITY);
    let input = doc("<a/>");

    assert!(style.apply_with_params(&input, &params(&[("x", "$missing")])).is_err());
    assert!(!style.error_message().is_empty());

    let result = style.apply_with_params(&input, &params(&[("x", "2")])).unwrap();
    assert_eq!(result.to_string(), "<out x=\"2\"><a/></out>");
    assert_eq!(style.error_message(), "");

    assert!(style.apply_with_params(&input, &params(&[("x", "$missing")])).is_err());
    let message = style.error_message().to_string();
    assert!(style.apply_with_params(&input, &params(&[("x", "$missing")])).is_err());
    assert_eq!(style.error_message(), message);
}

#[test]
fn terminating_message() {
    let mut style = stylesheet(
        r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
             <xsl:template match="/">
               <r/>
               <xsl:if test="/stop"><xsl:message terminate="yes">stopped at <xsl:value-of select="name(/*)"/></xsl:message></xsl:if>
             </xsl:template>
           </xsl:stylesheet>"#,
    );
    assert_eq!(style.apply(&doc("<go/>")).unwrap().to_string(), "<r/>");
    assert_eq!(
        style.apply(&doc("<stop/>")).unwrap_err(),
        StylesheetError::Transform("stopped at stop".to_string())
    );
    assert_eq!(style.apply(&doc("<go/>")).unwrap().to_string(), "<r/>");
}

#[test]
fn rejected_documents_come_back() {
    let rejected = Stylesheet::from_document(doc("<a><b/></a>")).unwrap_err();
    assert_eq!(rejected.message, "document is not a stylesheet");
    assert_eq!(rejected.document.to_string(), "<a><b/></a>");

    let rejected = Stylesheet::from_document(Document::new()).unwrap_err();
    assert_eq!(rejected.message, "stylesheet document is empty");
    assert!(rejected.document.is_empty());

    let err = StylesheetError::from(rejected);
    assert_eq!(err, StylesheetError::Compile("stylesheet document is empty".to_string()));
}

#[test]
fn compiled_from_file() {
    let file = fixture(IDENTITY);
    let mut style = Stylesheet::from_file(file.path()).unwrap();
    assert_eq!(style.program().parameters().collect::<Vec<_>>(), ["x"]);
    assert!(style.source().document_element().is_some());
    let result = style.apply(&doc("<a/>")).unwrap();
    assert_eq!(result.to_string(), "<out x=\"0\"><a/></out>");

    assert_eq!(
        Stylesheet::from_file("/no/such/style.xsl").unwrap_err(),
        StylesheetError::Parse(ParseError::SourceUnavailable(
            "failed to open file \"/no/such/style.xsl\"".to_string()
        ))
    );

    let file = fixture("<xsl:stylesheet><oops></xsl:stylesheet>");
    assert!(matches!(
        Stylesheet::from_file(file.path()),
        Err(StylesheetError::Parse(ParseError::Malformed(_)))
    ));

    let file = fixture(r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"><xsl:number/></xsl:stylesheet>"#);
    assert_eq!(
        Stylesheet::from_file(file.path()).unwrap_err(),
        StylesheetError::Compile("unsupported XSLT element xsl:number".to_string())
    );
}

#[test]
fn results_use_output_settings() {
    let mut style = stylesheet(
        r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
             <xsl:output method="text"/>
             <xsl:template match="/">total: <xsl:value-of select="sum(//n)"/></xsl:template>
           </xsl:stylesheet>"#,
    );
    assert_eq!(style.output_settings().method, Some(crate::document::OutputMethod::Text));
    let result = style.apply(&doc("<l><n>1</n><n>2</n></l>")).unwrap();
    assert_eq!(result.save_to_string(), "total: 3");

    let mut style = stylesheet(IDENTITY);
    let result = style.apply(&doc("<a/>")).unwrap();
    assert_eq!(
        result.save_to_string(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<out x=\"0\"><a/></out>\n"
    );
}
