/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::Document;
use crate::document::Tree;

use super::*;

const SAMPLE: &str = "<a><b><b/></b><d><e>123</e><f>456<b i=\"1\"/>789</f><b>abc</b></d></a>";

fn render(tree: &Tree, node: &XNode) -> String {
    match node {
        XNode::Node(id) => tree.xml_string(*id),
        XNode::Attribute(id, index) => {
            let attr = &tree.attributes(*id)[*index];
            format!("{}=\"{}\"", attr.name, attr.value)
        }
    }
}

fn check_path(document: &Document, expression: &str, expected: &[&str]) {
    let p1 = XPath::new(expression).unwrap();
    let value = p1.apply(document).unwrap();
    let nodes = value.nodes().unwrap();
    let result: Vec<String> = nodes.iter().map(|node| render(document.tree(), node)).collect();
    assert_eq!(result, expected, "for {}", expression);
}

fn check_value(document: &Document, expression: &str, expected: &str) {
    let value = XPath::new(expression).unwrap().apply(document).unwrap();
    assert_eq!(value.to_string_value(document.tree()), expected, "for {}", expression);
}

#[test]
fn simple_steps() {
    let doc = Document::from_str(SAMPLE).unwrap();

    check_path(&doc, "/*", &[SAMPLE]);

    check_path(&doc, "/a", &[SAMPLE]);

    check_path(&doc, "/a/b", &["<b><b/></b>"]);

    check_path(&doc, "/a/d/f/b", &["<b i=\"1\"/>"]);

    check_path(&doc, "/a/d/*", &["<e>123</e>", "<f>456<b i=\"1\"/>789</f>", "<b>abc</b>"]);

    check_path(&doc, "//b", &["<b><b/></b>", "<b/>", "<b i=\"1\"/>", "<b>abc</b>"]);

    check_path(&doc, "/a/d//b", &["<b i=\"1\"/>", "<b>abc</b>"]);

    check_path(&doc, "//b/b", &["<b/>"]);
}

#[test]
fn predicates() {
    let doc = Document::from_str(SAMPLE).unwrap();

    check_path(&doc, "/a/d/*[2]", &["<f>456<b i=\"1\"/>789</f>"]);
    check_path(&doc, "/a/d/*[last()]", &["<b>abc</b>"]);
    check_path(&doc, "/a/d/*[position() < 3][last()]", &["<f>456<b i=\"1\"/>789</f>"]);
    check_path(&doc, "//b[@i]", &["<b i=\"1\"/>"]);
    check_path(&doc, "//b[@i = '1']", &["<b i=\"1\"/>"]);
    check_path(&doc, "//b[. = 'abc']", &["<b>abc</b>"]);
    check_path(&doc, "//*[e]", &["<d><e>123</e><f>456<b i=\"1\"/>789</f><b>abc</b></d>"]);

    // First b child of every node versus first b of the whole document.
    check_path(&doc, "//b[1]", &["<b><b/></b>", "<b/>", "<b i=\"1\"/>", "<b>abc</b>"]);
    check_path(&doc, "(//b)[1]", &["<b><b/></b>"]);
}

#[test]
fn axes() {
    let doc = Document::from_str(SAMPLE).unwrap();

    check_path(&doc, "//e/..", &["<d><e>123</e><f>456<b i=\"1\"/>789</f><b>abc</b></d>"]);
    check_path(&doc, "//@i/..", &["<b i=\"1\"/>"]);
    check_path(&doc, "//@i", &["i=\"1\""]);
    check_path(&doc, "//f/text()", &["456", "789"]);
    check_path(&doc, "/a/d/b/preceding-sibling::*[1]", &["<f>456<b i=\"1\"/>789</f>"]);
    check_path(&doc, "/a/d/e/following-sibling::*", &["<f>456<b i=\"1\"/>789</f>", "<b>abc</b>"]);
    check_path(&doc, "//e/ancestor::*[1]/e", &["<e>123</e>"]);
    check_value(&doc, "count(//e/ancestor::*)", "2");
    check_path(&doc, "//e/following::b", &["<b i=\"1\"/>", "<b>abc</b>"]);
    check_path(&doc, "//f/preceding::*", &["<b><b/></b>", "<b/>", "<e>123</e>"]);
    check_path(&doc, "//e/self::e", &["<e>123</e>"]);
    check_path(&doc, "//e/self::f", &[]);
    check_path(&doc, "/a/b/descendant-or-self::b", &["<b><b/></b>", "<b/>"]);
    check_path(&doc, "/a/b | //e", &["<b><b/></b>", "<e>123</e>"]);
    check_path(&doc, "/", &[SAMPLE]);
}

#[test]
fn namespaces() {
    let doc = Document::from_str("<r xmlns:x=\"urn:x\" a=\"1\"><x:y x:z=\"2\"/></r>").unwrap();

    check_value(&doc, "namespace-uri(//x:y)", "urn:x");
    check_value(&doc, "local-name(//x:y)", "y");
    check_value(&doc, "name(//x:y)", "x:y");
    check_value(&doc, "count(//x:*)", "1");
    check_value(&doc, "count(/r/@*)", "1");
    check_value(&doc, "namespace-uri(/r/@a)", "");
    check_value(&doc, "namespace-uri(//@x:z)", "urn:x");
}

#[test]
fn strings() {
    let doc = Document::from_str(SAMPLE).unwrap();

    check_value(&doc, "string(//e)", "123");
    check_value(&doc, "concat('a', //e, 'b')", "a123b");
    check_value(&doc, "substring('12345', 2, 3)", "234");
    check_value(&doc, "substring('12345', 1.5, 2.6)", "234");
    check_value(&doc, "substring('12345', 0, 3)", "12");
    check_value(&doc, "substring('12345', 0 div 0, 3)", "");
    check_value(&doc, "normalize-space('  a  b ')", "a b");
    check_value(&doc, "translate('bar', 'abc', 'ABC')", "BAr");
    check_value(&doc, "translate('--aaa--', 'abc-', 'ABC')", "AAA");
    check_value(&doc, "string-length('çay')", "3");
    check_value(&doc, "substring-before('1999/04/01', '/')", "1999");
    check_value(&doc, "substring-after('1999/04/01', '/')", "04/01");
    check_value(&doc, "starts-with('abc', 'ab')", "true");
    check_value(&doc, "contains('abc', 'd')", "false");
    check_value(&doc, "name(/a/*[1])", "b");
}

#[test]
fn numbers() {
    let doc = Document::from_str(SAMPLE).unwrap();

    check_value(&doc, "count(//b)", "4");
    check_value(&doc, "//e + 1", "124");
    check_value(&doc, "1 + 2 * 3", "7");
    check_value(&doc, "(1 + 2) * 3", "9");
    check_value(&doc, "- 2 - -3", "1");
    check_value(&doc, "7 mod 3", "1");
    check_value(&doc, "-7 mod 3", "-1");
    check_value(&doc, "3 div 2", "1.5");
    check_value(&doc, "1 div 0", "Infinity");
    check_value(&doc, "-1 div 0", "-Infinity");
    check_value(&doc, "0 div 0", "NaN");
    check_value(&doc, "round(2.5)", "3");
    check_value(&doc, "round(-2.5)", "-2");
    check_value(&doc, "round(-0.2)", "0");
    check_value(&doc, "floor(-1.5)", "-2");
    check_value(&doc, "ceiling(1.2)", "2");
    check_value(&doc, "number('  12 ')", "12");
    check_value(&doc, "number('1e3')", "NaN");
    check_value(&doc, "sum(//e)", "123");
}

#[test]
fn booleans() {
    let doc = Document::from_str(SAMPLE).unwrap();

    check_value(&doc, "//e = 123", "true");
    check_value(&doc, "//b = 'abc'", "true");
    check_value(&doc, "//b != 'abc'", "true");
    check_value(&doc, "//e > 100", "true");
    check_value(&doc, "//e < 100", "false");
    check_value(&doc, "'2' = 2.0", "true");
    check_value(&doc, "true() = 'x'", "true");
    check_value(&doc, "//zzz = false()", "true");
    check_value(&doc, "//e = //d/*", "true");
    check_value(&doc, "boolean('')", "false");
    check_value(&doc, "not(//zzz)", "true");
    check_value(&doc, "1 = 1 and 2 > 3", "false");
    check_value(&doc, "1 = 1 or 2 > 3", "true");
}

#[test]
fn language() {
    let doc = Document::from_str("<a xml:lang=\"en-US\"><b/><c xml:lang=\"de\"/></a>").unwrap();
    check_value(&doc, "count(//*[lang('en')])", "2");
    check_value(&doc, "count(//*[lang('de')])", "1");
    check_value(&doc, "count(//*[lang('e')])", "0");
}

#[test]
fn variables() {
    let doc = Document::from_str(SAMPLE).unwrap();
    let tree = doc.tree();
    let mut variables = BTreeMap::new();
    variables.insert("n".to_string(), Value::Number(2.0));
    variables.insert("s".to_string(), Value::String("abc".to_string()));

    let context = Context::new(tree, XNode::Node(tree.root()), &variables);
    let value = XPath::new("/a/d/*[$n]").unwrap().evaluate(&context).unwrap();
    assert_eq!(value.nodes().unwrap().len(), 1);
    assert_eq!(render(tree, &value.nodes().unwrap()[0]), "<f>456<b i=\"1\"/>789</f>");

    let value = XPath::new("//b[. = $s]").unwrap().evaluate(&context).unwrap();
    assert_eq!(value.nodes().unwrap().len(), 1);

    let err = XPath::new("$missing").unwrap().evaluate(&context).unwrap_err();
    assert_eq!(err, XPathError::UnknownVariable("missing".to_string()));
}

#[test]
fn current_node() {
    let doc = Document::from_str("<a><k>2</k><v n=\"1\"/><v n=\"2\"/></a>").unwrap();
    let tree = doc.tree();
    let k = tree.children(tree.document_element().unwrap())[0];
    let context = Context::new(tree, XNode::Node(k), &NoVariables);
    let value = XPath::new("../v[@n = current()]").unwrap().evaluate(&context).unwrap();
    assert_eq!(render(tree, &value.nodes().unwrap()[0]), "<v n=\"2\"/>");
}

#[test]
fn bad_expressions() {
    fn syntax_error(expression: &str) {
        match XPath::new(expression) {
            Err(XPathError::Syntax { .. }) => (),
            other => panic!("expected a syntax error for {}, got {:?}", expression, other),
        }
    }

    syntax_error("/a[");
    syntax_error("1 +");
    syntax_error("'abc");
    syntax_error("a b");
    syntax_error("bogus::x");
    syntax_error("a/");
    syntax_error("$");
    syntax_error("a ! b");

    assert_eq!(
        XPath::new("'abc").unwrap_err(),
        XPathError::Syntax {
            offset: 0,
            message: error::description::UNTERMINATED_LITERAL,
        }
    );
    assert_eq!(XPath::new("foo()").unwrap_err(), XPathError::UnknownFunction("foo".to_string()));
    assert_eq!(XPath::new("count()").unwrap_err(), XPathError::Arity("count".to_string()));
    assert_eq!(XPath::new("concat('a')").unwrap_err(), XPathError::Arity("concat".to_string()));
    assert_eq!(
        XPath::new("namespace::x").unwrap_err(),
        XPathError::Unsupported("namespace axis")
    );

    let doc = Document::from_str(SAMPLE).unwrap();
    assert_eq!(XPath::new("count(1)").unwrap().apply(&doc).unwrap_err(), XPathError::NotANodeSet);
}

#[test]
fn number_conversions() {
    assert_eq!(number_to_string(1.0), "1");
    assert_eq!(number_to_string(-0.0), "0");
    assert_eq!(number_to_string(0.5), "0.5");
    assert_eq!(number_to_string(1e21), "1000000000000000000000");
    assert!(string_to_number("").is_nan());
    assert!(string_to_number("-").is_nan());
    assert!(string_to_number("1.2.3").is_nan());
    assert_eq!(string_to_number(" -.5\n"), -0.5);
    assert_eq!(string_to_number("12."), 12.0);
}
