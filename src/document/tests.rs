/*
** This file is a part of Xmlwrap (XML parsing and XSLT bridge)
** Copyright (C) 2025 Gurer Ozen
**
** Xmlwrap is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;
use std::ops::ControlFlow;

#[derive(Default)]
struct Collector {
    warnings: Vec<String>,
    errors: Vec<String>,
    fatals: Vec<String>,
    whitespace: Vec<String>,
    ignore_blanks: bool,
    stop_on_error: bool,
}

impl SaxCallbacks for Collector {
    fn warning(&mut self, message: fmt::Arguments<'_>) {
        self.warnings.push(message.to_string());
    }

    fn error(&mut self, message: fmt::Arguments<'_>) -> ControlFlow<()> {
        self.errors.push(message.to_string());
        if self.stop_on_error {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn fatal_error(&mut self, message: fmt::Arguments<'_>) {
        self.fatals.push(message.to_string());
    }

    fn ignorable_whitespace(&mut self, text: &str) -> Whitespace {
        self.whitespace.push(text.to_string());
        if self.ignore_blanks {
            Whitespace::Ignore
        } else {
            Whitespace::Keep
        }
    }
}

struct Outcome {
    result: Result<(), ParseAborted>,
    well_formed: bool,
    tree: Option<Tree>,
}

fn parse_with(xml: &str, callbacks: &mut Collector) -> Outcome {
    let mut context = ParserContext::from_memory(xml.as_bytes()).unwrap();
    let result = context.parse_document(callbacks);
    Outcome {
        result,
        well_formed: context.well_formed(),
        tree: context.take_document(),
    }
}

fn compact(tree: Tree) -> String {
    Document::from_tree(tree).to_string()
}

#[test]
fn tree_access() {
    let doc: Document = "<a x='1'><b/>text<c>more</c></a>".parse().unwrap();
    let tree = doc.tree();
    let a = tree.document_element().unwrap();
    assert_eq!(tree.name(a), Some("a"));
    assert_eq!(tree.attribute(a, "x"), Some("1"));
    assert_eq!(tree.attribute(a, "y"), None);
    assert_eq!(tree.parent(a), Some(tree.root()));

    let children = tree.children(a);
    assert_eq!(children.len(), 3);
    assert_eq!(tree.name(children[0]), Some("b"));
    assert_eq!(tree.text(children[1]), Some("text"));
    assert_eq!(tree.string_value(a), "textmore");

    let order: Vec<NodeId> = tree.descendant_or_self(tree.root()).collect();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
    assert_eq!(order.len(), tree.len());
}

#[test]
fn text_pieces_are_merged() {
    let doc: Document = "<a>x &amp; y<![CDATA[ <z> ]]></a>".parse().unwrap();
    let tree = doc.tree();
    let a = tree.document_element().unwrap();
    assert_eq!(tree.children(a).len(), 1);
    assert_eq!(tree.string_value(a), "x & y <z> ");
    assert_eq!(doc.to_string(), "<a>x &amp; y &lt;z&gt; </a>");
}

#[test]
fn namespace_lookup() {
    let doc: Document = "<a xmlns='urn:d' xmlns:p='urn:p'><p:b><c/></p:b></a>".parse().unwrap();
    let tree = doc.tree();
    let c = tree.descendant_or_self(tree.root()).last().unwrap();
    assert_eq!(tree.name(c), Some("c"));
    assert_eq!(tree.lookup_namespace(c, "p"), Some("urn:p"));
    assert_eq!(tree.lookup_namespace(c, ""), Some("urn:d"));
    assert_eq!(tree.lookup_namespace(c, "q"), None);
    assert_eq!(tree.lookup_namespace(c, "xml"), Some(XML_NAMESPACE));
    assert_eq!(split_qname("p:b"), (Some("p"), "b"));
    assert_eq!(split_qname("b"), (None, "b"));
}

#[test]
fn copies() {
    let doc: Document = "<a><b> </b><c>x</c></a>".parse().unwrap();
    let mut other = Tree::new();
    let root = other.root();
    let holder = other.append_element(root, "holder");
    other.copy_from(holder, doc.tree(), doc.document_element().unwrap());
    assert_eq!(compact(other), "<holder><a><b> </b><c>x</c></a></holder>");

    let stripped = doc
        .tree()
        .filtered_copy(|tree, id| !tree.string_value(id).trim().is_empty());
    assert_eq!(compact(stripped), "<a><b/><c>x</c></a>");
}

#[test]
fn tree_editing() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.append_element(root, "a");
    assert!(tree.set_attribute(a, "k", "v1"));
    assert!(tree.set_attribute(a, "k", "v2"));
    tree.append_text(a, "x<");
    tree.append_text(a, "y");
    let t = tree.children(a)[0];
    assert!(!tree.set_attribute(t, "k", "v"));
    assert_eq!(compact(tree), "<a k=\"v2\">x&lt;y</a>");
}

#[test]
fn empty_buffer_has_no_context() {
    assert!(ParserContext::from_memory(b"").is_none());
    assert!(matches!("".parse::<Document>(), Err(DocumentError::BadXml(_))));
}

#[test]
fn tag_mismatch_is_fatal() {
    let mut callbacks = Collector::default();
    let outcome = parse_with("<a><b></a>", &mut callbacks);
    assert_eq!(outcome.result, Err(ParseAborted));
    assert!(!outcome.well_formed);
    assert_eq!(
        callbacks.fatals,
        vec!["line 1, column 10: Opening and ending tag mismatch: b and a".to_string()]
    );
    assert!(callbacks.warnings.is_empty());
    assert!(callbacks.errors.is_empty());
}

#[test]
fn syntax_errors_are_fatal() {
    let mut callbacks = Collector::default();
    let outcome = parse_with("<a>\n<b x='1' x='2'/></a>", &mut callbacks);
    assert!(outcome.result.is_err());
    assert_eq!(callbacks.fatals.len(), 1);
    assert!(callbacks.fatals[0].starts_with("line 2, column"));
    assert!(callbacks.fatals[0].ends_with("Attribute redefined x"));

    let mut callbacks = Collector::default();
    let outcome = parse_with("<a><b></b>", &mut callbacks);
    assert!(!outcome.well_formed);
    assert_eq!(callbacks.fatals.len(), 1);
    assert!(callbacks.fatals[0].contains("unclosed tags"));

    let mut callbacks = Collector::default();
    parse_with("   ", &mut callbacks);
    assert_eq!(callbacks.fatals, vec!["line 1, column 4: Document is empty".to_string()]);
}

#[test]
fn undefined_prefix_is_recoverable() {
    let mut callbacks = Collector::default();
    let outcome = parse_with("<p:a q:x='1'/>", &mut callbacks);
    assert_eq!(outcome.result, Ok(()));
    assert!(outcome.well_formed);
    assert!(outcome.tree.is_some());
    assert_eq!(
        callbacks.errors,
        vec![
            "Namespace prefix p on p:a is not defined".to_string(),
            "Namespace prefix q on p:a is not defined".to_string(),
        ]
    );

    let mut callbacks = Collector {
        stop_on_error: true,
        ..Default::default()
    };
    let outcome = parse_with("<a><p:b/><c/></a>", &mut callbacks);
    assert_eq!(outcome.result, Err(ParseAborted));
    assert_eq!(callbacks.errors.len(), 1);
    assert!(callbacks.fatals.is_empty());

    let mut callbacks = Collector::default();
    parse_with("<a xmlns:p='urn:p'><p:b p:x='1'/></a>", &mut callbacks);
    assert!(callbacks.errors.is_empty());
}

#[test]
fn warnings() {
    let mut callbacks = Collector::default();
    let outcome = parse_with("<?xml version='1.1'?><a xmlns='foo'/>", &mut callbacks);
    assert!(outcome.well_formed);
    assert_eq!(
        callbacks.warnings,
        vec![
            "Unsupported version '1.1'".to_string(),
            "xmlns: URI foo is not absolute".to_string(),
        ]
    );

    let mut callbacks = Collector::default();
    parse_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><a xmlns='urn:x'/>", &mut callbacks);
    assert!(callbacks.warnings.is_empty());

    let mut callbacks = Collector::default();
    parse_with("<a><?xml version='1.0'?></a>", &mut callbacks);
    assert_eq!(callbacks.fatals.len(), 1);
}

#[test]
fn ignorable_whitespace() {
    const XML: &str = "<a>\n  <b/>\n  <c>x</c>\n</a>";

    let mut callbacks = Collector {
        ignore_blanks: true,
        ..Default::default()
    };
    let outcome = parse_with(XML, &mut callbacks);
    assert_eq!(callbacks.whitespace.len(), 3);
    assert_eq!(compact(outcome.tree.unwrap()), "<a><b/><c>x</c></a>");

    // Once a blank is kept the parent has a text child, so later blanks
    // are no longer offered.
    let mut callbacks = Collector::default();
    let outcome = parse_with(XML, &mut callbacks);
    assert_eq!(callbacks.whitespace.len(), 1);
    assert_eq!(compact(outcome.tree.unwrap()), XML);
}

#[test]
fn whitespace_that_is_never_ignorable() {
    for xml in [
        "<a> </a>",
        "<a>x <b/> </a>",
        "<a><![CDATA[ ]]><b/></a>",
        "<a xml:space='preserve'> <b/> </a>",
    ] {
        let mut callbacks = Collector {
            ignore_blanks: true,
            ..Default::default()
        };
        let outcome = parse_with(xml, &mut callbacks);
        assert!(callbacks.whitespace.is_empty(), "{}", xml);
        assert!(outcome.well_formed);
    }
}

#[test]
fn panicking_callbacks_are_contained() {
    struct Panicky;

    impl SaxCallbacks for Panicky {
        fn warning(&mut self, _message: fmt::Arguments<'_>) {
            panic!("warning handler failed");
        }

        fn error(&mut self, _message: fmt::Arguments<'_>) -> ControlFlow<()> {
            panic!("error handler failed");
        }
    }

    let mut context = ParserContext::from_memory(b"<?xml version='2.0'?><a/>").unwrap();
    assert_eq!(context.parse_document(&mut Panicky), Ok(()));
    assert!(context.well_formed());

    let mut context = ParserContext::from_memory(b"<a><p:b/></a>").unwrap();
    assert_eq!(context.parse_document(&mut Panicky), Err(ParseAborted));
}

#[test]
fn file_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.xml");
    std::fs::write(&good, "<a><b/></a>").unwrap();
    let bad = dir.path().join("bad.xml");
    std::fs::write(&bad, "<a><b></a>").unwrap();

    let mut callbacks = Collector::default();
    let tree = parse_file_with_data(&good, &mut callbacks).unwrap();
    assert_eq!(compact(tree), "<a><b/></a>");

    let mut callbacks = Collector::default();
    assert!(parse_file_with_data(&bad, &mut callbacks).is_none());
    assert_eq!(callbacks.fatals.len(), 1);

    let mut callbacks = Collector::default();
    assert!(parse_file_with_data(&dir.path().join("missing.xml"), &mut callbacks).is_none());
    assert!(callbacks.fatals.is_empty());
    assert!(callbacks.errors.is_empty());
}

#[test]
fn plain_save() {
    let doc: Document = "<a><b/></a>".parse().unwrap();
    assert_eq!(doc.save_to_string(), "<?xml version=\"1.0\"?>\n<a><b/></a>\n");
    assert_eq!(Document::new().save_to_string(), "<?xml version=\"1.0\"?>\n");
}

#[test]
fn stylesheet_save() {
    let tree = "<a><b><c/></b><d>x</d></a>".parse::<Document>().unwrap().into_tree();
    let settings = OutputSettings {
        indent: true,
        ..Default::default()
    };
    let doc = Document::from_transform(tree, Arc::new(settings));
    assert!(matches!(doc.serialization(), Serialization::Stylesheet(_)));
    assert_eq!(
        doc.save_to_string(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a>\n  <b>\n    <c/>\n  </b>\n  <d>x</d>\n</a>\n"
    );

    let tree = "<r>ç</r>".parse::<Document>().unwrap().into_tree();
    let settings = OutputSettings {
        encoding: Some("ISO-8859-1".to_string()),
        standalone: Some(true),
        doctype_system: Some("r.dtd".to_string()),
        ..Default::default()
    };
    let doc = Document::from_transform(tree, Arc::new(settings));
    assert_eq!(
        doc.save_to_string(),
        "<?xml version=\"1.0\" encoding=\"ISO-8859-1\" standalone=\"yes\"?>\n<!DOCTYPE r SYSTEM \"r.dtd\">\n<r>&#231;</r>\n"
    );
}

#[test]
fn html_and_text_save() {
    let tree = "<html><body><p/><br/>a&amp;b</body></html>"
        .parse::<Document>()
        .unwrap()
        .into_tree();
    let doc = Document::from_transform(tree, Arc::new(OutputSettings::default()));
    assert_eq!(doc.save_to_string(), "<html><body><p></p><br>a&amp;b</body></html>\n");

    let tree = "<a>one<b>two</b></a>".parse::<Document>().unwrap().into_tree();
    let settings = OutputSettings {
        method: Some(OutputMethod::Text),
        ..Default::default()
    };
    let doc = Document::from_transform(tree, Arc::new(settings));
    assert_eq!(doc.save_to_string(), "onetwo");
}

#[test]
fn save_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xml");
    let doc: Document = "<a/>".parse().unwrap();
    doc.save_to_file(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "<?xml version=\"1.0\"?>\n<a/>\n");

    let missing = dir.path().join("no/such/dir/out.xml");
    assert!(matches!(doc.save_to_file(&missing), Err(DocumentError::Io(_))));
}

#[test]
fn deep_trees_serialize() {
    let mut tree = Tree::new();
    let mut node = tree.root();
    for _ in 0..100_000 {
        node = tree.append_element(node, "a");
    }
    tree.append_text(node, "x");

    let mut copy = Tree::new();
    let root = copy.root();
    copy.copy_from(root, &tree, tree.root());
    assert_eq!(copy.len(), tree.len());

    let expected = format!("{}x{}", "<a>".repeat(100_000), "</a>".repeat(100_000));
    let doc = Document::from_tree(copy);
    assert_eq!(doc.to_string(), expected);
    assert_eq!(doc.save_to_string(), format!("<?xml version=\"1.0\"?>\n{}\n", expected));
    assert_eq!(tree.string_value(tree.root()), "x");
}
