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

#[derive(Debug, Eq, PartialEq)]
enum Event {
    Start(String),
    Attr(String, String),
    Empty,
    End(String),
    Text(String),
    Section(String),
    Pi(String),
}

fn start(s: &str) -> Event {
    Event::Start(s.to_string())
}

fn attr(name: &str, value: &str) -> Event {
    Event::Attr(name.to_string(), value.to_string())
}

fn end(s: &str) -> Event {
    Event::End(s.to_string())
}

fn text(s: &str) -> Event {
    Event::Text(s.to_string())
}

fn section(s: &str) -> Event {
    Event::Section(s.to_string())
}

fn pi(s: &str) -> Event {
    Event::Pi(s.to_string())
}

// Adjacent text pieces of the same kind are merged, so the results do not
// depend on how the input was split into blocks.
#[derive(Default)]
struct Recorder {
    events: Vec<Event>,
}

impl SaxHandler for Recorder {
    fn handle_element(&mut self, element: &SaxElement) -> Result<(), SaxError> {
        let event = match element {
            SaxElement::StartTag(name) => start(name),
            SaxElement::Attribute(name, value) => attr(name, value),
            SaxElement::EmptyElementTag => Event::Empty,
            SaxElement::EndTag(name) => end(name),
            SaxElement::CData(s) => {
                if let Some(Event::Text(prev)) = self.events.last_mut() {
                    prev.push_str(s);
                    return Ok(());
                }
                text(s)
            }
            SaxElement::CDataSection(s) => {
                if let Some(Event::Section(prev)) = self.events.last_mut() {
                    prev.push_str(s);
                    return Ok(());
                }
                section(s)
            }
            SaxElement::ProcessingInstruction(s) => pi(s),
        };
        self.events.push(event);
        Ok(())
    }
}

struct Tester {
    expected: Vec<Event>,
}

impl Tester {
    fn new(expected: Vec<Event>) -> Tester {
        Tester { expected }
    }

    fn check_whole(&self, s: &str) -> SaxParser {
        let mut recorder = Recorder::default();
        let mut parser = SaxParser::new();
        assert_eq!(parser.parse_bytes_finish(&mut recorder, s.as_bytes()), Ok(()));
        assert_eq!(recorder.events, self.expected);

        let location = parser.location();
        assert_eq!(location.bytes, s.len());
        assert_eq!(location.line, s.matches('\n').count() + 1);
        let last_line = s.rsplit('\n').next().unwrap();
        assert_eq!(location.column, last_line.len() + 1);
        parser
    }

    fn check(&self, s: &str) {
        let mut parser = self.check_whole(s);

        // now try byte by byte
        parser.reset();
        let mut recorder = Recorder::default();
        for i in 0..s.len() {
            assert_eq!(parser.parse_bytes(&mut recorder, &s.as_bytes()[i..i + 1]), Ok(()));
        }
        assert_eq!(parser.parse_finish(), Ok(()));
        assert_eq!(recorder.events, self.expected);
        assert_eq!(parser.location().bytes, s.len());
    }
}

struct BadTester {
    bad_byte: usize,
}

impl BadTester {
    fn new(bad_byte: usize) -> BadTester {
        BadTester { bad_byte }
    }

    fn check(&mut self, s: &str) {
        self.check_bytes(s.as_bytes())
    }

    fn check_bytes(&mut self, bytes: &[u8]) {
        let mut parser = SaxParser::new();
        let result = parser.parse_bytes_finish(self, bytes);
        assert!(matches!(result, Err(SaxError::BadXml(_))), "{:?}", result);
        assert_eq!(parser.location().bytes, self.bad_byte);
    }

    fn check_with_message(&mut self, s: &str, message: &'static str) {
        let mut parser = SaxParser::new();
        let result = parser.parse_bytes_finish(self, s.as_bytes());
        assert_eq!(result, Err(SaxError::BadXml(message)));
        assert_eq!(parser.location().bytes, self.bad_byte);
    }
}

impl SaxHandler for BadTester {
    fn handle_element(&mut self, _element: &SaxElement) -> Result<(), SaxError> {
        Ok(())
    }
}

#[test]
fn tags() {
    Tester::new(vec![start("lonely"), Event::Empty]).check("<lonely/>");

    Tester::new(vec![start("lonely"), Event::Empty]).check("   <lonely/>    ");

    Tester::new(vec![
        start("parent"),
        start("child"),
        Event::Empty,
        start("child"),
        Event::Empty,
        text("child"),
        end("parent"),
    ])
    .check("<parent><child/><child/>child</parent>");

    Tester::new(vec![
        start("parent"),
        start("empty"),
        Event::Empty,
        start("b"),
        text("lala"),
        end("b"),
        end("parent"),
    ])
    .check("<parent  ><empty \t /><b>lala</b \n></parent>");

    Tester::new(vec![
        start("mytag"),
        attr("abc", "123"),
        attr("id", "XC72"),
        end("mytag"),
    ])
    .check("<mytag abc='123' id=\"XC72\"></mytag>");

    Tester::new(vec![
        start("a"),
        start("b"),
        attr("x1", "lala"),
        Event::Empty,
        start("c"),
        attr("x2", "bibi"),
        Event::Empty,
        end("a"),
    ])
    .check("<a><b x1 ='lala'/><c x2\t= \t'bibi'/></a>");

    Tester::new(vec![
        start("tag"),
        attr("a", "12\"34"),
        attr("b", "123'456"),
        Event::Empty,
    ])
    .check("<tag a='12\"34' b=\"123'456\" />");
}

#[test]
fn mismatched_names_pass_through() {
    // Name matching is the tree builder's job.
    Tester::new(vec![start("a"), start("b"), end("a")]).check("<a><b></a>");
}

#[test]
fn non_ascii_names() {
    Tester::new(vec![
        start("kitap"),
        attr("ölçü", "büyük"),
        text("Çingis"),
        end("kitap"),
    ])
    .check_whole("<kitap ölçü='büyük'>Çingis</kitap>");
}

#[test]
fn comments() {
    Tester::new(vec![
        start("item"),
        attr("url", "http://jabber.org"),
        text("Jabber Site"),
        end("item"),
    ])
    .check("<item url='http://jabber.org'><!-- little comment -->Jabber Site</item>");

    Tester::new(vec![start("empty"), Event::Empty]).check("<!-- comment --> <empty/> <!-- lala -->");
}

#[test]
fn cdata_sections() {
    Tester::new(vec![
        start("ka"),
        text("1234"),
        section(" <ka> lala ] ]] ]]] "),
        text("4321"),
        end("ka"),
    ])
    .check("<ka>1234<![CDATA[ <ka> lala ] ]] ]]] ]]>4321</ka>");

    Tester::new(vec![start("data"), section("[TEST]"), end("data")])
        .check("<data><![CDATA[[TEST]]]></data>");

    Tester::new(vec![start("data"), section("  "), end("data")]).check("<data><![CDATA[  ]]></data>");
}

#[test]
fn dtds() {
    Tester::new(vec![start("x"), text("foo"), end("x")])
        .check(" <!DOCTYPE greeting [ <!ELEMENT greeting (#PCDATA)> ]> <x>foo</x>");
}

#[test]
fn processing_instructions() {
    Tester::new(vec![
        pi("xml version='1.0'"),
        start("a"),
        pi("target data"),
        text("bibi"),
        end("a"),
    ])
    .check("<?xml version='1.0'?><a><?target data?>bibi</a>");

    Tester::new(vec![start("a"), pi("x a?b?"), text("t"), end("a")]).check("<a><?x a?b??>t</a>");
}

#[test]
fn entities() {
    Tester::new(vec![
        start("body"),
        text("I'm fixing parser&tester for \"<\" and \">\" chars."),
        end("body"),
    ])
    .check("<body>I&apos;m fixing parser&amp;tester for &quot;&lt;&quot; and &quot;&gt;&quot; chars.</body>");

    Tester::new(vec![start("a"), text(";AB;"), end("a")]).check("<a>&#x3B;&#65;&#x42;&#x3b;</a>");

    Tester::new(vec![start("a"), text(" \u{90} \u{900} \u{10abc} "), end("a")])
        .check("<a> &#x90; &#x900; &#x10abc; </a>");

    Tester::new(vec![start("a"), attr("b", "a&b BA"), end("a")]).check("<a b='a&amp;b &#x42;&#65;'></a>");
}

#[test]
fn long_tag() {
    let name = "abc".repeat(500);
    let xml = format!("<{}></{}>", name, name);

    Tester::new(vec![start(&name), end(&name)]).check(&xml);
}

#[test]
fn location() {
    let parser = Tester::new(vec![start("a"), text("\n\n "), end("a")]).check_whole("<a>\n\n </a>");
    assert_eq!(parser.location().to_string(), "line 3, column 6");
}

#[test]
fn handler_abort() {
    struct Stopper;

    impl SaxHandler for Stopper {
        fn handle_element(&mut self, element: &SaxElement) -> Result<(), SaxError> {
            match element {
                SaxElement::EndTag(_) => Err(SaxError::HandlerAbort),
                _ => Ok(()),
            }
        }
    }

    let mut parser = SaxParser::new();
    assert_eq!(
        parser.parse_bytes(&mut Stopper, b"<a><b></b></a>"),
        Err(SaxError::HandlerAbort)
    );
}

#[test]
fn bad_tags() {
    BadTester::new(4).check("<a>< b/></a>");
    BadTester::new(6).check("<a><b/ ></a>");
    BadTester::new(8).check("<a></ccc/></a>");
    BadTester::new(13).check("<a><b/><c></c/></a>");
    BadTester::new(1).check("</a>");
    BadTester::new(9).check("<a> </a  b>");
    BadTester::new(8).check("<a></a><b/>");
    BadTester::new(10).check("<a a='1' b></a>");
    BadTester::new(11).check("<a a='1' b=></a>");
    BadTester::new(12).check("<a a='12' b '2'></a>");
    BadTester::new(13).check("<a a='123' b c='5'></a>");
    BadTester::new(14).check("<a a='12'></a b='1'>");
    BadTester::new(17).check("<g><test a='123'/ b='lala'></g>");
    BadTester::new(13).check("<a a='1' b='></a>");
    BadTester::new(5).check("<a> <> </a>");
    BadTester::new(6).check("<a> </> </a>");
}

#[test]
fn bad_comments() {
    BadTester::new(10).check("<e><!-- -- --></e>");
    BadTester::new(22).check("<ha><!-- <lala> --><!- comment -></ha>");
    BadTester::new(12).check("<!-- c1 --> lala <ha/>");
    BadTester::new(31).check("<!-- c1 --> <ha/> <!-- pika -->c");
    BadTester::new(9).check("<!-- c ---> <ha/>");
}

#[test]
fn bad_pi() {
    BadTester::new(12).check("<e/> <?xml >");
    BadTester::new(13).check("<e/> <?xml ?>lala");
}

#[test]
fn bad_cdatas() {
    BadTester::new(2).check("  lala <a></a>");
    BadTester::new(10).check("  <a></a> lala");
    BadTester::new(2).check("<![CDATA[lala]> <a/>");
    BadTester::new(8).check(" <a/> <![CDATA[lala]>");
    BadTester::new(7).check("<a> <![DATA[lala]> </a>");
    BadTester::new(12).check("<a> <![CDATAlala]> </a>");
}

#[test]
fn bad_entities() {
    BadTester::new(8).check_with_message("<a>&lala;</a>", description::REFERENCE_CUSTOM_ENTITY);
    BadTester::new(12).check("<a>&lala           </a>");
    BadTester::new(4).check_with_message("<a>&;</a>", description::REFERENCE_EMPTY);
    BadTester::new(6).check("<a>&#1a;</a>");
    BadTester::new(6).check("<a>&#Xaa;</a>");
    BadTester::new(8).check("<a>&#xa5g;</a>");
    BadTester::new(6).check_with_message("<a>&#8;</a>", description::CHAR_INVALID);
    BadTester::new(10).check("<a>&#xD800;</a>");
    BadTester::new(10).check("<a>&#xFFff;</a>");
    BadTester::new(11).check("<a>&#x110000;</a>");
    BadTester::new(11).check("<a>&#99999999999;</a>");
}

#[test]
fn bad_chars() {
    BadTester::new(6).check_bytes(b"<test>\xFF</test>");
    BadTester::new(2).check_bytes(b"<t\x00></t>");
    BadTester::new(8).check_bytes(b"<test>\xe3\x8fa</test>");
    BadTester::new(7).check_bytes(b"<test>\xC0\x80</test>");
    BadTester::new(8).check_bytes(b"<test>\xe0\x80\xaf</test>");
    BadTester::new(9).check_bytes(b"<test>\xf0\x8f\xbf\xbf</test>");
    BadTester::new(1).check_bytes(b"<\x8f\x85></\x8f\x85>");
}

#[test]
fn bad_unfinished() {
    BadTester::new(5).check(" <a> ");
    BadTester::new(0).check_with_message("", description::DOC_NO_CONTENT);
    BadTester::new(20).check("  <!-- lala -->     ");
    BadTester::new(27).check(" <a></a> <!-- open comment ");
    BadTester::new(23).check(" <a></a> <?app open pi ");
}
