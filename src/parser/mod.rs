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
mod location;

use error::description;
pub use error::SaxError;
pub use location::Location;

/// An XML construct returned from the tokenizer.
#[derive(Debug, Eq, PartialEq)]
pub enum SaxElement<'a> {
    /// A start tag or empty element tag.
    ///
    /// The argument is the full name of the tag. This element is sent to the handler as soon as
    /// the name is parsed.
    StartTag(&'a str),

    /// A tag attribute for the last StartTag.
    ///
    /// First argument is the attribute name and the second argument is the attribute value.
    /// All references in the attribute value are replaced with the actual characters.
    Attribute(&'a str, &'a str),

    /// Indicates that the last StartTag was an empty element tag and will have no content.
    EmptyElementTag,

    /// An end tag element.
    ///
    /// The argument is the full name of the end tag.
    EndTag(&'a str),

    /// A character data element.
    ///
    /// You might get this element several times with different parts of the content for a
    /// single continous block of text, for example when the tokenizer encounters a reference
    /// to substitute. The tree builder concatenates the parts.
    CData(&'a str),

    /// Character data coming from a `<![CDATA[...]]>` section.
    ///
    /// Kept apart from [CData](SaxElement::CData) because section content is never
    /// considered ignorable whitespace.
    CDataSection(&'a str),

    /// A processing instruction, including the XML declaration.
    ///
    /// The argument is everything between `<?` and `?>`.
    ProcessingInstruction(&'a str),
}

pub trait SaxHandler {
    fn handle_element(&mut self, element: &SaxElement) -> Result<(), SaxError>;
}

/// SAX (Simple API for XML) based XML tokenizer.
///
/// This struct processes the incoming bytes and invokes a handler
/// function for each encountered XML construct. It checks the lexical
/// rules only; matching of start and end tag names, attribute
/// uniqueness and namespaces are left to the tree builder.
///
/// # Examples
///
/// ```
/// use xmlwrap::{SaxElement, SaxError, SaxHandler, SaxParser};
///
/// struct Counter { tags: usize }
/// impl SaxHandler for Counter {
///     fn handle_element(&mut self, element: &SaxElement) -> Result<(), SaxError> {
///         if let SaxElement::StartTag(_) = element {
///             self.tags += 1;
///         }
///         Ok(())
///     }
/// }
///
/// let mut counter = Counter { tags: 0 };
/// let mut parser = SaxParser::new();
/// parser.parse_bytes(&mut counter, b"<doc><a/><b>text</b></doc>").unwrap();
/// parser.parse_finish().unwrap();
/// assert_eq!(counter.tags, 3);
/// ```
pub struct SaxParser {
    state: State,
    uni_len: u32,
    uni_left: u32,
    uni_char: u32,
    depth: usize,
    is_end_tag: bool,
    is_quot_value: bool,
    seen_content: bool,
    value_pos: usize,
    buffer: Vec<u8>,
    ref_buffer: Vec<u8>,
    char_ref_value: u32,
    is_value_ref: bool,
    location: Location,
}

#[derive(Clone, Copy, Eq, PartialEq)]
enum State {
    Prolog,
    TagStart,
    PI,
    PIEnd,
    Markup,
    CDataSectionC,
    CDataSectionCD,
    CDataSectionCDA,
    CDataSectionCDAT,
    CDataSectionCDATA,
    CDataSectionCDATAb,
    CDataSectionBody,
    CDataSectionMaybeEnd,
    CDataSectionMaybeEnd2,
    CommentStart,
    CommentBody,
    CommentMaybeEnd,
    CommentEnd,
    DoctypeDO,
    DoctypeDOC,
    DoctypeDOCT,
    DoctypeDOCTY,
    DoctypeDOCTYP,
    DoctypeDOCTYPE,
    DoctypeWhitespace,
    DoctypeSkip,
    DoctypeMarkupDecl,
    TagName,
    EndTagWhitespace,
    EmptyTagEnd,
    AttributeWhitespace,
    AttributeName,
    AttributeValueStart,
    AttributeValue,
    AttributeEq,
    CData,
    Reference,
    CharReference,
    CharReferenceBody,
    HexCharReference,
    Entity,
    Epilog,
}

const INITIAL_BUFFER_CAPACITY: usize = 128;

const REF_BUFFER_SIZE: usize = 8;

macro_rules! whitespace {
    () => {
        b' ' | b'\t' | b'\r' | b'\n'
    };
}

fn is_valid_xml_char(c: u32) -> bool {
    matches!(
        c,
        0x09 | 0x0a | 0x0d | 0x20..=0xd7ff | 0xe000..=0xfffd | 0x10000..=0x10ffff
    )
}

// The tokenizer validates every byte before it reaches a slice, so this only
// fails when a multi byte sequence is cut by the caller's block boundary.
fn as_str(bytes: &[u8]) -> Result<&str, SaxError> {
    std::str::from_utf8(bytes).map_err(|_| SaxError::BadXml(description::UTF8_INCOMPLETE))
}

macro_rules! xml_error {
    ($a:ident) => {
        return Err(SaxError::BadXml(description::$a))
    };
}

impl SaxParser {
    /// Creates a new SAX parser instance.
    ///
    /// The instance can be reused for multiple documents with the [reset()](SaxParser::reset) method.
    pub fn new() -> SaxParser {
        SaxParser {
            state: State::Prolog,
            uni_len: 0,
            uni_left: 0,
            uni_char: 0,
            depth: 0,
            is_end_tag: false,
            is_quot_value: false,
            seen_content: false,
            value_pos: 0,
            buffer: Vec::<u8>::with_capacity(INITIAL_BUFFER_CAPACITY),
            ref_buffer: Vec::<u8>::with_capacity(REF_BUFFER_SIZE),
            char_ref_value: 0,
            is_value_ref: false,
            location: Location::new(),
        }
    }

    /// Resets the parser into a clean state.
    pub fn reset(&mut self) {
        self.state = State::Prolog;
        self.uni_len = 0;
        self.uni_left = 0;
        self.uni_char = 0;
        self.depth = 0;
        self.is_end_tag = false;
        self.is_quot_value = false;
        self.seen_content = false;
        self.value_pos = 0;
        self.buffer.clear();
        self.ref_buffer.clear();
        self.char_ref_value = 0;
        self.is_value_ref = false;
        self.location = Location::new();
    }

    fn send_char_reference(
        &mut self,
        handler: &mut impl SaxHandler,
        value: u32,
    ) -> Result<(), SaxError> {
        if !is_valid_xml_char(value) {
            xml_error!(CHAR_INVALID);
        }
        let Some(c) = char::from_u32(value) else {
            xml_error!(CHAR_INVALID);
        };
        let mut buf = [0u8; 4];
        let s = c.encode_utf8(&mut buf);
        if self.is_value_ref {
            self.buffer.extend_from_slice(s.as_bytes());
            Ok(())
        } else {
            handler.handle_element(&SaxElement::CData(s))
        }
    }

    /// Checks if the document is complete.
    ///
    /// A completed document should have a root tag and should not have any
    /// unfinished XML constructs, such as open comments and markup.
    pub fn parse_finish(&mut self) -> Result<(), SaxError> {
        if self.uni_left > 0 {
            xml_error!(UTF8_INCOMPLETE);
        }
        if !self.seen_content {
            xml_error!(DOC_NO_CONTENT);
        }
        if self.depth > 0 {
            xml_error!(DOC_OPEN_TAGS);
        }
        if self.state != State::Epilog {
            xml_error!(DOC_OPEN_MARKUP);
        }
        Ok(())
    }

    /// Parses given XML bytes and checks if the document is complete.
    pub fn parse_bytes_finish(
        &mut self,
        handler: &mut impl SaxHandler,
        bytes: &[u8],
    ) -> Result<(), SaxError> {
        self.parse_bytes(handler, bytes)?;
        self.parse_finish()
    }

    /// Parses given XML bytes.
    ///
    /// The input can be fed in several blocks, but a block boundary must not
    /// split a multi byte UTF-8 character inside text content.
    pub fn parse_bytes(
        &mut self,
        handler: &mut impl SaxHandler,
        bytes: &[u8],
    ) -> Result<(), SaxError> {
        let mut pos: usize = 0;
        let mut back: usize = 0;
        let mut redo: bool = false;

        while pos < bytes.len() {
            let c = bytes[pos];

            // A redone byte has already been through the encoding checks.
            if !redo {
                self.check_encoding(c)?;
            }
            redo = false;

            match self.state {
                State::Prolog => match c {
                    b'<' => self.state = State::TagStart,
                    whitespace!() => (),
                    _ => xml_error!(DOC_CDATA_WITHOUT_PARENT),
                },

                State::TagStart => match c {
                    b'!' => self.state = State::Markup,
                    b'?' => {
                        self.buffer.clear();
                        self.state = State::PI;
                    }
                    b'/' => {
                        if self.depth == 0 {
                            xml_error!(TAG_CLOSE_WITHOUT_OPEN);
                        }
                        back = pos + 1;
                        self.is_end_tag = true;
                        self.state = State::TagName;
                    }
                    whitespace!() => xml_error!(TAG_WHITESPACE_START),
                    b'>' => xml_error!(TAG_EMPTY_NAME),
                    _ => {
                        if self.depth == 0 && self.seen_content {
                            xml_error!(TAG_OUTSIDE_ROOT);
                        }
                        self.depth += 1;
                        back = pos;
                        self.is_end_tag = false;
                        self.seen_content = true;
                        self.state = State::TagName;
                    }
                },

                State::Markup => match c {
                    b'-' => self.state = State::CommentStart,
                    b'[' => {
                        if self.depth == 0 {
                            xml_error!(MARKUP_CDATA_SECTION_OUTSIDE_ROOT);
                        }
                        self.state = State::CDataSectionC;
                    }
                    b'D' => self.state = State::DoctypeDO,
                    _ => xml_error!(MARKUP_UNRECOGNIZED),
                },

                State::DoctypeDO => self.expect_markup(c, b'O', State::DoctypeDOC)?,
                State::DoctypeDOC => self.expect_markup(c, b'C', State::DoctypeDOCT)?,
                State::DoctypeDOCT => self.expect_markup(c, b'T', State::DoctypeDOCTY)?,
                State::DoctypeDOCTY => self.expect_markup(c, b'Y', State::DoctypeDOCTYP)?,
                State::DoctypeDOCTYP => self.expect_markup(c, b'P', State::DoctypeDOCTYPE)?,
                State::DoctypeDOCTYPE => self.expect_markup(c, b'E', State::DoctypeWhitespace)?,

                State::DoctypeWhitespace => match c {
                    whitespace!() => self.state = State::DoctypeSkip,
                    _ => xml_error!(MARKUP_DOCTYPE_BAD_START),
                },

                State::DoctypeSkip => match c {
                    b'<' => self.state = State::DoctypeMarkupDecl,
                    b'>' => self.state = State::Prolog,
                    _ => (),
                },

                State::DoctypeMarkupDecl => {
                    if c == b'>' {
                        self.state = State::DoctypeSkip;
                    }
                }

                State::CDataSectionC => self.expect_cdata(c, b'C', State::CDataSectionCD)?,
                State::CDataSectionCD => self.expect_cdata(c, b'D', State::CDataSectionCDA)?,
                State::CDataSectionCDA => self.expect_cdata(c, b'A', State::CDataSectionCDAT)?,
                State::CDataSectionCDAT => self.expect_cdata(c, b'T', State::CDataSectionCDATA)?,
                State::CDataSectionCDATA => self.expect_cdata(c, b'A', State::CDataSectionCDATAb)?,

                State::CDataSectionCDATAb => {
                    if c != b'[' {
                        xml_error!(MARKUP_CDATA_SECTION_BAD_START);
                    }
                    back = pos + 1;
                    self.state = State::CDataSectionBody;
                }

                State::CDataSectionBody => {
                    if c == b']' {
                        if back < pos {
                            let s = as_str(&bytes[back..pos])?;
                            handler.handle_element(&SaxElement::CDataSection(s))?;
                        }
                        self.state = State::CDataSectionMaybeEnd;
                    }
                }

                State::CDataSectionMaybeEnd => match c {
                    b']' => self.state = State::CDataSectionMaybeEnd2,
                    _ => {
                        handler.handle_element(&SaxElement::CDataSection("]"))?;
                        back = pos;
                        self.state = State::CDataSectionBody;
                    }
                },

                State::CDataSectionMaybeEnd2 => match c {
                    b'>' => {
                        back = pos + 1;
                        self.state = State::CData;
                    }
                    b']' => {
                        handler.handle_element(&SaxElement::CDataSection("]"))?;
                    }
                    _ => {
                        handler.handle_element(&SaxElement::CDataSection("]]"))?;
                        back = pos;
                        self.state = State::CDataSectionBody;
                    }
                },

                State::CommentStart => {
                    if c != b'-' {
                        xml_error!(COMMENT_MISSING_DASH);
                    }
                    self.state = State::CommentBody;
                }

                State::CommentBody => {
                    if c == b'-' {
                        self.state = State::CommentMaybeEnd;
                    }
                }

                State::CommentMaybeEnd => match c {
                    b'-' => self.state = State::CommentEnd,
                    _ => self.state = State::CommentBody,
                },

                State::CommentEnd => {
                    if c != b'>' {
                        xml_error!(COMMENT_MISSING_END);
                    }
                    back = pos + 1;
                    self.state = self.after_markup();
                }

                State::PI => match c {
                    b'?' => self.state = State::PIEnd,
                    _ => self.buffer.push(c),
                },

                State::PIEnd => match c {
                    b'>' => {
                        {
                            let s = as_str(&self.buffer)?;
                            handler.handle_element(&SaxElement::ProcessingInstruction(s))?;
                        }
                        self.buffer.clear();
                        back = pos + 1;
                        self.state = self.after_markup();
                    }
                    b'?' => self.buffer.push(b'?'),
                    _ => {
                        self.buffer.push(b'?');
                        self.buffer.push(c);
                        self.state = State::PI;
                    }
                },

                State::TagName => match c {
                    b'/' | b'>' | whitespace!() => {
                        if back < pos {
                            self.buffer.extend_from_slice(&bytes[back..pos]);
                        }
                        {
                            if self.buffer.is_empty() {
                                xml_error!(TAG_EMPTY_NAME);
                            }
                            let s = as_str(&self.buffer)?;
                            if self.is_end_tag {
                                if c == b'/' {
                                    xml_error!(TAG_DOUBLE_END);
                                }
                                handler.handle_element(&SaxElement::EndTag(s))?;
                            } else {
                                handler.handle_element(&SaxElement::StartTag(s))?;
                            }
                        }
                        self.buffer.clear();
                        match c {
                            b'/' => {
                                handler.handle_element(&SaxElement::EmptyElementTag)?;
                                self.state = State::EmptyTagEnd;
                            }
                            b'>' => {
                                if self.is_end_tag {
                                    self.close_tag()?;
                                }
                                back = pos + 1;
                            }
                            _ => {
                                if self.is_end_tag {
                                    self.state = State::EndTagWhitespace;
                                } else {
                                    self.state = State::AttributeWhitespace;
                                }
                            }
                        }
                        if c == b'>' && !self.is_end_tag {
                            self.state = State::CData;
                        }
                    }
                    _ => (),
                },

                State::EmptyTagEnd => match c {
                    b'>' => {
                        self.close_tag()?;
                        back = pos + 1;
                    }
                    _ => xml_error!(TAG_EMPTY_TAG_MISSING_END),
                },

                State::EndTagWhitespace => match c {
                    b'>' => {
                        self.close_tag()?;
                        back = pos + 1;
                    }
                    whitespace!() => (),
                    _ => xml_error!(TAG_END_TAG_ATTRIBUTES),
                },

                State::AttributeWhitespace => match c {
                    whitespace!() => (),
                    b'/' => {
                        handler.handle_element(&SaxElement::EmptyElementTag)?;
                        self.state = State::EmptyTagEnd;
                    }
                    b'>' => {
                        back = pos + 1;
                        self.state = State::CData;
                    }
                    _ => {
                        back = pos;
                        self.state = State::AttributeName;
                        redo = true;
                    }
                },

                State::AttributeName => match c {
                    b'=' | whitespace!() => {
                        if back < pos {
                            self.buffer.extend_from_slice(&bytes[back..pos]);
                        }
                        if c == b'=' {
                            self.state = State::AttributeValueStart;
                        } else {
                            self.state = State::AttributeEq;
                        }
                    }
                    b'/' | b'>' | b'<' => xml_error!(TAG_ATTRIBUTE_BAD_NAME),
                    _ => (),
                },

                State::AttributeEq => match c {
                    b'=' => self.state = State::AttributeValueStart,
                    whitespace!() => (),
                    _ => xml_error!(TAG_ATTRIBUTE_WITHOUT_EQUAL),
                },

                State::AttributeValueStart => match c {
                    b'"' | b'\'' => {
                        self.is_quot_value = c == b'\'';
                        self.value_pos = self.buffer.len();
                        back = pos + 1;
                        self.state = State::AttributeValue;
                    }
                    whitespace!() => (),
                    _ => xml_error!(TAG_ATTRIBUTE_WITHOUT_QUOTE),
                },

                State::AttributeValue => {
                    if (self.is_quot_value && c == b'\'') || (!self.is_quot_value && c == b'"') {
                        if back < pos {
                            self.buffer.extend_from_slice(&bytes[back..pos]);
                        }
                        {
                            let attr = as_str(&self.buffer[0..self.value_pos])?;
                            let value = as_str(&self.buffer[self.value_pos..])?;
                            handler.handle_element(&SaxElement::Attribute(attr, value))?;
                        }
                        self.buffer.clear();
                        self.state = State::AttributeWhitespace;
                    } else if c == b'&' {
                        if back < pos {
                            self.buffer.extend_from_slice(&bytes[back..pos]);
                        }
                        self.ref_buffer.clear();
                        self.is_value_ref = true;
                        self.state = State::Reference;
                    } else if c == b'<' {
                        xml_error!(TAG_ATTRIBUTE_BAD_VALUE);
                    }
                }

                State::CData => match c {
                    b'<' => {
                        if back < pos {
                            let s = as_str(&bytes[back..pos])?;
                            handler.handle_element(&SaxElement::CData(s))?;
                        }
                        back = pos + 1;
                        self.state = State::TagStart;
                    }
                    b'&' => {
                        if back < pos {
                            let s = as_str(&bytes[back..pos])?;
                            handler.handle_element(&SaxElement::CData(s))?;
                        }
                        self.ref_buffer.clear();
                        self.is_value_ref = false;
                        self.state = State::Reference;
                    }
                    _ => (),
                },

                State::Reference => match c {
                    b'#' => {
                        self.char_ref_value = 0;
                        self.state = State::CharReference;
                    }
                    b';' => xml_error!(REFERENCE_EMPTY),
                    _ => {
                        self.ref_buffer.push(c);
                        self.state = State::Entity;
                    }
                },

                State::Entity => match c {
                    b';' => {
                        let ent = match self.ref_buffer.as_slice() {
                            b"amp" => "&",
                            b"lt" => "<",
                            b"gt" => ">",
                            b"quot" => "\"",
                            b"apos" => "'",
                            _ => xml_error!(REFERENCE_CUSTOM_ENTITY),
                        };
                        back = pos + 1;
                        if self.is_value_ref {
                            self.buffer.extend_from_slice(ent.as_bytes());
                            self.state = State::AttributeValue;
                        } else {
                            self.state = State::CData;
                            handler.handle_element(&SaxElement::CData(ent))?;
                        }
                    }
                    _ => {
                        if self.ref_buffer.len() >= REF_BUFFER_SIZE {
                            xml_error!(REFERENCE_CUSTOM_ENTITY);
                        }
                        self.ref_buffer.push(c);
                    }
                },

                State::CharReference => match c {
                    b'x' => self.state = State::HexCharReference,
                    b'0'..=b'9' => {
                        self.char_ref_value = u32::from(c - b'0');
                        self.state = State::CharReferenceBody;
                    }
                    _ => xml_error!(REFERENCE_INVALID_DECIMAL),
                },

                State::CharReferenceBody => match c {
                    b';' => {
                        self.send_char_reference(handler, self.char_ref_value)?;
                        back = pos + 1;
                        self.state = self.after_reference();
                    }
                    b'0'..=b'9' => {
                        self.char_ref_value = self
                            .char_ref_value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(u32::from(c - b'0')))
                            .filter(|v| *v <= 0x10ffff)
                            .ok_or(SaxError::BadXml(description::REFERENCE_INVALID_DECIMAL))?;
                    }
                    _ => xml_error!(REFERENCE_INVALID_DECIMAL),
                },

                State::HexCharReference => match c {
                    b';' => {
                        self.send_char_reference(handler, self.char_ref_value)?;
                        back = pos + 1;
                        self.state = self.after_reference();
                    }
                    _ => {
                        let digit = match c {
                            b'0'..=b'9' => u32::from(c - b'0'),
                            b'a'..=b'f' => u32::from(c - b'a') + 10,
                            b'A'..=b'F' => u32::from(c - b'A') + 10,
                            _ => xml_error!(REFERENCE_INVALID_HEX),
                        };
                        self.char_ref_value = self
                            .char_ref_value
                            .checked_mul(16)
                            .and_then(|v| v.checked_add(digit))
                            .filter(|v| *v <= 0x10ffff)
                            .ok_or(SaxError::BadXml(description::REFERENCE_INVALID_HEX))?;
                    }
                },

                State::Epilog => match c {
                    b'<' => self.state = State::TagStart,
                    whitespace!() => (),
                    _ => xml_error!(DOC_CDATA_WITHOUT_PARENT),
                },
            }

            if !redo {
                pos += 1;
                self.location.advance(c);
            }
        }

        if back < pos {
            match self.state {
                State::TagName | State::AttributeName | State::AttributeValue => {
                    self.buffer.extend_from_slice(&bytes[back..pos]);
                }
                State::CData => {
                    let s = as_str(&bytes[back..pos])?;
                    handler.handle_element(&SaxElement::CData(s))?;
                }
                State::CDataSectionBody => {
                    let s = as_str(&bytes[back..pos])?;
                    handler.handle_element(&SaxElement::CDataSection(s))?;
                }
                _ => (),
            }
        }

        Ok(())
    }

    pub fn location(&self) -> Location {
        self.location
    }

    fn check_encoding(&mut self, c: u8) -> Result<(), SaxError> {
        if self.uni_left > 0 {
            if c & 0xc0 != 0x80 {
                xml_error!(UTF8_INVALID_CONT_BYTE);
            }
            self.uni_char <<= 6;
            self.uni_char += u32::from(c & 0x3f);
            self.uni_left -= 1;
            if self.uni_left == 0 {
                // Sequences longer than the actual character codepoint
                // size are security hazards.
                if (self.uni_len == 2 && self.uni_char <= 0x7f)
                    || (self.uni_len == 3 && self.uni_char <= 0x7ff)
                    || (self.uni_len == 4 && self.uni_char <= 0xffff)
                {
                    xml_error!(UTF8_OVERLONG_SEQUENCE);
                }
                if !is_valid_xml_char(self.uni_char) {
                    xml_error!(CHAR_INVALID);
                }
            }
        } else if c & 0x80 == 0x80 {
            if c & 0xe0 == 0xc0 {
                self.uni_len = 2;
                self.uni_left = 1;
                self.uni_char = u32::from(c & 0x1f);
            } else if c & 0xf0 == 0xe0 {
                self.uni_len = 3;
                self.uni_left = 2;
                self.uni_char = u32::from(c & 0x0f);
            } else if c & 0xf8 == 0xf0 {
                self.uni_len = 4;
                self.uni_left = 3;
                self.uni_char = u32::from(c & 0x07);
            } else {
                xml_error!(UTF8_INVALID_PREFIX_BYTE);
            }
        } else if c < 0x20 && (c != 0x09 && c != 0x0a && c != 0x0d) {
            xml_error!(CHAR_INVALID);
        }
        Ok(())
    }

    fn expect_markup(&mut self, c: u8, expected: u8, next: State) -> Result<(), SaxError> {
        if c != expected {
            xml_error!(MARKUP_DOCTYPE_BAD_START);
        }
        self.state = next;
        Ok(())
    }

    fn expect_cdata(&mut self, c: u8, expected: u8, next: State) -> Result<(), SaxError> {
        if c != expected {
            xml_error!(MARKUP_CDATA_SECTION_BAD_START);
        }
        self.state = next;
        Ok(())
    }

    fn close_tag(&mut self) -> Result<(), SaxError> {
        if self.depth == 0 {
            xml_error!(TAG_CLOSE_WITHOUT_OPEN);
        }
        self.depth -= 1;
        self.state = if self.depth == 0 {
            State::Epilog
        } else {
            State::CData
        };
        Ok(())
    }

    fn after_markup(&self) -> State {
        if self.depth > 0 {
            State::CData
        } else if self.seen_content {
            State::Epilog
        } else {
            State::Prolog
        }
    }

    fn after_reference(&self) -> State {
        if self.is_value_ref {
            State::AttributeValue
        } else {
            State::CData
        }
    }
}

impl Default for SaxParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
