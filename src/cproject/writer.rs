//! Project descriptor XML writer.
//!
//! STM32CubeIDE writes `.cproject` files through the Java XML transformer.
//! The output here follows that layout as closely as a generic writer allows:
//!
//! - UTF-8 without byte order mark
//! - two-space indentation, attributes kept on the element line
//! - childless elements written self-closing
//! - newlines and tabs inside attribute values written as character references
//! - `<?xml version="1.0" encoding="UTF-8" standalone="no"?>` declaration
//! - `<?fileVersion 4.0.0?>` directly in front of the root start tag
//!
//! The last two are added by [`apply_prolog_fixup`] after serialisation,
//! because the writer would put the instruction on a line of its own.
//!
//! Line breaks follow [`Document::line_ending`], so a descriptor saved with
//! CRLF keeps CRLF.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::document::{Document, Element, LineEnding, Node};

/// XML declaration written at the top of every descriptor.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#;

/// Instruction content used when the source document had no prolog.
pub const DEFAULT_FILE_VERSION: &str = "fileVersion 4.0.0";

const INDENT_SIZE: usize = 2;

/// Errors that can occur during descriptor writing.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("XML writing error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Serialises a document, including the declaration and prolog fixup.
///
/// # Errors
///
/// Returns an error if the underlying writer fails.
pub fn to_xml_string(document: &Document) -> Result<String, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT_SIZE);
    write_element(&mut writer, &document.root)?;

    let body = String::from_utf8_lossy(&writer.into_inner()).to_string();
    let xml = apply_prolog_fixup(&body, &document.prolog);
    Ok(match document.line_ending {
        LineEnding::Lf => xml,
        LineEnding::CrLf => xml.replace('\n', LineEnding::CrLf.as_str()),
    })
}

/// Prepends the XML declaration and the prolog instructions to a serialised
/// root element.
///
/// The instructions are placed on the declaration's following line, directly
/// in front of the root start tag. An empty prolog gets
/// [`DEFAULT_FILE_VERSION`].
#[must_use]
pub fn apply_prolog_fixup(body: &str, prolog: &[String]) -> String {
    let mut xml = String::with_capacity(XML_DECLARATION.len() + body.len() + 32);
    xml.push_str(XML_DECLARATION);
    xml.push('\n');
    if prolog.is_empty() {
        push_instruction(&mut xml, DEFAULT_FILE_VERSION);
    }
    for instruction in prolog {
        push_instruction(&mut xml, instruction);
    }
    xml.push_str(body.trim_start());
    xml
}

fn push_instruction(xml: &mut String, instruction: &str) {
    xml.push_str("<?");
    xml.push_str(instruction);
    xml.push_str("?>");
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<(), WriteError> {
    let attributes: Vec<(&str, String)> = element
        .attributes
        .iter()
        .map(|(key, value)| (key.as_str(), escape_attribute(value)))
        .collect();

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &attributes {
        // Values are already escaped; the byte form is pushed as-is.
        start.push_attribute((key.as_bytes(), value.as_bytes()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(writer, e)?,
            Node::Text(text) => {
                writer.write_event(Event::Text(BytesText::from_escaped(escape_text(text))))?;
            }
            Node::CData(text) => {
                writer.write_event(Event::CData(BytesCData::new(text.as_str())))?;
            }
            Node::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            Node::Instruction(text) => {
                writer.write_event(Event::PI(BytesPI::new(text.as_str())))?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
