//! Owned XML tree for project descriptors.
//!
//! The descriptor is small (a few hundred elements), so it is read fully into
//! an owned tree, patched in place and written back with
//! [`crate::cproject::writer`]. Attribute order is preserved so untouched
//! elements come out the way the IDE wrote them.
//!
//! Processing instructions in front of the root element (the
//! `<?fileVersion 4.0.0?>` marker) are kept in [`Document::prolog`]; the XML
//! declaration and any doctype are dropped and regenerated on output.
//!
//! Whitespace-only text between elements is dropped, since the writer
//! re-indents. Other text is kept as is. Line breaks are normalised to `\n`
//! in the tree and the file's original style is kept in
//! [`Document::line_ending`].

use indexmap::IndexMap;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors that can occur while parsing XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The reader rejected the input.
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// The file is not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// End of input reached with open elements.
    #[error("element <{name}> is never closed")]
    Unclosed {
        /// Name of the innermost open element.
        name: String,
    },

    /// The document contains no element at all.
    #[error("document has no root element")]
    MissingRoot,

    /// Text or a second element found outside the root element.
    #[error("unexpected content outside the root element")]
    ContentOutsideRoot,
}

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Child element.
    Element(Element),
    /// Unescaped character data.
    Text(String),
    /// `<![CDATA[...]]>` section content.
    CData(String),
    /// Raw comment content.
    Comment(String),
    /// Processing instruction content (without `<?` and `?>`).
    Instruction(String),
}

/// An XML element with ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element name, including any namespace prefix.
    pub name: String,
    /// Unescaped attribute values in document order.
    pub attributes: IndexMap<String, String>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element with no attributes or children.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Returns `true` if the element has the given name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns `true` if the attribute is present, whatever its value.
    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Sets an attribute. Existing attributes keep their position; new ones
    /// are appended.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Appends a child element.
    pub fn push_element(&mut self, element: Self) {
        self.children.push(Node::Element(element));
    }

    /// Iterates over child elements.
    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &Self> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Iterates mutably over child elements.
    pub fn elements_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut Self> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Removes child elements for which `keep` returns `false`. Other nodes
    /// are left alone.
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&Self) -> bool) {
        self.children.retain(|node| match node {
            Node::Element(e) => keep(e),
            _ => true,
        });
    }

    /// Iterates over all descendant elements in document order.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.elements().rev().collect(),
        }
    }

    /// Returns the first descendant matching `pred`, in document order.
    pub fn find(&self, pred: impl Fn(&Self) -> bool) -> Option<&Self> {
        self.descendants().find(|e| pred(e))
    }

    /// Mutable counterpart of [`Element::find`].
    pub fn find_mut(&mut self, pred: impl Fn(&Self) -> bool) -> Option<&mut Self> {
        self.find_mut_by(&pred)
    }

    fn find_mut_by(&mut self, pred: &dyn Fn(&Self) -> bool) -> Option<&mut Self> {
        for child in self.elements_mut() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_mut_by(pred) {
                return Some(found);
            }
        }
        None
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()));
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            element.attributes.insert(key, value);
        }
        Ok(element)
    }
}

/// Pre-order iterator over descendant elements.
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.elements().rev());
        Some(element)
    }
}

/// Line break style of a descriptor file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`, as written by the IDE on Windows.
    CrLf,
}

impl LineEnding {
    /// Detects the style of `text`: CRLF if any `\r\n` occurs.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            Self::CrLf
        } else {
            Self::Lf
        }
    }

    /// The line break sequence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Processing instructions found before the root element.
    pub prolog: Vec<String>,
    /// The root element.
    pub root: Element,
    /// Line breaks to use when writing the document back.
    pub line_ending: LineEnding,
}

impl Document {
    /// Creates a document around a root element.
    #[must_use]
    pub const fn new(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            line_ending: LineEnding::Lf,
        }
    }

    /// Parses a document from UTF-8 bytes, skipping a leading byte order mark.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not UTF-8 or not well-formed XML.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, XmlError> {
        let text = String::from_utf8(bytes)?;
        Self::parse(text.strip_prefix('\u{feff}').unwrap_or(&text))
    }

    /// Parses a document from a string.
    ///
    /// Whitespace-only text between elements is dropped; the writer
    /// re-indents on output. Any other text keeps its leading and trailing
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not well-formed XML.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let line_ending = LineEnding::detect(xml);
        let mut reader = Reader::from_str(xml);

        let mut prolog = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => stack.push(Element::from_start(e)?),
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::ContentOutsideRoot)?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::Empty(ref e) => {
                    let element = Element::from_start(e)?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::Text(ref e) => {
                    let raw = normalize_line_breaks(&String::from_utf8_lossy(e));
                    if raw.trim().is_empty() {
                        continue;
                    }
                    let text = unescape(&raw).map_err(quick_xml::Error::from)?.into_owned();
                    attach(&mut stack, &mut root, Node::Text(text))?;
                }
                Event::CData(ref e) => {
                    let text = normalize_line_breaks(&String::from_utf8_lossy(e));
                    attach(&mut stack, &mut root, Node::CData(text))?;
                }
                Event::Comment(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        let comment = normalize_line_breaks(&String::from_utf8_lossy(e));
                        parent.children.push(Node::Comment(comment));
                    }
                }
                Event::PI(ref e) => {
                    let instruction = normalize_line_breaks(&String::from_utf8_lossy(e));
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Instruction(instruction));
                    } else if root.is_none() {
                        prolog.push(instruction);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::Unclosed { name: open.name });
        }
        let root = root.ok_or(XmlError::MissingRoot)?;
        Ok(Self {
            prolog,
            root,
            line_ending,
        })
    }
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n")
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, node: Node) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        Node::Element(element) if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        _ => Err(XmlError::ContentOutsideRoot),
    }
}
