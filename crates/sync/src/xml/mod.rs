//! Generic XML tree.
//!
//! Parses a document into nested [`XmlValue`]s the way loosely-typed XML
//! object mappers do:
//!
//! - an element with no child elements and no attributes becomes [`XmlValue::Text`]
//! - an element with children or attributes becomes [`XmlValue::Node`]
//! - repeated sibling elements with the same name become [`XmlValue::List`];
//!   a single sibling stays unwrapped
//!
//! The last rule makes the shape of a collection depend on its length. Callers
//! that expect a sequence must go through [`XmlValue::as_sequence`] or the
//! normalizer in [`stones`], never match on the raw shape.

pub mod stones;

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

pub use stones::{ExtractError, RawStone, extract_stones};

/// Errors that can occur while parsing a document.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The underlying reader rejected the markup.
    #[error("malformed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },

    /// The document ended with elements still open.
    #[error("unexpected end of document inside <{0}>")]
    Unclosed(String),

    /// The document had no root element.
    #[error("document has no root element")]
    NoRoot,

    /// Content followed the root element.
    #[error("unexpected second root element <{0}>")]
    MultipleRoots(String),
}

/// A parsed XML value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// Text content of a leaf element (empty for `<Leaf/>`).
    Text(String),
    /// An element with attributes or child elements.
    Node(XmlNode),
    /// Two or more same-named sibling elements, in document order.
    List(Vec<XmlValue>),
}

/// An element with attributes or child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub attributes: IndexMap<String, String>,
    pub children: IndexMap<String, XmlValue>,
    /// Text directly inside the element, if any.
    pub text: Option<String>,
}

impl XmlValue {
    /// Child element by name, if this is a node.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Node(node) => node.children.get(name),
            _ => None,
        }
    }

    /// Follow a path of element names.
    #[must_use]
    pub fn path(&self, names: &[&str]) -> Option<&Self> {
        names.iter().try_fold(self, |value, name| value.child(name))
    }

    /// Text content of a leaf, or of a node's own text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Node(node) => node.text.as_deref(),
            Self::List(_) => None,
        }
    }

    /// View this value as a sequence: a list yields its items, anything else
    /// yields itself once.
    #[must_use]
    pub fn as_sequence(&self) -> Vec<&Self> {
        match self {
            Self::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

/// An element still being read.
struct OpenElement {
    name: String,
    node: XmlNode,
    text: String,
}

impl OpenElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, String> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = IndexMap::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            if attr.key.as_namespace_binding().is_some() {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            attributes.insert(key, value.into_owned());
        }
        Ok(Self {
            name,
            node: XmlNode {
                attributes,
                ..XmlNode::default()
            },
            text: String::new(),
        })
    }

    fn finish(self) -> (String, XmlValue) {
        // Whitespace-only runs are layout, not content.
        let text = if self.text.trim().is_empty() {
            String::new()
        } else {
            self.text
        };
        let value = if self.node.children.is_empty() && self.node.attributes.is_empty() {
            XmlValue::Text(text)
        } else {
            XmlValue::Node(XmlNode {
                text: (!text.is_empty()).then_some(text),
                ..self.node
            })
        };
        (self.name, value)
    }
}

/// Add a finished child, collapsing repeats into a list.
fn insert_child(children: &mut IndexMap<String, XmlValue>, name: String, value: XmlValue) {
    match children.get_mut(&name) {
        Some(XmlValue::List(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::replace(existing, XmlValue::List(Vec::new()));
            *existing = XmlValue::List(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Parse a document into a node whose single child is the root element.
///
/// For `<Stock><Stone>..</Stone></Stock>` the result's `path(&["Stock", "Stone"])`
/// reaches the stone value(s).
///
/// # Errors
///
/// Returns `XmlError` if the markup is malformed, unbalanced, or has no root.
pub fn parse_document(xml: &str) -> Result<XmlValue, XmlError> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut document = XmlNode::default();

    let malformed = |reader: &Reader<&[u8]>, message: String| XmlError::Malformed {
        position: reader.buffer_position(),
        message,
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(&reader, e.to_string()))?;
        match event {
            Event::Start(start) => {
                if stack.is_empty() && !document.children.is_empty() {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                    return Err(XmlError::MultipleRoots(name));
                }
                let open = OpenElement::from_start(&start).map_err(|m| malformed(&reader, m))?;
                stack.push(open);
            }
            Event::Empty(start) => {
                let open = OpenElement::from_start(&start).map_err(|m| malformed(&reader, m))?;
                let (name, value) = open.finish();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.node.children, name, value),
                    None if document.children.is_empty() => {
                        insert_child(&mut document.children, name, value);
                    }
                    None => return Err(XmlError::MultipleRoots(name)),
                }
            }
            Event::End(_) => {
                let Some(open) = stack.pop() else {
                    return Err(malformed(&reader, "unmatched closing tag".to_string()));
                };
                let (name, value) = open.finish();
                match stack.last_mut() {
                    Some(parent) => insert_child(&mut parent.node.children, name, value),
                    None => insert_child(&mut document.children, name, value),
                }
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    let text = text
                        .unescape()
                        .map_err(|e| malformed(&reader, e.to_string()))?;
                    open.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    if document.children.is_empty() {
        return Err(XmlError::NoRoot);
    }
    Ok(XmlValue::Node(document))
}
