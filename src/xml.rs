//! Forward-only XML tokenizer adapter.
//!
//! Row decoding only needs a handful of operations on a pull parser: advance
//! to the next element with a given name, walk the children of the current
//! element, collect the text of a subtree and skip a subtree without looking
//! inside it. [`EventSource`] is the narrow seam between those operations and
//! the actual tokenizer; [`QuickXmlSource`] backs it with quick-xml and a plain
//! `Vec<XmlEvent>` backs it in tests.

use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use std::io::BufRead;

/// A start tag with its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, without namespace prefix.
    pub name: String,
    /// Qualified name as written in the document.
    pub qname: String,
    /// Attributes in document order, keys as written (prefix included).
    pub attributes: Vec<(String, String)>,
}

impl Element {
    /// Create an element without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qname: name.clone(),
            name,
            attributes: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Look up an attribute value by its key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            qname: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
        })
    }
}

/// One token of a forward-only XML stream.
///
/// Self-closing tags are reported as a `Start` immediately followed by its
/// `End`. Whitespace is reported as `Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start of an element.
    Start(Element),
    /// Character data (text, whitespace or CDATA), unescaped.
    Text(String),
    /// End of an element, by local name.
    End(String),
    /// End of the document.
    Eof,
}

/// A pull-based source of XML events.
pub trait EventSource {
    /// Produce the next event. Once `Eof` is returned, every further call
    /// returns `Eof` again.
    fn next_event(&mut self) -> Result<XmlEvent>;

    /// Skip the remainder of `element`, whose `Start` was the last event
    /// returned, up to and including its matching `End`.
    fn skip_element(&mut self, _element: &Element) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                XmlEvent::Start(_) => depth += 1,
                XmlEvent::End(_) if depth == 0 => return Ok(()),
                XmlEvent::End(_) => depth -= 1,
                XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(unexpected_eof()),
            }
        }
    }
}

/// In-memory event stream, mostly useful for tests.
impl EventSource for std::vec::IntoIter<XmlEvent> {
    fn next_event(&mut self) -> Result<XmlEvent> {
        Ok(self.next().unwrap_or(XmlEvent::Eof))
    }
}

/// [`EventSource`] reading from a quick-xml pull parser.
pub struct QuickXmlSource<R> {
    reader: quick_xml::Reader<R>,
    buf: Vec<u8>,
}

impl<R: BufRead> QuickXmlSource<R> {
    /// Wrap a buffered reader positioned at the start of an XML document.
    pub fn new(inner: R) -> Self {
        let mut reader = quick_xml::Reader::from_reader(inner);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.trim_text(false);
        Self {
            reader,
            buf: Vec::new(),
        }
    }
}

impl<'a> QuickXmlSource<&'a [u8]> {
    /// Read events from an in-memory document.
    pub fn from_xml_str(xml: &'a str) -> Self {
        Self::new(xml.as_bytes())
    }
}

impl<R: BufRead> EventSource for QuickXmlSource<R> {
    fn next_event(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => return Ok(XmlEvent::Start(Element::from_start(&e)?)),
                Event::End(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    return Ok(XmlEvent::End(name));
                }
                Event::Text(e) => return Ok(XmlEvent::Text(e.unescape()?.into_owned())),
                Event::CData(e) => {
                    return Ok(XmlEvent::Text(String::from_utf8_lossy(&e).into_owned()))
                }
                Event::Eof => return Ok(XmlEvent::Eof),
                // declarations, comments, processing instructions
                _ => {}
            }
        }
    }

    fn skip_element(&mut self, element: &Element) -> Result<()> {
        self.buf.clear();
        self.reader
            .read_to_end_into(QName(element.qname.as_bytes()), &mut self.buf)?;
        Ok(())
    }
}

/// Depth-aware cursor over an [`EventSource`].
///
/// After [`next_child`](Self::next_child) or [`advance_to`](Self::advance_to)
/// returns an element, the caller must consume that element's subtree with
/// [`read_subtree_text`](Self::read_subtree_text),
/// [`skip_subtree`](Self::skip_subtree) or by walking its children until
/// `next_child` returns `None`.
pub struct XmlCursor<S> {
    source: S,
}

impl<S: EventSource> XmlCursor<S> {
    /// Wrap an event source.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Advance to the next start tag named `name`, at any depth.
    ///
    /// Returns `None` when the document ends first.
    pub fn advance_to(&mut self, name: &str) -> Result<Option<Element>> {
        loop {
            match self.source.next_event()? {
                XmlEvent::Start(e) if e.name == name => return Ok(Some(e)),
                XmlEvent::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Next child element of the current element.
    ///
    /// Text between children is ignored. Returns `None` once the current
    /// element's end tag has been consumed.
    pub fn next_child(&mut self) -> Result<Option<Element>> {
        loop {
            match self.source.next_event()? {
                XmlEvent::Start(e) => return Ok(Some(e)),
                XmlEvent::End(_) => return Ok(None),
                XmlEvent::Text(_) => {}
                XmlEvent::Eof => return Err(unexpected_eof()),
            }
        }
    }

    /// Concatenate every text fragment of the current element's subtree and
    /// consume its end tag. Nested elements contribute their text; siblings
    /// of the current element are never touched.
    pub fn read_subtree_text(&mut self) -> Result<String> {
        let mut depth = 0usize;
        let mut content = String::new();
        loop {
            match self.source.next_event()? {
                XmlEvent::Text(text) => content.push_str(&text),
                XmlEvent::Start(_) => depth += 1,
                XmlEvent::End(_) if depth == 0 => return Ok(content),
                XmlEvent::End(_) => depth -= 1,
                XmlEvent::Eof => return Err(unexpected_eof()),
            }
        }
    }

    /// Skip the rest of `element` without materializing its content.
    pub fn skip_subtree(&mut self, element: &Element) -> Result<()> {
        self.source.skip_element(element)
    }
}

fn unexpected_eof() -> Error {
    Error::MalformedDocument("unexpected end of document".to_string())
}
