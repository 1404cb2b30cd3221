// Copyright (c) 2026 - present Selene Contributors
// SPDX-License-Identifier: MIT

//! Minimal XML element tree
//!
//! Report documents are read once with `quick-xml` into an owned [`Element`]
//! tree. Only element names, attributes and nesting are kept; text content,
//! comments and processing instructions carry nothing the normalizers use.
//!
//! # Example
//!
//! ```
//! use selene_reports::xml::Element;
//!
//! let root = Element::parse(r#"<robot><suite name="Root"/></robot>"#).unwrap();
//! assert_eq!(root.name(), "robot");
//! assert_eq!(root.find("suite").and_then(|s| s.attr("name")), Some("Root"));
//! ```

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::ReportError;

/// Deepest element nesting [`Element::parse`] accepts
///
/// The tree and the normalizers that walk it are recursive, so nesting is
/// bounded to keep deep documents from exhausting the stack.
pub const MAX_DEPTH: usize = 256;

/// An XML element with its attributes and child elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
}

impl Element {
    /// Create an element with no attributes or children
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Append a child element
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Parse a complete XML document and return its root element
    ///
    /// # Errors
    ///
    /// Returns `ReportError::Xml` if the document is not well-formed, or
    /// `ReportError::MalformedDocument` if it has no root, several roots,
    /// unclosed elements, or elements nested deeper than [`MAX_DEPTH`].
    pub fn parse(xml: &str) -> Result<Self, ReportError> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    if open.len() >= MAX_DEPTH {
                        return Err(ReportError::MalformedDocument {
                            message: format!("elements nested deeper than {MAX_DEPTH} levels"),
                        });
                    }
                    open.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = open.pop().ok_or_else(|| ReportError::MalformedDocument {
                        message: "closing tag without a matching opening tag".to_string(),
                    })?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(ReportError::MalformedDocument {
                message: format!("unclosed element <{}>", unclosed.name),
            });
        }

        root.ok_or_else(|| ReportError::MalformedDocument {
            message: "document has no root element".to_string(),
        })
    }

    /// Parse raw report bytes, which must be UTF-8
    ///
    /// # Errors
    ///
    /// Returns `ReportError::MalformedDocument` for non-UTF-8 input, otherwise
    /// the same errors as [`Element::parse`].
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ReportError> {
        let xml = std::str::from_utf8(bytes).map_err(|e| ReportError::MalformedDocument {
            message: format!("document is not valid UTF-8: {e}"),
        })?;
        Self::parse(xml)
    }

    /// Element tag name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an attribute, if present
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Direct child elements in document order
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given tag
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == tag)
    }

    /// All direct children with the given tag, in document order
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == tag)
    }

    /// Whether any direct child has the given tag
    #[must_use]
    pub fn has_child(&self, tag: &str) -> bool {
        self.find(tag).is_some()
    }

    /// Pre-order walk over this element and every descendant
    #[must_use]
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Document-order iterator returned by [`Element::iter`]
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, ReportError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ReportError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(ReportError::MalformedDocument {
            message: format!("second root element <{}>", element.name),
        }),
    }
}
