//! Markup parsing into a nested element tree.
//!
//! Vote documents are small XML files. This module turns them into a tree
//! shaped like the upstream key/value format: a child name that occurs once
//! is stored as a bare element, a repeated name as a list. [`Node::items`]
//! flattens both shapes into a slice so callers never branch on shape.

use crate::error::MarkupError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use tracing::trace;

/// Children sharing one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    One(Element),
    Many(Vec<Element>),
}

impl Node {
    /// Uniform view over both shapes.
    pub fn items(&self) -> &[Element] {
        match self {
            Node::One(element) => std::slice::from_ref(element),
            Node::Many(elements) => elements,
        }
    }

    fn push(&mut self, element: Element) {
        *self = match std::mem::replace(self, Node::Many(Vec::new())) {
            Node::One(first) => Node::Many(vec![first, element]),
            Node::Many(mut elements) => {
                elements.push(element);
                Node::Many(elements)
            }
        };
    }
}

/// One element: attributes, text content and named children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    attrs: BTreeMap<String, String>,
    text: String,
    children: BTreeMap<String, Node>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Concatenated, whitespace-trimmed text content.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw child node under `name`, preserving its shape.
    #[allow(dead_code)] // Shape inspection; callers normally use `children`
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    /// All children called `name`; empty when there are none.
    pub fn children(&self, name: &str) -> &[Element] {
        self.children.get(name).map(Node::items).unwrap_or(&[])
    }

    /// First child called `name`.
    pub fn first(&self, name: &str) -> Option<&Element> {
        self.children(name).first()
    }

    /// Text of the first child called `name`.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.first(name).map(Element::text)
    }

    fn append_child(&mut self, name: String, element: Element) {
        match self.children.get_mut(&name) {
            Some(node) => node.push(element),
            None => {
                self.children.insert(name, Node::One(element));
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(text);
    }
}

/// A parsed document: the root element and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root_name: String,
    pub root: Element,
}

/// Parse document text, rejecting anything that is not well-formed.
pub fn parse(text: &str) -> Result<Document, MarkupError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<(String, Element)> = Vec::new();
    let mut root: Option<Document> = None;

    loop {
        let event = reader.read_event().map_err(|e| MarkupError::Malformed {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let (name, element) = open_element(&start, &reader)?;
                if stack.is_empty() && root.is_some() {
                    return Err(MarkupError::MultipleRoots(name));
                }
                stack.push((name, element));
            }
            Event::Empty(start) => {
                let (name, element) = open_element(&start, &reader)?;
                close_element(&mut stack, &mut root, name, element)?;
            }
            Event::End(_) => {
                // quick-xml has already checked that the end name matches.
                let (name, element) = stack.pop().ok_or_else(|| MarkupError::Malformed {
                    position: reader.buffer_position() as u64,
                    message: "unexpected closing tag".to_string(),
                })?;
                close_element(&mut stack, &mut root, name, element)?;
            }
            Event::Text(content) => {
                let content = content.unescape().map_err(|e| MarkupError::Malformed {
                    position: reader.buffer_position() as u64,
                    message: e.to_string(),
                })?;
                match stack.last_mut() {
                    Some((_, element)) => element.append_text(&content),
                    None if content.trim().is_empty() => {}
                    None => return Err(MarkupError::StrayText),
                }
            }
            Event::CData(content) => {
                let content = String::from_utf8_lossy(&content.into_inner()).into_owned();
                match stack.last_mut() {
                    Some((_, element)) => element.append_text(&content),
                    None => return Err(MarkupError::StrayText),
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some((name, _)) = stack.pop() {
        return Err(MarkupError::Unclosed(name));
    }

    let document = root.ok_or(MarkupError::Empty)?;
    trace!("Parsed document with root <{}>", document.root_name);
    Ok(document)
}

fn open_element(
    start: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<(String, Element), MarkupError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::default();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| MarkupError::Malformed {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| MarkupError::Malformed {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;
        element.attrs.insert(key, value.into_owned());
    }

    Ok((name, element))
}

fn close_element(
    stack: &mut [(String, Element)],
    root: &mut Option<Document>,
    name: String,
    element: Element,
) -> Result<(), MarkupError> {
    match stack.last_mut() {
        Some((_, parent)) => {
            parent.append_child(name, element);
            Ok(())
        }
        None if root.is_some() => Err(MarkupError::MultipleRoots(name)),
        None => {
            *root = Some(Document {
                root_name: name,
                root: element,
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_child_is_one() {
        let doc = parse("<a><b x=\"1\">hi</b></a>").unwrap();
        assert_eq!(doc.root_name, "a");
        assert!(matches!(doc.root.child("b"), Some(Node::One(_))));
        assert_eq!(doc.root.children("b").len(), 1);
        assert_eq!(doc.root.first("b").unwrap().attr("x"), Some("1"));
        assert_eq!(doc.root.child_text("b"), Some("hi"));
    }

    #[test]
    fn test_repeated_children_become_many() {
        let doc = parse("<a><b>1</b><c/><b>2</b><b>3</b></a>").unwrap();
        assert!(matches!(doc.root.child("b"), Some(Node::Many(_))));
        let texts: Vec<&str> = doc.root.children("b").iter().map(Element::text).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
        assert_eq!(doc.root.children("c").len(), 1);
        assert!(doc.root.children("missing").is_empty());
    }

    #[test]
    fn test_unescapes_text_and_attributes() {
        let doc = parse("<a t=\"x &amp; y\">&lt;ok&gt;<![CDATA[ raw ]]></a>").unwrap();
        assert_eq!(doc.root.attr("t"), Some("x & y"));
        assert_eq!(doc.root.text(), "<ok> raw");
    }

    #[test]
    fn test_declaration_and_comments_ignored() {
        let doc = parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- c --><a/>").unwrap();
        assert_eq!(doc.root_name, "a");
    }

    #[test]
    fn test_mismatched_tag_is_malformed() {
        let err = parse("<a><b></a></b>").unwrap_err();
        assert!(matches!(err, MarkupError::Malformed { .. }));
    }

    #[test]
    fn test_unclosed_root() {
        assert!(parse("<a><b>text</b>").is_err());
    }

    #[test]
    fn test_empty_and_stray_text() {
        assert_eq!(parse("").unwrap_err(), MarkupError::Empty);
        assert_eq!(parse("just text").unwrap_err(), MarkupError::StrayText);
    }

    #[test]
    fn test_multiple_roots() {
        assert_eq!(
            parse("<a/><b/>").unwrap_err(),
            MarkupError::MultipleRoots("b".to_string())
        );
    }
}
