//! Element tree over a part's XML that remembers where each element came from.
//!
//! Every [`XmlElement`] records its byte range in the source text, so anything
//! the typed model does not understand can be cut out verbatim as a
//! [`RawXml`] and written back unchanged.

use crate::common::xml::{resolve_reference, unescape_xml};
use crate::ooxml::docx::writer::RawXml;
use crate::ooxml::docx::writer::preserved::PreservedAttrs;
use crate::ooxml::error::{OoxmlError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::ops::Range;

#[derive(Debug, Clone)]
pub(crate) struct XmlElement {
    /// Qualified name, e.g. `w:p`
    pub(crate) name: String,
    attrs: Vec<(String, String)>,
    pub(crate) children: Vec<XmlElement>,
    /// Character data directly inside this element, unescaped
    pub(crate) text: String,
    span: Range<usize>,
    /// End of the start tag (equal to `span.end` for empty elements)
    start_tag_end: usize,
}

impl XmlElement {
    fn open(e: &BytesStart<'_>, start: usize, start_tag_end: usize) -> Self {
        let attrs = e
            .attributes()
            .flatten()
            .map(|a| {
                (
                    String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                    unescape_xml(&String::from_utf8_lossy(&a.value)),
                )
            })
            .collect();
        Self {
            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
            attrs,
            children: Vec::new(),
            text: String::new(),
            span: start..start_tag_end,
            start_tag_end,
        }
    }

    /// Local part of the element name.
    pub(crate) fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    #[inline]
    pub(crate) fn is(&self, qname: &str) -> bool {
        self.name == qname
    }

    /// Attribute value by qualified name.
    pub(crate) fn attr(&self, qname: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == qname)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|(key, _)| key.as_str())
    }

    /// Whether every attribute is one of `allowed`.
    pub(crate) fn attrs_within(&self, allowed: &[&str]) -> bool {
        self.attr_names().all(|name| allowed.contains(&name))
    }

    /// Like [`attrs_within`](Self::attrs_within), ignoring namespace declarations.
    pub(crate) fn attrs_within_ns(&self, allowed: &[&str]) -> bool {
        self.attr_names()
            .all(|name| is_namespace_decl(name) || allowed.contains(&name))
    }

    /// Whether the attributes, namespace declarations aside, are exactly `expected`.
    pub(crate) fn has_exact_attrs(&self, expected: &[(&str, &str)]) -> bool {
        self.attr_names().filter(|name| !is_namespace_decl(name)).count() == expected.len()
            && expected
                .iter()
                .all(|(name, value)| self.attr(name) == Some(*value))
    }

    /// An empty element with exactly `expected` attributes.
    pub(crate) fn is_exactly(&self, expected: &[(&str, &str)]) -> bool {
        self.children.is_empty() && self.text.trim().is_empty() && self.has_exact_attrs(expected)
    }

    /// An empty element whose attributes are all among `allowed`.
    pub(crate) fn is_exactly_within(&self, allowed: &[&str]) -> bool {
        self.children.is_empty() && self.text.trim().is_empty() && self.attrs_within_ns(allowed)
    }

    /// All attributes, in source order, for writing back unchanged.
    pub(crate) fn preserved_attrs(&self) -> PreservedAttrs {
        PreservedAttrs::new(self.attrs.clone())
    }

    /// Parse an attribute, `None` when missing or malformed.
    pub(crate) fn parse_attr<T: std::str::FromStr>(&self, qname: &str) -> Option<T> {
        self.attr(qname)?.parse().ok()
    }

    /// OOXML on/off value of `w:val`; a bare element means on.
    pub(crate) fn on_off(&self) -> bool {
        !matches!(self.attr("w:val"), Some("0" | "false" | "off"))
    }

    pub(crate) fn child(&self, qname: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.is(qname))
    }

    /// The exact source text of this element.
    pub(crate) fn raw_text<'s>(&self, src: &'s str) -> &'s str {
        src.get(self.span.clone()).unwrap_or_default()
    }

    /// The element as preserved markup.
    pub(crate) fn to_raw(&self, src: &str) -> RawXml {
        RawXml::new(self.name.clone(), self.raw_text(src))
    }

    /// Just the start tag, e.g. the root tag with its namespace declarations.
    pub(crate) fn start_tag<'s>(&self, src: &'s str) -> &'s str {
        src.get(self.span.start..self.start_tag_end)
            .unwrap_or_default()
    }

    /// Every descendant in document order, depth first.
    pub(crate) fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        let mut stack: Vec<&XmlElement> = self.children.iter().rev().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }
}

fn is_namespace_decl(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// Parse a part into its root element.
pub(crate) fn parse(xml: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| OoxmlError::Xml(format!("at byte {}: {}", start, e)))?;
        let end = reader.buffer_position() as usize;

        let finished = match event {
            Event::Start(e) => {
                stack.push(XmlElement::open(&e, start, end));
                None
            },
            Event::Empty(e) => Some(XmlElement::open(&e, start, end)),
            Event::End(_) => {
                let mut el = stack
                    .pop()
                    .ok_or_else(|| OoxmlError::Xml(format!("unbalanced end tag at byte {}", start)))?;
                el.span.end = end;
                Some(el)
            },
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescape_xml(&String::from_utf8_lossy(&t)));
                }
                None
            },
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
                None
            },
            Event::GeneralRef(r) => {
                if let Some(top) = stack.last_mut() {
                    let name = String::from_utf8_lossy(&r);
                    match resolve_reference(&name) {
                        Some(c) => top.text.push(c),
                        None => {
                            top.text.push('&');
                            top.text.push_str(&name);
                            top.text.push(';');
                        },
                    }
                }
                None
            },
            Event::Eof => break,
            _ => None,
        };

        if let Some(el) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(el),
                None if root.is_none() => root = Some(el),
                None => {},
            }
        }
    }

    if !stack.is_empty() {
        return Err(OoxmlError::Xml("unexpected end of document".to_string()));
    }
    root.ok_or_else(|| OoxmlError::Xml("document has no root element".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve">A &amp; B</w:t></w:r></w:p><w:proofErr   w:type="gramEnd" /></w:body></w:document>"#;

    #[test]
    fn test_tree_and_text() {
        let root = parse(SRC).unwrap();
        assert_eq!(root.local_name(), "document");
        assert_eq!(root.start_tag(SRC), r#"<w:document xmlns:w="urn:w">"#);

        let body = root.child("w:body").unwrap();
        assert_eq!(body.children.len(), 2);
        let t = &body.children[0].children[0].children[0];
        assert_eq!(t.text, "A & B");
        assert_eq!(t.attr("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_raw_span_is_verbatim() {
        let root = parse(SRC).unwrap();
        let body = root.child("w:body").unwrap();
        assert_eq!(
            body.children[1].raw_text(SRC),
            r#"<w:proofErr   w:type="gramEnd" />"#
        );
        assert_eq!(
            body.children[0].raw_text(SRC),
            r#"<w:p><w:r><w:t xml:space="preserve">A &amp; B</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = parse(SRC).unwrap();
        let names: Vec<&str> = root.descendants().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w:body", "w:p", "w:r", "w:t", "w:proofErr"]);
    }

    #[test]
    fn test_attribute_character_references() {
        let src = r#"<wp:docPr id="1" descr="line1&#xA;line2 &amp;&#x26;"/>"#;
        let root = parse(src).unwrap();
        assert_eq!(root.attr("descr"), Some("line1\nline2 &&"));
    }

    #[test]
    fn test_exact_attributes_ignore_declarations() {
        let root = parse(r#"<a:graphicData xmlns:a="urn:a" uri="urn:pic"><x/></a:graphicData>"#).unwrap();
        assert!(root.has_exact_attrs(&[("uri", "urn:pic")]));
        assert!(!root.has_exact_attrs(&[]));
        assert!(!root.is_exactly(&[("uri", "urn:pic")]));
        assert!(root.attrs_within_ns(&["uri"]));
        assert!(!root.attrs_within(&["uri"]));
        assert!(root.children[0].is_exactly(&[]));
    }

    #[test]
    fn test_unbalanced_is_error() {
        assert!(parse("<a><b></a>").is_err());
        assert!(parse("<a>").is_err());
    }

    #[test]
    fn test_on_off() {
        let root = parse(r#"<w:rPr><w:b/><w:i w:val="0"/></w:rPr>"#).unwrap();
        assert!(root.children[0].on_off());
        assert!(!root.children[1].on_off());
    }
}
