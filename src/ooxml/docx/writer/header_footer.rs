//! Header and footer parts.
//!
//! Every header or footer is a part of its own (`word/header{n}.xml`,
//! `word/footer{n}.xml`) with its own relationship table. Sections point at
//! them by part name; the `r:id` written into `w:sectPr` is looked up in the
//! document's relationship table when the section is emitted.

use super::doc::{DocumentBody, write_root_start};
use super::{EmitContext, NodeVisitor, NoteIds};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::content_type;
use crate::ooxml::opc::{PackURI, RelType, Relationships};
use std::fmt::Write as FmtWrite;

/// Header or footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderFooterKind {
    Header,
    Footer,
}

impl HeaderFooterKind {
    /// Root element local name.
    pub(crate) fn root(&self) -> &'static str {
        match self {
            Self::Header => "hdr",
            Self::Footer => "ftr",
        }
    }

    /// Reference element local name inside `w:sectPr`.
    pub(crate) fn reference(&self) -> &'static str {
        match self {
            Self::Header => "headerReference",
            Self::Footer => "footerReference",
        }
    }

    /// File name stem: `header` or `footer`.
    pub(crate) fn stem(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Footer => "footer",
        }
    }

    pub(crate) fn content_type(&self) -> &'static str {
        match self {
            Self::Header => content_type::WML_HEADER,
            Self::Footer => content_type::WML_FOOTER,
        }
    }

    pub(crate) fn reltype(&self) -> RelType {
        match self {
            Self::Header => RelType::Header,
            Self::Footer => RelType::Footer,
        }
    }
}

/// Which pages of a section a header or footer applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeaderFooterType {
    #[default]
    Default,
    First,
    Even,
}

impl HeaderFooterType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::First => "first",
            Self::Even => "even",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "first" => Some(Self::First),
            "even" => Some(Self::Even),
            _ => None,
        }
    }
}

/// A header or footer part.
#[derive(Debug, Clone)]
pub struct HeaderFooter {
    pub(crate) kind: HeaderFooterKind,
    pub(crate) partname: PackURI,
    pub(crate) content: DocumentBody,
    pub(crate) rels: Relationships,
    /// Root start tag as read from the package
    pub(crate) root: Option<String>,
}

impl HeaderFooter {
    pub(crate) fn new(kind: HeaderFooterKind, partname: PackURI) -> Self {
        Self {
            kind,
            rels: Relationships::new(partname.as_str()),
            partname,
            content: DocumentBody::default(),
            root: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> HeaderFooterKind {
        self.kind
    }

    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    pub fn content(&self) -> &DocumentBody {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut DocumentBody {
        &mut self.content
    }

    /// Add a paragraph to this header or footer.
    pub fn add_paragraph(&mut self) -> &mut super::MutableParagraph {
        self.content.add_paragraph()
    }

    pub fn add_paragraph_with_text(&mut self, text: &str) -> &mut super::MutableParagraph {
        self.content.add_paragraph_with_text(text)
    }

    pub fn relationships(&self) -> &Relationships {
        &self.rels
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    pub(crate) fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        self.content.walk(visitor)
    }

    pub(crate) fn to_xml(&self, notes: &NoteIds) -> Result<String> {
        let ctx = EmitContext::new(&self.rels, notes);
        let mut xml = String::with_capacity(1024);

        write_root_start(&mut xml, self.root.as_deref(), self.kind.root());
        self.content.to_xml(&mut xml, &ctx)?;
        // A header or footer needs at least one paragraph
        if self.content.needs_trailing_paragraph() {
            xml.push_str("<w:p/>");
        }
        write!(xml, "</w:{}>", self.kind.root()).map_err(|e| OoxmlError::Xml(e.to_string()))?;

        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_xml() {
        let mut header = HeaderFooter::new(
            HeaderFooterKind::Header,
            PackURI::from_membername("word/header1.xml"),
        );
        header.add_paragraph_with_text("Running head");
        assert_eq!(header.relationships().source(), "/word/header1.xml");

        let xml = header.to_xml(&NoteIds::default()).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(xml.contains("<w:hdr xmlns:w="));
        assert!(xml.contains(">Running head</w:t>"));
        assert!(xml.ends_with("</w:p></w:hdr>"));
    }

    #[test]
    fn test_empty_footer_gets_paragraph() {
        let footer = HeaderFooter::new(
            HeaderFooterKind::Footer,
            PackURI::from_membername("word/footer1.xml"),
        );
        let xml = footer.to_xml(&NoteIds::default()).unwrap();
        assert!(xml.ends_with("<w:p/></w:ftr>"));
    }

    #[test]
    fn test_type_names() {
        for slot in [
            HeaderFooterType::Default,
            HeaderFooterType::First,
            HeaderFooterType::Even,
        ] {
            assert_eq!(HeaderFooterType::parse(slot.as_str()), Some(slot));
        }
        assert_eq!(HeaderFooterType::parse("odd"), None);
        assert_eq!(HeaderFooterKind::Footer.reference(), "footerReference");
    }
}
