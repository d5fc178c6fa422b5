/// Bookmark writer support for DOCX documents.
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use std::fmt::Write as FmtWrite;

/// A named location in a Word document.
///
/// Ids and names come from the document's identity registry, see
/// [`MutableDocument::bookmark`](super::MutableDocument::bookmark).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableBookmark {
    /// Bookmark ID
    id: u32,
    /// Bookmark name
    name: String,
}

impl MutableBookmark {
    pub(crate) fn new(id: u32, name: String) -> Self {
        Self { id, name }
    }

    /// Get the bookmark ID.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Get the bookmark name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn to_xml_start(&self, xml: &mut String) -> Result<()> {
        write!(
            xml,
            r#"<w:bookmarkStart w:id="{}" w:name="{}"/>"#,
            self.id,
            escape_xml(&self.name)
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))
    }
}
