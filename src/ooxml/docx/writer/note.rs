//! Footnotes and endnotes parts.
//!
//! Each notes part owns its own relationship table, so images and links inside
//! notes resolve against `word/_rels/footnotes.xml.rels` (or endnotes).
//! Separator notes are kept verbatim; a new part gets the usual pair with ids
//! -1 and 0.

use super::doc::{DocumentBody, write_root_start};
use super::preserved::RawXml;
use super::{EmitContext, NoteIds, NodeVisitor};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type, part_name};
use crate::ooxml::opc::{PackURI, RelType, Relationships};
use std::fmt::Write as FmtWrite;

/// Footnote or endnote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteKind {
    Footnote,
    Endnote,
}

impl NoteKind {
    /// Local name of a single note element.
    pub fn element(&self) -> &'static str {
        match self {
            Self::Footnote => "footnote",
            Self::Endnote => "endnote",
        }
    }

    /// Local name of the part's root element.
    pub(crate) fn root(&self) -> &'static str {
        match self {
            Self::Footnote => "footnotes",
            Self::Endnote => "endnotes",
        }
    }

    pub(crate) fn default_partname(&self) -> &'static str {
        match self {
            Self::Footnote => part_name::FOOTNOTES,
            Self::Endnote => part_name::ENDNOTES,
        }
    }

    pub(crate) fn content_type(&self) -> &'static str {
        match self {
            Self::Footnote => content_type::WML_FOOTNOTES,
            Self::Endnote => content_type::WML_ENDNOTES,
        }
    }

    pub(crate) fn reltype(&self) -> RelType {
        match self {
            Self::Footnote => RelType::Footnotes,
            Self::Endnote => RelType::Endnotes,
        }
    }

    /// Character style of the reference mark in the body.
    pub(crate) fn reference_style(&self) -> &'static str {
        match self {
            Self::Footnote => "FootnoteReference",
            Self::Endnote => "EndnoteReference",
        }
    }
}

/// Footnote or endnote entry.
#[derive(Debug, Clone)]
pub struct Note {
    /// Note ID, referenced from `w:footnoteReference` / `w:endnoteReference`
    pub(crate) id: i32,
    /// Note content
    pub(crate) content: DocumentBody,
}

impl Note {
    pub(crate) fn new(id: i32) -> Self {
        Self {
            id,
            content: DocumentBody::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Add a paragraph to this note.
    pub fn add_paragraph(&mut self) -> &mut super::MutableParagraph {
        self.content.add_paragraph()
    }

    /// Add a paragraph with text to this note.
    pub fn add_paragraph_with_text(&mut self, text: &str) -> &mut super::MutableParagraph {
        self.content.add_paragraph_with_text(text)
    }

    pub fn content(&self) -> &DocumentBody {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut DocumentBody {
        &mut self.content
    }

    pub fn text(&self) -> String {
        self.content.text()
    }
}

/// A footnotes or endnotes part.
#[derive(Debug, Clone)]
pub struct NotesPart {
    pub(crate) kind: NoteKind,
    pub(crate) partname: PackURI,
    /// Separator and other special notes, kept verbatim ahead of the notes
    pub(crate) separators: Vec<RawXml>,
    pub(crate) notes: Vec<Note>,
    pub(crate) rels: Relationships,
    /// Root start tag as read from the package
    pub(crate) root: Option<String>,
}

impl NotesPart {
    pub(crate) fn new(kind: NoteKind) -> Self {
        let partname = PackURI::from_membername(kind.default_partname());
        Self {
            kind,
            rels: Relationships::new(partname.as_str()),
            partname,
            separators: Vec::new(),
            notes: Vec::new(),
            root: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> NoteKind {
        self.kind
    }

    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    /// Append a note with the next free id (never below 1).
    pub(crate) fn add_note(&mut self) -> &mut Note {
        let id = self
            .notes
            .iter()
            .map(|note| note.id)
            .max()
            .unwrap_or(0)
            .max(0)
            + 1;
        self.notes.push(Note::new(id));
        match self.notes.last_mut() {
            Some(note) => note,
            None => unreachable!(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn note(&mut self, id: i32) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == id)
    }

    pub fn relationships(&self) -> &Relationships {
        &self.rels
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.notes.iter().map(|note| note.id)
    }

    pub(crate) fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        for raw in &self.separators {
            visitor.preserved(raw)?;
        }
        for note in &mut self.notes {
            note.content.walk(visitor)?;
        }
        Ok(())
    }

    pub(crate) fn to_xml(&self, notes: &NoteIds) -> Result<String> {
        let ctx = EmitContext::new(&self.rels, notes);
        let element = self.kind.element();
        let mut xml = String::with_capacity(2048);

        write_root_start(&mut xml, self.root.as_deref(), self.kind.root());

        if self.separators.is_empty() {
            write!(
                xml,
                r#"<w:{0} w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:{0}>"#,
                element
            )
            .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            write!(
                xml,
                r#"<w:{0} w:type="continuationSeparator" w:id="0"><w:p><w:r><w:continuationSeparator/></w:r></w:p></w:{0}>"#,
                element
            )
            .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        } else {
            for raw in &self.separators {
                ctx.emit_preserved(raw, &mut xml)?;
            }
        }

        for note in &self.notes {
            write!(xml, r#"<w:{} w:id="{}">"#, element, note.id)
                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            note.content.to_xml(&mut xml, &ctx)?;
            if note.content.is_empty() {
                xml.push_str("<w:p/>");
            }
            write!(xml, "</w:{}>", element).map_err(|e| OoxmlError::Xml(e.to_string()))?;
        }

        write!(xml, "</w:{}>", self.kind.root()).map_err(|e| OoxmlError::Xml(e.to_string()))?;
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_ids_start_at_one() {
        let mut part = NotesPart::new(NoteKind::Footnote);
        assert_eq!(part.add_note().id(), 1);
        assert_eq!(part.add_note().id(), 2);
        part.note(2).unwrap().add_paragraph_with_text("second");
        assert_eq!(part.notes()[1].text(), "second");
        assert!(part.note(3).is_none());
    }

    #[test]
    fn test_new_part_gets_separators() {
        let mut part = NotesPart::new(NoteKind::Endnote);
        part.add_note().add_paragraph_with_text("See also");

        let xml = part.to_xml(&NoteIds::default()).unwrap();
        assert!(xml.contains(r#"<w:endnotes xmlns:w="#));
        assert!(xml.contains(r#"<w:endnote w:type="separator" w:id="-1">"#));
        assert!(xml.contains(r#"<w:endnote w:type="continuationSeparator" w:id="0">"#));
        assert!(xml.contains(r#"<w:endnote w:id="1"><w:p>"#));
        assert!(xml.ends_with("</w:endnote></w:endnotes>"));
    }

    #[test]
    fn test_kept_separators_replace_defaults() {
        let mut part = NotesPart::new(NoteKind::Footnote);
        part.separators.push(RawXml::new(
            "w:footnote",
            r#"<w:footnote w:type="separator" w:id="0"><w:p/></w:footnote>"#,
        ));
        part.add_note();

        let xml = part.to_xml(&NoteIds::default()).unwrap();
        assert_eq!(xml.matches(r#"w:type="separator""#).count(), 1);
        assert!(xml.contains(r#"<w:footnote w:id="1"><w:p/></w:footnote>"#));
    }
}
