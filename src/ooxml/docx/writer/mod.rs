//! Mutable document writer components for DOCX.
//!
//! Serialization runs in two phases. Staging walks every part in document
//! order, registers relationships for nodes that have none yet, names media
//! parts and sweeps `wp:docPr` ids. Emission is then a pure function of the
//! tree and the relationship tables: any id that fails to resolve aborts the
//! pass with [`OoxmlError::UnresolvedReference`].

pub mod bookmark;
pub mod content_control;
pub mod doc;
pub mod drawing;
pub mod header_footer;
pub mod hyperlink;
pub mod ids;
pub mod note;
pub(crate) mod order;
pub mod paragraph;
pub mod preserved;
pub mod run;
pub mod section;
pub mod table;

use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::{Relationship, Relationships};
use std::collections::HashSet;

// Re-export main document type
pub use doc::{BodyElement, DocumentBody, MutableDocument};

pub use bookmark::MutableBookmark;
pub use content_control::{ContentControlType, MutableContentControl};
pub use drawing::Drawing;
pub use header_footer::{HeaderFooter, HeaderFooterKind, HeaderFooterType};
pub use hyperlink::{HyperlinkTarget, MutableHyperlink};
pub use ids::IdentityRegistry;
pub use note::{Note, NoteKind, NotesPart};
pub use paragraph::{MutableParagraph, ParagraphElement};
pub use preserved::RawXml;
pub use run::{MutableRun, RunContent, RunProperties, VerticalPosition};
pub use section::{PageOrientation, SectionProperties, SectionReference};
pub use table::{
    CellProperties, MutableCell, MutableRow, MutableTable, TableBorder, TableBorders, TableWidth,
};

/// Note ids that exist in the footnotes and endnotes parts.
#[derive(Debug, Default, Clone)]
pub(crate) struct NoteIds {
    pub(crate) footnotes: HashSet<i32>,
    pub(crate) endnotes: HashSet<i32>,
}

/// What emission needs besides the node itself: the owning part's
/// relationship table and the set of existing notes.
pub(crate) struct EmitContext<'a> {
    rels: &'a Relationships,
    notes: &'a NoteIds,
}

impl<'a> EmitContext<'a> {
    pub(crate) fn new(rels: &'a Relationships, notes: &'a NoteIds) -> Self {
        Self { rels, notes }
    }

    #[inline]
    pub(crate) fn rels(&self) -> &'a Relationships {
        self.rels
    }

    pub(crate) fn resolve(&self, r_id: &str) -> Result<&'a Relationship> {
        Ok(self.rels.resolve(r_id)?)
    }

    pub(crate) fn check_note(&self, kind: NoteKind, id: i32) -> Result<()> {
        let ids = match kind {
            NoteKind::Footnote => &self.notes.footnotes,
            NoteKind::Endnote => &self.notes.endnotes,
        };
        if ids.contains(&id) {
            Ok(())
        } else {
            Err(OoxmlError::UnresolvedReference {
                part: self.rels.source().to_string(),
                id: format!("{} {}", kind.element(), id),
            })
        }
    }

    /// Splice preserved markup after checking its relationship references.
    pub(crate) fn emit_preserved(&self, raw: &RawXml, xml: &mut String) -> Result<()> {
        self.check_refs(std::slice::from_ref(raw))?;
        raw.to_xml(xml);
        Ok(())
    }

    /// Resolve every relationship id referenced by preserved markup.
    pub(crate) fn check_refs(&self, raws: &[RawXml]) -> Result<()> {
        for raw in raws {
            for r_id in raw.referenced_ids() {
                self.resolve(r_id)?;
            }
        }
        Ok(())
    }
}

/// Mutable access to the nodes staging cares about, in document order.
pub(crate) trait NodeVisitor {
    fn drawing(&mut self, _drawing: &mut Drawing) -> Result<()> {
        Ok(())
    }

    fn hyperlink(&mut self, _link: &mut MutableHyperlink) -> Result<()> {
        Ok(())
    }

    fn preserved(&mut self, _raw: &RawXml) -> Result<()> {
        Ok(())
    }
}
