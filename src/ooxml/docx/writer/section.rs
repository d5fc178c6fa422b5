/// Section properties: page setup and header/footer references.
use super::EmitContext;
use super::header_footer::{HeaderFooterKind, HeaderFooterType};
use super::order::{PropChild, SECTPR_ORDER, emit_ordered};
use super::preserved::RawXml;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::PackURI;
use std::fmt::Write as FmtWrite;

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl PageOrientation {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            _ => None,
        }
    }
}

/// A header or footer attached to a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionReference {
    pub kind: HeaderFooterKind,
    pub slot: HeaderFooterType,
    /// Part name of the referenced header or footer
    pub partname: PackURI,
}

/// Section properties including page setup and margins.
#[derive(Debug, Clone)]
pub struct SectionProperties {
    /// Page width in twips (twentieth of a point, 1440 = 1 inch)
    pub page_width: u32,
    /// Page height in twips
    pub page_height: u32,
    /// Page orientation
    pub orientation: PageOrientation,
    /// Top margin in twips; negative values let text overlap the header
    pub margin_top: i32,
    /// Bottom margin in twips
    pub margin_bottom: i32,
    /// Left margin in twips
    pub margin_left: u32,
    /// Right margin in twips
    pub margin_right: u32,
    /// Header distance from top in twips
    pub header_distance: u32,
    /// Footer distance from bottom in twips
    pub footer_distance: u32,
    pub gutter: u32,
    /// Different first page; implied when a first-page header or footer exists
    pub title_page: Option<bool>,
    pub(crate) references: Vec<SectionReference>,
    pub(crate) preserved: Vec<RawXml>,
}

impl Default for SectionProperties {
    fn default() -> Self {
        // US Letter size: 8.5" x 11" = 12240 x 15840 twips
        Self {
            page_width: 12240,
            page_height: 15840,
            orientation: PageOrientation::Portrait,
            margin_top: 1440,     // 1 inch
            margin_bottom: 1440,  // 1 inch
            margin_left: 1440,    // 1 inch
            margin_right: 1440,   // 1 inch
            header_distance: 720, // 0.5 inch
            footer_distance: 720, // 0.5 inch
            gutter: 0,
            title_page: None,
            references: Vec::new(),
            preserved: Vec::new(),
        }
    }
}

impl SectionProperties {
    /// Create A4 page size (210mm x 297mm).
    pub fn a4() -> Self {
        Self {
            page_width: 11906,  // 210mm = 8.27 inches
            page_height: 16838, // 297mm = 11.69 inches
            ..Default::default()
        }
    }

    /// Create US Letter page size (8.5" x 11").
    pub fn letter() -> Self {
        Self::default()
    }

    /// Set page to landscape orientation.
    pub fn landscape(mut self) -> Self {
        if self.orientation == PageOrientation::Portrait {
            self.orientation = PageOrientation::Landscape;
            std::mem::swap(&mut self.page_width, &mut self.page_height);
        }
        self
    }

    /// Set margins (all in inches).
    pub fn margins(mut self, top: f64, bottom: f64, left: f64, right: f64) -> Self {
        self.margin_top = (top * 1440.0) as i32;
        self.margin_bottom = (bottom * 1440.0) as i32;
        self.margin_left = (left * 1440.0) as u32;
        self.margin_right = (right * 1440.0) as u32;
        self
    }

    pub fn references(&self) -> &[SectionReference] {
        &self.references
    }

    /// The part referenced for `kind` and `slot`, if any.
    pub fn reference(&self, kind: HeaderFooterKind, slot: HeaderFooterType) -> Option<&PackURI> {
        self.references
            .iter()
            .find(|r| r.kind == kind && r.slot == slot)
            .map(|r| &r.partname)
    }

    /// Point `slot` of `kind` at a part, replacing an earlier reference.
    pub(crate) fn set_reference(
        &mut self,
        kind: HeaderFooterKind,
        slot: HeaderFooterType,
        partname: PackURI,
    ) {
        match self
            .references
            .iter_mut()
            .find(|r| r.kind == kind && r.slot == slot)
        {
            Some(existing) => existing.partname = partname,
            None => self.references.push(SectionReference {
                kind,
                slot,
                partname,
            }),
        }
    }

    fn has_preserved(&self, local: &str) -> bool {
        self.preserved.iter().any(|raw| raw.local_name() == local)
    }

    fn known_children(&self, ctx: &EmitContext<'_>) -> Result<Vec<PropChild>> {
        let mut children = Vec::new();
        let rels = ctx.rels();
        let source = PackURI::new(rels.source()).map_err(OoxmlError::InvalidFormat)?;

        for reference in &self.references {
            let target = reference.partname.relative_ref(source.base_uri());
            let rel = rels
                .find(&reference.kind.reltype(), &target)
                .ok_or_else(|| OoxmlError::UnresolvedReference {
                    part: rels.source().to_string(),
                    id: reference.partname.to_string(),
                })?;
            children.push(PropChild::new(
                reference.kind.reference(),
                format!(
                    r#"<w:{} w:type="{}" r:id="{}"/>"#,
                    reference.kind.reference(),
                    reference.slot.as_str(),
                    rel.r_id()
                ),
            ));
        }

        if !self.has_preserved("pgSz") {
            let mut xml = String::with_capacity(64);
            write!(
                xml,
                r#"<w:pgSz w:w="{}" w:h="{}""#,
                self.page_width, self.page_height
            )
            .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            if self.orientation == PageOrientation::Landscape {
                write!(xml, r#" w:orient="{}""#, self.orientation.as_str())
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            xml.push_str("/>");
            children.push(PropChild::new("pgSz", xml));
        }

        if !self.has_preserved("pgMar") {
            children.push(PropChild::new(
                "pgMar",
                format!(
                    r#"<w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="{}" w:footer="{}" w:gutter="{}"/>"#,
                    self.margin_top,
                    self.margin_right,
                    self.margin_bottom,
                    self.margin_left,
                    self.header_distance,
                    self.footer_distance,
                    self.gutter
                ),
            ));
        }

        let has_first = self
            .references
            .iter()
            .any(|r| r.slot == HeaderFooterType::First);
        match self.title_page.or(has_first.then_some(true)) {
            Some(true) => children.push(PropChild::new("titlePg", "<w:titlePg/>")),
            Some(false) => children.push(PropChild::new("titlePg", r#"<w:titlePg w:val="0"/>"#)),
            None => {},
        }

        Ok(children)
    }

    /// Serialize as `<w:sectPr>`. Every header or footer reference must have a
    /// relationship in the owning part's table.
    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        ctx.check_refs(&self.preserved)?;
        let known = self.known_children(ctx)?;
        emit_ordered(xml, "sectPr", SECTPR_ORDER, &known, &self.preserved);
        Ok(())
    }
}
