/// Paragraph types and implementation for DOCX documents.
use super::bookmark::MutableBookmark;
use super::drawing::Drawing;
use super::hyperlink::MutableHyperlink;
use super::note::NoteKind;
use super::order::{PPR_ORDER, PropChild, emit_ordered};
use super::preserved::{PreservedAttrs, RawXml};
use super::run::MutableRun;
use super::{EmitContext, NodeVisitor};
use crate::common::xml::escape_xml;
use crate::ooxml::docx::image::ImageResource;
use crate::ooxml::error::{OoxmlError, Result};
use std::fmt::Write as FmtWrite;

// Import shared format types
pub use super::super::format::{LineSpacing, ParagraphAlignment};

/// Paragraph element (run, hyperlink, drawing, ...).
#[derive(Debug, Clone)]
pub enum ParagraphElement {
    Run(MutableRun),
    Hyperlink(MutableHyperlink),
    Drawing(Drawing),
    BookmarkStart(MutableBookmark),
    /// End of the bookmark with this id
    BookmarkEnd(u32),
    /// Markup kept verbatim from a parsed part
    Preserved(RawXml),
}

/// Numbering properties for list paragraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NumberingProperties {
    pub(crate) num_id: u32,
    pub(crate) ilvl: u32,
}

/// Paragraph properties.
#[derive(Debug, Default, Clone)]
pub(crate) struct ParagraphProperties {
    pub(crate) style: Option<String>,
    pub(crate) keep_next: Option<bool>,
    pub(crate) page_break_before: Option<bool>,
    pub(crate) numbering: Option<NumberingProperties>,
    /// Spacing in twips
    pub(crate) space_before: Option<u32>,
    pub(crate) space_after: Option<u32>,
    pub(crate) line_spacing: Option<LineSpacing>,
    /// Indentation in twips
    pub(crate) indent_left: Option<i32>,
    pub(crate) indent_right: Option<i32>,
    /// Negative values are a hanging indent
    pub(crate) indent_first_line: Option<i32>,
    pub(crate) alignment: Option<ParagraphAlignment>,
    pub(crate) preserved: Vec<RawXml>,
}

impl ParagraphProperties {
    fn known_children(&self) -> Result<Vec<PropChild>> {
        let mut children = Vec::new();

        if let Some(ref style) = self.style {
            children.push(PropChild::new(
                "pStyle",
                format!("<w:pStyle w:val=\"{}\"/>", escape_xml(style)),
            ));
        }
        for (local, value) in [
            ("keepNext", self.keep_next),
            ("pageBreakBefore", self.page_break_before),
        ] {
            match value {
                Some(true) => children.push(PropChild::new(local, format!("<w:{}/>", local))),
                Some(false) => {
                    children.push(PropChild::new(local, format!("<w:{} w:val=\"0\"/>", local)))
                },
                None => {},
            }
        }
        if let Some(numbering) = self.numbering {
            children.push(PropChild::new(
                "numPr",
                format!(
                    "<w:numPr><w:ilvl w:val=\"{}\"/><w:numId w:val=\"{}\"/></w:numPr>",
                    numbering.ilvl, numbering.num_id
                ),
            ));
        }

        if self.space_before.is_some() || self.space_after.is_some() || self.line_spacing.is_some()
        {
            let mut spacing = String::from("<w:spacing");
            if let Some(before) = self.space_before {
                write!(spacing, " w:before=\"{}\"", before)
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            if let Some(after) = self.space_after {
                write!(spacing, " w:after=\"{}\"", after)
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            if let Some(line_spacing) = self.line_spacing {
                let (line, rule) = line_spacing.to_attrs();
                write!(spacing, " w:line=\"{}\" w:lineRule=\"{}\"", line, rule)
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            spacing.push_str("/>");
            children.push(PropChild::new("spacing", spacing));
        }

        if self.indent_left.is_some()
            || self.indent_right.is_some()
            || self.indent_first_line.is_some()
        {
            let mut ind = String::from("<w:ind");
            if let Some(left) = self.indent_left {
                write!(ind, " w:left=\"{}\"", left).map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            if let Some(right) = self.indent_right {
                write!(ind, " w:right=\"{}\"", right)
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            if let Some(first_line) = self.indent_first_line {
                if first_line >= 0 {
                    write!(ind, " w:firstLine=\"{}\"", first_line)
                        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                } else {
                    write!(ind, " w:hanging=\"{}\"", -first_line)
                        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                }
            }
            ind.push_str("/>");
            children.push(PropChild::new("ind", ind));
        }

        if let Some(alignment) = self.alignment {
            children.push(PropChild::new(
                "jc",
                format!("<w:jc w:val=\"{}\"/>", alignment.as_str()),
            ));
        }

        Ok(children)
    }
}

/// A mutable paragraph.
#[derive(Debug, Clone, Default)]
pub struct MutableParagraph {
    /// Paragraph content in order
    pub(crate) elements: Vec<ParagraphElement>,
    /// Paragraph properties
    pub(crate) properties: ParagraphProperties,
    pub(crate) attrs: PreservedAttrs,
}

impl MutableParagraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a new run to the paragraph.
    pub fn add_run(&mut self) -> &mut MutableRun {
        self.elements.push(ParagraphElement::Run(MutableRun::new()));
        match self.elements.last_mut() {
            Some(ParagraphElement::Run(r)) => r,
            _ => unreachable!(),
        }
    }

    /// Add a run with text.
    pub fn add_run_with_text(&mut self, text: &str) -> &mut MutableRun {
        let run = self.add_run();
        run.set_text(text);
        run
    }

    /// Add a hyperlink to an external URL.
    pub fn add_hyperlink(&mut self, url: &str, text: &str) -> &mut MutableHyperlink {
        self.push_hyperlink(MutableHyperlink::external(url, text))
    }

    /// Add a hyperlink to a bookmark in this document.
    pub fn add_internal_link(&mut self, anchor: &str, text: &str) -> &mut MutableHyperlink {
        self.push_hyperlink(MutableHyperlink::internal(anchor, text))
    }

    fn push_hyperlink(&mut self, link: MutableHyperlink) -> &mut MutableHyperlink {
        self.elements.push(ParagraphElement::Hyperlink(link));
        match self.elements.last_mut() {
            Some(ParagraphElement::Hyperlink(h)) => h,
            _ => unreachable!(),
        }
    }

    /// Add an image. Its relationship is registered when the document is staged.
    pub fn add_image(&mut self, image: ImageResource) -> &mut Drawing {
        self.elements.push(ParagraphElement::Drawing(Drawing::new(image)));
        match self.elements.last_mut() {
            Some(ParagraphElement::Drawing(d)) => d,
            _ => unreachable!(),
        }
    }

    /// Add a run holding a footnote or endnote reference mark.
    pub fn add_note_reference(&mut self, kind: NoteKind, id: i32) -> &mut MutableRun {
        let run = self.add_run();
        run.style(kind.reference_style());
        match kind {
            NoteKind::Footnote => run.add_footnote_reference(id),
            NoteKind::Endnote => run.add_endnote_reference(id),
        };
        run
    }

    /// Mark the start of a bookmark allocated by the document.
    pub fn add_bookmark_start(&mut self, bookmark: &MutableBookmark) {
        self.elements
            .push(ParagraphElement::BookmarkStart(bookmark.clone()));
    }

    pub fn add_bookmark_end(&mut self, bookmark: &MutableBookmark) {
        self.elements
            .push(ParagraphElement::BookmarkEnd(bookmark.id()));
    }

    /// Set the paragraph style.
    pub fn set_style(&mut self, style_id: &str) {
        self.properties.style = Some(style_id.to_string());
    }

    pub fn style(&self) -> Option<&str> {
        self.properties.style.as_deref()
    }

    /// Set paragraph alignment.
    pub fn set_alignment(&mut self, alignment: ParagraphAlignment) {
        self.properties.alignment = Some(alignment);
    }

    pub fn alignment(&self) -> Option<ParagraphAlignment> {
        self.properties.alignment
    }

    /// Set spacing before this paragraph (in points).
    pub fn set_space_before(&mut self, points: f64) {
        self.properties.space_before = Some((points * 20.0) as u32);
    }

    /// Set spacing after this paragraph (in points).
    pub fn set_space_after(&mut self, points: f64) {
        self.properties.space_after = Some((points * 20.0) as u32);
    }

    /// Set line spacing for this paragraph.
    pub fn set_line_spacing(&mut self, spacing: LineSpacing) {
        self.properties.line_spacing = Some(spacing);
    }

    /// Set left indentation (in inches).
    pub fn set_indent_left(&mut self, inches: f64) {
        self.properties.indent_left = Some((inches * 1440.0) as i32);
    }

    /// Set right indentation (in inches).
    pub fn set_indent_right(&mut self, inches: f64) {
        self.properties.indent_right = Some((inches * 1440.0) as i32);
    }

    /// Set first line indentation (in inches). Negative values hang.
    pub fn set_indent_first_line(&mut self, inches: f64) {
        self.properties.indent_first_line = Some((inches * 1440.0) as i32);
    }

    /// Make this paragraph a list item of numbering definition `num_id`.
    pub fn set_numbering(&mut self, num_id: u32, level: u32) {
        self.properties.numbering = Some(NumberingProperties {
            num_id,
            ilvl: level,
        });
    }

    pub fn set_keep_with_next(&mut self, keep: bool) {
        self.properties.keep_next = Some(keep);
    }

    pub fn set_page_break_before(&mut self, page_break: bool) {
        self.properties.page_break_before = Some(page_break);
    }

    pub fn elements(&self) -> &[ParagraphElement] {
        &self.elements
    }

    /// Get the number of elements.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Text of runs and hyperlinks.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for element in &self.elements {
            match element {
                ParagraphElement::Run(run) => text.push_str(&run.text()),
                ParagraphElement::Hyperlink(link) => text.push_str(&link.text()),
                _ => {},
            }
        }
        text
    }

    /// Drawings in this paragraph.
    pub fn drawings(&self) -> impl Iterator<Item = &Drawing> {
        self.elements.iter().filter_map(|e| match e {
            ParagraphElement::Drawing(d) => Some(d),
            _ => None,
        })
    }

    pub fn hyperlinks(&self) -> impl Iterator<Item = &MutableHyperlink> {
        self.elements.iter().filter_map(|e| match e {
            ParagraphElement::Hyperlink(h) => Some(h),
            _ => None,
        })
    }

    /// Clear all elements from the paragraph.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub(crate) fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        for element in &mut self.elements {
            match element {
                ParagraphElement::Drawing(drawing) => visitor.drawing(drawing)?,
                ParagraphElement::Hyperlink(link) => visitor.hyperlink(link)?,
                ParagraphElement::Preserved(raw) => visitor.preserved(raw)?,
                _ => {},
            }
        }
        for raw in &self.properties.preserved {
            visitor.preserved(raw)?;
        }
        Ok(())
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        self.attrs.open_tag(xml, "w:p");

        ctx.check_refs(&self.properties.preserved)?;
        emit_ordered(
            xml,
            "pPr",
            PPR_ORDER,
            &self.properties.known_children()?,
            &self.properties.preserved,
        );

        for element in &self.elements {
            match element {
                ParagraphElement::Run(run) => run.to_xml(xml, ctx)?,
                ParagraphElement::Hyperlink(link) => link.to_xml(xml, ctx)?,
                ParagraphElement::Drawing(drawing) => drawing.to_xml(xml, ctx)?,
                ParagraphElement::BookmarkStart(bookmark) => bookmark.to_xml_start(xml)?,
                ParagraphElement::BookmarkEnd(id) => {
                    write!(xml, r#"<w:bookmarkEnd w:id="{}"/>"#, id)
                        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                },
                ParagraphElement::Preserved(raw) => ctx.emit_preserved(raw, xml)?,
            }
        }

        xml.push_str("</w:p>");
        Ok(())
    }
}
