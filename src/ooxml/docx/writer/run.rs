/// Run types and implementation for DOCX documents.
use super::EmitContext;
use super::note::NoteKind;
use super::order::{PropChild, RPR_ORDER, emit_ordered};
use super::preserved::{PreservedAttrs, RawXml};
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use std::fmt::Write as FmtWrite;

// Import shared format types
pub use super::super::format::UnderlineStyle;

/// Run content type.
#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    /// Plain text
    Text(String),
    /// Tab character
    Tab,
    /// Line break
    Break,
    /// Page break
    PageBreak,
    /// Footnote reference
    FootnoteReference(i32),
    /// Endnote reference
    EndnoteReference(i32),
}

/// Vertical position of run text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalPosition {
    Superscript,
    Subscript,
    Baseline,
}

impl VerticalPosition {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Superscript => "superscript",
            Self::Subscript => "subscript",
            Self::Baseline => "baseline",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "superscript" => Some(Self::Superscript),
            "subscript" => Some(Self::Subscript),
            "baseline" => Some(Self::Baseline),
            _ => None,
        }
    }
}

/// A mutable run.
///
/// Runs contain text and character formatting.
#[derive(Debug, Clone, Default)]
pub struct MutableRun {
    /// Run content, in order
    pub(crate) content: Vec<RunContent>,
    /// Run properties
    pub(crate) properties: RunProperties,
    pub(crate) attrs: PreservedAttrs,
}

impl MutableRun {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_text(text: &str) -> Self {
        let mut run = Self::new();
        run.set_text(text);
        run
    }

    /// Replace the content with a single text item.
    pub fn set_text(&mut self, text: &str) {
        self.content.clear();
        self.content.push(RunContent::Text(text.to_string()));
    }

    /// Concatenated text of the run.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for item in &self.content {
            match item {
                RunContent::Text(s) => text.push_str(s),
                RunContent::Tab => text.push('\t'),
                RunContent::Break => text.push('\n'),
                _ => {},
            }
        }
        text
    }

    pub fn content(&self) -> &[RunContent] {
        &self.content
    }

    pub fn properties(&self) -> &RunProperties {
        &self.properties
    }

    /// Make the text bold.
    pub fn bold(&mut self, bold: bool) -> &mut Self {
        self.properties.bold = Some(bold);
        self
    }

    /// Make the text italic.
    pub fn italic(&mut self, italic: bool) -> &mut Self {
        self.properties.italic = Some(italic);
        self
    }

    /// Set underline style.
    pub fn underline(&mut self, style: UnderlineStyle) -> &mut Self {
        self.properties.underline = Some(style);
        self
    }

    /// Set font size in half-points (e.g., 24 = 12pt).
    pub fn font_size(&mut self, size: u32) -> &mut Self {
        self.properties.font_size = Some(size);
        self
    }

    /// Set font name.
    pub fn font_name(&mut self, name: &str) -> &mut Self {
        self.properties.font_name = Some(name.to_string());
        self
    }

    /// Set text color (hex RGB, e.g., "FF0000" for red).
    pub fn color(&mut self, color: &str) -> &mut Self {
        self.properties.color = Some(color.to_string());
        self
    }

    /// Set highlight color (e.g., "yellow").
    pub fn highlight(&mut self, color: &str) -> &mut Self {
        self.properties.highlight = Some(color.to_string());
        self
    }

    /// Set the character style.
    pub fn style(&mut self, style_id: &str) -> &mut Self {
        self.properties.style = Some(style_id.to_string());
        self
    }

    pub fn strike(&mut self, strike: bool) -> &mut Self {
        self.properties.strike = Some(strike);
        self
    }

    pub fn vertical_position(&mut self, position: VerticalPosition) -> &mut Self {
        self.properties.vertical = Some(position);
        self
    }

    pub fn add_text(&mut self, text: &str) -> &mut Self {
        self.content.push(RunContent::Text(text.to_string()));
        self
    }

    /// Add a line break.
    pub fn add_break(&mut self) -> &mut Self {
        self.content.push(RunContent::Break);
        self
    }

    /// Add a page break.
    pub fn add_page_break(&mut self) -> &mut Self {
        self.content.push(RunContent::PageBreak);
        self
    }

    /// Add a tab character.
    pub fn add_tab(&mut self) -> &mut Self {
        self.content.push(RunContent::Tab);
        self
    }

    /// Add a footnote reference mark.
    pub fn add_footnote_reference(&mut self, id: i32) -> &mut Self {
        self.content.push(RunContent::FootnoteReference(id));
        self
    }

    /// Add an endnote reference mark.
    pub fn add_endnote_reference(&mut self, id: i32) -> &mut Self {
        self.content.push(RunContent::EndnoteReference(id));
        self
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        self.attrs.open_tag(xml, "w:r");
        self.properties.to_xml(xml)?;

        for item in &self.content {
            match item {
                RunContent::Text(text) if !text.is_empty() => {
                    write!(xml, "<w:t xml:space=\"preserve\">{}</w:t>", escape_xml(text))
                        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                },
                RunContent::Text(_) => {},
                RunContent::Tab => xml.push_str("<w:tab/>"),
                RunContent::Break => xml.push_str("<w:br/>"),
                RunContent::PageBreak => xml.push_str("<w:br w:type=\"page\"/>"),
                RunContent::FootnoteReference(id) => {
                    ctx.check_note(NoteKind::Footnote, *id)?;
                    write!(xml, "<w:footnoteReference w:id=\"{}\"/>", id)
                        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                },
                RunContent::EndnoteReference(id) => {
                    ctx.check_note(NoteKind::Endnote, *id)?;
                    write!(xml, "<w:endnoteReference w:id=\"{}\"/>", id)
                        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                },
            }
        }

        xml.push_str("</w:r>");
        Ok(())
    }
}

/// Run properties (formatting).
#[derive(Debug, Default, Clone)]
pub struct RunProperties {
    pub(crate) style: Option<String>,
    pub(crate) bold: Option<bool>,
    pub(crate) italic: Option<bool>,
    pub(crate) strike: Option<bool>,
    pub(crate) underline: Option<UnderlineStyle>,
    /// Font size in half-points
    pub(crate) font_size: Option<u32>,
    pub(crate) font_name: Option<String>,
    pub(crate) color: Option<String>,
    pub(crate) highlight: Option<String>,
    pub(crate) vertical: Option<VerticalPosition>,
    /// Children this model does not interpret, kept from parsing
    pub(crate) preserved: Vec<RawXml>,
}

impl RunProperties {
    pub fn bold(&self) -> Option<bool> {
        self.bold
    }

    pub fn italic(&self) -> Option<bool> {
        self.italic
    }

    pub fn font_size(&self) -> Option<u32> {
        self.font_size
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.known_children().is_empty() && self.preserved.is_empty()
    }

    fn known_children(&self) -> Vec<PropChild> {
        let mut children = Vec::new();

        if let Some(ref style) = self.style {
            children.push(PropChild::new(
                "rStyle",
                format!("<w:rStyle w:val=\"{}\"/>", escape_xml(style)),
            ));
        }
        if let Some(ref font_name) = self.font_name {
            let name = escape_xml(font_name);
            children.push(PropChild::new(
                "rFonts",
                format!("<w:rFonts w:ascii=\"{}\" w:hAnsi=\"{}\"/>", name, name),
            ));
        }
        for (local, value) in [("b", self.bold), ("i", self.italic), ("strike", self.strike)] {
            match value {
                Some(true) => children.push(PropChild::new(local, format!("<w:{}/>", local))),
                Some(false) => {
                    children.push(PropChild::new(local, format!("<w:{} w:val=\"0\"/>", local)))
                },
                None => {},
            }
        }
        if let Some(ref color) = self.color {
            children.push(PropChild::new(
                "color",
                format!("<w:color w:val=\"{}\"/>", escape_xml(color)),
            ));
        }
        if let Some(size) = self.font_size {
            children.push(PropChild::new("sz", format!("<w:sz w:val=\"{}\"/>", size)));
        }
        if let Some(ref highlight) = self.highlight {
            children.push(PropChild::new(
                "highlight",
                format!("<w:highlight w:val=\"{}\"/>", escape_xml(highlight)),
            ));
        }
        if let Some(underline) = self.underline {
            children.push(PropChild::new(
                "u",
                format!("<w:u w:val=\"{}\"/>", underline.as_str()),
            ));
        }
        if let Some(vertical) = self.vertical {
            children.push(PropChild::new(
                "vertAlign",
                format!("<w:vertAlign w:val=\"{}\"/>", vertical.as_str()),
            ));
        }

        children
    }

    pub(crate) fn to_xml(&self, xml: &mut String) -> Result<()> {
        emit_ordered(xml, "rPr", RPR_ORDER, &self.known_children(), &self.preserved);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::writer::NoteIds;
    use crate::ooxml::opc::Relationships;

    fn emit(run: &MutableRun) -> Result<String> {
        let rels = Relationships::new("/word/document.xml");
        let mut notes = NoteIds::default();
        notes.footnotes.insert(1);
        let ctx = EmitContext::new(&rels, &notes);
        let mut xml = String::new();
        run.to_xml(&mut xml, &ctx)?;
        Ok(xml)
    }

    #[test]
    fn test_property_order_is_schema_order() {
        let mut run = MutableRun::with_text("x");
        run.underline(UnderlineStyle::Single)
            .font_size(28)
            .color("FF0000")
            .bold(true)
            .font_name("Arial")
            .style("Emphasis");
        let xml = emit(&run).unwrap();
        assert_eq!(
            xml,
            "<w:r><w:rPr><w:rStyle w:val=\"Emphasis\"/><w:rFonts w:ascii=\"Arial\" w:hAnsi=\"Arial\"/>\
             <w:b/><w:color w:val=\"FF0000\"/><w:sz w:val=\"28\"/><w:u w:val=\"single\"/></w:rPr>\
             <w:t xml:space=\"preserve\">x</w:t></w:r>"
        );
    }

    #[test]
    fn test_explicit_off_is_written() {
        let mut run = MutableRun::with_text("x");
        run.italic(false);
        let xml = emit(&run).unwrap();
        assert!(xml.contains("<w:i w:val=\"0\"/>"));
    }

    #[test]
    fn test_content_items() {
        let mut run = MutableRun::new();
        run.add_text("a & b").add_tab().add_break().add_page_break();
        assert_eq!(run.text(), "a & b\t\n");
        let xml = emit(&run).unwrap();
        assert!(xml.contains("a &amp; b"));
        assert!(xml.contains("<w:tab/><w:br/><w:br w:type=\"page\"/>"));
        assert!(!xml.contains("<w:rPr>"));
    }

    #[test]
    fn test_note_reference_must_exist() {
        let mut run = MutableRun::new();
        run.add_footnote_reference(1);
        assert!(emit(&run).unwrap().contains("<w:footnoteReference w:id=\"1\"/>"));

        let mut dangling = MutableRun::new();
        dangling.add_endnote_reference(4);
        assert!(emit(&dangling).unwrap_err().is_unresolved_reference());
    }

    #[test]
    fn test_preserved_property_kept_in_slot() {
        let mut run = MutableRun::with_text("x");
        run.bold(true);
        run.properties
            .preserved
            .push(RawXml::new("w:lang", "<w:lang w:val=\"de-DE\"/>"));
        run.properties
            .preserved
            .push(RawXml::new("w:caps", "<w:caps/>"));
        let xml = emit(&run).unwrap();
        assert!(xml.contains("<w:rPr><w:b/><w:caps/><w:lang w:val=\"de-DE\"/></w:rPr>"));
    }
}
