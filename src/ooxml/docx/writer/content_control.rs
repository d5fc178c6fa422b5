/// Content control writer support for DOCX documents.
///
/// Content controls (structured document tags, `w:sdt`) are structured
/// document regions that can contain text, dates, drop-down lists, and other
/// content types. They're commonly used in templates and forms. Block-level
/// controls wrap a [`DocumentBody`] of their own.
use super::doc::DocumentBody;
use super::order::{PropChild, SDTPR_ORDER, emit_ordered};
use super::preserved::RawXml;
use super::{EmitContext, NodeVisitor};
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use std::fmt::Write as FmtWrite;

const CHECKED_GLYPH: &str = "\u{2612}";
const UNCHECKED_GLYPH: &str = "\u{2610}";

/// Type of content control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentControlType {
    /// Rich text content control (can contain formatted text and paragraphs)
    RichText,
    /// Plain text content control (text only, no formatting)
    PlainText,
    /// Drop-down list content control
    DropDownList {
        /// List items (display text, value)
        items: Vec<(String, String)>,
    },
    /// Date picker content control
    DatePicker {
        /// Date format string
        format: String,
    },
    /// Checkbox content control
    Checkbox {
        /// Checked state
        checked: bool,
    },
    /// No type element, or one kept verbatim with the other properties
    Unspecified,
}

/// A mutable content control in a Word document.
///
/// Content controls provide structured editing regions with validation,
/// data binding, and user interface enhancements.
#[derive(Debug, Clone)]
pub struct MutableContentControl {
    /// Control ID, unique within the document
    pub(crate) id: Option<u32>,
    /// Control tag (for programmatic identification)
    pub(crate) tag: Option<String>,
    /// Control title (`w:alias`, displayed to user)
    pub(crate) title: Option<String>,
    pub(crate) control_type: ContentControlType,
    /// Whether the control can be deleted
    pub(crate) allow_delete: bool,
    /// Whether the content can be edited
    pub(crate) allow_edit: bool,
    /// Placeholder document part
    pub(crate) placeholder: Option<String>,
    pub(crate) content: DocumentBody,
    /// Unknown `w:sdtPr` children
    pub(crate) preserved: Vec<RawXml>,
    /// `w:sdtEndPr`, kept verbatim
    pub(crate) end_properties: Option<RawXml>,
}

impl MutableContentControl {
    /// Create a control with an id from the document's identity registry.
    pub(crate) fn new(id: Option<u32>, control_type: ContentControlType) -> Self {
        let mut control = Self {
            id,
            tag: None,
            title: None,
            control_type,
            allow_delete: true,
            allow_edit: true,
            placeholder: None,
            content: DocumentBody::default(),
            preserved: Vec::new(),
            end_properties: None,
        };
        match control.control_type {
            ContentControlType::Checkbox { checked } => control.write_checkbox_glyph(checked),
            _ => {
                control.content.add_paragraph();
            },
        }
        control
    }

    /// Get the control ID.
    #[inline]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Get the control tag.
    #[inline]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Set the control tag.
    pub fn set_tag(&mut self, tag: Option<String>) -> &mut Self {
        self.tag = tag;
        self
    }

    /// Get the control title.
    #[inline]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the control title.
    pub fn set_title(&mut self, title: Option<String>) -> &mut Self {
        self.title = title;
        self
    }

    /// Set whether the control can be deleted.
    pub fn set_allow_delete(&mut self, allow: bool) -> &mut Self {
        self.allow_delete = allow;
        self
    }

    /// Set whether the content can be edited.
    pub fn set_allow_edit(&mut self, allow: bool) -> &mut Self {
        self.allow_edit = allow;
        self
    }

    /// Set placeholder document part.
    pub fn set_placeholder(&mut self, placeholder: Option<String>) -> &mut Self {
        self.placeholder = placeholder;
        self
    }

    /// Get the content control type.
    pub fn control_type(&self) -> &ContentControlType {
        &self.control_type
    }

    /// Check or uncheck a checkbox control. The content is replaced with the
    /// matching box glyph. Other control types are left alone.
    pub fn set_checked(&mut self, checked: bool) {
        if let ContentControlType::Checkbox { checked: state } = &mut self.control_type {
            *state = checked;
            self.write_checkbox_glyph(checked);
        }
    }

    fn write_checkbox_glyph(&mut self, checked: bool) {
        self.content.clear();
        let run = self
            .content
            .add_paragraph()
            .add_run_with_text(if checked { CHECKED_GLYPH } else { UNCHECKED_GLYPH });
        run.font_name("MS Gothic");
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

    fn lock_value(&self) -> Option<&'static str> {
        match (self.allow_delete, self.allow_edit) {
            (true, true) => None,
            (false, true) => Some("sdtLocked"),
            (true, false) => Some("contentLocked"),
            (false, false) => Some("sdtContentLocked"),
        }
    }

    fn known_children(&self) -> Result<Vec<PropChild>> {
        let mut children = Vec::new();

        if let Some(ref title) = self.title {
            children.push(PropChild::new(
                "alias",
                format!(r#"<w:alias w:val="{}"/>"#, escape_xml(title)),
            ));
        }
        if let Some(ref tag) = self.tag {
            children.push(PropChild::new(
                "tag",
                format!(r#"<w:tag w:val="{}"/>"#, escape_xml(tag)),
            ));
        }
        if let Some(id) = self.id {
            children.push(PropChild::new("id", format!(r#"<w:id w:val="{}"/>"#, id)));
        }
        if let Some(lock) = self.lock_value() {
            children.push(PropChild::new("lock", format!(r#"<w:lock w:val="{}"/>"#, lock)));
        }
        if let Some(ref placeholder) = self.placeholder {
            children.push(PropChild::new(
                "placeholder",
                format!(
                    r#"<w:placeholder><w:docPart w:val="{}"/></w:placeholder>"#,
                    escape_xml(placeholder)
                ),
            ));
        }

        // Add control type-specific properties
        match &self.control_type {
            ContentControlType::RichText => {
                children.push(PropChild::new("richText", "<w:richText/>"));
            },
            ContentControlType::PlainText => {
                children.push(PropChild::new("text", "<w:text/>"));
            },
            ContentControlType::DropDownList { items } => {
                let mut xml = String::from("<w:dropDownList>");
                for (display, value) in items {
                    write!(
                        xml,
                        r#"<w:listItem w:displayText="{}" w:value="{}"/>"#,
                        escape_xml(display),
                        escape_xml(value)
                    )
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                }
                xml.push_str("</w:dropDownList>");
                children.push(PropChild::new("dropDownList", xml));
            },
            ContentControlType::DatePicker { format } => {
                children.push(PropChild::new(
                    "date",
                    format!(
                        r#"<w:date><w:dateFormat w:val="{}"/></w:date>"#,
                        escape_xml(format)
                    ),
                ));
            },
            ContentControlType::Checkbox { checked } => {
                children.push(PropChild::new(
                    "w14:checkbox",
                    format!(
                        r#"<w14:checkbox><w14:checked w14:val="{}"/><w14:checkedState w14:val="2612" w14:font="MS Gothic"/><w14:uncheckedState w14:val="2610" w14:font="MS Gothic"/></w14:checkbox>"#,
                        u8::from(*checked)
                    ),
                ));
            },
            ContentControlType::Unspecified => {},
        }

        Ok(children)
    }

    pub(crate) fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        for raw in self.preserved.iter().chain(self.end_properties.iter()) {
            visitor.preserved(raw)?;
        }
        self.content.walk(visitor)
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        xml.push_str("<w:sdt>");

        ctx.check_refs(&self.preserved)?;
        emit_ordered(xml, "sdtPr", SDTPR_ORDER, &self.known_children()?, &self.preserved);

        if let Some(ref end_properties) = self.end_properties {
            ctx.emit_preserved(end_properties, xml)?;
        }

        xml.push_str("<w:sdtContent>");
        self.content.to_xml(xml, ctx)?;
        xml.push_str("</w:sdtContent></w:sdt>");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::writer::NoteIds;
    use crate::ooxml::opc::Relationships;

    fn emit(control: &MutableContentControl) -> String {
        let rels = Relationships::new("/word/document.xml");
        let notes = NoteIds::default();
        let mut xml = String::new();
        control
            .to_xml(&mut xml, &EmitContext::new(&rels, &notes))
            .unwrap();
        xml
    }

    #[test]
    fn test_rich_text_control() {
        let mut control = MutableContentControl::new(Some(1), ContentControlType::RichText);
        control
            .set_tag(Some("MyTag".to_string()))
            .set_title(Some("My Control".to_string()));
        assert_eq!(control.id(), Some(1));
        assert_eq!(control.tag(), Some("MyTag"));

        let xml = emit(&control);
        assert!(xml.starts_with(
            r#"<w:sdt><w:sdtPr><w:alias w:val="My Control"/><w:tag w:val="MyTag"/><w:id w:val="1"/><w:richText/></w:sdtPr><w:sdtContent><w:p>"#
        ));
        assert!(xml.ends_with("</w:sdtContent></w:sdt>"));
    }

    #[test]
    fn test_dropdown_control() {
        let items = vec![
            ("Option 1".to_string(), "opt1".to_string()),
            ("A & B".to_string(), "ab".to_string()),
        ];
        let control =
            MutableContentControl::new(Some(3), ContentControlType::DropDownList { items });

        let xml = emit(&control);
        assert!(xml.contains(
            r#"<w:dropDownList><w:listItem w:displayText="Option 1" w:value="opt1"/><w:listItem w:displayText="A &amp; B" w:value="ab"/></w:dropDownList>"#
        ));
    }

    #[test]
    fn test_date_picker_control() {
        let control = MutableContentControl::new(
            Some(4),
            ContentControlType::DatePicker {
                format: "MM/dd/yyyy".to_string(),
            },
        );
        assert!(emit(&control).contains(r#"<w:date><w:dateFormat w:val="MM/dd/yyyy"/></w:date>"#));
    }

    #[test]
    fn test_checkbox_glyph_follows_state() {
        let mut control =
            MutableContentControl::new(Some(5), ContentControlType::Checkbox { checked: false });
        assert_eq!(control.text(), UNCHECKED_GLYPH);

        control.set_checked(true);
        assert_eq!(control.text(), CHECKED_GLYPH);
        assert_eq!(
            control.control_type(),
            &ContentControlType::Checkbox { checked: true }
        );
        let xml = emit(&control);
        assert!(xml.contains(r#"<w14:checked w14:val="1"/>"#));
        assert_eq!(control.content().paragraph_count(), 1);
    }

    #[test]
    fn test_single_lock_element() {
        let mut control = MutableContentControl::new(Some(1), ContentControlType::PlainText);
        control.set_allow_delete(false).set_allow_edit(false);

        let xml = emit(&control);
        assert_eq!(xml.matches("<w:lock").count(), 1);
        assert!(xml.contains(r#"<w:lock w:val="sdtContentLocked"/>"#));
    }

    #[test]
    fn test_preserved_properties_keep_their_slot() {
        let mut control = MutableContentControl::new(Some(9), ContentControlType::PlainText);
        control.preserved.push(RawXml::new(
            "w:showingPlcHdr",
            "<w:showingPlcHdr/>",
        ));
        control.preserved.push(RawXml::new(
            "w:rPr",
            r#"<w:rPr><w:b/></w:rPr>"#,
        ));
        control.end_properties = Some(RawXml::new("w:sdtEndPr", "<w:sdtEndPr/>"));

        let xml = emit(&control);
        assert!(xml.starts_with(
            r#"<w:sdt><w:sdtPr><w:rPr><w:b/></w:rPr><w:id w:val="9"/><w:showingPlcHdr/><w:text/></w:sdtPr><w:sdtEndPr/><w:sdtContent>"#
        ));
    }
}
