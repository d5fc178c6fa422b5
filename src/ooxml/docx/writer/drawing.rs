//! Drawing markup for images placed in paragraphs.
use super::EmitContext;
use super::preserved::PreservedAttrs;
use super::run::RunProperties;
use crate::common::xml::escape_xml;
use crate::ooxml::docx::image::{FloatingPosition, ImageResource, Placement, WrapStyle};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::RelType;
use std::fmt::Write as FmtWrite;

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Base z-order for floating drawings.
pub(crate) const RELATIVE_HEIGHT_BASE: u32 = 251_658_240;

/// An image placed in a paragraph, inline or floating.
#[derive(Debug, Clone)]
pub struct Drawing {
    pub(crate) image: ImageResource,
    /// `wp:docPr` id, assigned by the document-wide sweep before emission
    pub(crate) doc_pr_id: Option<u32>,
    /// Formatting of the run that carries the drawing
    pub(crate) run_properties: RunProperties,
    pub(crate) run_attrs: PreservedAttrs,
}

impl Drawing {
    pub(crate) fn new(image: ImageResource) -> Self {
        Self {
            image,
            doc_pr_id: None,
            run_properties: RunProperties::default(),
            run_attrs: PreservedAttrs::default(),
        }
    }

    pub fn image(&self) -> &ImageResource {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ImageResource {
        &mut self.image
    }

    pub fn doc_pr_id(&self) -> Option<u32> {
        self.doc_pr_id
    }

    fn missing(&self, ctx: &EmitContext<'_>, what: &str) -> OoxmlError {
        OoxmlError::UnresolvedReference {
            part: ctx.rels().source().to_string(),
            id: what.to_string(),
        }
    }

    /// Serialize as `<w:r><w:drawing>...</w:drawing></w:r>`.
    ///
    /// Fails if the image has no relationship id, if the id does not resolve
    /// to an image relationship of the owning part, or if no docPr id was
    /// assigned.
    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        let r_id = self
            .image
            .relationship_id()
            .ok_or_else(|| self.missing(ctx, "image without relationship id"))?;
        let rel = ctx.resolve(r_id)?;
        if *rel.reltype() != RelType::Image {
            return Err(self.missing(ctx, r_id));
        }
        let doc_pr_id = self
            .doc_pr_id
            .ok_or_else(|| self.missing(ctx, "drawing without docPr id"))?;

        self.run_attrs.open_tag(xml, "w:r");
        self.run_properties.to_xml(xml)?;
        xml.push_str("<w:drawing>");

        let cx = self.image.width_emu();
        let cy = self.image.height_emu();
        match self.image.placement() {
            Placement::Inline => {
                xml.push_str(r#"<wp:inline distT="0" distB="0" distL="0" distR="0">"#);
                write!(xml, r#"<wp:extent cx="{}" cy="{}"/>"#, cx, cy)
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
                xml.push_str(r#"<wp:effectExtent l="0" t="0" r="0" b="0"/>"#);
                self.write_doc_pr(xml, doc_pr_id)?;
                self.write_graphic(xml, r_id)?;
                xml.push_str("</wp:inline>");
            },
            Placement::Floating(position) => {
                self.write_anchor(xml, position, doc_pr_id, r_id)?;
            },
        }

        xml.push_str("</w:drawing></w:r>");
        Ok(())
    }

    fn write_anchor(
        &self,
        xml: &mut String,
        position: &FloatingPosition,
        doc_pr_id: u32,
        r_id: &str,
    ) -> Result<()> {
        let behind = position.wrap == WrapStyle::BehindText;
        write!(
            xml,
            r#"<wp:anchor distT="0" distB="0" distL="114300" distR="114300" simplePos="0" relativeHeight="{}" behindDoc="{}" locked="0" layoutInCell="1" allowOverlap="1">"#,
            RELATIVE_HEIGHT_BASE.saturating_add(doc_pr_id),
            u8::from(behind)
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        xml.push_str(r#"<wp:simplePos x="0" y="0"/>"#);
        write!(
            xml,
            r#"<wp:positionH relativeFrom="{}"><wp:posOffset>{}</wp:posOffset></wp:positionH>"#,
            escape_xml(&position.h_relative),
            position.h_offset_emu
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        write!(
            xml,
            r#"<wp:positionV relativeFrom="{}"><wp:posOffset>{}</wp:posOffset></wp:positionV>"#,
            escape_xml(&position.v_relative),
            position.v_offset_emu
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        write!(
            xml,
            r#"<wp:extent cx="{}" cy="{}"/>"#,
            self.image.width_emu(),
            self.image.height_emu()
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        xml.push_str(r#"<wp:effectExtent l="0" t="0" r="0" b="0"/>"#);

        match position.wrap {
            WrapStyle::Square => xml.push_str(r#"<wp:wrapSquare wrapText="bothSides"/>"#),
            WrapStyle::Tight => xml.push_str(
                r#"<wp:wrapTight wrapText="bothSides"><wp:wrapPolygon edited="0"><wp:start x="0" y="0"/><wp:lineTo x="0" y="21600"/><wp:lineTo x="21600" y="21600"/><wp:lineTo x="21600" y="0"/><wp:lineTo x="0" y="0"/></wp:wrapPolygon></wp:wrapTight>"#,
            ),
            WrapStyle::TopAndBottom => xml.push_str("<wp:wrapTopAndBottom/>"),
            WrapStyle::BehindText | WrapStyle::InFrontOfText => xml.push_str("<wp:wrapNone/>"),
        }

        self.write_doc_pr(xml, doc_pr_id)?;
        self.write_graphic(xml, r_id)?;
        xml.push_str("</wp:anchor>");
        Ok(())
    }

    fn display_name(&self, doc_pr_id: u32) -> String {
        match self.image.name() {
            Some(name) => escape_xml(name),
            None => format!("Picture {}", doc_pr_id),
        }
    }

    fn write_doc_pr(&self, xml: &mut String, doc_pr_id: u32) -> Result<()> {
        write!(
            xml,
            r#"<wp:docPr id="{}" name="{}" descr="{}"/>"#,
            doc_pr_id,
            self.display_name(doc_pr_id),
            escape_xml(self.image.description())
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        write!(
            xml,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            NS_A
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))
    }

    fn write_graphic(&self, xml: &mut String, r_id: &str) -> Result<()> {
        let image = &self.image;
        write!(
            xml,
            r#"<a:graphic xmlns:a="{}"><a:graphicData uri="{}"><pic:pic xmlns:pic="{}">"#,
            NS_A, NS_PIC, NS_PIC
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        write!(
            xml,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{}" descr="{}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            escape_xml(image.media_name().unwrap_or("image")),
            escape_xml(image.description())
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;

        xml.push_str("<pic:blipFill>");
        let effects = image.effects();
        if effects.is_empty() {
            write!(xml, r#"<a:blip r:embed="{}"/>"#, escape_xml(r_id))
                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        } else {
            write!(xml, r#"<a:blip r:embed="{}">"#, escape_xml(r_id))
                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            if effects.grayscale {
                xml.push_str("<a:grayscl/>");
            }
            if effects.brightness != 0 || effects.contrast != 0 {
                write!(
                    xml,
                    r#"<a:lum bright="{}" contrast="{}"/>"#,
                    effects.brightness, effects.contrast
                )
                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
            xml.push_str("</a:blip>");
        }
        if let Some(crop) = image.crop() {
            write!(
                xml,
                r#"<a:srcRect l="{}" t="{}" r="{}" b="{}"/>"#,
                crop.left, crop.top, crop.right, crop.bottom
            )
            .map_err(|e| OoxmlError::Xml(e.to_string()))?;
        }
        xml.push_str("<a:stretch><a:fillRect/></a:stretch></pic:blipFill>");

        xml.push_str("<pic:spPr><a:xfrm");
        let rot = (image.rotation() * 60_000.0).round() as i64;
        if rot != 0 {
            write!(xml, r#" rot="{}""#, rot).map_err(|e| OoxmlError::Xml(e.to_string()))?;
        }
        write!(
            xml,
            r#"><a:off x="0" y="0"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            image.width_emu(),
            image.height_emu()
        )
        .map_err(|e| OoxmlError::Xml(e.to_string()))?;

        xml.push_str("</pic:pic></a:graphicData></a:graphic>");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::fixtures;
    use crate::ooxml::docx::image::Crop;
    use crate::ooxml::docx::writer::NoteIds;
    use crate::ooxml::opc::{Relationships, TargetMode};

    fn staged(rels: &mut Relationships) -> Drawing {
        let mut image = ImageResource::from_bytes(fixtures::gif(96, 192));
        image.relationship_id =
            Some(rels.register(RelType::Image, "media/image1.gif", TargetMode::Internal));
        image.media_name = Some("image1.gif".to_string());
        let mut drawing = Drawing::new(image);
        drawing.doc_pr_id = Some(3);
        drawing
    }

    fn emit(drawing: &Drawing, rels: &Relationships) -> Result<String> {
        let notes = NoteIds::default();
        let mut xml = String::new();
        drawing.to_xml(&mut xml, &EmitContext::new(rels, &notes))?;
        Ok(xml)
    }

    #[test]
    fn test_inline_drawing() {
        let mut rels = Relationships::new("/word/document.xml");
        let drawing = staged(&mut rels);
        let xml = emit(&drawing, &rels).unwrap();

        assert!(xml.starts_with("<w:r><w:drawing><wp:inline "));
        assert!(xml.contains(r#"<wp:extent cx="914400" cy="1828800"/>"#));
        assert!(xml.contains(r#"<wp:docPr id="3" name="Picture 3" descr=""/>"#));
        assert!(xml.contains(r#"<a:blip r:embed="rId1"/>"#));
        assert!(!xml.contains("rot="));
        assert!(xml.ends_with("</wp:inline></w:drawing></w:r>"));
    }

    #[test]
    fn test_crop_rotation_effects() {
        let mut rels = Relationships::new("/word/document.xml");
        let mut drawing = staged(&mut rels);
        drawing
            .image_mut()
            .set_rotation(90.0)
            .set_crop(Crop::from_percent(5.0, 0.0, 0.0, 10.0))
            .set_grayscale(true)
            .set_brightness_contrast(10.0, 0.0);
        let xml = emit(&drawing, &rels).unwrap();

        assert!(xml.contains(
            r#"<a:blip r:embed="rId1"><a:grayscl/><a:lum bright="10000" contrast="0"/></a:blip>"#
        ));
        assert!(xml.contains(r#"<a:srcRect l="5000" t="0" r="0" b="10000"/><a:stretch>"#));
        assert!(xml.contains(r#"<a:xfrm rot="5400000">"#));
    }

    #[test]
    fn test_floating_drawing() {
        let mut rels = Relationships::new("/word/document.xml");
        let mut drawing = staged(&mut rels);
        drawing.image_mut().set_floating(
            FloatingPosition::new(914_400, -12_700).with_wrap(WrapStyle::BehindText),
        );
        let xml = emit(&drawing, &rels).unwrap();

        assert!(xml.contains(r#"behindDoc="1""#));
        assert!(xml.contains(
            r#"<wp:positionH relativeFrom="column"><wp:posOffset>914400</wp:posOffset></wp:positionH>"#
        ));
        assert!(xml.contains(r#"<wp:posOffset>-12700</wp:posOffset>"#));
        assert!(xml.contains("<wp:wrapNone/><wp:docPr "));
        assert!(xml.ends_with("</wp:anchor></w:drawing></w:r>"));
    }

    #[test]
    fn test_unresolved_image_is_fatal() {
        let mut rels = Relationships::new("/word/document.xml");
        let mut drawing = staged(&mut rels);

        let empty = Relationships::new("/word/document.xml");
        assert!(emit(&drawing, &empty).unwrap_err().is_unresolved_reference());

        drawing.image.relationship_id = None;
        assert!(emit(&drawing, &rels).unwrap_err().is_unresolved_reference());
    }

    #[test]
    fn test_missing_doc_pr_is_fatal() {
        let mut rels = Relationships::new("/word/document.xml");
        let mut drawing = staged(&mut rels);
        drawing.doc_pr_id = None;
        assert!(emit(&drawing, &rels).is_err());
    }
}
