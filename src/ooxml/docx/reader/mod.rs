//! Reading a `.docx` package back into a [`MutableDocument`].
//!
//! Parts the model edits (the main document, headers, footers and notes) are
//! converted into typed nodes; everything else in the package is carried as
//! passthrough bytes. Within converted parts, markup without a typed
//! counterpart is kept verbatim so that saving an untouched document
//! reproduces it.

mod body;
pub(crate) mod dom;

use self::body::Converter;
use self::dom::XmlElement;
use crate::ooxml::docx::writer::{
    HeaderFooter, HeaderFooterKind, HeaderFooterType, IdentityRegistry, MutableDocument, Note,
    NoteKind, NotesPart, PageOrientation, SectionProperties,
};
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::opc::{
    ContentTypes, PackURI, PartStore, RelType, Relationship, Relationships, ZipPackage,
};
use std::collections::{BTreeMap, HashSet};

/// Members converted into typed parts, plus the media their drawings own.
#[derive(Default)]
struct Consumed {
    parts: HashSet<String>,
    media: HashSet<String>,
    bookmarks: HashSet<String>,
}

fn part_text<'p>(package: &'p ZipPackage, partname: &PackURI) -> Result<&'p str> {
    let data = package
        .get(partname.membername())
        .ok_or_else(|| OoxmlError::PartNotFound(partname.to_string()))?;
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    std::str::from_utf8(data)
        .map_err(|e| OoxmlError::InvalidFormat(format!("{} is not UTF-8: {}", partname, e)))
}

/// Relationships of `partname`, empty when the part has none.
fn read_rels(package: &ZipPackage, partname: &PackURI) -> Result<Relationships> {
    match package.get(partname.rels_uri().membername()) {
        Some(data) => Relationships::from_xml(partname.as_str(), &String::from_utf8_lossy(data)).map_err(Into::into),
        None => Ok(Relationships::new(partname.as_str())),
    }
}

/// Reserve every bookmark and content control id present in a part.
fn reserve_ids(root: &XmlElement, registry: &mut IdentityRegistry) {
    for el in root.descendants() {
        match el.name.as_str() {
            "w:bookmarkStart" => {
                if let (Some(id), Some(name)) = (el.parse_attr::<u32>("w:id"), el.attr("w:name")) {
                    // A repeated name keeps its first id
                    let _ = registry.reserve_bookmark(name, id);
                }
            },
            "w:sdtPr" => {
                if let Some(id) = el.child("w:id").and_then(|id| id.parse_attr::<u32>("w:val")) {
                    registry.reserve_sdt(id);
                }
            },
            _ => {},
        }
    }
}

fn internal_target(rels: &Relationships, rel: &Relationship) -> Option<PackURI> {
    if rel.is_external() {
        return None;
    }
    rels.target_partname(rel).ok()
}

/// A parsed part awaiting conversion.
struct Parsed {
    partname: PackURI,
    src: String,
    root: XmlElement,
    rels: Relationships,
}

impl Parsed {
    fn load(package: &ZipPackage, partname: PackURI) -> Result<Self> {
        let src = part_text(package, &partname)?.to_string();
        let root = dom::parse(&src)?;
        let rels = read_rels(package, &partname)?;
        Ok(Self {
            partname,
            src,
            root,
            rels,
        })
    }

    /// Mark the part and its relationships as converted.
    fn consume(&self, consumed: &mut Consumed) {
        consumed.parts.insert(self.partname.membername().to_string());
        consumed
            .parts
            .insert(self.partname.rels_uri().membername().to_string());
    }

    fn root_tag(&self) -> String {
        self.root.start_tag(&self.src).to_string()
    }
}

struct DocumentReader<'a> {
    package: &'a ZipPackage,
    registry: IdentityRegistry,
    consumed: Consumed,
}

impl<'a> DocumentReader<'a> {
    fn converter<'s>(&'s mut self, part: &'s Parsed) -> Converter<'s> {
        Converter {
            src: &part.src,
            rels: &part.rels,
            package: self.package,
            registry: &self.registry,
            typed_bookmarks: &mut self.consumed.bookmarks,
            claimed_media: &mut self.consumed.media,
        }
    }

    fn header_footer(&mut self, kind: HeaderFooterKind, partname: PackURI) -> Result<HeaderFooter> {
        let part = Parsed::load(self.package, partname.clone())?;
        if part.root.local_name() != kind.root() {
            return Err(OoxmlError::InvalidFormat(format!(
                "{} has root {}, expected w:{}",
                partname,
                part.root.name,
                kind.root()
            )));
        }
        part.consume(&mut self.consumed);
        reserve_ids(&part.root, &mut self.registry);
        let mut hf = HeaderFooter::new(kind, partname);
        hf.content = self.converter(&part).body(&part.root.children);
        hf.root = Some(part.root_tag());
        hf.rels = part.rels;
        Ok(hf)
    }

    fn section(
        &mut self,
        el: &XmlElement,
        src: &str,
        doc_rels: &Relationships,
        parts: &mut BTreeMap<PackURI, HeaderFooter>,
    ) -> SectionProperties {
        let mut section = SectionProperties::default();
        let mut title_page = None;
        for child in &el.children {
            let understood = match child.name.as_str() {
                "w:headerReference" | "w:footerReference" => {
                    self.section_reference(child, doc_rels, parts, &mut section)
                },
                "w:pgSz" if child.attrs_within(&["w:w", "w:h", "w:orient"]) => {
                    match (child.parse_attr::<u32>("w:w"), child.parse_attr::<u32>("w:h")) {
                        (Some(w), Some(h)) => {
                            section.page_width = w;
                            section.page_height = h;
                            section.orientation = child
                                .attr("w:orient")
                                .and_then(PageOrientation::parse)
                                .unwrap_or_default();
                            true
                        },
                        _ => false,
                    }
                },
                "w:pgMar" => self.margins(child, &mut section),
                "w:titlePg" if child.attrs_within(&["w:val"]) => {
                    title_page = Some(child.on_off());
                    true
                },
                _ => false,
            };
            if !understood {
                section.preserved.push(child.to_raw(src));
            }
        }
        section.title_page = title_page;
        section
    }

    fn margins(&self, el: &XmlElement, section: &mut SectionProperties) -> bool {
        const ATTRS: [&str; 7] = [
            "w:top", "w:right", "w:bottom", "w:left", "w:header", "w:footer", "w:gutter",
        ];
        if !el.attrs_within(&ATTRS) {
            return false;
        }
        let parsed = (
            el.parse_attr::<i32>("w:top"),
            el.parse_attr::<u32>("w:right"),
            el.parse_attr::<i32>("w:bottom"),
            el.parse_attr::<u32>("w:left"),
            el.parse_attr::<u32>("w:header"),
            el.parse_attr::<u32>("w:footer"),
        );
        let (Some(top), Some(right), Some(bottom), Some(left), Some(header), Some(footer)) = parsed else {
            return false;
        };
        section.margin_top = top;
        section.margin_right = right;
        section.margin_bottom = bottom;
        section.margin_left = left;
        section.header_distance = header;
        section.footer_distance = footer;
        section.gutter = el.parse_attr("w:gutter").unwrap_or(0);
        true
    }

    /// Load the part behind a header or footer reference. Returns false when
    /// the reference cannot be followed, leaving it to be kept verbatim.
    fn section_reference(
        &mut self,
        el: &XmlElement,
        doc_rels: &Relationships,
        parts: &mut BTreeMap<PackURI, HeaderFooter>,
        section: &mut SectionProperties,
    ) -> bool {
        let kind = match el.local_name() {
            "headerReference" => HeaderFooterKind::Header,
            _ => HeaderFooterKind::Footer,
        };
        if !el.attrs_within(&["w:type", "r:id"]) {
            return false;
        }
        let slot = el
            .attr("w:type")
            .map_or(Some(HeaderFooterType::Default), HeaderFooterType::parse);
        let Some(slot) = slot else {
            return false;
        };
        let Some(rel) = el.attr("r:id").and_then(|r_id| doc_rels.get(r_id)) else {
            return false;
        };
        if *rel.reltype() != kind.reltype() {
            return false;
        }
        let Some(partname) = internal_target(doc_rels, rel) else {
            return false;
        };

        if !parts.contains_key(&partname) {
            match self.header_footer(kind, partname.clone()) {
                Ok(hf) => {
                    parts.insert(partname.clone(), hf);
                },
                Err(e) => {
                    log::warn!("keeping {} reference as markup: {}", kind.reference(), e);
                    return false;
                },
            }
        }
        section.set_reference(kind, slot, partname);
        true
    }
}

/// Read a `.docx` archive.
pub(crate) fn read_document(bytes: &[u8]) -> Result<MutableDocument> {
    let package = ZipPackage::from_archive_bytes(bytes)?;
    let mut consumed = Consumed::default();

    let content_types = match package.get(part_name::CONTENT_TYPES) {
        Some(data) => ContentTypes::from_xml(&String::from_utf8_lossy(data))?,
        None => ContentTypes::new(),
    };
    consumed.parts.insert(part_name::CONTENT_TYPES.to_string());

    let package_rels = match package.get(part_name::PACKAGE_RELS) {
        Some(data) => Relationships::from_xml("/", &String::from_utf8_lossy(data))?,
        None => return Err(OoxmlError::InvalidFormat("package has no relationships".to_string())),
    };
    consumed.parts.insert(part_name::PACKAGE_RELS.to_string());

    let main_rel = package_rels
        .part_with_reltype(&RelType::OfficeDocument)
        .map_err(|_| OoxmlError::InvalidFormat("package has no main document".to_string()))?;
    let partname = internal_target(&package_rels, main_rel)
        .ok_or_else(|| OoxmlError::InvalidFormat("main document is external".to_string()))?;

    let main = Parsed::load(&package, partname)?;
    if main.root.local_name() != "document" {
        return Err(OoxmlError::InvalidFormat(format!(
            "{} has root {}, expected w:document",
            main.partname, main.root.name
        )));
    }
    main.consume(&mut consumed);

    let mut reader = DocumentReader {
        package: &package,
        registry: IdentityRegistry::new(),
        consumed,
    };
    reserve_ids(&main.root, &mut reader.registry);

    // Notes first, so their bookmark ids are reserved before any conversion
    let mut note_parts = Vec::new();
    for kind in [NoteKind::Footnote, NoteKind::Endnote] {
        let Some(notes_partname) = main
            .rels
            .part_with_reltype(&kind.reltype())
            .ok()
            .and_then(|rel| internal_target(&main.rels, rel))
        else {
            continue;
        };
        let parsed = Parsed::load(&package, notes_partname)?;
        parsed.consume(&mut reader.consumed);
        reserve_ids(&parsed.root, &mut reader.registry);
        note_parts.push((kind, parsed));
    }

    let mut doc = MutableDocument::new();
    doc.root = Some(main.root_tag());

    let mut headers_footers = BTreeMap::new();
    let mut saw_body = false;
    for child in &main.root.children {
        if !child.is("w:body") || saw_body {
            doc.prelude.push(child.to_raw(&main.src));
            continue;
        }
        saw_body = true;
        let (blocks, sect_pr) = match child.children.split_last() {
            Some((last, rest)) if last.is("w:sectPr") => (rest, Some(last)),
            _ => (child.children.as_slice(), None),
        };
        if let Some(sect_pr) = sect_pr {
            doc.section = reader.section(sect_pr, &main.src, &main.rels, &mut headers_footers);
        }
        doc.body = reader.converter(&main).body(blocks);
    }

    // Header and footer bodies were read while loading the section
    doc.headers_footers = headers_footers.into_values().collect();

    for (kind, parsed) in note_parts {
        let part = reader.notes_from(kind, parsed);
        match kind {
            NoteKind::Footnote => doc.footnotes = Some(part),
            NoteKind::Endnote => doc.endnotes = Some(part),
        }
    }

    let DocumentReader {
        registry, consumed, ..
    } = reader;

    let mut passthrough = BTreeMap::new();
    for name in package.list() {
        if consumed.parts.contains(&name) || consumed.media.contains(&name) {
            continue;
        }
        if let Some(data) = package.get(&name) {
            passthrough.insert(name, data.to_vec());
        }
    }
    log::debug!(
        "read {}: {} typed parts, {} media claimed, {} passthrough",
        main.partname,
        consumed.parts.len(),
        consumed.media.len(),
        passthrough.len()
    );

    doc.partname = main.partname;
    doc.rels = main.rels;
    doc.registry = registry;
    doc.package_rels = package_rels;
    doc.content_types = content_types;
    doc.passthrough = passthrough;
    Ok(doc)
}

impl DocumentReader<'_> {
    fn notes_from(&mut self, kind: NoteKind, part: Parsed) -> NotesPart {
        let mut notes = NotesPart::new(kind);
        notes.partname = part.partname.clone();
        let mut converter = self.converter(&part);
        for child in &part.root.children {
            match child.parse_attr::<i32>("w:id") {
                // Separators and continuation notes carry a w:type
                Some(id) if child.local_name() == kind.element() && child.attr("w:type").is_none() => {
                    let mut note = Note::new(id);
                    note.content = converter.body(&child.children);
                    notes.notes.push(note);
                },
                _ => notes.separators.push(child.to_raw(&part.src)),
            }
        }
        notes.root = Some(part.root_tag());
        notes.rels = part.rels;
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::fixtures;
    use crate::ooxml::docx::image::{Crop, FloatingPosition, ImageResource, WrapStyle};
    use crate::ooxml::docx::writer::{BodyElement, ContentControlType, ParagraphElement};

    const CT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

    const PKG_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

    fn package_with(document: &str, doc_rels: Option<&str>, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let mut package = ZipPackage::new();
        package.put(part_name::CONTENT_TYPES, CT.as_bytes().to_vec());
        package.put(part_name::PACKAGE_RELS, PKG_RELS.as_bytes().to_vec());
        package.put(part_name::DOCUMENT, document.as_bytes().to_vec());
        if let Some(rels) = doc_rels {
            package.put("word/_rels/document.xml.rels", rels.as_bytes().to_vec());
        }
        for (name, data) in extra {
            package.put(name, data.to_vec());
        }
        package.to_archive_bytes().unwrap()
    }

    fn document_xml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" mc:Ignorable="w14"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    /// Document relationships: `(id, image target)` pairs plus external links.
    fn doc_rels(images: &[(&str, &str)], links: &[(&str, &str)]) -> String {
        let mut xml = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, target) in images {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{}"/>"#,
                id, target
            ));
        }
        for (id, target) in links {
            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{}" TargetMode="External"/>"#,
                id, target
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }

    /// A 1-inch inline picture run shaped the way the writer emits one.
    fn inline_picture(r_id: &str, descr: &str, doc_pr_extra: &str, sp_pr_extra: &str) -> String {
        let doc_pr = if doc_pr_extra.is_empty() {
            format!(r#"<wp:docPr id="1" name="Picture 1" descr="{}"/>"#, descr)
        } else {
            format!(r#"<wp:docPr id="1" name="Picture 1" descr="{}">{}</wp:docPr>"#, descr, doc_pr_extra)
        };
        format!(
            concat!(
                r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="914400" cy="914400"/><wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
                "{doc_pr}",
                r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
                r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="0" name="photo" descr="{descr}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{r_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="914400" cy="914400"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom>{sp_pr_extra}</pic:spPr>"#,
                "</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"
            ),
            doc_pr = doc_pr,
            descr = descr,
            r_id = r_id,
            sp_pr_extra = sp_pr_extra,
        )
    }

    fn saved_document(doc: &mut MutableDocument) -> (ZipPackage, String) {
        let saved = doc.to_package().unwrap();
        let xml = String::from_utf8(saved.get(part_name::DOCUMENT).unwrap().to_vec()).unwrap();
        (saved, xml)
    }

    #[test]
    fn test_missing_main_document() {
        let mut package = ZipPackage::new();
        package.put(part_name::CONTENT_TYPES, CT.as_bytes().to_vec());
        package.put(
            part_name::PACKAGE_RELS,
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"/>"#.to_vec(),
        );
        let bytes = package.to_archive_bytes().unwrap();
        assert!(matches!(read_document(&bytes), Err(OoxmlError::InvalidFormat(_))));
    }

    #[test]
    fn test_text_and_section() {
        let body = r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p><w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1000" w:right="1200" w:bottom="1000" w:left="1200" w:header="700" w:footer="700" w:gutter="0"/><w:cols w:space="720"/><w:docGrid w:linePitch="360"/></w:sectPr>"#;
        let doc = read_document(&package_with(&document_xml(body), None, &[])).unwrap();
        assert_eq!(doc.body().text(), "Hello");
        let section = doc.section();
        assert_eq!(section.page_width, 11906);
        assert_eq!(section.margin_left, 1200);
        assert_eq!(section.preserved.len(), 2);
    }

    #[test]
    fn test_untouched_unknown_markup_survives_save() {
        let field = r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> PAGE </w:instrText></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#;
        let custom = r#"<w:customXml w:element="invoice"><w:p><w:r><w:t>42</w:t></w:r></w:p></w:customXml>"#;
        let body = format!("{}{}<w:p><w:r><w:t>after</w:t></w:r></w:p>", field, custom);
        let styles: &[u8] = b"<w:styles/>";
        let mut doc = read_document(&package_with(
            &document_xml(&body),
            None,
            &[("word/styles.xml", styles)],
        ))
        .unwrap();
        assert!(matches!(doc.body().elements()[1], BodyElement::Preserved(_)));

        let saved = doc.to_package().unwrap();
        let xml = std::str::from_utf8(saved.get(part_name::DOCUMENT).unwrap()).unwrap();
        assert!(xml.contains(r#"<w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> PAGE </w:instrText></w:r>"#));
        assert!(xml.contains(custom));
        assert!(xml.contains(r#"mc:Ignorable="w14""#));
        assert_eq!(saved.get("word/styles.xml"), Some(styles));
    }

    #[test]
    fn test_image_and_hyperlink_read_back() {
        let mut doc = MutableDocument::new();
        let para = doc.add_paragraph();
        para.add_image(ImageResource::from_bytes(fixtures::gif(96, 48)));
        para.add_hyperlink("https://example.com/a?b=1&c=2", "link");
        let bytes = doc.to_archive_bytes().unwrap();

        let mut reopened = MutableDocument::from_archive_bytes(&bytes).unwrap();
        let para = reopened.body().paragraphs().next().unwrap();
        let drawing = para.drawings().next().unwrap();
        assert_eq!(drawing.image.media_name(), Some("image1.gif"));
        assert_eq!(drawing.image.width_emu(), 914_400);
        assert_eq!(drawing.image.data().unwrap(), fixtures::gif(96, 48).as_slice());
        let link = para.hyperlinks().next().unwrap();
        assert_eq!(link.url(), Some("https://example.com/a?b=1&c=2"));
        assert!(reopened.passthrough_parts().all(|name| !name.starts_with("word/media/")));

        // Saving again keeps the single media part and both relationships
        let again = reopened.to_package().unwrap();
        assert!(again.has("word/media/image1.gif"));
        assert_eq!(reopened.relationships().len(), 2);
    }

    #[test]
    fn test_headers_and_notes_read_back() {
        let mut doc = MutableDocument::new();
        doc.add_header(HeaderFooterType::Default)
            .add_paragraph_with_text("Head");
        let note = doc.add_footnote();
        note.add_paragraph_with_text("A note");
        let id = note.id();
        doc.add_paragraph().add_note_reference(NoteKind::Footnote, id);
        let bytes = doc.to_archive_bytes().unwrap();

        let mut reopened = MutableDocument::from_archive_bytes(&bytes).unwrap();
        let header = reopened
            .header(HeaderFooterType::Default)
            .expect("header read back");
        assert_eq!(header.text(), "Head");
        let footnotes = reopened.footnotes().unwrap();
        assert_eq!(footnotes.notes().len(), 1);
        assert_eq!(footnotes.notes()[0].text(), "A note");
        assert!(!footnotes.separators.is_empty());
    }

    #[test]
    fn test_bookmark_and_control_ids_reserved() {
        let body = r#"<w:p><w:bookmarkStart w:id="7" w:name="intro"/><w:r><w:t>x</w:t></w:r><w:bookmarkEnd w:id="7"/></w:p><w:sdt><w:sdtPr><w:id w:val="1"/></w:sdtPr><w:sdtContent><w:p/></w:sdtContent></w:sdt>"#;
        let mut doc = read_document(&package_with(&document_xml(body), None, &[])).unwrap();
        let para = doc.body().paragraphs().next().unwrap();
        match &para.elements()[0] {
            ParagraphElement::BookmarkStart(bookmark) => assert_eq!(bookmark.id(), 7),
            other => panic!("expected bookmark start, got {:?}", other),
        }
        assert!(doc.bookmark("intro").is_err());
        assert_eq!(doc.bookmark("next").unwrap().id(), 8);
        let control = doc.new_content_control(ContentControlType::RichText);
        assert_eq!(control.id(), Some(2));
    }

    #[test]
    fn test_writer_shaped_picture_is_typed() {
        let gif = fixtures::gif(96, 96);
        let body = format!("<w:p>{}</w:p>", inline_picture("rId1", "alt", "", ""));
        let rels = doc_rels(&[("rId1", "media/image1.gif")], &[]);
        let doc = read_document(&package_with(
            &document_xml(&body),
            Some(&rels),
            &[("word/media/image1.gif", &gif)],
        ))
        .unwrap();
        let drawings = doc.body().drawings();
        assert_eq!(drawings.len(), 1);
        assert_eq!(drawings[0].image().description(), "alt");
        assert_eq!(drawings[0].image().name(), None);
        assert!(doc.passthrough_parts().all(|name| name != "word/media/image1.gif"));
    }

    #[test]
    fn test_drawing_with_unmodelled_markup_stays_raw() {
        let gif = fixtures::gif(96, 96);
        let run = inline_picture(
            "rId1",
            "alt",
            r#"<a:hlinkClick xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" r:id="rId2"/>"#,
            r#"<a:ln w="12700"><a:solidFill><a:srgbClr val="000000"/></a:solidFill></a:ln>"#,
        );
        let body = format!("<w:p>{}</w:p>", run);
        let rels = doc_rels(&[("rId1", "media/image1.gif")], &[("rId2", "https://example.com")]);
        let mut doc = read_document(&package_with(
            &document_xml(&body),
            Some(&rels),
            &[("word/media/image1.gif", &gif)],
        ))
        .unwrap();
        let para = doc.body().paragraphs().next().unwrap();
        assert!(matches!(para.elements()[0], ParagraphElement::Preserved(_)));
        assert_eq!(para.drawings().count(), 0);
        assert!(doc.passthrough_parts().any(|name| name == "word/media/image1.gif"));

        let (saved, xml) = saved_document(&mut doc);
        assert!(xml.contains(&run));
        assert_eq!(saved.get("word/media/image1.gif"), Some(gif.as_slice()));
        assert!(doc.relationships().contains("rId2"));
    }

    #[test]
    fn test_floating_picture_reads_back_typed() {
        let mut doc = MutableDocument::new();
        let para = doc.add_paragraph();
        let drawing = para.add_image(ImageResource::from_bytes(fixtures::gif(96, 48)));
        drawing
            .image_mut()
            .set_rotation(30.0)
            .set_crop(Crop::from_percent(10.0, 0.0, 0.0, 5.0))
            .set_grayscale(true)
            .set_floating(FloatingPosition::new(12_700, -25_400).with_wrap(WrapStyle::Tight));
        let bytes = doc.to_archive_bytes().unwrap();

        let reopened = MutableDocument::from_archive_bytes(&bytes).unwrap();
        let drawings = reopened.body().drawings();
        assert_eq!(drawings.len(), 1);
        let image = drawings[0].image();
        assert_eq!(image.placement(), doc.body().drawings()[0].image().placement());
        assert_eq!(image.crop(), Some(Crop::from_percent(10.0, 0.0, 0.0, 5.0)));
        assert!(image.effects().grayscale);
        assert!((image.rotation() - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_description_character_reference() {
        let gif = fixtures::gif(96, 96);
        let body = format!("<w:p>{}</w:p>", inline_picture("rId1", "line1&#xA;line2", "", ""));
        let rels = doc_rels(&[("rId1", "media/image1.gif")], &[]);
        let mut doc = read_document(&package_with(
            &document_xml(&body),
            Some(&rels),
            &[("word/media/image1.gif", &gif)],
        ))
        .unwrap();
        assert_eq!(doc.body().drawings()[0].image().description(), "line1\nline2");

        let (saved, xml) = saved_document(&mut doc);
        assert!(!xml.contains("&amp;#xA;"));
        let reread = read_document(&saved.to_archive_bytes().unwrap()).unwrap();
        assert_eq!(reread.body().drawings()[0].image().description(), "line1\nline2");
    }

    #[test]
    fn test_extension_run_property_and_revision_ids_survive() {
        let body = r#"<w:p w:rsidR="00A1B2C3" w14:paraId="1A2B3C4D"><w:r w:rsidRPr="00D4E5F6"><w:rPr><w:b/><w:color w:val="FF0000"/><w:sz w:val="24"/><w14:shadow w14:blurRad="50800" w14:algn="tl"/></w:rPr><w:t>x</w:t></w:r></w:p>"#;
        let mut doc = read_document(&package_with(&document_xml(body), None, &[])).unwrap();
        let para = doc.body().paragraphs().next().unwrap();
        assert!(matches!(para.elements()[0], ParagraphElement::Run(_)));

        let (_, xml) = saved_document(&mut doc);
        assert!(xml.contains(
            r#"<w:p w:rsidR="00A1B2C3" w14:paraId="1A2B3C4D"><w:r w:rsidRPr="00D4E5F6"><w:rPr><w:b/><w:color w:val="FF0000"/><w:sz w:val="24"/><w14:shadow w14:blurRad="50800" w14:algn="tl"/></w:rPr>"#
        ));
    }

    #[test]
    fn test_converted_bitmap_gets_free_media_name() {
        let bmp = fixtures::bmp(4, 4, 24, false, 0);
        let png = fixtures::png(8, 8, 9, &[]);
        let body = format!(
            "<w:p>{}{}</w:p>",
            inline_picture("rId1", "", "", ""),
            inline_picture("rId2", "", "", "")
        );
        let rels = doc_rels(&[("rId1", "media/image1.bmp"), ("rId2", "media/image1.png")], &[]);
        let mut doc = read_document(&package_with(
            &document_xml(&body),
            Some(&rels),
            &[("word/media/image1.bmp", &bmp), ("word/media/image1.png", &png)],
        ))
        .unwrap();
        assert_eq!(doc.body().drawings().len(), 2);

        let report = doc.optimize_images();
        assert!(report.optimized_count >= 1);
        let drawings = doc.body().drawings();
        assert_eq!(drawings[0].image().media_name(), Some("image2.png"));
        assert_eq!(drawings[1].image().media_name(), Some("image1.png"));
        let converted = drawings[0].image().data().unwrap().to_vec();
        let kept = drawings[1].image().data().unwrap().to_vec();
        assert_eq!(
            doc.relationships().get("rId1").map(|rel| rel.target_ref()),
            Some("media/image2.png")
        );
        assert_eq!(
            doc.relationships().get("rId2").map(|rel| rel.target_ref()),
            Some("media/image1.png")
        );

        let (saved, _) = saved_document(&mut doc);
        assert!(!saved.has("word/media/image1.bmp"));
        assert_eq!(saved.get("word/media/image2.png"), Some(converted.as_slice()));
        assert_eq!(saved.get("word/media/image1.png"), Some(kept.as_slice()));
    }
}
