/// Mutable Word document and its serialization pipeline.
///
/// Writing a document runs three steps. [`MutableDocument::stage`] walks every
/// part in document order (body, headers, footers, footnotes, endnotes),
/// registers the relationships that drawings and external hyperlinks need,
/// names new media parts `image{n}.{ext}` and reassigns `wp:docPr` ids in one
/// sweep. Emission then turns each part into XML using only the tree and the
/// part's relationship table. Finally the parts, media and `[Content_Types].xml`
/// are written to a [`ZipPackage`].
use super::bookmark::MutableBookmark;
use super::content_control::{ContentControlType, MutableContentControl};
use super::drawing::Drawing;
use super::header_footer::{HeaderFooter, HeaderFooterKind, HeaderFooterType};
use super::hyperlink::{HyperlinkTarget, MutableHyperlink};
use super::ids::{IdentityRegistry, media_index};
use super::note::{Note, NoteKind, NotesPart};
use super::paragraph::MutableParagraph;
use super::preserved::RawXml;
use super::section::SectionProperties;
use super::table::MutableTable;
use super::{EmitContext, NodeVisitor, NoteIds};
use crate::images::{ImageFormat, OptimizationReport, optimize};
use crate::ooxml::docx::image::Payload;
use crate::ooxml::error::{OoxmlError, Result};
use crate::ooxml::opc::constants::{content_type, part_name};
use crate::ooxml::opc::{
    ContentTypes, PackURI, PartStore, RelType, Relationships, TargetMode, ZipPackage,
};
use crate::options::DocumentOptions;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Namespaces every generated part root declares.
const NAMESPACES: &[(&str, &str)] = &[
    ("w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
    ("r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
    ("wp", "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"),
    ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    ("pic", "http://schemas.openxmlformats.org/drawingml/2006/picture"),
    ("w14", "http://schemas.microsoft.com/office/word/2010/wordml"),
];

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Add any of [`NAMESPACES`] missing from a root start tag read from a package.
pub(crate) fn ensure_namespaces(root: &str) -> String {
    let trimmed = root.trim_end();
    let body = trimmed
        .strip_suffix("/>")
        .or_else(|| trimmed.strip_suffix('>'))
        .unwrap_or(trimmed);
    let mut tag = String::with_capacity(body.len() + 256);
    tag.push_str(body);
    for (prefix, uri) in NAMESPACES {
        if !body.contains(&format!("xmlns:{}=", prefix)) {
            tag.push_str(" xmlns:");
            tag.push_str(prefix);
            tag.push_str("=\"");
            tag.push_str(uri);
            tag.push('"');
        }
    }
    tag.push('>');
    tag
}

/// Write the XML declaration and the root start tag of a part: the tag read
/// from the package when there is one, else `<w:{local}>` with [`NAMESPACES`].
pub(crate) fn write_root_start(xml: &mut String, root: Option<&str>, local: &str) {
    xml.push_str(XML_DECLARATION);
    match root {
        Some(root) => xml.push_str(&ensure_namespaces(root)),
        None => {
            xml.push_str("<w:");
            xml.push_str(local);
            for (prefix, uri) in NAMESPACES {
                xml.push_str(" xmlns:");
                xml.push_str(prefix);
                xml.push_str("=\"");
                xml.push_str(uri);
                xml.push('"');
            }
            xml.push('>');
        },
    }
}

/// Block-level content element.
#[derive(Debug, Clone)]
pub enum BodyElement {
    Paragraph(MutableParagraph),
    Table(MutableTable),
    /// Block-level content control (`w:sdt`)
    StructuredTag(MutableContentControl),
    /// Markup kept verbatim from a parsed part
    Preserved(RawXml),
}

/// A sequence of block-level content: the document body, a table cell, a
/// header or footer, a note or a content control.
#[derive(Debug, Clone, Default)]
pub struct DocumentBody {
    /// Content elements (paragraphs, tables, etc.) in document order
    pub(crate) elements: Vec<BodyElement>,
}

impl DocumentBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new paragraph.
    pub fn add_paragraph(&mut self) -> &mut MutableParagraph {
        self.elements
            .push(BodyElement::Paragraph(MutableParagraph::new()));
        match self.elements.last_mut() {
            Some(BodyElement::Paragraph(p)) => p,
            _ => unreachable!(),
        }
    }

    /// Add a paragraph holding one run of text.
    pub fn add_paragraph_with_text(&mut self, text: &str) -> &mut MutableParagraph {
        let para = self.add_paragraph();
        para.add_run_with_text(text);
        para
    }

    /// Add a new table with single borders on every edge.
    pub fn add_table(&mut self, rows: usize, cols: usize) -> &mut MutableTable {
        self.elements
            .push(BodyElement::Table(MutableTable::new(rows, cols)));
        match self.elements.last_mut() {
            Some(BodyElement::Table(t)) => t,
            _ => unreachable!(),
        }
    }

    /// Append a content control, usually one made by
    /// [`MutableDocument::new_content_control`].
    pub fn push_content_control(
        &mut self,
        control: MutableContentControl,
    ) -> &mut MutableContentControl {
        self.elements.push(BodyElement::StructuredTag(control));
        match self.elements.last_mut() {
            Some(BodyElement::StructuredTag(c)) => c,
            _ => unreachable!(),
        }
    }

    pub fn elements(&self) -> &[BodyElement] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut Vec<BodyElement> {
        &mut self.elements
    }

    /// Get the number of top-level paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Get the number of top-level tables.
    pub fn table_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, BodyElement::Table(_)))
            .count()
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &MutableParagraph> {
        self.elements.iter().filter_map(|e| match e {
            BodyElement::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Get the `index`-th top-level paragraph.
    pub fn paragraph(&mut self, index: usize) -> Option<&mut MutableParagraph> {
        self.elements
            .iter_mut()
            .filter_map(|e| match e {
                BodyElement::Paragraph(p) => Some(p),
                _ => None,
            })
            .nth(index)
    }

    /// Get the `index`-th top-level table.
    pub fn table(&mut self, index: usize) -> Option<&mut MutableTable> {
        self.elements
            .iter_mut()
            .filter_map(|e| match e {
                BodyElement::Table(t) => Some(t),
                _ => None,
            })
            .nth(index)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Text of every paragraph, one line per paragraph, descending into
    /// tables and content controls.
    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        self.collect_text(&mut lines);
        lines.join("\n")
    }

    fn collect_text(&self, lines: &mut Vec<String>) {
        for element in &self.elements {
            match element {
                BodyElement::Paragraph(p) => lines.push(p.text()),
                BodyElement::Table(t) => {
                    for row in t.rows() {
                        for cell in row.cells() {
                            cell.content().collect_text(lines);
                        }
                    }
                },
                BodyElement::StructuredTag(c) => c.content().collect_text(lines),
                BodyElement::Preserved(_) => {},
            }
        }
    }

    /// Every drawing in document order, including those in tables and
    /// content controls.
    pub fn drawings(&self) -> Vec<&Drawing> {
        let mut drawings = Vec::new();
        self.collect_drawings(&mut drawings);
        drawings
    }

    fn collect_drawings<'a>(&'a self, drawings: &mut Vec<&'a Drawing>) {
        for element in &self.elements {
            match element {
                BodyElement::Paragraph(p) => drawings.extend(p.drawings()),
                BodyElement::Table(t) => {
                    for row in t.rows() {
                        for cell in row.cells() {
                            cell.content().collect_drawings(drawings);
                        }
                    }
                },
                BodyElement::StructuredTag(c) => c.content().collect_drawings(drawings),
                BodyElement::Preserved(_) => {},
            }
        }
    }

    /// Whether a container holding this content must append `<w:p/>` to end
    /// on a paragraph.
    pub(crate) fn needs_trailing_paragraph(&self) -> bool {
        match self.elements.last() {
            Some(BodyElement::Paragraph(_)) => false,
            Some(BodyElement::Preserved(raw)) => raw.local_name() != "p",
            _ => true,
        }
    }

    pub(crate) fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        for element in &mut self.elements {
            match element {
                BodyElement::Paragraph(p) => p.walk(visitor)?,
                BodyElement::Table(t) => t.walk(visitor)?,
                BodyElement::StructuredTag(c) => c.walk(visitor)?,
                BodyElement::Preserved(raw) => visitor.preserved(raw)?,
            }
        }
        Ok(())
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        for element in &self.elements {
            match element {
                BodyElement::Paragraph(p) => p.to_xml(xml, ctx)?,
                BodyElement::Table(t) => t.to_xml(xml, ctx)?,
                BodyElement::StructuredTag(c) => c.to_xml(xml, ctx)?,
                BodyElement::Preserved(raw) => ctx.emit_preserved(raw, xml)?,
            }
        }
        Ok(())
    }
}

/// The node tree of one part, borrowed apart from its relationship table.
enum Nodes<'a> {
    Document {
        prelude: &'a [RawXml],
        body: &'a mut DocumentBody,
        section: &'a SectionProperties,
    },
    Body(&'a mut DocumentBody),
    Notes {
        separators: &'a [RawXml],
        notes: &'a mut Vec<Note>,
    },
}

struct PartMut<'a> {
    rels: &'a mut Relationships,
    nodes: Nodes<'a>,
}

impl PartMut<'_> {
    fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        match &self.nodes {
            Nodes::Document {
                prelude, section, ..
            } => {
                for raw in prelude.iter().chain(section.preserved.iter()) {
                    visitor.preserved(raw)?;
                }
            },
            Nodes::Notes { separators, .. } => {
                for raw in separators.iter() {
                    visitor.preserved(raw)?;
                }
            },
            Nodes::Body(_) => {},
        }
        walk_content(&mut self.nodes, visitor)
    }
}

/// Visit the editable content of a part, leaving its preserved prelude out.
fn walk_content(nodes: &mut Nodes<'_>, visitor: &mut dyn NodeVisitor) -> Result<()> {
    match nodes {
        Nodes::Document { body, .. } | Nodes::Body(body) => body.walk(visitor),
        Nodes::Notes { notes, .. } => {
            for note in notes.iter_mut() {
                note.content.walk(visitor)?;
            }
            Ok(())
        },
    }
}

/// Directory of the part owning `rels`, for relative targets.
fn base_uri(rels: &Relationships) -> String {
    match PackURI::new(rels.source()) {
        Ok(uri) => uri.base_uri().to_string(),
        Err(_) => "/".to_string(),
    }
}

/// Relationship target of media part `media_name` as seen from `base`.
fn media_target(media_name: &str, base: &str) -> String {
    PackURI::from_membername(&format!("{}{}", part_name::MEDIA_DIR, media_name)).relative_ref(base)
}

/// Ids and names already in use before staging starts.
#[derive(Default)]
struct Survey {
    doc_pr: HashSet<u32>,
    media: HashSet<String>,
}

impl NodeVisitor for Survey {
    fn drawing(&mut self, drawing: &mut Drawing) -> Result<()> {
        if let Some(name) = drawing.image.media_name() {
            self.media.insert(name.to_string());
        }
        Ok(())
    }

    fn preserved(&mut self, raw: &RawXml) -> Result<()> {
        self.doc_pr.extend(raw.doc_pr_ids());
        Ok(())
    }
}

/// Attaches relationships, media names and docPr ids within one part.
struct StageVisitor<'a> {
    rels: &'a mut Relationships,
    base: String,
    registry: &'a mut IdentityRegistry,
    taken_media: &'a mut HashSet<String>,
}

impl StageVisitor<'_> {
    fn allocate_media_name(&mut self, ext: &str) -> String {
        loop {
            let name = format!("image{}.{}", self.registry.next_media_index(), ext);
            if self.taken_media.insert(name.clone()) {
                return name;
            }
        }
    }
}

impl NodeVisitor for StageVisitor<'_> {
    fn drawing(&mut self, drawing: &mut Drawing) -> Result<()> {
        drawing.doc_pr_id = Some(self.registry.next_doc_pr());

        let media_name = match drawing.image.media_name.clone() {
            Some(name) => name,
            None => {
                let name = self.allocate_media_name(drawing.image.extension());
                drawing.image.media_name = Some(name.clone());
                name
            },
        };
        let target = media_target(&media_name, &self.base);

        let linked = drawing
            .image
            .relationship_id
            .as_deref()
            .and_then(|r_id| self.rels.get(r_id))
            .is_some_and(|rel| {
                *rel.reltype() == RelType::Image && !rel.is_external() && rel.target_ref() == target
            });
        if !linked {
            let r_id = match self.rels.find(&RelType::Image, &target) {
                Some(rel) => rel.r_id().to_string(),
                None => self.rels.register(RelType::Image, target, TargetMode::Internal),
            };
            log::debug!("{}: image {} linked as {}", self.rels.source(), media_name, r_id);
            drawing.image.relationship_id = Some(r_id);
        }
        Ok(())
    }

    fn hyperlink(&mut self, link: &mut MutableHyperlink) -> Result<()> {
        match &link.target {
            HyperlinkTarget::External(url) => {
                let linked = link
                    .r_id
                    .as_deref()
                    .and_then(|r_id| self.rels.get(r_id))
                    .is_some_and(|rel| {
                        *rel.reltype() == RelType::Hyperlink && rel.target_ref() == url.as_str()
                    });
                if !linked {
                    let r_id = match self.rels.find(&RelType::Hyperlink, url) {
                        Some(rel) => rel.r_id().to_string(),
                        None => self.rels.register(
                            RelType::Hyperlink,
                            url.clone(),
                            TargetMode::External,
                        ),
                    };
                    link.r_id = Some(r_id);
                }
            },
            HyperlinkTarget::Anchor(_) => link.r_id = None,
        }
        Ok(())
    }
}

/// Runs the optimizer over the drawings of one part.
struct OptimizeVisitor<'a> {
    rels: &'a mut Relationships,
    base: String,
    level: u32,
    report: &'a mut OptimizationReport,
    registry: &'a mut IdentityRegistry,
    taken_media: &'a mut HashSet<String>,
    /// Media names already converted in this pass, old name to new
    renamed: &'a mut HashMap<String, String>,
}

impl OptimizeVisitor<'_> {
    /// `{stem}.{ext}` when free, else a fresh `image{n}.{ext}`.
    fn converted_name(&mut self, old_name: &str, ext: &str) -> String {
        if let Some(name) = self.renamed.get(old_name) {
            return name.clone();
        }
        let stem = old_name.rsplit_once('.').map_or(old_name, |(stem, _)| stem);
        let mut name = format!("{}.{}", stem, ext);
        while !self.taken_media.insert(name.clone()) {
            name = format!("image{}.{}", self.registry.next_media_index(), ext);
        }
        self.renamed.insert(old_name.to_string(), name.clone());
        name
    }
}

impl NodeVisitor for OptimizeVisitor<'_> {
    fn drawing(&mut self, drawing: &mut Drawing) -> Result<()> {
        let image = &mut drawing.image;
        let Payload::Loaded { bytes, .. } = &image.payload else {
            log::debug!("skipping unloaded image during optimization");
            return Ok(());
        };
        let before = bytes.len();
        let Some(optimized) = optimize(bytes, image.format, self.level) else {
            return Ok(());
        };
        let original_format = image.format;
        let after = optimized.data.len();
        let changed_format = optimized.changed_format(original_format);
        image.replace_payload(optimized);
        self.report.record(before, after);

        if changed_format && let Some(old_name) = drawing.image.media_name.clone() {
            let new_name = self.converted_name(&old_name, drawing.image.extension());
            let image = &mut drawing.image;
            log::debug!("renaming media {} -> {}", old_name, new_name);
            if let Some(r_id) = image.relationship_id.as_deref()
                && self.rels.contains(r_id)
            {
                self.rels
                    .rewrite_target(r_id, media_target(&new_name, &self.base))?;
            }
            image.media_name = Some(new_name);
        }
        Ok(())
    }
}

/// Unloaded image paths, in first-seen order.
#[derive(Default)]
struct PendingImages {
    paths: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl NodeVisitor for PendingImages {
    fn drawing(&mut self, drawing: &mut Drawing) -> Result<()> {
        if let Payload::Unloaded { path } = &drawing.image.payload
            && self.seen.insert(path.clone())
        {
            self.paths.push(path.clone());
        }
        Ok(())
    }
}

struct AttachImages<'a> {
    loaded: &'a HashMap<PathBuf, Vec<u8>>,
    options: &'a DocumentOptions,
}

impl NodeVisitor for AttachImages<'_> {
    fn drawing(&mut self, drawing: &mut Drawing) -> Result<()> {
        let bytes = match &drawing.image.payload {
            Payload::Unloaded { path } => self.loaded.get(path).cloned(),
            Payload::Loaded { .. } => None,
        };
        if let Some(bytes) = bytes {
            drawing.image.attach_bytes(bytes, self.options);
        }
        Ok(())
    }
}

/// A mutable Word document.
///
/// # Example
///
/// ```rust
/// use quire::ooxml::docx::MutableDocument;
/// use quire::ooxml::docx::image::ImageResource;
///
/// let mut doc = MutableDocument::new();
/// let para = doc.add_paragraph();
/// para.add_run_with_text("See ");
/// para.add_hyperlink("https://example.com", "example");
///
/// let gif = b"GIF89a\x10\x00\x10\x00\x00\x00\x00\x3b".to_vec();
/// doc.add_paragraph().add_image(ImageResource::from_bytes(gif));
///
/// let bytes = doc.to_archive_bytes()?;
/// let reopened = MutableDocument::from_archive_bytes(&bytes)?;
/// assert_eq!(reopened.body().drawings().len(), 1);
/// # Ok::<(), quire::ooxml::error::OoxmlError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MutableDocument {
    /// Main document part name, normally `/word/document.xml`
    pub(crate) partname: PackURI,
    /// Root start tag as read from the package
    pub(crate) root: Option<String>,
    /// Children of the root before `w:body` (e.g. `w:background`), verbatim
    pub(crate) prelude: Vec<RawXml>,
    pub(crate) body: DocumentBody,
    /// Final section properties (the body's `w:sectPr`)
    pub(crate) section: SectionProperties,
    /// Relationships of the main document part
    pub(crate) rels: Relationships,
    pub(crate) headers_footers: Vec<HeaderFooter>,
    pub(crate) footnotes: Option<NotesPart>,
    pub(crate) endnotes: Option<NotesPart>,
    pub(crate) registry: IdentityRegistry,
    pub(crate) options: DocumentOptions,
    /// Package-level relationships (`_rels/.rels`)
    pub(crate) package_rels: Relationships,
    pub(crate) content_types: ContentTypes,
    /// Parts carried over untouched, by member name: styles, numbering,
    /// theme, settings and media only referenced from preserved markup
    pub(crate) passthrough: BTreeMap<String, Vec<u8>>,
}

impl Default for MutableDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MutableDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::with_options(DocumentOptions::default())
    }

    pub fn with_options(options: DocumentOptions) -> Self {
        let partname = PackURI::from_membername(part_name::DOCUMENT);
        Self {
            rels: Relationships::new(partname.as_str()),
            partname,
            root: None,
            prelude: Vec::new(),
            body: DocumentBody::default(),
            section: SectionProperties::default(),
            headers_footers: Vec::new(),
            footnotes: None,
            endnotes: None,
            registry: IdentityRegistry::new(),
            options,
            package_rels: Relationships::new("/"),
            content_types: ContentTypes::new(),
            passthrough: BTreeMap::new(),
        }
    }

    /// Open a `.docx` file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_archive_bytes(&bytes)
    }

    /// Parse a `.docx` archive held in memory.
    pub fn from_archive_bytes(bytes: &[u8]) -> Result<Self> {
        crate::ooxml::docx::reader::read_document(bytes)
    }

    /// Load every file-backed image, then write the document to `path`.
    pub async fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_images_loaded().await?;
        let bytes = self.to_archive_bytes()?;
        tokio::fs::write(path.as_ref(), bytes).await?;
        log::debug!("saved document to {}", path.as_ref().display());
        Ok(())
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut DocumentOptions {
        &mut self.options
    }

    pub fn body(&self) -> &DocumentBody {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut DocumentBody {
        &mut self.body
    }

    /// Add a new paragraph to the end of the document.
    pub fn add_paragraph(&mut self) -> &mut MutableParagraph {
        self.body.add_paragraph()
    }

    /// Add a paragraph with text.
    pub fn add_paragraph_with_text(&mut self, text: &str) -> &mut MutableParagraph {
        self.body.add_paragraph_with_text(text)
    }

    /// Add a table to the end of the document.
    pub fn add_table(&mut self, rows: usize, cols: usize) -> &mut MutableTable {
        self.body.add_table(rows, cols)
    }

    /// Get the number of paragraphs in the document.
    pub fn paragraph_count(&self) -> usize {
        self.body.paragraph_count()
    }

    /// Get the number of tables in the document.
    pub fn table_count(&self) -> usize {
        self.body.table_count()
    }

    /// Get a reference to a paragraph by index.
    pub fn paragraph(&mut self, index: usize) -> Option<&mut MutableParagraph> {
        self.body.paragraph(index)
    }

    /// Get a reference to a table by index.
    pub fn table(&mut self, index: usize) -> Option<&mut MutableTable> {
        self.body.table(index)
    }

    /// A content control with an id from this document's registry, for
    /// placing anywhere (table cells, notes, headers).
    pub fn new_content_control(&mut self, control_type: ContentControlType) -> MutableContentControl {
        MutableContentControl::new(Some(self.registry.next_sdt_id()), control_type)
    }

    /// Add a content control to the end of the document.
    pub fn add_content_control(
        &mut self,
        control_type: ContentControlType,
    ) -> &mut MutableContentControl {
        let control = self.new_content_control(control_type);
        self.body.push_content_control(control)
    }

    /// Allocate a bookmark. Place it with
    /// [`MutableParagraph::add_bookmark_start`] and
    /// [`MutableParagraph::add_bookmark_end`].
    ///
    /// Fails with [`OoxmlError::DuplicateIdentity`] if the name is taken.
    pub fn bookmark(&mut self, name: &str) -> Result<MutableBookmark> {
        let id = self.registry.register_bookmark(name)?;
        Ok(MutableBookmark::new(id, name.to_string()))
    }

    pub fn section(&self) -> &SectionProperties {
        &self.section
    }

    pub fn section_mut(&mut self) -> &mut SectionProperties {
        &mut self.section
    }

    /// The header for `slot`, created with its own part if missing.
    pub fn add_header(&mut self, slot: HeaderFooterType) -> &mut HeaderFooter {
        self.add_header_footer(HeaderFooterKind::Header, slot)
    }

    /// The footer for `slot`, created with its own part if missing.
    pub fn add_footer(&mut self, slot: HeaderFooterType) -> &mut HeaderFooter {
        self.add_header_footer(HeaderFooterKind::Footer, slot)
    }

    pub fn header(&mut self, slot: HeaderFooterType) -> Option<&mut HeaderFooter> {
        let index = self.header_footer_index(HeaderFooterKind::Header, slot)?;
        self.headers_footers.get_mut(index)
    }

    pub fn footer(&mut self, slot: HeaderFooterType) -> Option<&mut HeaderFooter> {
        let index = self.header_footer_index(HeaderFooterKind::Footer, slot)?;
        self.headers_footers.get_mut(index)
    }

    /// All header and footer parts.
    pub fn headers_footers(&self) -> &[HeaderFooter] {
        &self.headers_footers
    }

    fn header_footer_index(&self, kind: HeaderFooterKind, slot: HeaderFooterType) -> Option<usize> {
        let partname = self.section.reference(kind, slot)?;
        self.headers_footers
            .iter()
            .position(|hf| &hf.partname == partname)
    }

    fn add_header_footer(&mut self, kind: HeaderFooterKind, slot: HeaderFooterType) -> &mut HeaderFooter {
        let index = match self.header_footer_index(kind, slot) {
            Some(index) => index,
            None => {
                let partname = self.free_partname(kind.stem());
                self.section.set_reference(kind, slot, partname.clone());
                self.headers_footers.push(HeaderFooter::new(kind, partname));
                self.headers_footers.len() - 1
            },
        };
        &mut self.headers_footers[index]
    }

    /// First `word/{stem}{n}.xml` not used by any part.
    fn free_partname(&self, stem: &str) -> PackURI {
        let mut n = 1u32;
        loop {
            let name = format!("word/{}{}.xml", stem, n);
            let taken = self.passthrough.contains_key(&name)
                || self
                    .headers_footers
                    .iter()
                    .any(|hf| hf.partname.membername() == name);
            if !taken {
                return PackURI::from_membername(&name);
            }
            n += 1;
        }
    }

    /// Add a footnote. Reference it from a run with
    /// [`MutableParagraph::add_note_reference`].
    pub fn add_footnote(&mut self) -> &mut Note {
        self.footnotes
            .get_or_insert_with(|| NotesPart::new(NoteKind::Footnote))
            .add_note()
    }

    /// Add an endnote.
    pub fn add_endnote(&mut self) -> &mut Note {
        self.endnotes
            .get_or_insert_with(|| NotesPart::new(NoteKind::Endnote))
            .add_note()
    }

    pub fn footnotes(&self) -> Option<&NotesPart> {
        self.footnotes.as_ref()
    }

    pub fn endnotes(&self) -> Option<&NotesPart> {
        self.endnotes.as_ref()
    }

    /// Relationships of the main document part.
    pub fn relationships(&self) -> &Relationships {
        &self.rels
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// Parts carried over from the source package, by member name.
    pub fn passthrough_parts(&self) -> impl Iterator<Item = &str> {
        self.passthrough.keys().map(String::as_str)
    }

    /// Remove all content and reset the identity counters.
    ///
    /// Relationships of images, hyperlinks, headers, footers and notes are
    /// dropped; their ids stay retired. Passthrough parts are kept.
    pub fn clear(&mut self) {
        self.body.clear();
        self.prelude.clear();
        self.section = SectionProperties::default();

        for hf in self.headers_footers.drain(..) {
            self.content_types.remove_override(&hf.partname);
        }
        for notes in [self.footnotes.take(), self.endnotes.take()].into_iter().flatten() {
            self.content_types.remove_override(&notes.partname);
        }

        let stale: Vec<String> = self
            .rels
            .iter()
            .filter(|rel| {
                matches!(
                    rel.reltype(),
                    RelType::Image
                        | RelType::Hyperlink
                        | RelType::Header
                        | RelType::Footer
                        | RelType::Footnotes
                        | RelType::Endnotes
                )
            })
            .map(|rel| rel.r_id().to_string())
            .collect();
        for r_id in stale {
            self.rels.remove(&r_id);
        }

        self.registry.clear();
    }

    /// Every part's relationship table paired with its nodes, in staging order.
    fn parts_mut(&mut self) -> (Vec<PartMut<'_>>, &mut IdentityRegistry) {
        let Self {
            prelude,
            body,
            section,
            rels,
            headers_footers,
            footnotes,
            endnotes,
            registry,
            ..
        } = self;

        let mut parts = vec![PartMut {
            rels,
            nodes: Nodes::Document {
                prelude,
                body,
                section,
            },
        }];

        let mut hfs: Vec<&mut HeaderFooter> = headers_footers.iter_mut().collect();
        hfs.sort_by_key(|hf| hf.kind == HeaderFooterKind::Footer);
        for hf in hfs {
            parts.push(PartMut {
                rels: &mut hf.rels,
                nodes: Nodes::Body(&mut hf.content),
            });
        }

        for notes in [footnotes, endnotes].into_iter().flatten() {
            parts.push(PartMut {
                rels: &mut notes.rels,
                nodes: Nodes::Notes {
                    separators: &notes.separators,
                    notes: &mut notes.notes,
                },
            });
        }

        (parts, registry)
    }

    fn walk_all(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        let (parts, _) = self.parts_mut();
        for mut part in parts {
            part.walk(visitor)?;
        }
        Ok(())
    }

    /// Read every file-backed image that is not loaded yet.
    ///
    /// Each distinct path is read once with `tokio::fs`. On the first I/O
    /// failure the error is returned and the remaining images stay unloaded.
    pub async fn ensure_images_loaded(&mut self) -> Result<()> {
        let mut pending = PendingImages::default();
        self.walk_all(&mut pending)?;
        if pending.paths.is_empty() {
            return Ok(());
        }

        let mut loaded = HashMap::with_capacity(pending.paths.len());
        for path in pending.paths {
            let bytes = tokio::fs::read(&path).await?;
            log::debug!("loaded image {} ({} bytes)", path.display(), bytes.len());
            loaded.insert(path, bytes);
        }

        let options = self.options.clone();
        self.walk_all(&mut AttachImages {
            loaded: &loaded,
            options: &options,
        })
    }

    /// Losslessly optimize every loaded image in every part.
    ///
    /// PNGs are re-compressed when that makes them smaller; BMPs become PNGs,
    /// with the media part renamed and its relationship target rewritten under
    /// the same id. Optimization never fails the document.
    pub fn optimize_images(&mut self) -> OptimizationReport {
        let mut report = OptimizationReport::default();
        let level = self.options.png_compression;
        let mut taken_media = match self.taken_media() {
            Ok(taken) => taken,
            Err(e) => {
                log::warn!("image optimization skipped: {}", e);
                return report;
            },
        };
        let mut renamed = HashMap::new();
        let (parts, registry) = self.parts_mut();
        for part in parts {
            let PartMut { rels, mut nodes } = part;
            let mut visitor = OptimizeVisitor {
                base: base_uri(rels),
                rels,
                level,
                report: &mut report,
                registry: &mut *registry,
                taken_media: &mut taken_media,
                renamed: &mut renamed,
            };
            if let Err(e) = walk_content(&mut nodes, &mut visitor) {
                log::warn!("image optimization stopped early: {}", e);
            }
        }
        log::debug!(
            "optimized {} images, saved {} bytes",
            report.optimized_count,
            report.total_saved_bytes
        );
        report
    }

    /// Attach relationship ids, media names and docPr ids to every node that
    /// needs them, and link the header, footer and notes parts.
    ///
    /// Staging is idempotent: nodes whose ids still resolve keep them.
    pub fn stage(&mut self) -> Result<()> {
        let mut survey = Survey::default();
        self.walk_all(&mut survey)?;
        let mut taken_media = self.taken_media()?;

        let (parts, registry) = self.parts_mut();
        registry.begin_doc_pr_sweep(survey.doc_pr);
        for part in parts {
            let PartMut { rels, mut nodes } = part;
            let mut visitor = StageVisitor {
                base: base_uri(rels),
                rels,
                registry: &mut *registry,
                taken_media: &mut taken_media,
            };
            walk_content(&mut nodes, &mut visitor)?;
        }

        self.link_parts()?;
        Ok(())
    }

    /// Media names used by drawings or passthrough members. Their indices are
    /// reserved so new `image{n}` names stay clear of them.
    fn taken_media(&mut self) -> Result<HashSet<String>> {
        let mut survey = Survey::default();
        self.walk_all(&mut survey)?;
        let mut taken = survey.media;
        taken.extend(
            self.passthrough
                .keys()
                .filter_map(|name| name.strip_prefix(part_name::MEDIA_DIR))
                .map(str::to_string),
        );
        for index in taken.iter().filter_map(|name| media_index(name)) {
            self.registry.reserve_media_index(index);
        }
        Ok(taken)
    }

    /// Make sure the package points at the document and the document points
    /// at its header, footer and notes parts.
    fn link_parts(&mut self) -> Result<()> {
        let document_target = self.partname.relative_ref("/");
        if self
            .package_rels
            .find(&RelType::OfficeDocument, &document_target)
            .is_none()
        {
            self.package_rels
                .register(RelType::OfficeDocument, document_target, TargetMode::Internal);
        }

        let base = self.partname.base_uri().to_string();
        let mut linked: Vec<(RelType, String)> = self
            .headers_footers
            .iter()
            .map(|hf| (hf.kind.reltype(), hf.partname.relative_ref(&base)))
            .collect();
        for notes in [&self.footnotes, &self.endnotes].into_iter().flatten() {
            linked.push((notes.kind.reltype(), notes.partname.relative_ref(&base)));
        }
        for (reltype, target) in linked {
            if self.rels.find(&reltype, &target).is_none() {
                self.rels.register(reltype, target, TargetMode::Internal);
            }
        }
        Ok(())
    }

    fn note_ids(&self) -> NoteIds {
        NoteIds {
            footnotes: self
                .footnotes
                .as_ref()
                .map(|part| part.ids().collect())
                .unwrap_or_default(),
            endnotes: self
                .endnotes
                .as_ref()
                .map(|part| part.ids().collect())
                .unwrap_or_default(),
        }
    }

    /// Serialize the main document part. Expects a staged tree.
    pub(crate) fn document_xml(&self, notes: &NoteIds) -> Result<String> {
        let ctx = EmitContext::new(&self.rels, notes);
        let mut xml = String::with_capacity(4096);

        write_root_start(&mut xml, self.root.as_deref(), "document");
        for raw in &self.prelude {
            ctx.emit_preserved(raw, &mut xml)?;
        }
        xml.push_str("<w:body>");
        self.body.to_xml(&mut xml, &ctx)?;
        // The sectPr must be the last element in the body
        self.section.to_xml(&mut xml, &ctx)?;
        xml.push_str("</w:body></w:document>");

        Ok(xml)
    }

    /// Stage the tree and write every part into a package.
    pub fn to_package(&mut self) -> Result<ZipPackage> {
        if self.options.optimize_images_on_save {
            self.optimize_images();
        }
        self.stage()?;

        let notes = self.note_ids();
        let mut package = ZipPackage::new().with_compression_level(self.options.zip_compression);
        let mut content_types = self.content_types.clone();

        for (name, data) in &self.passthrough {
            package.put(name, data.clone());
        }

        let document_xml = self.document_xml(&notes)?;
        put_part(
            &mut package,
            &mut content_types,
            &self.partname,
            content_type::WML_DOCUMENT_MAIN,
            document_xml,
            &self.rels,
        );

        let mut drawings = self.body.drawings();
        for hf in &self.headers_footers {
            let xml = hf.to_xml(&notes)?;
            put_part(
                &mut package,
                &mut content_types,
                &hf.partname,
                hf.kind.content_type(),
                xml,
                &hf.rels,
            );
            drawings.extend(hf.content.drawings());
        }
        for part in [&self.footnotes, &self.endnotes].into_iter().flatten() {
            let xml = part.to_xml(&notes)?;
            put_part(
                &mut package,
                &mut content_types,
                &part.partname,
                part.kind.content_type(),
                xml,
                &part.rels,
            );
            for note in &part.notes {
                drawings.extend(note.content.drawings());
            }
        }

        let mut written = HashSet::new();
        for drawing in drawings {
            let image = drawing.image();
            let media_name = image.media_name().ok_or_else(|| OoxmlError::UnresolvedReference {
                part: self.partname.to_string(),
                id: "image without media name".to_string(),
            })?;
            if !written.insert(media_name) {
                continue;
            }
            let uri = PackURI::from_membername(&format!("{}{}", part_name::MEDIA_DIR, media_name));
            if content_types.content_type_for(&uri).is_none() {
                content_types.add_default(uri.ext(), ImageFormat::from_extension(uri.ext()).mime_type());
            }
            package.put(uri.membername(), image.data()?.to_vec());
        }

        package.put(
            part_name::PACKAGE_RELS,
            self.package_rels.to_xml().into_bytes(),
        );
        package.put(part_name::CONTENT_TYPES, content_types.to_xml().into_bytes());

        log::debug!(
            "wrote package: {} parts, {} media",
            package.len(),
            written.len()
        );
        Ok(package)
    }

    /// Serialize the document to `.docx` bytes.
    ///
    /// Synchronous and free of I/O: file-backed images must have been loaded
    /// (see [`ensure_images_loaded`](Self::ensure_images_loaded)), otherwise
    /// this fails with [`OoxmlError::PayloadNotLoaded`].
    pub fn to_archive_bytes(&mut self) -> Result<Vec<u8>> {
        Ok(self.to_package()?.to_archive_bytes()?)
    }
}

/// Write a part and its relationships, and register its content type unless
/// the package already declares a specific one.
fn put_part(
    package: &mut ZipPackage,
    content_types: &mut ContentTypes,
    partname: &PackURI,
    part_content_type: &str,
    xml: String,
    rels: &Relationships,
) {
    package.put(partname.membername(), xml.into_bytes());
    if !rels.is_empty() {
        package.put(partname.rels_uri().membername(), rels.to_xml().into_bytes());
    }
    match content_types.content_type_for(partname) {
        Some(existing) if existing != content_type::XML => {},
        _ => content_types.add_override(partname, part_content_type),
    }
}
