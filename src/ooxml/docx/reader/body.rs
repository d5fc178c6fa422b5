//! Conversion of parsed WordprocessingML into the editable element model.
//!
//! Each converter accepts exactly the shapes the model can write back. An
//! element with anything else in it stays [`RawXml`]: unknown property
//! children are kept next to the typed ones, and blocks, runs or drawings the
//! model cannot represent are kept whole.

use super::dom::XmlElement;
use crate::ooxml::docx::format::{
    LineSpacing, ParagraphAlignment, TableBorderStyle, UnderlineStyle, VerticalAlignment,
};
use crate::ooxml::docx::image::{
    Crop, FloatingPosition, ImageEffects, ImageResource, Placement, WrapStyle,
};
use crate::ooxml::docx::writer::bookmark::MutableBookmark;
use crate::ooxml::docx::writer::drawing::{NS_PIC, RELATIVE_HEIGHT_BASE};
use crate::ooxml::docx::writer::paragraph::{NumberingProperties, ParagraphProperties};
use crate::ooxml::docx::writer::run::VerticalPosition;
use crate::ooxml::docx::writer::table::{RowProperties, TableProperties};
use crate::ooxml::docx::writer::{
    BodyElement, CellProperties, ContentControlType, DocumentBody, Drawing, HyperlinkTarget,
    IdentityRegistry, MutableCell, MutableContentControl, MutableHyperlink, MutableParagraph,
    MutableRow, MutableRun, MutableTable, ParagraphElement, RawXml, RunContent, RunProperties,
    TableBorder, TableBorders, TableWidth,
};
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::opc::{PartStore, RelType, Relationships, ZipPackage};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Everything conversion of one part needs.
pub(crate) struct Converter<'a> {
    pub(crate) src: &'a str,
    /// Relationship table of the part being converted
    pub(crate) rels: &'a Relationships,
    pub(crate) package: &'a ZipPackage,
    pub(crate) registry: &'a IdentityRegistry,
    /// Bookmark names already given a typed start
    pub(crate) typed_bookmarks: &'a mut HashSet<String>,
    /// Media members owned by typed drawings
    pub(crate) claimed_media: &'a mut HashSet<String>,
}

impl Converter<'_> {
    fn raw(&self, el: &XmlElement) -> RawXml {
        el.to_raw(self.src)
    }

    /// Convert the block-level children of a body, cell, note or control.
    pub(crate) fn body<'e>(&mut self, children: impl IntoIterator<Item = &'e XmlElement>) -> DocumentBody {
        let mut body = DocumentBody::default();
        for el in children {
            let element = self.block(el);
            body.elements.push(element);
        }
        body
    }

    pub(crate) fn block(&mut self, el: &XmlElement) -> BodyElement {
        let converted = match el.name.as_str() {
            "w:p" => self.paragraph(el).map(BodyElement::Paragraph),
            "w:tbl" => self.table(el).map(BodyElement::Table),
            "w:sdt" => self.content_control(el).map(BodyElement::StructuredTag),
            _ => None,
        };
        converted.unwrap_or_else(|| BodyElement::Preserved(self.raw(el)))
    }

    fn paragraph(&mut self, el: &XmlElement) -> Option<MutableParagraph> {
        let mut para = MutableParagraph::default();
        para.attrs = el.preserved_attrs();
        for child in &el.children {
            let element = match child.name.as_str() {
                "w:pPr" => {
                    para.properties = self.paragraph_properties(child)?;
                    continue;
                },
                "w:r" => self
                    .drawing_run(child)
                    .map(ParagraphElement::Drawing)
                    .or_else(|| self.run(child).map(ParagraphElement::Run)),
                "w:hyperlink" => self.hyperlink(child).map(ParagraphElement::Hyperlink),
                "w:bookmarkStart" => self.bookmark_start(child).map(ParagraphElement::BookmarkStart),
                "w:bookmarkEnd" if child.attrs_within(&["w:id"]) => child
                    .parse_attr("w:id")
                    .map(ParagraphElement::BookmarkEnd),
                _ => None,
            };
            para.elements
                .push(element.unwrap_or_else(|| ParagraphElement::Preserved(self.raw(child))));
        }
        Some(para)
    }

    fn paragraph_properties(&self, el: &XmlElement) -> Option<ParagraphProperties> {
        if !el.attrs_within(&[]) {
            return None;
        }
        let mut props = ParagraphProperties::default();
        for child in &el.children {
            let understood = match child.name.as_str() {
                "w:pStyle" if child.attrs_within(&["w:val"]) => {
                    props.style = child.attr("w:val").map(str::to_string);
                    props.style.is_some()
                },
                "w:keepNext" if child.attrs_within(&["w:val"]) => {
                    props.keep_next = Some(child.on_off());
                    true
                },
                "w:pageBreakBefore" if child.attrs_within(&["w:val"]) => {
                    props.page_break_before = Some(child.on_off());
                    true
                },
                "w:numPr" => numbering(child).map(|n| props.numbering = Some(n)).is_some(),
                "w:spacing" if child.attrs_within(&["w:before", "w:after", "w:line", "w:lineRule"]) => {
                    props.space_before = child.parse_attr("w:before");
                    props.space_after = child.parse_attr("w:after");
                    props.line_spacing = child
                        .parse_attr::<i64>("w:line")
                        .map(|line| LineSpacing::from_attrs(line, child.attr("w:lineRule")));
                    true
                },
                "w:ind" if child.attrs_within(&["w:left", "w:right", "w:firstLine", "w:hanging"]) => {
                    props.indent_left = child.parse_attr("w:left");
                    props.indent_right = child.parse_attr("w:right");
                    props.indent_first_line = match (
                        child.parse_attr::<i32>("w:firstLine"),
                        child.parse_attr::<i32>("w:hanging"),
                    ) {
                        (_, Some(hanging)) => Some(-hanging),
                        (first, None) => first,
                    };
                    true
                },
                "w:jc" if child.attrs_within(&["w:val"]) => {
                    props.alignment = child.attr("w:val").and_then(ParagraphAlignment::parse);
                    props.alignment.is_some()
                },
                _ => false,
            };
            if !understood {
                props.preserved.push(self.raw(child));
            }
        }
        Some(props)
    }

    fn run_properties(&self, el: &XmlElement) -> Option<RunProperties> {
        if !el.attrs_within(&[]) {
            return None;
        }
        let mut props = RunProperties::default();
        for child in &el.children {
            let val = child.attr("w:val");
            let only_val = child.attrs_within(&["w:val"]);
            let understood = match child.name.as_str() {
                "w:rStyle" if only_val => {
                    props.style = val.map(str::to_string);
                    props.style.is_some()
                },
                "w:rFonts" if child.attrs_within(&["w:ascii", "w:hAnsi"]) => {
                    match (child.attr("w:ascii"), child.attr("w:hAnsi")) {
                        (Some(ascii), Some(h_ansi)) if ascii == h_ansi => {
                            props.font_name = Some(ascii.to_string());
                            true
                        },
                        _ => false,
                    }
                },
                "w:b" if only_val => {
                    props.bold = Some(child.on_off());
                    true
                },
                "w:i" if only_val => {
                    props.italic = Some(child.on_off());
                    true
                },
                "w:strike" if only_val => {
                    props.strike = Some(child.on_off());
                    true
                },
                "w:color" if only_val => {
                    props.color = val.map(str::to_string);
                    props.color.is_some()
                },
                "w:sz" if only_val => {
                    props.font_size = child.parse_attr("w:val");
                    props.font_size.is_some()
                },
                "w:highlight" if only_val => {
                    props.highlight = val.map(str::to_string);
                    props.highlight.is_some()
                },
                "w:u" if only_val => {
                    props.underline = val.and_then(UnderlineStyle::parse);
                    props.underline.is_some()
                },
                "w:vertAlign" if only_val => {
                    props.vertical = val.and_then(VerticalPosition::parse);
                    props.vertical.is_some()
                },
                _ => false,
            };
            if !understood {
                props.preserved.push(self.raw(child));
            }
        }
        Some(props)
    }

    /// A text run. Fails on anything besides text, tabs, breaks and note marks.
    fn run(&self, el: &XmlElement) -> Option<MutableRun> {
        let mut run = MutableRun::default();
        run.attrs = el.preserved_attrs();
        for child in &el.children {
            let item = match child.name.as_str() {
                "w:rPr" => {
                    run.properties = self.run_properties(child)?;
                    continue;
                },
                "w:t" if child.attrs_within(&["xml:space"]) => RunContent::Text(child.text.clone()),
                "w:tab" if child.attrs_within(&[]) => RunContent::Tab,
                "w:br" => match (child.attrs_within(&["w:type"]), child.attr("w:type")) {
                    (true, None) => RunContent::Break,
                    (true, Some("page")) => RunContent::PageBreak,
                    _ => return None,
                },
                "w:footnoteReference" if child.attrs_within(&["w:id"]) => {
                    RunContent::FootnoteReference(child.parse_attr("w:id")?)
                },
                "w:endnoteReference" if child.attrs_within(&["w:id"]) => {
                    RunContent::EndnoteReference(child.parse_attr("w:id")?)
                },
                _ => return None,
            };
            run.content.push(item);
        }
        Some(run)
    }

    fn hyperlink(&self, el: &XmlElement) -> Option<MutableHyperlink> {
        if !el.attrs_within(&["r:id", "w:anchor", "w:tooltip", "w:history"]) {
            return None;
        }
        let (target, r_id) = match (el.attr("r:id"), el.attr("w:anchor")) {
            (Some(r_id), None) => {
                let rel = self.rels.get(r_id)?;
                if *rel.reltype() != RelType::Hyperlink || !rel.is_external() {
                    return None;
                }
                (
                    HyperlinkTarget::External(rel.target_ref().to_string()),
                    Some(r_id.to_string()),
                )
            },
            (None, Some(anchor)) => (HyperlinkTarget::Anchor(anchor.to_string()), None),
            _ => return None,
        };
        let runs = el
            .children
            .iter()
            .map(|child| if child.is("w:r") { self.run(child) } else { None })
            .collect::<Option<Vec<_>>>()?;
        let mut link = MutableHyperlink::external(String::new(), "");
        link.target = target;
        link.r_id = r_id;
        link.runs = runs;
        link.tooltip = el.attr("w:tooltip").map(str::to_string);
        link.history = matches!(el.attr("w:history"), Some("1" | "true"));
        Some(link)
    }

    fn bookmark_start(&mut self, el: &XmlElement) -> Option<MutableBookmark> {
        if !el.attrs_within(&["w:id", "w:name"]) {
            return None;
        }
        let id: u32 = el.parse_attr("w:id")?;
        let name = el.attr("w:name")?;
        // Only the occurrence the registry knows becomes typed; duplicates stay raw
        if self.registry.bookmark_id(name) != Some(id) || !self.typed_bookmarks.insert(name.to_string()) {
            return None;
        }
        Some(MutableBookmark::new(id, name.to_string()))
    }

    /// A run holding only a picture, when the writer can reproduce every
    /// element and attribute of its drawing markup. Any other drawing, or one
    /// carrying extra markup such as a click hyperlink, an outline or an
    /// extension list, is kept raw.
    fn drawing_run(&mut self, el: &XmlElement) -> Option<Drawing> {
        let mut run_properties = RunProperties::default();
        let mut drawing_el = None;
        for child in &el.children {
            match child.name.as_str() {
                "w:rPr" => run_properties = self.run_properties(child)?,
                "w:drawing" if drawing_el.is_none() && child.attrs_within_ns(&[]) => {
                    drawing_el = Some(child)
                },
                _ => return None,
            }
        }
        let [frame] = drawing_el?.children.as_slice() else {
            return None;
        };
        let mut kids = frame.children.iter();
        let anchor = match frame.name.as_str() {
            "wp:inline" if frame.has_exact_attrs(&INLINE_ATTRS) => None,
            "wp:anchor" => Some(AnchorFrame::read(frame, &mut kids)?),
            _ => return None,
        };

        let extent = next_is(&mut kids, "wp:extent")
            .filter(|e| e.children.is_empty() && e.attrs_within_ns(&["cx", "cy"]))?;
        let cx: u32 = extent.parse_attr("cx")?;
        let cy: u32 = extent.parse_attr("cy")?;
        if !next_is(&mut kids, "wp:effectExtent").is_some_and(|e| e.is_exactly(&ZERO_EFFECT_EXTENT)) {
            return None;
        }
        let placement = match &anchor {
            None => Placement::Inline,
            Some(anchor) => Placement::Floating(anchor.position(kids.next()?)?),
        };
        let doc_pr = next_is(&mut kids, "wp:docPr")
            .filter(|d| d.is_exactly_within(&["id", "name", "descr"]))?;
        let doc_pr_id: u32 = doc_pr.parse_attr("id")?;
        if anchor
            .as_ref()
            .is_some_and(|a| a.relative_height != RELATIVE_HEIGHT_BASE.saturating_add(doc_pr_id))
        {
            return None;
        }
        let frame_pr = next_is(&mut kids, "wp:cNvGraphicFramePr").filter(|f| f.attrs_within_ns(&[]))?;
        match frame_pr.children.as_slice() {
            [locks] if locks.is("a:graphicFrameLocks") && locks.is_exactly(&[("noChangeAspect", "1")]) => {},
            _ => return None,
        }
        let graphic = next_is(&mut kids, "a:graphic").filter(|g| g.attrs_within_ns(&[]))?;
        if kids.next().is_some() {
            return None;
        }

        let description = doc_pr.attr("descr").unwrap_or_default();
        let pic = picture(graphic, description)?;
        let [_, blip_fill, sp_pr] = pic.children.as_slice() else {
            return None;
        };
        let (blip, crop) = blip_fill_parts(blip_fill)?;
        let effects = blip_effects(blip)?;
        let rotation = shape_rotation(sp_pr, cx, cy)?;
        let r_id = blip.attr("r:embed")?;

        let rel = self.rels.get(r_id)?;
        if *rel.reltype() != RelType::Image || rel.is_external() {
            return None;
        }
        let partname = self.rels.target_partname(rel).ok()?;
        let member = partname.membername().to_string();
        let media_name = member.strip_prefix(part_name::MEDIA_DIR)?.to_string();
        if media_name.contains('/') {
            return None;
        }
        let bytes = self.package.get(&member)?.to_vec();

        let mut image = ImageResource::from_package(bytes, media_name, r_id.to_string(), cx, cy);
        image.placement = placement;
        if let Some(name) = doc_pr.attr("name")
            && name != format!("Picture {}", doc_pr_id)
        {
            image.name = Some(name.to_string());
        }
        image.description = description.to_string();
        image.effects = effects;
        image.crop = crop;
        image.rotation = rotation;

        self.claimed_media.insert(member);
        Some(Drawing {
            image,
            doc_pr_id: None,
            run_properties,
            run_attrs: el.preserved_attrs(),
        })
    }

    fn table(&mut self, el: &XmlElement) -> Option<MutableTable> {
        let mut table = MutableTable::default();
        for child in &el.children {
            match child.name.as_str() {
                "w:tblPr" => table.properties = self.table_properties(child)?,
                "w:tblGrid" => table.grid = grid(child)?,
                "w:tr" => table.rows.push(self.row(child)?),
                _ => return None,
            }
        }
        Some(table)
    }

    fn table_properties(&self, el: &XmlElement) -> Option<TableProperties> {
        let mut props = TableProperties::default();
        for child in &el.children {
            let understood = match child.name.as_str() {
                "w:tblStyle" if child.attrs_within(&["w:val"]) => {
                    props.style = child.attr("w:val").map(str::to_string);
                    props.style.is_some()
                },
                "w:tblW" if child.attrs_within(&["w:w", "w:type"]) => {
                    props.width = table_width(child);
                    props.width.is_some()
                },
                "w:tblBorders" => borders(child).map(|b| props.borders = Some(b)).is_some(),
                _ => false,
            };
            if !understood {
                props.preserved.push(self.raw(child));
            }
        }
        Some(props)
    }

    fn row(&mut self, el: &XmlElement) -> Option<MutableRow> {
        let mut row = MutableRow::default();
        row.attrs = el.preserved_attrs();
        for child in &el.children {
            match child.name.as_str() {
                "w:trPr" => row.properties = self.row_properties(child),
                "w:tc" => row.cells.push(self.cell(child)?),
                _ => return None,
            }
        }
        Some(row)
    }

    fn row_properties(&self, el: &XmlElement) -> RowProperties {
        let mut props = RowProperties::default();
        for child in &el.children {
            let understood = match child.name.as_str() {
                "w:cantSplit" if child.attrs_within(&["w:val"]) => {
                    props.cant_split = Some(child.on_off());
                    true
                },
                "w:tblHeader" if child.attrs_within(&["w:val"]) => {
                    props.header = Some(child.on_off());
                    true
                },
                "w:trHeight" if child.attrs_within(&["w:val", "w:hRule"]) => {
                    match child.parse_attr::<u32>("w:val") {
                        Some(height) => {
                            props.height = Some((height, child.attr("w:hRule").map(str::to_string)));
                            true
                        },
                        None => false,
                    }
                },
                _ => false,
            };
            if !understood {
                props.preserved.push(self.raw(child));
            }
        }
        props
    }

    fn cell(&mut self, el: &XmlElement) -> Option<MutableCell> {
        let mut cell = MutableCell::default();
        if let Some(props) = el.child("w:tcPr") {
            cell.properties = self.cell_properties(props);
        }
        cell.content = self.body(el.children.iter().filter(|c| !c.is("w:tcPr")));
        Some(cell)
    }

    fn cell_properties(&self, el: &XmlElement) -> CellProperties {
        let mut props = CellProperties::default();
        for child in &el.children {
            let understood = match child.name.as_str() {
                "w:tcW" if child.attrs_within(&["w:w", "w:type"]) && child.attr("w:type") == Some("dxa") => {
                    props.width_dxa = child.parse_attr("w:w");
                    props.width_dxa.is_some()
                },
                "w:gridSpan" if child.attrs_within(&["w:val"]) => {
                    props.grid_span = child.parse_attr("w:val");
                    props.grid_span.is_some()
                },
                "w:vMerge" if child.attrs_within(&["w:val"]) => {
                    props.vertical_merge = Some(child.attr("w:val") == Some("restart"));
                    true
                },
                "w:tcBorders" => borders(child).map(|b| props.borders = Some(b)).is_some(),
                "w:shd"
                    if child.attrs_within(&["w:val", "w:color", "w:fill"])
                        && child.attr("w:val") == Some("clear")
                        && child.attr("w:color") == Some("auto") =>
                {
                    props.background_color = child.attr("w:fill").map(str::to_string);
                    props.background_color.is_some()
                },
                "w:vAlign" if child.attrs_within(&["w:val"]) => {
                    props.vertical_alignment = child.attr("w:val").and_then(VerticalAlignment::parse);
                    props.vertical_alignment.is_some()
                },
                _ => false,
            };
            if !understood {
                props.preserved.push(self.raw(child));
            }
        }
        props
    }

    /// A block-level content control.
    fn content_control(&mut self, el: &XmlElement) -> Option<MutableContentControl> {
        let mut control = MutableContentControl::new(None, ContentControlType::Unspecified);
        control.content.clear();
        let mut saw_content = false;
        for child in &el.children {
            match child.name.as_str() {
                "w:sdtPr" => self.content_control_properties(child, &mut control)?,
                "w:sdtEndPr" => control.end_properties = Some(self.raw(child)),
                "w:sdtContent" if !saw_content => {
                    saw_content = true;
                    control.content = self.body(&child.children);
                },
                _ => return None,
            }
        }
        Some(control)
    }

    fn content_control_properties(&self, el: &XmlElement, control: &mut MutableContentControl) -> Option<()> {
        if !el.attrs_within(&[]) {
            return None;
        }
        for child in &el.children {
            let val = child.attr("w:val");
            let only_val = child.attrs_within(&["w:val"]);
            let understood = match child.name.as_str() {
                "w:alias" if only_val && val.is_some() => {
                    control.title = val.map(str::to_string);
                    true
                },
                "w:tag" if only_val && val.is_some() => {
                    control.tag = val.map(str::to_string);
                    true
                },
                "w:id" if only_val => {
                    control.id = child.parse_attr("w:val");
                    control.id.is_some()
                },
                "w:lock" if only_val => match val {
                    Some("sdtLocked") => {
                        control.allow_delete = false;
                        true
                    },
                    Some("contentLocked") => {
                        control.allow_edit = false;
                        true
                    },
                    Some("sdtContentLocked") => {
                        control.allow_delete = false;
                        control.allow_edit = false;
                        true
                    },
                    _ => false,
                },
                "w:placeholder" => match child.children.as_slice() {
                    [doc_part] if doc_part.is("w:docPart") && doc_part.attrs_within(&["w:val"]) => {
                        control.placeholder = doc_part.attr("w:val").map(str::to_string);
                        control.placeholder.is_some()
                    },
                    _ => false,
                },
                _ if control.control_type != ContentControlType::Unspecified => false,
                "w:richText" if child.children.is_empty() && child.attrs_within(&[]) => {
                    control.control_type = ContentControlType::RichText;
                    true
                },
                "w:text" if child.children.is_empty() && child.attrs_within(&[]) => {
                    control.control_type = ContentControlType::PlainText;
                    true
                },
                "w:dropDownList" if child.attrs_within(&[]) => match list_items(child) {
                    Some(items) => {
                        control.control_type = ContentControlType::DropDownList { items };
                        true
                    },
                    None => false,
                },
                "w:date" if child.attrs_within(&[]) => match child.children.as_slice() {
                    [format] if format.is("w:dateFormat") && format.attrs_within(&["w:val"]) => {
                        control.control_type = ContentControlType::DatePicker {
                            format: format.attr("w:val").unwrap_or_default().to_string(),
                        };
                        true
                    },
                    _ => false,
                },
                "w14:checkbox" => match checkbox_state(child) {
                    Some(checked) => {
                        control.control_type = ContentControlType::Checkbox { checked };
                        true
                    },
                    None => false,
                },
                _ => false,
            };
            if !understood {
                control.preserved.push(self.raw(child));
            }
        }
        Some(())
    }
}

fn numbering(el: &XmlElement) -> Option<NumberingProperties> {
    if !el.attrs_within(&[]) || el.children.len() != 2 {
        return None;
    }
    let ilvl = el.child("w:ilvl").filter(|c| c.attrs_within(&["w:val"]))?;
    let num_id = el.child("w:numId").filter(|c| c.attrs_within(&["w:val"]))?;
    Some(NumberingProperties {
        num_id: num_id.parse_attr("w:val")?,
        ilvl: ilvl.parse_attr("w:val")?,
    })
}

fn table_width(el: &XmlElement) -> Option<TableWidth> {
    let w = el.parse_attr::<u32>("w:w").unwrap_or(0);
    match el.attr("w:type") {
        Some("auto") if w == 0 => Some(TableWidth::Auto),
        Some("dxa") | None => Some(TableWidth::Dxa(w)),
        Some("pct") => Some(TableWidth::Pct(w)),
        _ => None,
    }
}

fn grid(el: &XmlElement) -> Option<Vec<u32>> {
    let widths: Vec<Option<u32>> = el
        .children
        .iter()
        .map(|col| {
            if col.is("w:gridCol") && col.attrs_within(&["w:w"]) {
                Some(col.parse_attr("w:w"))
            } else {
                None
            }
        })
        .collect::<Option<_>>()?;
    if widths.iter().all(Option::is_none) {
        Some(Vec::new())
    } else {
        widths.into_iter().collect()
    }
}

fn borders(el: &XmlElement) -> Option<TableBorders> {
    if !el.attrs_within(&[]) {
        return None;
    }
    let mut borders = TableBorders::default();
    for side in &el.children {
        if !side.attrs_within(&["w:val", "w:sz", "w:space", "w:color"])
            || side.attr("w:space").is_some_and(|space| space != "0")
        {
            return None;
        }
        let slot = borders.side_mut(side.local_name())?;
        *slot = Some(TableBorder {
            style: side.attr("w:val").and_then(TableBorderStyle::parse)?,
            size: side.parse_attr("w:sz").unwrap_or(0),
            color: side.attr("w:color").unwrap_or("auto").to_string(),
        });
    }
    Some(borders)
}

fn list_items(el: &XmlElement) -> Option<Vec<(String, String)>> {
    el.children
        .iter()
        .map(|item| {
            if !item.is("w:listItem") || !item.attrs_within(&["w:displayText", "w:value"]) {
                return None;
            }
            let value = item.attr("w:value")?.to_string();
            let display = item.attr("w:displayText").map_or_else(|| value.clone(), str::to_string);
            Some((display, value))
        })
        .collect()
}

/// Checked state of a `w14:checkbox` using the standard ballot-box glyphs.
fn checkbox_state(el: &XmlElement) -> Option<bool> {
    let checked = el.child("w14:checked")?.attr("w14:val").is_some_and(|v| v == "1" || v == "true");
    let glyph = |name: &str, code: &str| el.child(name).is_some_and(|state| state.attr("w14:val") == Some(code));
    if el.children.len() != 3 || !glyph("w14:checkedState", "2612") || !glyph("w14:uncheckedState", "2610") {
        return None;
    }
    Some(checked)
}

/// Attributes the writer puts on every `wp:inline`.
const INLINE_ATTRS: [(&str, &str); 4] = [("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")];

const ZERO_EFFECT_EXTENT: [(&str, &str); 4] = [("l", "0"), ("t", "0"), ("r", "0"), ("b", "0")];

/// Fixed `wp:anchor` attributes. Aligned positions are not modelled.
const ANCHOR_ATTRS: [(&str, &str); 8] = [
    ("distT", "0"),
    ("distB", "0"),
    ("distL", "114300"),
    ("distR", "114300"),
    ("simplePos", "0"),
    ("locked", "0"),
    ("layoutInCell", "1"),
    ("allowOverlap", "1"),
];

/// Outline written for tight wrapping, in 21600ths of the image box.
const TIGHT_POLYGON: [(&str, &str, &str); 5] = [
    ("wp:start", "0", "0"),
    ("wp:lineTo", "0", "21600"),
    ("wp:lineTo", "21600", "21600"),
    ("wp:lineTo", "21600", "0"),
    ("wp:lineTo", "0", "0"),
];

fn next_is<'e>(kids: &mut std::slice::Iter<'e, XmlElement>, qname: &str) -> Option<&'e XmlElement> {
    kids.next().filter(|el| el.is(qname))
}

/// Integer attribute that defaults to zero when absent; `None` when malformed.
fn int_attr<T: std::str::FromStr + Default>(el: &XmlElement, name: &str) -> Option<T> {
    match el.attr(name) {
        Some(value) => value.parse().ok(),
        None => Some(T::default()),
    }
}

/// The `wp:anchor` attributes and the children before `wp:extent`.
struct AnchorFrame {
    h_relative: String,
    h_offset_emu: i64,
    v_relative: String,
    v_offset_emu: i64,
    behind: bool,
    relative_height: u32,
}

impl AnchorFrame {
    fn read(anchor: &XmlElement, kids: &mut std::slice::Iter<'_, XmlElement>) -> Option<Self> {
        let mut names: SmallVec<[&str; 10]> = ANCHOR_ATTRS.iter().map(|(name, _)| *name).collect();
        names.extend(["relativeHeight", "behindDoc"]);
        if !anchor.attrs_within_ns(&names)
            || !ANCHOR_ATTRS
                .iter()
                .all(|(name, value)| anchor.attr(name) == Some(*value))
        {
            return None;
        }
        let behind = match anchor.attr("behindDoc")? {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => return None,
        };
        let relative_height = anchor.parse_attr("relativeHeight")?;
        if !next_is(kids, "wp:simplePos").is_some_and(|p| p.is_exactly(&[("x", "0"), ("y", "0")])) {
            return None;
        }
        let (h_relative, h_offset_emu) = offset(next_is(kids, "wp:positionH")?)?;
        let (v_relative, v_offset_emu) = offset(next_is(kids, "wp:positionV")?)?;
        Some(Self {
            h_relative,
            h_offset_emu,
            v_relative,
            v_offset_emu,
            behind,
            relative_height,
        })
    }

    /// Complete the position from the wrap element after `wp:effectExtent`.
    fn position(&self, wrap_el: &XmlElement) -> Option<FloatingPosition> {
        let both_sides = [("wrapText", "bothSides")];
        let wrap = match wrap_el.name.as_str() {
            "wp:wrapSquare" if wrap_el.is_exactly(&both_sides) => WrapStyle::Square,
            "wp:wrapTight" if wrap_el.has_exact_attrs(&both_sides) && is_tight_polygon(wrap_el) => {
                WrapStyle::Tight
            },
            "wp:wrapTopAndBottom" if wrap_el.is_exactly(&[]) => WrapStyle::TopAndBottom,
            "wp:wrapNone" if wrap_el.is_exactly(&[]) && self.behind => WrapStyle::BehindText,
            "wp:wrapNone" if wrap_el.is_exactly(&[]) => WrapStyle::InFrontOfText,
            _ => return None,
        };
        if self.behind != (wrap == WrapStyle::BehindText) {
            return None;
        }
        Some(FloatingPosition {
            h_offset_emu: self.h_offset_emu,
            v_offset_emu: self.v_offset_emu,
            h_relative: self.h_relative.clone(),
            v_relative: self.v_relative.clone(),
            wrap,
        })
    }
}

/// `relativeFrom` and `wp:posOffset` of a `wp:positionH`/`wp:positionV`.
fn offset(pos: &XmlElement) -> Option<(String, i64)> {
    if !pos.attrs_within_ns(&["relativeFrom"]) {
        return None;
    }
    let relative = pos.attr("relativeFrom")?.to_string();
    let [value] = pos.children.as_slice() else {
        return None;
    };
    if !value.is("wp:posOffset") || !value.children.is_empty() || !value.attrs_within_ns(&[]) {
        return None;
    }
    Some((relative, value.text.trim().parse().ok()?))
}

fn is_tight_polygon(wrap: &XmlElement) -> bool {
    let [polygon] = wrap.children.as_slice() else {
        return false;
    };
    polygon.is("wp:wrapPolygon")
        && polygon.has_exact_attrs(&[("edited", "0")])
        && polygon.children.len() == TIGHT_POLYGON.len()
        && polygon
            .children
            .iter()
            .zip(TIGHT_POLYGON)
            .all(|(point, (name, x, y))| point.is(name) && point.is_exactly(&[("x", x), ("y", y)]))
}

/// The `pic:pic` inside `a:graphic`, checked down to its non-visual
/// properties, whose description must match the `wp:docPr` one.
fn picture<'e>(graphic: &'e XmlElement, description: &str) -> Option<&'e XmlElement> {
    let [data] = graphic.children.as_slice() else {
        return None;
    };
    if !data.is("a:graphicData") || !data.has_exact_attrs(&[("uri", NS_PIC)]) {
        return None;
    }
    let [pic] = data.children.as_slice() else {
        return None;
    };
    if !pic.is("pic:pic") || !pic.attrs_within_ns(&[]) {
        return None;
    }
    let [nv_pic_pr, blip_fill, sp_pr] = pic.children.as_slice() else {
        return None;
    };
    if !nv_pic_pr.is("pic:nvPicPr")
        || !nv_pic_pr.attrs_within_ns(&[])
        || !blip_fill.is("pic:blipFill")
        || !sp_pr.is("pic:spPr")
    {
        return None;
    }
    // cNvPr id and name are rewritten from the media part on save
    match nv_pic_pr.children.as_slice() {
        [c_nv_pr, c_nv_pic_pr]
            if c_nv_pr.is("pic:cNvPr")
                && c_nv_pr.is_exactly_within(&["id", "name", "descr"])
                && c_nv_pr.attr("descr").unwrap_or_default() == description
                && c_nv_pic_pr.is("pic:cNvPicPr")
                && c_nv_pic_pr.is_exactly(&[]) =>
        {
            Some(pic)
        },
        _ => None,
    }
}

/// The `a:blip` and the crop of a `pic:blipFill` that stretches its image.
fn blip_fill_parts(blip_fill: &XmlElement) -> Option<(&XmlElement, Option<Crop>)> {
    if !blip_fill.attrs_within_ns(&[]) {
        return None;
    }
    let (blip, crop_el, stretch) = match blip_fill.children.as_slice() {
        [blip, stretch] => (blip, None, stretch),
        [blip, rect, stretch] if rect.is("a:srcRect") => (blip, Some(rect), stretch),
        _ => return None,
    };
    if !blip.is("a:blip") || !blip.attrs_within_ns(&["r:embed"]) || !stretch.is("a:stretch") || !stretch.attrs_within_ns(&[]) {
        return None;
    }
    match stretch.children.as_slice() {
        [fill] if fill.is("a:fillRect") && fill.is_exactly(&[]) => {},
        _ => return None,
    }
    let crop = match crop_el {
        Some(rect) => {
            if !rect.children.is_empty() || !rect.attrs_within_ns(&["l", "t", "r", "b"]) {
                return None;
            }
            let crop = Crop {
                left: int_attr(rect, "l")?,
                top: int_attr(rect, "t")?,
                right: int_attr(rect, "r")?,
                bottom: int_attr(rect, "b")?,
            };
            (!crop.is_empty()).then_some(crop)
        },
        None => None,
    };
    Some((blip, crop))
}

/// Grayscale and brightness/contrast, in the order they are written.
fn blip_effects(blip: &XmlElement) -> Option<ImageEffects> {
    let mut effects = ImageEffects::default();
    let mut kids = blip.children.iter().peekable();
    if let Some(gray) = kids.next_if(|e| e.is("a:grayscl")) {
        if !gray.is_exactly(&[]) {
            return None;
        }
        effects.grayscale = true;
    }
    if let Some(lum) = kids.next_if(|e| e.is("a:lum")) {
        if !lum.children.is_empty() || !lum.attrs_within_ns(&["bright", "contrast"]) {
            return None;
        }
        effects.brightness = int_attr(lum, "bright")?;
        effects.contrast = int_attr(lum, "contrast")?;
    }
    if kids.next().is_some() {
        return None;
    }
    Some(effects)
}

/// Rotation in degrees of a `pic:spPr` that holds only a transform matching
/// the extent and a plain rectangle.
fn shape_rotation(sp_pr: &XmlElement, cx: u32, cy: u32) -> Option<f64> {
    if !sp_pr.attrs_within_ns(&[]) {
        return None;
    }
    let [xfrm, geom] = sp_pr.children.as_slice() else {
        return None;
    };
    if !xfrm.is("a:xfrm")
        || !xfrm.attrs_within_ns(&["rot"])
        || !geom.is("a:prstGeom")
        || !geom.has_exact_attrs(&[("prst", "rect")])
    {
        return None;
    }
    match geom.children.as_slice() {
        [av] if av.is("a:avLst") && av.is_exactly(&[]) => {},
        _ => return None,
    }
    let (cx, cy) = (cx.to_string(), cy.to_string());
    match xfrm.children.as_slice() {
        [off, ext]
            if off.is("a:off")
                && off.is_exactly(&[("x", "0"), ("y", "0")])
                && ext.is("a:ext")
                && ext.is_exactly(&[("cx", cx.as_str()), ("cy", cy.as_str())]) => {},
        _ => return None,
    }
    let rot: i64 = int_attr(xfrm, "rot")?;
    Some((rot as f64 / 60_000.0).rem_euclid(360.0))
}

#[cfg(test)]
mod tests {
    use super::super::dom;
    use super::*;
    use crate::ooxml::opc::TargetMode;

    struct Fixture {
        rels: Relationships,
        package: ZipPackage,
        registry: IdentityRegistry,
        typed: HashSet<String>,
        claimed: HashSet<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                rels: Relationships::new("/word/document.xml"),
                package: ZipPackage::new(),
                registry: IdentityRegistry::new(),
                typed: HashSet::new(),
                claimed: HashSet::new(),
            }
        }

        fn convert(&mut self, xml: &str) -> BodyElement {
            let root = dom::parse(xml).unwrap();
            let mut converter = Converter {
                src: xml,
                rels: &self.rels,
                package: &self.package,
                registry: &self.registry,
                typed_bookmarks: &mut self.typed,
                claimed_media: &mut self.claimed,
            };
            converter.block(&root)
        }
    }

    fn paragraph(element: BodyElement) -> MutableParagraph {
        match element {
            BodyElement::Paragraph(p) => p,
            other => panic!("expected paragraph, got {:?}", other),
        }
    }

    #[test]
    fn test_paragraph_with_properties() {
        let mut fx = Fixture::new();
        let para = paragraph(fx.convert(
            r#"<w:p w:rsidR="00AB"><w:pPr><w:pStyle w:val="Heading1"/><w:jc w:val="center"/><w:pBdr><w:top w:val="single"/></w:pBdr></w:pPr><w:r><w:rPr><w:b/><w:sz w:val="28"/></w:rPr><w:t>Title</w:t></w:r></w:p>"#,
        ));
        assert_eq!(para.style(), Some("Heading1"));
        assert_eq!(para.alignment(), Some(ParagraphAlignment::Center));
        assert_eq!(para.properties.preserved.len(), 1);
        assert_eq!(para.text(), "Title");
        match &para.elements()[0] {
            ParagraphElement::Run(run) => {
                assert_eq!(run.properties().bold(), Some(true));
                assert_eq!(run.properties().font_size(), Some(28));
            },
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_run_content_is_preserved() {
        let mut fx = Fixture::new();
        let src = r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:proofErr w:type="spellStart"/></w:p>"#;
        let para = paragraph(fx.convert(src));
        assert_eq!(para.element_count(), 2);
        match &para.elements()[0] {
            ParagraphElement::Preserved(raw) => {
                assert_eq!(raw.as_str(), r#"<w:r><w:fldChar w:fldCharType="begin"/></w:r>"#)
            },
            other => panic!("expected preserved run, got {:?}", other),
        }
    }

    #[test]
    fn test_external_hyperlink_keeps_id() {
        let mut fx = Fixture::new();
        fx.rels.register(RelType::Hyperlink, "https://example.com", TargetMode::External);
        let para = paragraph(fx.convert(
            r#"<w:p><w:hyperlink r:id="rId1" w:history="1"><w:r><w:t>go</w:t></w:r></w:hyperlink></w:p>"#,
        ));
        let link = para.hyperlinks().next().unwrap();
        assert_eq!(link.url(), Some("https://example.com"));
        assert_eq!(link.relationship_id(), Some("rId1"));
        assert_eq!(link.text(), "go");
    }

    #[test]
    fn test_duplicate_bookmark_stays_raw() {
        let mut fx = Fixture::new();
        fx.registry.reserve_bookmark("intro", 0).unwrap();
        let first = paragraph(fx.convert(r#"<w:p><w:bookmarkStart w:id="0" w:name="intro"/></w:p>"#));
        assert!(matches!(first.elements()[0], ParagraphElement::BookmarkStart(_)));
        let second = paragraph(fx.convert(r#"<w:p><w:bookmarkStart w:id="5" w:name="intro"/></w:p>"#));
        assert!(matches!(second.elements()[0], ParagraphElement::Preserved(_)));
    }

    #[test]
    fn test_table_with_cells() {
        let mut fx = Fixture::new();
        let element = fx.convert(
            r#"<w:tbl><w:tblPr><w:tblW w:w="5000" w:type="pct"/><w:tblLook w:val="04A0"/></w:tblPr><w:tblGrid><w:gridCol w:w="2000"/><w:gridCol w:w="3000"/></w:tblGrid><w:tr><w:tc><w:tcPr><w:shd w:val="clear" w:color="auto" w:fill="FF0000"/></w:tcPr><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>"#,
        );
        let BodyElement::Table(table) = element else {
            panic!("expected table");
        };
        assert_eq!(table.grid, vec![2000, 3000]);
        assert_eq!(table.properties.width, Some(TableWidth::Pct(5000)));
        assert_eq!(table.properties.preserved.len(), 1);
        let cell = &table.rows()[0].cells()[0];
        assert_eq!(cell.properties.background_color.as_deref(), Some("FF0000"));
        assert_eq!(cell.text(), "A");
    }

    #[test]
    fn test_checkbox_control() {
        let mut fx = Fixture::new();
        let element = fx.convert(
            r#"<w:sdt><w:sdtPr><w:tag w:val="agree"/><w:id w:val="17"/><w14:checkbox><w14:checked w14:val="1"/><w14:checkedState w14:val="2612" w14:font="MS Gothic"/><w14:uncheckedState w14:val="2610" w14:font="MS Gothic"/></w14:checkbox></w:sdtPr><w:sdtContent><w:p/></w:sdtContent></w:sdt>"#,
        );
        let BodyElement::StructuredTag(control) = element else {
            panic!("expected content control");
        };
        assert_eq!(control.id(), Some(17));
        assert_eq!(control.control_type, ContentControlType::Checkbox { checked: true });
        assert!(control.preserved.is_empty());
    }

    #[test]
    fn test_chart_drawing_is_preserved() {
        let mut fx = Fixture::new();
        let src = r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="1" cy="1"/><wp:docPr id="4" name="Chart 1"/><a:graphic><a:graphicData uri="chart"><c:chart r:id="rId9"/></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#;
        let para = paragraph(fx.convert(src));
        assert!(matches!(para.elements()[0], ParagraphElement::Preserved(_)));
        assert!(fx.claimed.is_empty());
    }
}
