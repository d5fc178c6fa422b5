/// Table types and implementation for DOCX documents.
use super::doc::DocumentBody;
use super::order::{PropChild, TBLPR_ORDER, TCPR_ORDER, TRPR_ORDER, emit_ordered};
use super::paragraph::MutableParagraph;
use super::preserved::{PreservedAttrs, RawXml};
use super::{EmitContext, NodeVisitor};
use crate::common::xml::escape_xml;
use crate::ooxml::error::{OoxmlError, Result};
use std::fmt::Write as FmtWrite;

// Import shared format types
pub use super::super::format::{TableBorderStyle, VerticalAlignment};

/// Border definition for table or cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBorder {
    /// Border style
    pub style: TableBorderStyle,
    /// Border width in eighths of a point (e.g., 8 = 1pt, 24 = 3pt)
    pub size: u32,
    /// Border color in hex RGB format (e.g., "FF0000" for red)
    pub color: String,
}

impl Default for TableBorder {
    fn default() -> Self {
        Self {
            style: TableBorderStyle::Single,
            size: 4,
            color: "000000".to_string(),
        }
    }
}

/// Table borders (all sides).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableBorders {
    pub top: Option<TableBorder>,
    pub left: Option<TableBorder>,
    pub bottom: Option<TableBorder>,
    pub right: Option<TableBorder>,
    pub inside_h: Option<TableBorder>,
    pub inside_v: Option<TableBorder>,
}

impl TableBorders {
    /// The same border on every side and between all cells.
    pub fn all(border: TableBorder) -> Self {
        Self {
            top: Some(border.clone()),
            left: Some(border.clone()),
            bottom: Some(border.clone()),
            right: Some(border.clone()),
            inside_h: Some(border.clone()),
            inside_v: Some(border),
        }
    }

    pub(crate) fn side_mut(&mut self, name: &str) -> Option<&mut Option<TableBorder>> {
        match name {
            "top" => Some(&mut self.top),
            "left" | "start" => Some(&mut self.left),
            "bottom" => Some(&mut self.bottom),
            "right" | "end" => Some(&mut self.right),
            "insideH" => Some(&mut self.inside_h),
            "insideV" => Some(&mut self.inside_v),
            _ => None,
        }
    }

    fn to_xml(&self, tag: &str) -> Result<String> {
        let mut xml = String::with_capacity(256);
        write!(xml, "<w:{}>", tag).map_err(|e| OoxmlError::Xml(e.to_string()))?;
        for (name, border) in [
            ("top", &self.top),
            ("left", &self.left),
            ("bottom", &self.bottom),
            ("right", &self.right),
            ("insideH", &self.inside_h),
            ("insideV", &self.inside_v),
        ] {
            if let Some(border) = border {
                write!(
                    xml,
                    "<w:{} w:val=\"{}\" w:sz=\"{}\" w:space=\"0\" w:color=\"{}\"/>",
                    name,
                    border.style.as_str(),
                    border.size,
                    escape_xml(&border.color)
                )
                .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
        }
        write!(xml, "</w:{}>", tag).map_err(|e| OoxmlError::Xml(e.to_string()))?;
        Ok(xml)
    }
}

/// Preferred table width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableWidth {
    Auto,
    /// Twentieths of a point
    Dxa(u32),
    /// Fiftieths of a percent (5000 = 100%)
    Pct(u32),
}

/// Table properties.
#[derive(Debug, Default, Clone)]
pub(crate) struct TableProperties {
    pub(crate) style: Option<String>,
    pub(crate) width: Option<TableWidth>,
    pub(crate) borders: Option<TableBorders>,
    pub(crate) preserved: Vec<RawXml>,
}

impl TableProperties {
    fn known_children(&self) -> Result<Vec<PropChild>> {
        let mut children = Vec::new();
        if let Some(ref style) = self.style {
            children.push(PropChild::new(
                "tblStyle",
                format!("<w:tblStyle w:val=\"{}\"/>", escape_xml(style)),
            ));
        }
        if let Some(width) = self.width {
            let xml = match width {
                TableWidth::Auto => "<w:tblW w:w=\"0\" w:type=\"auto\"/>".to_string(),
                TableWidth::Dxa(w) => format!("<w:tblW w:w=\"{}\" w:type=\"dxa\"/>", w),
                TableWidth::Pct(w) => format!("<w:tblW w:w=\"{}\" w:type=\"pct\"/>", w),
            };
            children.push(PropChild::new("tblW", xml));
        }
        if let Some(ref borders) = self.borders {
            children.push(PropChild::new("tblBorders", borders.to_xml("tblBorders")?));
        }
        Ok(children)
    }
}

/// Cell properties.
#[derive(Debug, Default, Clone)]
pub struct CellProperties {
    /// Cell background color in hex RGB format
    pub background_color: Option<String>,
    /// Cell borders (if different from table borders)
    pub borders: Option<TableBorders>,
    /// Cell width in DXA units (twentieth of a point)
    pub width_dxa: Option<u32>,
    /// Number of grid columns spanned
    pub grid_span: Option<u32>,
    /// Vertical merge: `Some(true)` restarts a merged region, `Some(false)` continues one
    pub vertical_merge: Option<bool>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub(crate) preserved: Vec<RawXml>,
}

impl CellProperties {
    fn known_children(&self) -> Result<Vec<PropChild>> {
        let mut children = Vec::new();
        if let Some(width) = self.width_dxa {
            children.push(PropChild::new(
                "tcW",
                format!("<w:tcW w:w=\"{}\" w:type=\"dxa\"/>", width),
            ));
        }
        if let Some(span) = self.grid_span.filter(|span| *span > 1) {
            children.push(PropChild::new(
                "gridSpan",
                format!("<w:gridSpan w:val=\"{}\"/>", span),
            ));
        }
        match self.vertical_merge {
            Some(true) => children.push(PropChild::new("vMerge", "<w:vMerge w:val=\"restart\"/>")),
            Some(false) => children.push(PropChild::new("vMerge", "<w:vMerge/>")),
            None => {},
        }
        if let Some(ref borders) = self.borders {
            children.push(PropChild::new("tcBorders", borders.to_xml("tcBorders")?));
        }
        if let Some(ref bg_color) = self.background_color {
            children.push(PropChild::new(
                "shd",
                format!(
                    "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{}\"/>",
                    escape_xml(bg_color)
                ),
            ));
        }
        if let Some(v_align) = self.vertical_alignment {
            children.push(PropChild::new(
                "vAlign",
                format!("<w:vAlign w:val=\"{}\"/>", v_align.as_str()),
            ));
        }
        Ok(children)
    }
}

/// Row properties.
#[derive(Debug, Default, Clone)]
pub(crate) struct RowProperties {
    pub(crate) cant_split: Option<bool>,
    /// Height in twips and its rule (`atLeast`, `exact`, `auto`)
    pub(crate) height: Option<(u32, Option<String>)>,
    pub(crate) header: Option<bool>,
    pub(crate) preserved: Vec<RawXml>,
}

impl RowProperties {
    fn known_children(&self) -> Vec<PropChild> {
        let mut children = Vec::new();
        for (local, value) in [("cantSplit", self.cant_split), ("tblHeader", self.header)] {
            match value {
                Some(true) => children.push(PropChild::new(local, format!("<w:{}/>", local))),
                Some(false) => {
                    children.push(PropChild::new(local, format!("<w:{} w:val=\"0\"/>", local)))
                },
                None => {},
            }
        }
        if let Some((height, ref rule)) = self.height {
            let xml = match rule {
                Some(rule) => format!(
                    "<w:trHeight w:val=\"{}\" w:hRule=\"{}\"/>",
                    height,
                    escape_xml(rule)
                ),
                None => format!("<w:trHeight w:val=\"{}\"/>", height),
            };
            children.push(PropChild::new("trHeight", xml));
        }
        children
    }
}

/// A mutable table.
#[derive(Debug, Clone, Default)]
pub struct MutableTable {
    /// Table rows
    pub(crate) rows: Vec<MutableRow>,
    /// Column widths in twips; empty means one unsized column per cell
    pub(crate) grid: Vec<u32>,
    /// Table properties
    pub(crate) properties: TableProperties,
}

impl MutableTable {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        let mut table = Self {
            rows: Vec::with_capacity(rows),
            grid: Vec::new(),
            properties: TableProperties {
                width: Some(TableWidth::Pct(5000)),
                borders: Some(TableBorders::all(TableBorder::default())),
                ..Default::default()
            },
        };
        for _ in 0..rows {
            table.add_row(cols);
        }
        table
    }

    /// Add a new row with specified column count.
    pub fn add_row(&mut self, cols: usize) -> &mut MutableRow {
        self.rows.push(MutableRow::new(cols));
        match self.rows.last_mut() {
            Some(row) => row,
            None => unreachable!(),
        }
    }

    /// Set table width as a percentage of the text width.
    pub fn set_width_percent(&mut self, percent: u32) {
        self.properties.width = Some(TableWidth::Pct(percent.min(100) * 50));
    }

    pub fn set_width(&mut self, width: TableWidth) {
        self.properties.width = Some(width);
    }

    /// Set all table borders at once.
    pub fn set_borders(&mut self, border: TableBorder) {
        self.properties.borders = Some(TableBorders::all(border));
    }

    pub fn set_style(&mut self, style_id: &str) {
        self.properties.style = Some(style_id.to_string());
    }

    /// Set column widths in twips.
    pub fn set_column_widths(&mut self, widths: &[u32]) {
        self.grid = widths.to_vec();
    }

    /// Get a cell by row and column index.
    pub fn cell(&mut self, row: usize, col: usize) -> Option<&mut MutableCell> {
        self.rows.get_mut(row)?.cell(col)
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a row by index.
    pub fn row(&mut self, index: usize) -> Option<&mut MutableRow> {
        self.rows.get_mut(index)
    }

    pub fn rows(&self) -> &[MutableRow] {
        &self.rows
    }

    pub(crate) fn walk(&mut self, visitor: &mut dyn NodeVisitor) -> Result<()> {
        for raw in &self.properties.preserved {
            visitor.preserved(raw)?;
        }
        for row in &mut self.rows {
            for raw in &row.properties.preserved {
                visitor.preserved(raw)?;
            }
            for cell in &mut row.cells {
                for raw in &cell.properties.preserved {
                    visitor.preserved(raw)?;
                }
                cell.content.walk(visitor)?;
            }
        }
        Ok(())
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        xml.push_str("<w:tbl>");

        ctx.check_refs(&self.properties.preserved)?;
        let mut known = self.properties.known_children()?;
        if known.is_empty() && self.properties.preserved.is_empty() {
            // tblPr is required
            known.push(PropChild::new("tblW", "<w:tblW w:w=\"0\" w:type=\"auto\"/>"));
        }
        emit_ordered(xml, "tblPr", TBLPR_ORDER, &known, &self.properties.preserved);

        xml.push_str("<w:tblGrid>");
        if self.grid.is_empty() {
            let cols = self.rows.first().map_or(0, MutableRow::cell_count);
            for _ in 0..cols {
                xml.push_str("<w:gridCol/>");
            }
        } else {
            for width in &self.grid {
                write!(xml, "<w:gridCol w:w=\"{}\"/>", width)
                    .map_err(|e| OoxmlError::Xml(e.to_string()))?;
            }
        }
        xml.push_str("</w:tblGrid>");

        for row in &self.rows {
            row.to_xml(xml, ctx)?;
        }

        xml.push_str("</w:tbl>");

        Ok(())
    }
}

/// A mutable table row.
#[derive(Debug, Clone, Default)]
pub struct MutableRow {
    /// Table cells in this row
    pub(crate) cells: Vec<MutableCell>,
    pub(crate) properties: RowProperties,
    pub(crate) attrs: PreservedAttrs,
}

impl MutableRow {
    pub(crate) fn new(cols: usize) -> Self {
        let mut row = Self {
            cells: Vec::with_capacity(cols),
            properties: RowProperties::default(),
            attrs: PreservedAttrs::default(),
        };
        for _ in 0..cols {
            row.cells.push(MutableCell::new());
        }
        row
    }

    /// Get a cell by index.
    pub fn cell(&mut self, index: usize) -> Option<&mut MutableCell> {
        self.cells.get_mut(index)
    }

    /// Add a new cell.
    pub fn add_cell(&mut self) -> &mut MutableCell {
        self.cells.push(MutableCell::new());
        match self.cells.last_mut() {
            Some(cell) => cell,
            None => unreachable!(),
        }
    }

    /// Get the number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> &[MutableCell] {
        &self.cells
    }

    /// Repeat this row at the top of each page.
    pub fn set_header(&mut self, header: bool) {
        self.properties.header = Some(header);
    }

    /// Minimum row height in twips.
    pub fn set_height(&mut self, twips: u32) {
        self.properties.height = Some((twips, Some("atLeast".to_string())));
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        self.attrs.open_tag(xml, "w:tr");

        ctx.check_refs(&self.properties.preserved)?;
        emit_ordered(
            xml,
            "trPr",
            TRPR_ORDER,
            &self.properties.known_children(),
            &self.properties.preserved,
        );

        for cell in &self.cells {
            cell.to_xml(xml, ctx)?;
        }

        xml.push_str("</w:tr>");

        Ok(())
    }
}

/// A mutable table cell.
#[derive(Debug, Clone, Default)]
pub struct MutableCell {
    /// Block content of the cell
    pub(crate) content: DocumentBody,
    /// Cell properties
    pub(crate) properties: CellProperties,
}

impl MutableCell {
    pub(crate) fn new() -> Self {
        let mut cell = Self::default();
        cell.content.add_paragraph();
        cell
    }

    /// Add a new paragraph to the cell.
    pub fn add_paragraph(&mut self) -> &mut MutableParagraph {
        self.content.add_paragraph()
    }

    /// Get the number of paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.content.paragraph_count()
    }

    /// Get a paragraph by index.
    pub fn paragraph(&mut self, index: usize) -> Option<&mut MutableParagraph> {
        self.content.paragraph(index)
    }

    pub fn content(&self) -> &DocumentBody {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut DocumentBody {
        &mut self.content
    }

    /// Replace the content with one paragraph of text.
    pub fn set_text(&mut self, text: &str) {
        self.content.clear();
        self.content.add_paragraph_with_text(text);
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Set cell background color in hex RGB format (e.g., "FFFF00" for yellow).
    pub fn set_background_color(&mut self, color: &str) {
        self.properties.background_color = Some(color.to_string());
    }

    /// Set cell width in DXA units (twentieth of a point).
    pub fn set_width_dxa(&mut self, width: u32) {
        self.properties.width_dxa = Some(width);
    }

    pub fn properties_mut(&mut self) -> &mut CellProperties {
        &mut self.properties
    }

    pub(crate) fn to_xml(&self, xml: &mut String, ctx: &EmitContext<'_>) -> Result<()> {
        xml.push_str("<w:tc>");

        ctx.check_refs(&self.properties.preserved)?;
        emit_ordered(
            xml,
            "tcPr",
            TCPR_ORDER,
            &self.properties.known_children()?,
            &self.properties.preserved,
        );

        self.content.to_xml(xml, ctx)?;
        // A cell must end with a paragraph
        if self.content.needs_trailing_paragraph() {
            xml.push_str("<w:p/>");
        }

        xml.push_str("</w:tc>");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::docx::writer::NoteIds;
    use crate::ooxml::opc::Relationships;

    fn emit(table: &MutableTable) -> String {
        let rels = Relationships::new("/word/document.xml");
        let notes = NoteIds::default();
        let mut xml = String::new();
        table.to_xml(&mut xml, &EmitContext::new(&rels, &notes)).unwrap();
        xml
    }

    #[test]
    fn test_new_table_shape() {
        let mut table = MutableTable::new(2, 3);
        assert_eq!(table.row_count(), 2);
        table.cell(1, 2).unwrap().set_text("last");
        assert!(table.cell(2, 0).is_none());

        let xml = emit(&table);
        assert!(xml.starts_with("<w:tbl><w:tblPr><w:tblW w:w=\"5000\" w:type=\"pct\"/><w:tblBorders>"));
        assert_eq!(xml.matches("<w:gridCol/>").count(), 3);
        assert_eq!(xml.matches("<w:tc>").count(), 6);
        assert!(xml.contains(">last</w:t>"));
    }

    #[test]
    fn test_tcpr_order() {
        let mut table = MutableTable::new(1, 1);
        let cell = table.cell(0, 0).unwrap();
        cell.set_background_color("FFFF00");
        cell.set_width_dxa(2400);
        cell.properties_mut().vertical_alignment = Some(VerticalAlignment::Center);
        cell.properties_mut().grid_span = Some(2);

        let xml = emit(&table);
        assert!(xml.contains(
            "<w:tcPr><w:tcW w:w=\"2400\" w:type=\"dxa\"/><w:gridSpan w:val=\"2\"/>\
             <w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"FFFF00\"/><w:vAlign w:val=\"center\"/></w:tcPr>"
        ));
    }

    #[test]
    fn test_row_properties_and_grid() {
        let mut table = MutableTable::new(1, 2);
        table.set_column_widths(&[1000, 2000]);
        let row = table.row(0).unwrap();
        row.set_height(400);
        row.set_header(true);

        let xml = emit(&table);
        assert!(xml.contains("<w:tblGrid><w:gridCol w:w=\"1000\"/><w:gridCol w:w=\"2000\"/></w:tblGrid>"));
        assert!(xml.contains("<w:trPr><w:trHeight w:val=\"400\" w:hRule=\"atLeast\"/><w:tblHeader/></w:trPr>"));
    }

    #[test]
    fn test_cell_ending_in_table_gets_paragraph() {
        let mut table = MutableTable::new(1, 1);
        let cell = table.cell(0, 0).unwrap();
        cell.content_mut().clear();
        cell.content_mut().add_table(1, 1);

        let xml = emit(&table);
        assert!(xml.contains("</w:tbl><w:p/></w:tc></w:tr></w:tbl>"));
    }
}
