//! Field tables fixing the child order of property containers.
//!
//! WordprocessingML property elements (`w:rPr`, `w:pPr`, ...) are schema
//! sequences: readers reject children out of order. Each container's known
//! children are produced by the owning node, unknown children kept from parsing
//! are merged in, and [`emit_ordered`] writes everything sorted by its slot in
//! the table. The tables name `w:` children only; any other child, including
//! extension elements such as `w14:shadow`, goes last in source order.

use super::preserved::RawXml;
use smallvec::SmallVec;

pub const RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr",
    "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish",
    "oMath",
];

pub const PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap", "jc",
    "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId", "cnfStyle",
    "rPr", "sectPr", "pPrChange",
];

pub const TBLPR_ORDER: &[&str] = &[
    "tblStyle", "tblpPr", "tblOverlap", "bidiVisual", "tblStyleRowBandSize",
    "tblStyleColBandSize", "tblW", "jc", "tblCellSpacing", "tblInd", "tblBorders", "shd",
    "tblLayout", "tblCellMar", "tblLook", "tblCaption", "tblDescription", "tblPrChange",
];

pub const TRPR_ORDER: &[&str] = &[
    "cnfStyle", "divId", "gridBefore", "gridAfter", "wBefore", "wAfter", "cantSplit",
    "trHeight", "tblHeader", "tblCellSpacing", "jc", "hidden", "ins", "del", "trPrChange",
];

pub const TCPR_ORDER: &[&str] = &[
    "cnfStyle", "tcW", "gridSpan", "hMerge", "vMerge", "tcBorders", "shd", "noWrap", "tcMar",
    "textDirection", "tcFitText", "vAlign", "hideMark", "headers", "cellIns", "cellDel",
    "cellMerge", "tcPrChange",
];

pub const SECTPR_ORDER: &[&str] = &[
    "headerReference", "footerReference", "footnotePr", "endnotePr", "type", "pgSz", "pgMar",
    "paperSrc", "pgBorders", "lnNumType", "pgNumType", "cols", "formProt", "vAlign", "noEndnote",
    "titlePg", "textDirection", "bidi", "rtlGutter", "docGrid", "printerSettings",
    "sectPrChange",
];

pub const SDTPR_ORDER: &[&str] = &[
    "rPr", "alias", "tag", "id", "lock", "placeholder", "temporary", "showingPlcHdr",
    "dataBinding", "label", "tabIndex", "equation", "comboBox", "date", "docPartObj",
    "docPartList", "dropDownList", "picture", "richText", "text", "citation", "group",
    "bibliography",
];

/// One serialized child of a property container.
#[derive(Debug, Clone)]
pub(crate) struct PropChild {
    /// Local name of a `w:` child, or the qualified name of any other
    pub local: &'static str,
    pub xml: String,
}

impl PropChild {
    pub(crate) fn new(local: &'static str, xml: impl Into<String>) -> Self {
        Self {
            local,
            xml: xml.into(),
        }
    }
}

fn slot(order: &[&str], name: &str) -> usize {
    let local = match name.split_once(':') {
        Some(("w", local)) => local,
        Some(_) => return order.len(),
        None => name,
    };
    order
        .iter()
        .position(|name| *name == local)
        .unwrap_or(order.len())
}

/// Write `<w:{tag}>` with `known` and `preserved` children merged in table order.
///
/// Nothing is written when both lists are empty. For equal slots the model's
/// own child comes before a preserved one.
pub(crate) fn emit_ordered(
    xml: &mut String,
    tag: &str,
    order: &[&str],
    known: &[PropChild],
    preserved: &[RawXml],
) {
    if known.is_empty() && preserved.is_empty() {
        return;
    }

    let mut children: SmallVec<[(usize, &str); 16]> = SmallVec::new();
    children.extend(known.iter().map(|c| (slot(order, c.local), c.xml.as_str())));
    children.extend(preserved.iter().map(|p| (slot(order, p.name()), p.as_str())));
    // Stable: known children and source order survive within a slot
    children.sort_by_key(|(slot, _)| *slot);

    xml.push_str("<w:");
    xml.push_str(tag);
    xml.push('>');
    for (_, child) in children {
        xml.push_str(child);
    }
    xml.push_str("</w:");
    xml.push_str(tag);
    xml.push('>');
}
