//! Markup the element model does not interpret.
//!
//! A [`RawXml`] holds the exact bytes of an element as it appeared in the
//! source part and is written back unchanged. Relationship references inside it
//! are still checked against the owning part's table at emission time.

use crate::common::xml::escape_xml;
use memchr::memmem;
use smallvec::SmallVec;

/// Attributes that carry relationship ids in WordprocessingML and DrawingML.
const REL_ATTRS: [&str; 5] = ["r:id=\"", "r:embed=\"", "r:link=\"", "r:pict=\"", "r:dm=\""];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawXml {
    /// Qualified name of the root element, e.g. `w:proofErr`
    name: String,
    xml: String,
}

impl RawXml {
    pub fn new(name: impl Into<String>, xml: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            xml: xml.into(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local part of the element name.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.xml
    }

    pub(crate) fn to_xml(&self, xml: &mut String) {
        xml.push_str(&self.xml);
    }

    /// Relationship ids referenced anywhere inside the markup.
    pub fn referenced_ids(&self) -> SmallVec<[&str; 2]> {
        let mut ids = SmallVec::new();
        let bytes = self.xml.as_bytes();
        for needle in REL_ATTRS {
            for pos in memmem::find_iter(bytes, needle.as_bytes()) {
                // Skip longer names ending in the same suffix, e.g. `wr:id`
                if pos > 0 && !matches!(bytes[pos - 1], b' ' | b'\t' | b'\r' | b'\n') {
                    continue;
                }
                if let Some(value) = quoted_value(&self.xml, pos + needle.len()) {
                    ids.push(value);
                }
            }
        }
        ids
    }

    /// `wp:docPr` ids used by drawings inside the markup.
    pub fn doc_pr_ids(&self) -> SmallVec<[u32; 2]> {
        let mut ids = SmallVec::new();
        let bytes = self.xml.as_bytes();
        for pos in memmem::find_iter(bytes, b"<wp:docPr ") {
            let tag_end = memchr::memchr(b'>', &bytes[pos..]).map_or(bytes.len(), |n| pos + n);
            let tag = &self.xml[pos..tag_end];
            if let Some(start) = memmem::find(tag.as_bytes(), b" id=\"")
                && let Some(value) = quoted_value(tag, start + 5)
                && let Ok(id) = value.parse()
            {
                ids.push(id);
            }
        }
        ids
    }
}

/// Start-tag attributes kept from a parsed element, such as `w:rsidR` or
/// `w14:paraId`, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PreservedAttrs(Vec<(String, String)>);

impl PreservedAttrs {
    pub(crate) fn new(attrs: Vec<(String, String)>) -> Self {
        Self(attrs)
    }

    /// Write `<{tag}` with the kept attributes, then `>`.
    pub(crate) fn open_tag(&self, xml: &mut String, tag: &str) {
        xml.push('<');
        xml.push_str(tag);
        for (name, value) in &self.0 {
            xml.push(' ');
            xml.push_str(name);
            xml.push_str("=\"");
            xml.push_str(&escape_xml(value));
            xml.push('"');
        }
        xml.push('>');
    }
}

fn quoted_value(s: &str, start: usize) -> Option<&str> {
    let rest = s.get(start..)?;
    let end = memchr::memchr(b'"', rest.as_bytes())?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_is_verbatim() {
        let src = r#"<w:proofErr   w:type="spellStart" />"#;
        let raw = RawXml::new("w:proofErr", src);
        let mut out = String::new();
        raw.to_xml(&mut out);
        assert_eq!(out, src);
        assert_eq!(raw.local_name(), "proofErr");
    }

    #[test]
    fn test_referenced_ids() {
        let raw = RawXml::new(
            "w:r",
            r#"<w:r><w:object><v:imagedata r:id="rId7"/><o:OLEObject r:id="rId8"/></w:object><a:blip r:embed="rId9"/></w:r>"#,
        );
        let mut ids: Vec<&str> = raw.referenced_ids().into_iter().collect();
        ids.sort();
        assert_eq!(ids, ["rId7", "rId8", "rId9"]);
    }

    #[test]
    fn test_referenced_ids_ignores_other_prefixes() {
        let raw = RawXml::new("w:x", r#"<w:x xr:id="rId1" w:id="3"/>"#);
        assert!(raw.referenced_ids().is_empty());
    }

    #[test]
    fn test_doc_pr_ids() {
        let raw = RawXml::new(
            "w:r",
            r#"<w:r><wp:docPr id="12" name="Shape 1"/><wp:docPr name="x" id="3"/></w:r>"#,
        );
        assert_eq!(raw.doc_pr_ids().as_slice(), &[12, 3]);
    }

    #[test]
    fn test_open_tag_keeps_attributes() {
        let attrs = PreservedAttrs::new(vec![
            ("w:rsidR".to_string(), "00A1".to_string()),
            ("w14:paraId".to_string(), "1F<2".to_string()),
        ]);
        let mut xml = String::new();
        attrs.open_tag(&mut xml, "w:p");
        assert_eq!(xml, r#"<w:p w:rsidR="00A1" w14:paraId="1F&lt;2">"#);

        xml.clear();
        PreservedAttrs::default().open_tag(&mut xml, "w:r");
        assert_eq!(xml, "<w:r>");
    }
}
