//! The `[Content_Types].xml` part.
//!
//! Maps file extensions (`Default`) and individual part names (`Override`) to
//! content types. Entries are kept sorted so the serialized part is stable.

use crate::common::xml::{attr, escape_xml};
use crate::ooxml::opc::constants::content_type as ct;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypes {
    /// Default content types by lower-case extension
    defaults: BTreeMap<String, String>,
    /// Override content types by partname (with leading slash)
    overrides: BTreeMap<String, String>,
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentTypes {
    /// A table holding the `rels` and `xml` defaults every package needs.
    pub fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        self.defaults
            .insert(ext.to_ascii_lowercase(), content_type.to_string());
    }

    pub fn add_override(&mut self, partname: &PackURI, content_type: &str) {
        self.overrides
            .insert(partname.to_string(), content_type.to_string());
    }

    pub fn remove_override(&mut self, partname: &PackURI) -> Option<String> {
        self.overrides.remove(partname.as_str())
    }

    /// Content type of a part: its override if any, else its extension default.
    pub fn content_type_for(&self, partname: &PackURI) -> Option<&str> {
        if let Some(ct) = self.overrides.get(partname.as_str()) {
            return Some(ct);
        }
        self.defaults
            .get(&partname.ext().to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(512 + 128 * (self.defaults.len() + self.overrides.len()));

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );

        for (ext, content_type) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                escape_xml(ext),
                escape_xml(content_type)
            ));
        }

        for (partname, content_type) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="{}" ContentType="{}"/>"#,
                escape_xml(partname),
                escape_xml(content_type)
            ));
        }

        xml.push_str("</Types>");
        xml
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut types = Self {
            defaults: BTreeMap::new(),
            overrides: BTreeMap::new(),
        };
        let mut reader = Reader::from_str(xml);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e) | Event::Empty(e)) => match e.local_name().as_ref() {
                    b"Default" => {
                        if let (Some(ext), Some(ct)) = (attr(&e, b"Extension"), attr(&e, b"ContentType")) {
                            types.add_default(&ext, &ct);
                        }
                    },
                    b"Override" => {
                        if let (Some(name), Some(ct)) = (attr(&e, b"PartName"), attr(&e, b"ContentType")) {
                            types.overrides.insert(name, ct);
                        }
                    },
                    _ => {},
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(e.to_string())),
                _ => {},
            }
        }

        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types_xml() {
        let mut types = ContentTypes::new();
        types.add_default("PNG", "image/png");
        types.add_override(
            &PackURI::new("/word/document.xml").unwrap(),
            ct::WML_DOCUMENT_MAIN,
        );

        let xml = types.to_xml();
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/word/document.xml""#));
        // Defaults are sorted by extension
        assert!(xml.find(r#"Extension="png""#) < xml.find(r#"Extension="rels""#));
    }

    #[test]
    fn test_lookup_prefers_override() {
        let mut types = ContentTypes::new();
        let doc = PackURI::new("/word/document.xml").unwrap();
        let styles = PackURI::new("/word/styles.xml").unwrap();
        types.add_override(&doc, ct::WML_DOCUMENT_MAIN);
        assert_eq!(types.content_type_for(&doc), Some(ct::WML_DOCUMENT_MAIN));
        assert_eq!(types.content_type_for(&styles), Some(ct::XML));
        assert_eq!(types.content_type_for(&PackURI::new("/a.bin").unwrap()), None);
    }

    #[test]
    fn test_round_trip() {
        let mut types = ContentTypes::new();
        types.add_default("jpeg", "image/jpeg");
        types.add_override(&PackURI::new("/word/header1.xml").unwrap(), ct::WML_HEADER);
        let parsed = ContentTypes::from_xml(&types.to_xml()).unwrap();
        assert_eq!(parsed, types);
    }
}
