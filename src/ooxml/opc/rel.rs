//! Relationship tables for OPC parts.
//!
//! Every part that references another part or an external URL owns a
//! [`Relationships`] table, serialized as the part's `.rels` file. Ids are handed
//! out as `rId1`, `rId2`, ... from a counter that only moves forward, so an id
//! that was removed is never issued again for the lifetime of the table.

use crate::common::xml::{attr, escape_xml};
use crate::ooxml::opc::constants::relationship_type as rt;
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::opc::packuri::PackURI;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Relationship type, with the URIs this engine produces named explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelType {
    OfficeDocument,
    CoreProperties,
    Image,
    Hyperlink,
    Header,
    Footer,
    Footnotes,
    Endnotes,
    Styles,
    /// Any other relationship type, kept by URI.
    Other(String),
}

impl RelType {
    pub fn uri(&self) -> &str {
        match self {
            RelType::OfficeDocument => rt::OFFICE_DOCUMENT,
            RelType::CoreProperties => rt::CORE_PROPERTIES,
            RelType::Image => rt::IMAGE,
            RelType::Hyperlink => rt::HYPERLINK,
            RelType::Header => rt::HEADER,
            RelType::Footer => rt::FOOTER,
            RelType::Footnotes => rt::FOOTNOTES,
            RelType::Endnotes => rt::ENDNOTES,
            RelType::Styles => rt::STYLES,
            RelType::Other(uri) => uri,
        }
    }

    pub fn from_uri(uri: &str) -> Self {
        match uri {
            rt::OFFICE_DOCUMENT => RelType::OfficeDocument,
            rt::CORE_PROPERTIES => RelType::CoreProperties,
            rt::IMAGE => RelType::Image,
            rt::HYPERLINK => RelType::Hyperlink,
            rt::HEADER => RelType::Header,
            rt::FOOTER => RelType::Footer,
            rt::FOOTNOTES => RelType::Footnotes,
            rt::ENDNOTES => RelType::Endnotes,
            rt::STYLES => RelType::Styles,
            other => RelType::Other(other.to_string()),
        }
    }
}

/// Whether a target is a part in the package or an external URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetMode {
    #[default]
    Internal,
    External,
}

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    r_id: String,
    reltype: RelType,
    target_ref: String,
    mode: TargetMode,
}

impl Relationship {
    pub fn new(r_id: String, reltype: RelType, target_ref: String, mode: TargetMode) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            mode,
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &RelType {
        &self.reltype
    }

    /// Part reference relative to the source directory, or an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn mode(&self) -> TargetMode {
        self.mode
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.mode == TargetMode::External
    }
}

/// Relationships owned by one source part.
#[derive(Debug, Clone)]
pub struct Relationships {
    /// Partname of the owning part, e.g. `/word/document.xml`
    source: String,
    rels: HashMap<String, Relationship>,
    /// Next numeric suffix handed out by `register`. Wider than the
    /// `u32` suffixes `insert` advances it past, so it cannot overflow.
    next_id: u64,
}

impl Relationships {
    /// Create an empty table for the part at `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            rels: HashMap::new(),
            next_id: 1,
        }
    }

    /// Partname of the owning part.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Register a relationship under a fresh `rId{n}` and return the id.
    pub fn register(
        &mut self,
        reltype: RelType,
        target_ref: impl Into<String>,
        mode: TargetMode,
    ) -> String {
        let mut r_id = format!("rId{}", self.next_id);
        self.next_id += 1;
        // Never shadow an explicitly inserted id
        while self.rels.contains_key(&r_id) {
            r_id = format!("rId{}", self.next_id);
            self.next_id += 1;
        }
        let rel = Relationship::new(r_id.clone(), reltype, target_ref.into(), mode);
        self.rels.insert(r_id.clone(), rel);
        r_id
    }

    /// Insert a relationship under a caller-chosen id, as read from an existing part.
    ///
    /// Fails with [`OpcError::DuplicateIdentity`] if the id is taken. Numeric
    /// `rId{n}` ids advance the counter so later registrations never collide.
    pub fn insert(
        &mut self,
        r_id: impl Into<String>,
        reltype: RelType,
        target_ref: impl Into<String>,
        mode: TargetMode,
    ) -> Result<()> {
        let r_id = r_id.into();
        if self.rels.contains_key(&r_id) {
            return Err(OpcError::DuplicateIdentity(format!(
                "relationship {} in {}",
                r_id, self.source
            )));
        }
        if let Some(n) = numeric_suffix(&r_id) {
            self.next_id = self.next_id.max(u64::from(n) + 1);
        }
        let rel = Relationship::new(r_id.clone(), reltype, target_ref.into(), mode);
        self.rels.insert(r_id, rel);
        Ok(())
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.get(r_id)
    }

    #[inline]
    pub fn contains(&self, r_id: &str) -> bool {
        self.rels.contains_key(r_id)
    }

    /// Look up a relationship that a node references. A miss is fatal for the caller.
    pub fn resolve(&self, r_id: &str) -> Result<&Relationship> {
        self.rels
            .get(r_id)
            .ok_or_else(|| OpcError::UnresolvedReference {
                part: self.source.clone(),
                id: r_id.to_string(),
            })
    }

    /// Point an existing relationship at a new target, keeping its id.
    pub fn rewrite_target(&mut self, r_id: &str, target_ref: impl Into<String>) -> Result<()> {
        let rel = self
            .rels
            .get_mut(r_id)
            .ok_or_else(|| OpcError::UnresolvedReference {
                part: self.source.clone(),
                id: r_id.to_string(),
            })?;
        rel.target_ref = target_ref.into();
        Ok(())
    }

    /// Remove a relationship. Its id is retired, not recycled.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        self.rels.remove(r_id)
    }

    /// Find a relationship of the given type pointing at `target_ref`.
    pub fn find(&self, reltype: &RelType, target_ref: &str) -> Option<&Relationship> {
        self.sorted()
            .into_iter()
            .find(|rel| rel.reltype() == reltype && rel.target_ref() == target_ref)
    }

    /// The single relationship of a type, e.g. the main document from `_rels/.rels`.
    pub fn part_with_reltype(&self, reltype: &RelType) -> Result<&Relationship> {
        let matching: Vec<&Relationship> = self
            .sorted()
            .into_iter()
            .filter(|rel| rel.reltype() == reltype)
            .collect();

        match matching.len() {
            0 => Err(OpcError::PartNotFound(format!(
                "no relationship of type '{}' in {}",
                reltype.uri(),
                self.source
            ))),
            1 => Ok(matching[0]),
            _ => Err(OpcError::InvalidRelationship(format!(
                "multiple relationships of type '{}'",
                reltype.uri()
            ))),
        }
    }

    /// Absolute partname of an internal relationship's target.
    pub fn target_partname(&self, rel: &Relationship) -> Result<PackURI> {
        if rel.is_external() {
            return Err(OpcError::InvalidRelationship(format!(
                "{} is external",
                rel.r_id()
            )));
        }
        let source = PackURI::new(self.source.as_str()).map_err(OpcError::InvalidPackUri)?;
        PackURI::from_rel_ref(source.base_uri(), rel.target_ref()).map_err(OpcError::InvalidPackUri)
    }

    /// Relationships in id order: `rId{n}` numerically, then other ids by name.
    pub fn sorted(&self) -> Vec<&Relationship> {
        let mut rels: Vec<&Relationship> = self.rels.values().collect();
        rels.sort_by(|a, b| sort_key(a.r_id()).cmp(&sort_key(b.r_id())));
        rels
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize to the XML of a `.rels` part, sorted by id for stable output.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.rels.len() * 160);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for rel in self.sorted() {
            let target_mode = if rel.is_external() {
                r#" TargetMode="External""#
            } else {
                ""
            };

            xml.push_str(&format!(
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(rel.r_id()),
                escape_xml(rel.reltype().uri()),
                escape_xml(rel.target_ref()),
                target_mode
            ));
        }

        xml.push_str("</Relationships>");
        xml
    }

    /// Parse a `.rels` part, keeping every original id.
    pub fn from_xml(source: impl Into<String>, xml: &str) -> Result<Self> {
        let mut rels = Self::new(source);
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e) | Event::Empty(e))
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let r_id = attr(&e, b"Id").ok_or_else(|| {
                        OpcError::InvalidRelationship("Relationship without Id".to_string())
                    })?;
                    let reltype = attr(&e, b"Type").unwrap_or_default();
                    let target = attr(&e, b"Target").unwrap_or_default();
                    let mode = match attr(&e, b"TargetMode").as_deref() {
                        Some("External") => TargetMode::External,
                        _ => TargetMode::Internal,
                    };
                    rels.insert(r_id, RelType::from_uri(&reltype), target, mode)?;
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(e.to_string())),
                _ => {},
            }
        }

        Ok(rels)
    }
}

fn numeric_suffix(r_id: &str) -> Option<u32> {
    r_id.strip_prefix("rId")?.parse::<u32>().ok()
}

fn sort_key(r_id: &str) -> (u8, u64, &str) {
    match r_id.strip_prefix("rId").and_then(|n| n.parse::<u64>().ok()) {
        Some(n) => (0, n, r_id),
        None => (1, 0, r_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_register_is_sequential() {
        let mut rels = Relationships::new("/word/document.xml");
        assert_eq!(rels.register(RelType::Styles, "styles.xml", TargetMode::Internal), "rId1");
        assert_eq!(rels.register(RelType::Image, "media/image1.png", TargetMode::Internal), "rId2");
        assert_eq!(rels.len(), 2);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut rels = Relationships::new("/word/document.xml");
        let a = rels.register(RelType::Image, "media/image1.png", TargetMode::Internal);
        let b = rels.register(RelType::Image, "media/image2.png", TargetMode::Internal);
        rels.remove(&a);
        let c = rels.register(RelType::Image, "media/image3.png", TargetMode::Internal);
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert_eq!(c, "rId3");
    }

    #[test]
    fn test_resolve_unregistered_is_error() {
        let rels = Relationships::new("/word/document.xml");
        match rels.resolve("rId9") {
            Err(OpcError::UnresolvedReference { part, id }) => {
                assert_eq!(part, "/word/document.xml");
                assert_eq!(id, "rId9");
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_insert_duplicate_and_counter() {
        let mut rels = Relationships::new("/word/document.xml");
        rels.insert("rId7", RelType::Styles, "styles.xml", TargetMode::Internal)
            .unwrap();
        assert!(matches!(
            rels.insert("rId7", RelType::Styles, "other.xml", TargetMode::Internal),
            Err(OpcError::DuplicateIdentity(_))
        ));
        rels.insert("rIdCustom", RelType::Styles, "x.xml", TargetMode::Internal)
            .unwrap();
        assert_eq!(rels.register(RelType::Image, "media/a.png", TargetMode::Internal), "rId8");
    }

    #[test]
    fn test_register_after_largest_suffix() {
        let mut rels = Relationships::new("/word/document.xml");
        rels.insert("rId4294967295", RelType::Styles, "styles.xml", TargetMode::Internal)
            .unwrap();
        let r_id = rels.register(RelType::Image, "media/a.png", TargetMode::Internal);
        assert_eq!(r_id, "rId4294967296");
        assert_eq!(rels.register(RelType::Image, "media/b.png", TargetMode::Internal), "rId4294967297");

        let reparsed = Relationships::from_xml("/word/document.xml", &rels.to_xml()).unwrap();
        assert_eq!(reparsed.len(), 3);
        assert!(reparsed.contains(&r_id));
    }

    #[test]
    fn test_rewrite_target_keeps_id() {
        let mut rels = Relationships::new("/word/document.xml");
        let id = rels.register(RelType::Image, "media/image1.bmp", TargetMode::Internal);
        rels.rewrite_target(&id, "media/image1.png").unwrap();
        assert_eq!(rels.resolve(&id).unwrap().target_ref(), "media/image1.png");
        assert!(rels.rewrite_target("rId99", "x").is_err());
    }

    #[test]
    fn test_xml_round_trip() {
        let mut rels = Relationships::new("/word/document.xml");
        for _ in 0..10 {
            rels.register(RelType::Image, "media/image.png", TargetMode::Internal);
        }
        rels.register(RelType::Hyperlink, "https://example.com/?a=1&b=2", TargetMode::External);
        let xml = rels.to_xml();
        // rId10 sorts after rId9
        let nine = xml.find(r#"Id="rId9""#).unwrap();
        let ten = xml.find(r#"Id="rId10""#).unwrap();
        assert!(nine < ten);
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));

        let parsed = Relationships::from_xml("/word/document.xml", &xml).unwrap();
        assert_eq!(parsed.len(), 11);
        let link = parsed.resolve("rId11").unwrap();
        assert_eq!(link.reltype(), &RelType::Hyperlink);
        assert_eq!(link.target_ref(), "https://example.com/?a=1&b=2");
        assert!(link.is_external());
        assert_eq!(parsed.to_xml(), xml);
    }

    #[test]
    fn test_unknown_type_survives() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://example.com/custom" Target="custom.xml"/></Relationships>"#;
        let rels = Relationships::from_xml("/word/document.xml", xml).unwrap();
        let rel = rels.resolve("rId3").unwrap();
        assert_eq!(rel.reltype(), &RelType::Other("http://example.com/custom".to_string()));
        assert_eq!(
            rels.target_partname(rel).unwrap().as_str(),
            "/word/custom.xml"
        );
    }

    #[test]
    fn test_part_with_reltype() {
        let mut rels = Relationships::new("/");
        rels.register(RelType::OfficeDocument, "word/document.xml", TargetMode::Internal);
        let main = rels.part_with_reltype(&RelType::OfficeDocument).unwrap();
        assert_eq!(rels.target_partname(main).unwrap().as_str(), "/word/document.xml");
        assert!(rels.part_with_reltype(&RelType::Styles).is_err());
    }

    proptest! {
        #[test]
        fn ids_are_never_reused(total in 1usize..40, removals in proptest::collection::vec(any::<prop::sample::Index>(), 0..20), more in 1usize..40) {
            let mut rels = Relationships::new("/word/document.xml");
            let mut issued = std::collections::HashSet::new();
            let mut live = Vec::new();
            for _ in 0..total {
                let id = rels.register(RelType::Image, "media/x.png", TargetMode::Internal);
                prop_assert!(issued.insert(id.clone()));
                live.push(id);
            }
            for idx in removals {
                if live.is_empty() {
                    break;
                }
                let id = live.remove(idx.index(live.len()));
                rels.remove(&id);
            }
            for _ in 0..more {
                let id = rels.register(RelType::Image, "media/y.png", TargetMode::Internal);
                prop_assert!(issued.insert(id));
            }
        }
    }
}
