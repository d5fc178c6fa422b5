//! Physical package storage.
//!
//! The serializer only needs a named-blob store; [`PartStore`] is that seam.
//! [`ZipPackage`] is the in-memory implementation backed by a ZIP archive.

use crate::ooxml::opc::constants::part_name;
use crate::ooxml::opc::error::Result;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A store of named parts. Names are ZIP member names, e.g. `word/document.xml`.
pub trait PartStore {
    fn put(&mut self, name: &str, data: Vec<u8>);

    fn get(&self, name: &str) -> Option<&[u8]>;

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All part names, in a stable order.
    fn list(&self) -> Vec<String>;

    fn remove(&mut self, name: &str) -> Option<Vec<u8>>;
}

/// Parts held in memory and written out as a deterministic ZIP archive.
#[derive(Debug, Clone, Default)]
pub struct ZipPackage {
    parts: BTreeMap<String, Vec<u8>>,
    /// Deflate level for written members; `None` uses the zip crate default
    compression_level: Option<i64>,
}

impl ZipPackage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level.min(9) as i64);
        self
    }

    /// Read every member of an archive into memory.
    pub fn from_archive_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut parts = BTreeMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(name, buf);
        }

        log::debug!("read package with {} parts", parts.len());
        Ok(Self {
            parts,
            compression_level: None,
        })
    }

    /// Write the archive. `[Content_Types].xml` comes first, then parts by name;
    /// timestamps are fixed so equal packages produce equal bytes.
    pub fn to_archive_bytes(&self) -> Result<Vec<u8>> {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(self.compression_level)
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        if let Some(content_types) = self.parts.get(part_name::CONTENT_TYPES) {
            zip.start_file(part_name::CONTENT_TYPES, options)?;
            zip.write_all(content_types)?;
        }
        for (name, data) in &self.parts {
            if name == part_name::CONTENT_TYPES {
                continue;
            }
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?.into_inner())
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl PartStore for ZipPackage {
    fn put(&mut self, name: &str, data: Vec<u8>) {
        self.parts.insert(name.trim_start_matches('/').to_string(), data);
    }

    fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .get(name.trim_start_matches('/'))
            .map(Vec::as_slice)
    }

    fn list(&self) -> Vec<String> {
        self.parts.keys().cloned().collect()
    }

    fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.parts.remove(name.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ZipPackage {
        let mut pkg = ZipPackage::new();
        pkg.put("word/document.xml", b"<w:document/>".to_vec());
        pkg.put("_rels/.rels", b"<Relationships/>".to_vec());
        pkg.put("[Content_Types].xml", b"<Types/>".to_vec());
        pkg.put("word/media/image1.png", vec![0x89, 0x50, 0x4E, 0x47]);
        pkg
    }

    #[test]
    fn test_part_store() {
        let mut pkg = sample();
        assert!(pkg.has("word/document.xml"));
        assert!(pkg.has("/word/document.xml"));
        assert_eq!(pkg.get("_rels/.rels"), Some(b"<Relationships/>".as_slice()));
        assert_eq!(pkg.list().len(), 4);
        assert!(pkg.remove("word/media/image1.png").is_some());
        assert!(!pkg.has("word/media/image1.png"));
    }

    #[test]
    fn test_archive_round_trip() {
        let pkg = sample();
        let bytes = pkg.to_archive_bytes().unwrap();
        let read = ZipPackage::from_archive_bytes(&bytes).unwrap();
        assert_eq!(read.list(), pkg.list());
        assert_eq!(read.get("word/media/image1.png"), pkg.get("word/media/image1.png"));
    }

    #[test]
    fn test_content_types_is_first_member() {
        let bytes = sample().to_archive_bytes().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "[Content_Types].xml");
        assert_eq!(archive.by_index(1).unwrap().name(), "_rels/.rels");
    }

    #[test]
    fn test_output_is_deterministic() {
        let a = sample().to_archive_bytes().unwrap();
        let b = sample().to_archive_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(ZipPackage::from_archive_bytes(b"definitely not a zip").is_err());
    }
}
