//! Per-document identity counters.
//!
//! Drawing (`wp:docPr`), bookmark, structured document tag and media indices
//! are handed out from counters that only move forward. Values seen while
//! reading an existing package are reserved so new ids never collide with
//! them. Only [`IdentityRegistry::clear`] rewinds the counters.

use crate::ooxml::error::{OoxmlError, Result};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    next_doc_pr: u32,
    /// docPr ids owned by preserved markup, skipped during the sweep
    reserved_doc_pr: HashSet<u32>,
    next_bookmark: u32,
    bookmark_names: HashMap<String, u32>,
    next_sdt: u32,
    reserved_sdt: HashSet<u32>,
    next_media: u32,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            next_doc_pr: 1,
            reserved_doc_pr: HashSet::new(),
            next_bookmark: 0,
            bookmark_names: HashMap::new(),
            next_sdt: 1,
            reserved_sdt: HashSet::new(),
            next_media: 1,
        }
    }

    /// Start a docPr sweep: numbering restarts at 1 and skips `reserved`.
    pub fn begin_doc_pr_sweep(&mut self, reserved: impl IntoIterator<Item = u32>) {
        self.next_doc_pr = 1;
        self.reserved_doc_pr = reserved.into_iter().collect();
    }

    pub fn next_doc_pr(&mut self) -> u32 {
        while self.reserved_doc_pr.contains(&self.next_doc_pr) {
            self.next_doc_pr += 1;
        }
        let id = self.next_doc_pr;
        self.next_doc_pr += 1;
        id
    }

    /// Allocate a bookmark id for `name`.
    ///
    /// Fails with [`OoxmlError::DuplicateIdentity`] if the name is taken.
    pub fn register_bookmark(&mut self, name: &str) -> Result<u32> {
        if self.bookmark_names.contains_key(name) {
            return Err(OoxmlError::DuplicateIdentity(format!("bookmark '{}'", name)));
        }
        let id = self.next_bookmark;
        self.next_bookmark += 1;
        self.bookmark_names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Record a bookmark found in an existing part.
    pub fn reserve_bookmark(&mut self, name: &str, id: u32) -> Result<()> {
        if self.bookmark_names.contains_key(name) {
            return Err(OoxmlError::DuplicateIdentity(format!("bookmark '{}'", name)));
        }
        self.bookmark_names.insert(name.to_string(), id);
        self.next_bookmark = self.next_bookmark.max(id.saturating_add(1));
        Ok(())
    }

    pub fn bookmark_id(&self, name: &str) -> Option<u32> {
        self.bookmark_names.get(name).copied()
    }

    pub fn next_sdt_id(&mut self) -> u32 {
        while self.reserved_sdt.contains(&self.next_sdt) {
            self.next_sdt += 1;
        }
        let id = self.next_sdt;
        self.next_sdt += 1;
        id
    }

    pub fn reserve_sdt(&mut self, id: u32) {
        self.reserved_sdt.insert(id);
    }

    /// Next `n` for a `word/media/image{n}.{ext}` part name.
    pub fn next_media_index(&mut self) -> u32 {
        let index = self.next_media;
        self.next_media += 1;
        index
    }

    /// Keep new media names clear of `image{index}` parts already in the package.
    pub fn reserve_media_index(&mut self, index: u32) {
        self.next_media = self.next_media.max(index.saturating_add(1));
    }

    /// Reset every counter and forget every reservation.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Parse the index out of a media file name like `image12.png`.
pub(crate) fn media_index(filename: &str) -> Option<u32> {
    let stem = filename.split('.').next()?;
    stem.strip_prefix("image")?.parse().ok()
}
