//! Word (.docx) document support.
//!
//! The module is organized around these key types:
//! - [`MutableDocument`]: the editable document and its parts
//! - [`ImageResource`]: an embedded picture whose bytes may load lazily
//! - [`DocumentBody`]: block content shared by the body, cells, notes and headers
//! - [`RawXml`]: markup read from a package and written back untouched
//!
//! # Example
//!
//! ```rust
//! use quire::ooxml::docx::{ImageResource, MutableDocument};
//!
//! let gif = b"GIF89a\x60\x00\x30\x00\x00\x00\x00\x3b".to_vec();
//! let mut doc = MutableDocument::new();
//! let para = doc.add_paragraph();
//! para.add_run_with_text("Logo: ");
//! para.add_image(ImageResource::from_bytes(gif));
//!
//! let bytes = doc.to_archive_bytes()?;
//! let reopened = MutableDocument::from_archive_bytes(&bytes)?;
//! assert_eq!(reopened.body().drawings().len(), 1);
//! # Ok::<(), quire::ooxml::error::OoxmlError>(())
//! ```
pub mod format;
pub mod image;
pub(crate) mod reader;
pub mod writer;

pub use format::{
    LineSpacing, ParagraphAlignment, TableBorderStyle, UnderlineStyle, VerticalAlignment,
};
pub use image::{Crop, FloatingPosition, ImageEffects, ImageResource, Payload, Placement, WrapStyle};
pub use writer::{
    BodyElement, ContentControlType, DocumentBody, Drawing, HeaderFooter, HeaderFooterKind,
    HeaderFooterType, HyperlinkTarget, IdentityRegistry, MutableBookmark, MutableCell,
    MutableContentControl, MutableDocument, MutableHyperlink, MutableParagraph, MutableRow,
    MutableRun, MutableTable, Note, NoteKind, NotesPart, PageOrientation, ParagraphElement, RawXml,
    SectionProperties, TableBorder, TableBorders, TableWidth,
};
