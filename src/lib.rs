//! Quire - a Rust library for writing and re-editing Word documents
//!
//! Quire builds WordprocessingML packages (.docx) from an editable element
//! tree, and reads existing packages back into the same tree without losing
//! markup it does not model.
//!
//! # Features
//!
//! - **Image resources**: format sniffing, pixel size and DPI detection, lazy
//!   file-backed payloads and lossless PNG/BMP optimization
//! - **Element tree**: paragraphs, runs, tables, hyperlinks, bookmarks,
//!   content controls, floating images, headers, footers and notes
//! - **Ordered serialization**: property children always leave in schema
//!   order, with preserved markup merged into its slot
//! - **Read-back**: unknown elements and parts survive a load/save cycle
//!
//! # Example - Building a document
//!
//! ```no_run
//! use quire::ooxml::docx::{ImageResource, MutableDocument};
//!
//! # async fn run() -> quire::ooxml::Result<()> {
//! let mut doc = MutableDocument::new();
//! doc.add_paragraph_with_text("Quarterly report");
//! let para = doc.add_paragraph();
//! para.add_image(ImageResource::from_path("chart.png"));
//! doc.save("report.docx").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Editing an existing document
//!
//! ```no_run
//! use quire::ooxml::docx::MutableDocument;
//!
//! # async fn run() -> quire::ooxml::Result<()> {
//! let mut doc = MutableDocument::open("report.docx").await?;
//! doc.add_paragraph_with_text("Appendix");
//! doc.save("report.docx").await?;
//! # Ok(())
//! # }
//! ```

/// Byte readers, unit conversion and XML text helpers
pub mod common;

/// Image payload codec: sniffing, dimensions, CRC-32 and optimization
pub mod images;

/// OOXML packaging and WordprocessingML serialization
///
/// This module provides the OPC container layer and the .docx document model.
pub mod ooxml;

/// Settings shared by image handling and package output
pub mod options;

// Re-export commonly used types for convenience
pub use images::ImageFormat;
pub use ooxml::docx::{ImageResource, MutableDocument};
pub use ooxml::{OoxmlError, Result};
pub use options::DocumentOptions;
