//! Office Open XML (OOXML) packaging and WordprocessingML serialization.
//!
//! # Architecture
//!
//! 1. **OPC Layer** (`opc`): part names, relationships, content types, ZIP container
//! 2. **Error** (`error`): the crate-wide [`OoxmlError`]
//! 3. **Word documents** (`docx`): image resources, the element tree and its
//!    ordered serializer, and archive read-back
//!
//! # Example
//!
//! ```
//! use quire::ooxml::docx::MutableDocument;
//!
//! let mut doc = MutableDocument::new();
//! doc.add_paragraph_with_text("Hello");
//! let bytes = doc.to_archive_bytes()?;
//! let reopened = MutableDocument::from_archive_bytes(&bytes)?;
//! assert_eq!(reopened.paragraph_count(), 1);
//! # Ok::<(), quire::ooxml::error::OoxmlError>(())
//! ```
pub mod docx;
pub mod error;
pub mod opc;

pub use error::{OoxmlError, Result};
pub use opc::{PackURI, PartStore, ZipPackage};
