//! Open Packaging Conventions (OPC) plumbing.
//!
//! - Part names and relative reference resolution (`packuri`)
//! - Relationship tables and `.rels` parts (`rel`)
//! - The `[Content_Types].xml` part (`content_types`)
//! - Named-blob storage and the ZIP container (`container`)

pub mod constants;
pub mod container;
pub mod content_types;
pub mod error;
pub mod packuri;
pub mod rel;

// Re-export commonly used types
pub use container::{PartStore, ZipPackage};
pub use content_types::ContentTypes;
pub use error::OpcError;
pub use packuri::PackURI;
pub use rel::{RelType, Relationship, Relationships, TargetMode};
