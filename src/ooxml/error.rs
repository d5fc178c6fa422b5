/// Error types for OOXML operations.
use crate::ooxml::opc::error::OpcError;
use thiserror::Error;

/// Result type for OOXML operations.
pub type Result<T> = std::result::Result<T, OoxmlError>;

/// Error types for OOXML operations.
#[derive(Error, Debug)]
pub enum OoxmlError {
    /// OPC package error
    #[error("OPC error: {0}")]
    Opc(#[from] OpcError),

    /// XML parsing or formatting error
    #[error("XML error: {0}")]
    Xml(String),

    /// Part not found
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Invalid format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A value in parsed markup could not be interpreted
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A node refers to an id with no registered entry
    #[error("Unresolved reference {id} in {part}")]
    UnresolvedReference { part: String, id: String },

    /// A name or id that must be unique was registered twice
    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// An image payload was not loaded before serialization
    #[error("Image payload not loaded: {0}")]
    PayloadNotLoaded(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl OoxmlError {
    /// Whether this is an unresolved reference, at either layer.
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(
            self,
            OoxmlError::UnresolvedReference { .. }
                | OoxmlError::Opc(OpcError::UnresolvedReference { .. })
        )
    }

    /// Whether this is a duplicate registration, at either layer.
    pub fn is_duplicate_identity(&self) -> bool {
        matches!(
            self,
            OoxmlError::DuplicateIdentity(_) | OoxmlError::Opc(OpcError::DuplicateIdentity(_))
        )
    }
}

impl From<quick_xml::Error> for OoxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}

impl From<std::fmt::Error> for OoxmlError {
    fn from(err: std::fmt::Error) -> Self {
        OoxmlError::Xml(err.to_string())
    }
}

impl From<zip::result::ZipError> for OoxmlError {
    fn from(err: zip::result::ZipError) -> Self {
        OoxmlError::Opc(OpcError::ZipError(err))
    }
}
