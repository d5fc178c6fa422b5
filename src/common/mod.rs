//! Common utilities shared by the image codec and the OOXML writer.

pub mod binary;
pub mod unit;
pub mod xml;

pub use binary::{BinaryError, BinaryResult, ByteOrder};
