//! Image payload codec.
//!
//! Classifies embedded image bytes, recovers their pixel size and resolution,
//! and losslessly shrinks raster payloads before they are written to a package.
//!
//! # Architecture
//!
//! - `format`: magic-byte sniffing into [`ImageFormat`]
//! - `dimensions`: per-format size and DPI extraction
//! - `crc`: CRC-32 for PNG chunk trailers
//! - `png`: chunk reader/writer and re-compression
//! - `bmp`: uncompressed BMP to PNG conversion
//! - `optimize`: router choosing the transform for a payload
//!
//! # Example
//!
//! ```
//! use quire::images::{ImageFormat, dimensions};
//!
//! let gif = b"GIF89a\x40\x01\xc8\x00\x00\x00\x00\x3b";
//! assert_eq!(ImageFormat::sniff(gif), ImageFormat::Gif);
//! assert_eq!(dimensions::extract_dimensions(ImageFormat::Gif, gif), Some((320, 200)));
//! ```

pub mod bmp;
pub mod crc;
pub mod dimensions;
pub mod format;
pub mod optimize;
pub mod png;

#[cfg(test)]
pub(crate) mod fixtures;

pub use dimensions::{DetectedSize, detect_size};
pub use format::ImageFormat;
pub use optimize::{OptimizationReport, Optimized, optimize};
