//! Image format classification from magic bytes.

use serde::{Deserialize, Serialize};

/// Classification of an embedded image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Emf,
    Wmf,
    Svg,
    /// Unrecognised payload. Named as PNG, never sized.
    Unknown,
}

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];
const GIF_MAGIC: [u8; 3] = [0x47, 0x49, 0x46];
const BMP_MAGIC: [u8; 2] = [0x42, 0x4D];
const TIFF_LE_MAGIC: [u8; 4] = [0x49, 0x49, 0x2A, 0x00];
const TIFF_BE_MAGIC: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A];
const EMF_RECORD_TYPE: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
const EMF_SIGNATURE: [u8; 4] = [0x20, 0x45, 0x4D, 0x46];
const WMF_PLACEABLE_MAGIC: [u8; 4] = [0xD7, 0xCD, 0xC6, 0x9A];
const WMF_STANDARD_MAGIC: [u8; 4] = [0x01, 0x00, 0x09, 0x00];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

impl ImageFormat {
    /// Classify a payload by its leading bytes. Always returns a classification.
    ///
    /// ```
    /// use quire::images::ImageFormat;
    /// assert_eq!(ImageFormat::sniff(b"GIF89a......"), ImageFormat::Gif);
    /// assert_eq!(ImageFormat::sniff(b"\x00\x01"), ImageFormat::Unknown);
    /// ```
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&PNG_MAGIC) {
            return Self::Png;
        }
        if data.starts_with(&JPEG_MAGIC) {
            return Self::Jpeg;
        }
        if data.starts_with(&GIF_MAGIC) {
            return Self::Gif;
        }
        if data.starts_with(&BMP_MAGIC) {
            return Self::Bmp;
        }
        if data.starts_with(&TIFF_LE_MAGIC) || data.starts_with(&TIFF_BE_MAGIC) {
            return Self::Tiff;
        }
        if data.len() >= 44 && data.starts_with(&EMF_RECORD_TYPE) && data[40..44] == EMF_SIGNATURE
        {
            return Self::Emf;
        }
        if data.starts_with(&WMF_PLACEABLE_MAGIC) || data.starts_with(&WMF_STANDARD_MAGIC) {
            return Self::Wmf;
        }
        if looks_like_svg(data) {
            return Self::Svg;
        }
        Self::Unknown
    }

    /// Guess a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" | "jpe" => Self::Jpeg,
            "gif" => Self::Gif,
            "bmp" | "dib" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "emf" => Self::Emf,
            "wmf" => Self::Wmf,
            "svg" => Self::Svg,
            _ => Self::Unknown,
        }
    }

    /// File extension used when naming the media part.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png | Self::Unknown => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Emf => "emf",
            Self::Wmf => "wmf",
            Self::Svg => "svg",
        }
    }

    /// MIME type written to `[Content_Types].xml`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png | Self::Unknown => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::Emf => "image/x-emf",
            Self::Wmf => "image/x-wmf",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Vector formats carry a logical bounding box rather than a pixel grid.
    pub const fn is_vector(&self) -> bool {
        matches!(self, Self::Emf | Self::Wmf | Self::Svg)
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let body = data.strip_prefix(&UTF8_BOM).unwrap_or(data);
    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'<')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_raster_formats() {
        assert_eq!(
            ImageFormat::sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::sniff(b"GIF87a"), ImageFormat::Gif);
        assert_eq!(ImageFormat::sniff(b"BM\0\0\0\0"), ImageFormat::Bmp);
        assert_eq!(ImageFormat::sniff(b"II*\0\x08\0\0\0"), ImageFormat::Tiff);
        assert_eq!(ImageFormat::sniff(b"MM\0*\0\0\0\x08"), ImageFormat::Tiff);
    }

    #[test]
    fn test_sniff_metafiles() {
        let mut emf = vec![0u8; 44];
        emf[0] = 0x01;
        emf[40..44].copy_from_slice(b" EMF");
        assert_eq!(ImageFormat::sniff(&emf), ImageFormat::Emf);

        // Too short for the EMF signature, and not a WMF header either
        assert_eq!(ImageFormat::sniff(&emf[..20]), ImageFormat::Unknown);

        assert_eq!(
            ImageFormat::sniff(&[0xD7, 0xCD, 0xC6, 0x9A, 0, 0]),
            ImageFormat::Wmf
        );
        assert_eq!(
            ImageFormat::sniff(&[0x01, 0x00, 0x09, 0x00, 0, 0]),
            ImageFormat::Wmf
        );
    }

    #[test]
    fn test_sniff_svg() {
        assert_eq!(ImageFormat::sniff(b"  \n<svg/>"), ImageFormat::Svg);
        assert_eq!(ImageFormat::sniff(b"\xEF\xBB\xBF<?xml?>"), ImageFormat::Svg);
        assert_eq!(ImageFormat::sniff(b"   "), ImageFormat::Unknown);
        assert_eq!(ImageFormat::sniff(b""), ImageFormat::Unknown);
    }

    #[test]
    fn test_unknown_names_as_png() {
        assert_eq!(ImageFormat::Unknown.extension(), "png");
        assert_eq!(ImageFormat::Unknown.mime_type(), "image/png");
        assert_eq!(ImageFormat::from_extension("JPG"), ImageFormat::Jpeg);
    }
}
