//! Lossless optimisation router.
//!
//! Dispatches a classified payload to the matching transform. Optimisation is
//! strictly optional, so nothing here returns an error: a payload that cannot be
//! improved yields `None` and the caller keeps the original bytes.

use super::format::ImageFormat;
use super::{bmp, png};
use serde::{Deserialize, Serialize};

/// A payload that should replace the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Optimized {
    pub data: Vec<u8>,
    /// Format of `data`; differs from the input when the transform converted it.
    pub format: ImageFormat,
}

impl Optimized {
    pub fn changed_format(&self, original: ImageFormat) -> bool {
        self.format != original
    }
}

/// Outcome of optimising every image of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub optimized_count: usize,
    pub total_saved_bytes: u64,
}

impl OptimizationReport {
    /// Account for one adopted replacement.
    pub fn record(&mut self, before: usize, after: usize) {
        self.optimized_count += 1;
        self.total_saved_bytes += before.saturating_sub(after) as u64;
    }
}

/// Optimise `data` of the given format at zlib `level`.
///
/// PNG output is returned only when strictly smaller than the input. BMP
/// conversion is returned whenever it succeeds. Every other format is not
/// applicable.
pub fn optimize(data: &[u8], format: ImageFormat, level: u32) -> Option<Optimized> {
    match format {
        ImageFormat::Png => {
            let out = png::recompress(data, level)?;
            if out.len() < data.len() {
                log::debug!("PNG re-compressed: {} -> {} bytes", data.len(), out.len());
                Some(Optimized {
                    data: out,
                    format: ImageFormat::Png,
                })
            } else {
                log::debug!("PNG re-compression not smaller, keeping original");
                None
            }
        },
        ImageFormat::Bmp => {
            let out = bmp::bmp_to_png(data, level)?;
            log::debug!("BMP converted to PNG: {} -> {} bytes", data.len(), out.len());
            Some(Optimized {
                data: out,
                format: ImageFormat::Png,
            })
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::fixtures;
    use crate::images::png::{MAX_COMPRESSION, chunks, decode_scanlines};

    #[test]
    fn test_suboptimal_png_shrinks_and_loses_text() {
        let banner = b"Comment\0".repeat(64);
        let png = fixtures::png(48, 48, 1, &[(*b"tEXt", banner.as_slice())]);
        let out = optimize(&png, ImageFormat::Png, MAX_COMPRESSION).unwrap();
        assert_eq!(out.format, ImageFormat::Png);
        assert!(out.data.len() < png.len());
        assert!(
            chunks(&out.data)
                .unwrap()
                .all(|c| c.unwrap().kind != *b"tEXt")
        );
        assert_eq!(decode_scanlines(&out.data), decode_scanlines(&png));
    }

    #[test]
    fn test_already_optimal_png_is_kept() {
        let png = fixtures::png(16, 16, MAX_COMPRESSION, &[]);
        let once = optimize(&png, ImageFormat::Png, MAX_COMPRESSION);
        // Re-assembly yields identical bytes, which is not strictly smaller.
        assert!(once.is_none());
    }

    #[test]
    fn test_jpeg_is_not_applicable() {
        let jpeg = fixtures::jpeg(8, 8, 1, 72);
        let before = jpeg.clone();
        assert!(optimize(&jpeg, ImageFormat::Jpeg, MAX_COMPRESSION).is_none());
        assert_eq!(jpeg, before);
    }

    #[test]
    fn test_bmp_becomes_png() {
        let bmp = fixtures::bmp(20, 20, 24, false, 0);
        let out = optimize(&bmp, ImageFormat::Bmp, MAX_COMPRESSION).unwrap();
        assert!(out.changed_format(ImageFormat::Bmp));
        let (ihdr, _) = decode_scanlines(&out.data).unwrap();
        assert_eq!((ihdr.width, ihdr.height), (20, 20));
    }

    #[test]
    fn test_malformed_input_is_no_change() {
        assert!(optimize(b"\x89PNG\r\n\x1a\n", ImageFormat::Png, 9).is_none());
        assert!(optimize(b"BM", ImageFormat::Bmp, 9).is_none());
        assert!(optimize(b"<svg/>", ImageFormat::Svg, 9).is_none());
    }

    #[test]
    fn test_report_accumulates() {
        let mut report = OptimizationReport::default();
        report.record(1000, 400);
        report.record(10, 12);
        assert_eq!(report.optimized_count, 2);
        assert_eq!(report.total_saved_bytes, 600);
    }
}
