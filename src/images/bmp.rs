//! BMP to PNG conversion for uncompressed true-colour bitmaps.

use super::png::{self, Ihdr};
use crate::common::binary::{BinaryError, BinaryResult, read_i32_le, read_u16_le, read_u32_le, slice_at};

const FILE_HEADER_SIZE: usize = 14;
const INFO_HEADER_MIN_SIZE: u32 = 40;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;

/// The fields of BITMAPFILEHEADER + BITMAPINFOHEADER needed to read pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DibHeader {
    pub pixel_offset: usize,
    pub width: u32,
    pub height: u32,
    /// Rows stored first-to-last from the top (negative height on disk).
    pub top_down: bool,
    pub bit_count: u16,
    pub compression: u32,
}

impl DibHeader {
    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        if !data.starts_with(b"BM") {
            return Err(BinaryError::ParseError("missing BM signature".to_string()));
        }
        let pixel_offset = read_u32_le(data, 10)? as usize;
        let header_size = read_u32_le(data, FILE_HEADER_SIZE)?;
        if header_size < INFO_HEADER_MIN_SIZE {
            return Err(BinaryError::ParseError(format!(
                "unsupported DIB header size {}",
                header_size
            )));
        }
        let width = read_i32_le(data, 18)?;
        let height = read_i32_le(data, 22)?;
        if width <= 0 || height == 0 {
            return Err(BinaryError::ParseError("empty bitmap".to_string()));
        }
        Ok(Self {
            pixel_offset,
            width: width as u32,
            height: height.unsigned_abs(),
            top_down: height < 0,
            bit_count: read_u16_le(data, 28)?,
            compression: read_u32_le(data, 30)?,
        })
    }

    /// Whether the pixel layout is one this converter handles.
    pub fn is_supported(&self) -> bool {
        match (self.bit_count, self.compression) {
            (24, BI_RGB) => true,
            (32, BI_RGB | BI_BITFIELDS) => true,
            _ => false,
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bit_count as usize / 8
    }

    /// Row length on disk, padded to a 4-byte boundary.
    pub fn stride(&self) -> usize {
        (self.width as usize * self.bytes_per_pixel()).div_ceil(4) * 4
    }
}

/// Re-encode an uncompressed 24/32-bit BMP as a PNG deflated at `level`.
///
/// Returns `None` for indexed, 16-bit and RLE bitmaps and for truncated input.
pub fn bmp_to_png(data: &[u8], level: u32) -> Option<Vec<u8>> {
    let header = match DibHeader::parse(data) {
        Ok(header) => header,
        Err(e) => {
            log::debug!("BMP conversion skipped: {}", e);
            return None;
        },
    };
    if !header.is_supported() {
        log::debug!(
            "BMP conversion skipped: {}-bit, compression {}",
            header.bit_count,
            header.compression
        );
        return None;
    }
    let raw = match to_scanlines(data, &header) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("BMP conversion skipped: {}", e);
            return None;
        },
    };

    let color_type = if header.bit_count == 32 {
        Ihdr::COLOR_RGBA
    } else {
        Ihdr::COLOR_RGB
    };
    let ihdr = Ihdr::new(header.width, header.height, color_type);
    let idat = png::deflate(&raw, level).ok()?;
    Some(png::assemble(&ihdr, None, None, &idat))
}

/// Build PNG scanlines (filter byte 0, then RGB/RGBA) from the BMP pixel array.
fn to_scanlines(data: &[u8], header: &DibHeader) -> BinaryResult<Vec<u8>> {
    let bpp = header.bytes_per_pixel();
    let stride = header.stride();
    let width = header.width as usize;
    let height = header.height as usize;
    let row_bytes = width * bpp;

    let total = stride
        .checked_mul(height)
        .ok_or_else(|| BinaryError::ParseError("bitmap too large".to_string()))?;
    let pixels = slice_at(data, header.pixel_offset, total)?;

    let mut raw = Vec::with_capacity((row_bytes + 1) * height);
    for y in 0..height {
        let stored = if header.top_down { y } else { height - 1 - y };
        let row = &pixels[stored * stride..stored * stride + row_bytes];
        raw.push(0);
        for px in row.chunks_exact(bpp) {
            raw.extend_from_slice(&[px[2], px[1], px[0]]);
            if bpp == 4 {
                raw.push(px[3]);
            }
        }
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::fixtures;
    use crate::images::png::{MAX_COMPRESSION, decode_scanlines};

    /// Expected PNG scanlines for the fixture bitmap.
    fn expected_scanlines(width: u32, height: u32, alpha: bool) -> Vec<u8> {
        let mut raw = Vec::new();
        for y in 0..height {
            raw.push(0);
            for x in 0..width {
                let [r, g, b, a] = fixtures::bmp_pixel(x, y);
                raw.extend_from_slice(&[r, g, b]);
                if alpha {
                    raw.push(a);
                }
            }
        }
        raw
    }

    fn assert_converts(width: u32, height: u32, bpp: u16, top_down: bool, compression: u32) {
        let bmp = fixtures::bmp(width, height, bpp, top_down, compression);
        let png = bmp_to_png(&bmp, MAX_COMPRESSION).unwrap();
        let (ihdr, raw) = decode_scanlines(&png).unwrap();
        assert_eq!((ihdr.width, ihdr.height), (width, height));
        let alpha = bpp == 32;
        assert_eq!(
            ihdr.color_type,
            if alpha { Ihdr::COLOR_RGBA } else { Ihdr::COLOR_RGB }
        );
        assert_eq!(raw, expected_scanlines(width, height, alpha));
    }

    #[test]
    fn test_24bit_bottom_up() {
        // 5 px * 3 bytes = 15, padded to 16
        assert_converts(5, 3, 24, false, BI_RGB);
    }

    #[test]
    fn test_24bit_top_down() {
        assert_converts(7, 4, 24, true, BI_RGB);
    }

    #[test]
    fn test_32bit_both_orientations() {
        assert_converts(6, 5, 32, false, BI_RGB);
        assert_converts(6, 5, 32, true, BI_RGB);
    }

    #[test]
    fn test_32bit_bitfields() {
        assert_converts(4, 4, 32, false, BI_BITFIELDS);
    }

    #[test]
    fn test_20x20_is_smaller_as_png() {
        let bmp = fixtures::bmp(20, 20, 24, false, BI_RGB);
        let png = bmp_to_png(&bmp, MAX_COMPRESSION).unwrap();
        assert!(png.len() < bmp.len());
        assert_eq!(crate::images::ImageFormat::sniff(&png), crate::images::ImageFormat::Png);
    }

    #[test]
    fn test_unsupported_layouts() {
        let mut indexed = fixtures::bmp(4, 4, 24, false, BI_RGB);
        indexed[28..30].copy_from_slice(&8u16.to_le_bytes());
        assert!(bmp_to_png(&indexed, MAX_COMPRESSION).is_none());

        let mut rle = fixtures::bmp(4, 4, 24, false, BI_RGB);
        rle[30..34].copy_from_slice(&1u32.to_le_bytes());
        assert!(bmp_to_png(&rle, MAX_COMPRESSION).is_none());

        let bitfields_24 = fixtures::bmp(4, 4, 24, false, BI_BITFIELDS);
        assert!(bmp_to_png(&bitfields_24, MAX_COMPRESSION).is_none());
    }

    #[test]
    fn test_truncated_pixels() {
        let bmp = fixtures::bmp(8, 8, 24, false, BI_RGB);
        assert!(bmp_to_png(&bmp[..bmp.len() - 1], MAX_COMPRESSION).is_none());
        assert!(bmp_to_png(&bmp[..20], MAX_COMPRESSION).is_none());
        assert!(bmp_to_png(b"GIF89a", MAX_COMPRESSION).is_none());
    }

    #[test]
    fn test_header_parse() {
        let header = DibHeader::parse(&fixtures::bmp(5, 3, 24, true, BI_RGB)).unwrap();
        assert_eq!(header.width, 5);
        assert_eq!(header.height, 3);
        assert!(header.top_down);
        assert_eq!(header.stride(), 16);
        assert_eq!(header.pixel_offset, 54);
    }
}
