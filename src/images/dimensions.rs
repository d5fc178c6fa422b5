//! Pixel dimension and resolution extraction.
//!
//! One parser per format, each walking just enough of the payload to find the
//! image size. All of them are total: a truncated or malformed header yields
//! `None`, never a panic or an error, and the caller falls back to defaults.

use super::format::ImageFormat;
use super::png::{self, IDAT, PHYS};
use crate::common::binary::{
    BinaryResult, ByteOrder, read_i16_le, read_i32_le, read_u16_be, read_u16_le, read_u32_be,
    slice_at,
};
use crate::common::unit::{self, DEFAULT_DPI};
use memchr::memmem;

/// How much of an SVG document is scanned for the root element.
const SVG_SCAN_LIMIT: usize = 2048;

/// Size of an image as detected from its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedSize {
    pub format: ImageFormat,
    /// Pixel dimensions, if the header could be parsed.
    pub pixels: Option<(u32, u32)>,
    pub dpi: u32,
    pub width_emu: u32,
    pub height_emu: u32,
}

impl DetectedSize {
    /// Whether the EMU size is the fallback placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.pixels.is_none()
    }
}

/// Sniff, size and resolve a payload into EMU.
///
/// `placeholder` is used (in EMU) when the dimensions cannot be determined;
/// `default_dpi` when no resolution metadata is present.
pub fn detect_size(data: &[u8], default_dpi: u32, placeholder: (u32, u32)) -> DetectedSize {
    let format = ImageFormat::sniff(data);
    let dpi = if format.is_vector() {
        DEFAULT_DPI
    } else {
        detect_dpi(format, data).unwrap_or(default_dpi)
    };

    match extract_dimensions(format, data) {
        Some((w, h)) => DetectedSize {
            format,
            pixels: Some((w, h)),
            dpi,
            width_emu: unit::px_to_emu(w, dpi).max(1),
            height_emu: unit::px_to_emu(h, dpi).max(1),
        },
        None => {
            if format != ImageFormat::Unknown {
                log::warn!(
                    "could not determine {:?} image dimensions, using placeholder size",
                    format
                );
            }
            DetectedSize {
                format,
                pixels: None,
                dpi,
                width_emu: placeholder.0,
                height_emu: placeholder.1,
            }
        },
    }
}

/// Pixel dimensions for a classified payload. Zero-sized results count as undetermined.
pub fn extract_dimensions(format: ImageFormat, data: &[u8]) -> Option<(u32, u32)> {
    let dims = match format {
        ImageFormat::Png => png_dimensions(data),
        ImageFormat::Jpeg => jpeg_dimensions(data),
        ImageFormat::Gif => gif_dimensions(data),
        ImageFormat::Bmp => bmp_dimensions(data),
        ImageFormat::Tiff => tiff_dimensions(data),
        ImageFormat::Emf => emf_dimensions(data),
        ImageFormat::Wmf => wmf_dimensions(data),
        ImageFormat::Svg => svg_dimensions(data),
        ImageFormat::Unknown => None,
    }?;
    (dims.0 > 0 && dims.1 > 0).then_some(dims)
}

/// Resolution metadata, where the format carries it.
pub fn detect_dpi(format: ImageFormat, data: &[u8]) -> Option<u32> {
    let dpi = match format {
        ImageFormat::Png => png_dpi(data),
        ImageFormat::Jpeg => jpeg_dpi(data),
        _ => None,
    }?;
    (dpi > 0).then_some(dpi)
}

/// IHDR width/height at fixed offsets 16 and 20.
pub fn png_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if slice_at(data, 12, 4).ok()? != b"IHDR" {
        return None;
    }
    Some((read_u32_be(data, 16).ok()?, read_u32_be(data, 20).ok()?))
}

pub fn gif_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    Some((
        read_u16_le(data, 6).ok()? as u32,
        read_u16_le(data, 8).ok()? as u32,
    ))
}

/// BITMAPINFOHEADER width at 18, height at 22 (negative for top-down rows).
pub fn bmp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let width = read_i32_le(data, 18).ok()?;
    let height = read_i32_le(data, 22).ok()?;
    Some((width.unsigned_abs(), height.unsigned_abs()))
}

/// Start-of-frame markers. 0xC4 (DHT), 0xC8 (JPG) and 0xCC (DAC) are not frames.
#[inline]
pub fn is_sof_marker(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF)
}

/// A marker segment located during a JPEG walk.
struct Segment {
    marker: u8,
    /// Offset of the 0xFF byte introducing the marker.
    offset: usize,
}

/// Walk JPEG marker segments after SOI, calling `visit` until it returns a value
/// or scan data (SOS) / EOI is reached.
fn walk_jpeg<T>(data: &[u8], mut visit: impl FnMut(&Segment) -> Option<T>) -> Option<T> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        match marker {
            // Fill bytes and stuffed zeros
            0xFF | 0x00 => {
                pos += 1;
                continue;
            },
            0xDA | 0xD9 => return None,
            // Standalone markers without a length field
            0x01 | 0xD0..=0xD7 => {
                pos += 2;
                continue;
            },
            _ => {},
        }
        if let Some(found) = visit(&Segment {
            marker,
            offset: pos,
        }) {
            return Some(found);
        }
        let len = read_u16_be(data, pos + 2).ok()? as usize;
        if len < 2 {
            return None;
        }
        pos += 2 + len;
    }
    None
}

pub fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    walk_jpeg(data, |seg| {
        if !is_sof_marker(seg.marker) {
            return None;
        }
        let height = read_u16_be(data, seg.offset + 5).ok()?;
        let width = read_u16_be(data, seg.offset + 7).ok()?;
        Some((width as u32, height as u32))
    })
}

/// JFIF APP0 density. Unit 1 is dots per inch, unit 2 dots per centimetre.
pub fn jpeg_dpi(data: &[u8]) -> Option<u32> {
    walk_jpeg(data, |seg| {
        if seg.marker != 0xE0 {
            return None;
        }
        if slice_at(data, seg.offset + 4, 5).ok()? != b"JFIF\0" {
            return None;
        }
        let unit = *data.get(seg.offset + 11)?;
        let density = read_u16_be(data, seg.offset + 12).ok()? as f64;
        match unit {
            1 => Some(density.round() as u32),
            2 => Some((density * 2.54).round() as u32),
            _ => None,
        }
    })
}

/// pHYs pixels-per-metre, honoured only when the unit flag says metres.
pub fn png_dpi(data: &[u8]) -> Option<u32> {
    for chunk in png::chunks(data).ok()? {
        let chunk = chunk.ok()?;
        match chunk.kind {
            PHYS => {
                let ppm = read_u32_be(chunk.data, 0).ok()?;
                let unit = *chunk.data.get(8)?;
                return (unit == 1).then(|| (ppm as f64 * 0.0254).round() as u32);
            },
            // pHYs must precede the image data
            IDAT => return None,
            _ => {},
        }
    }
    None
}

const TIFF_TAG_WIDTH: u16 = 256;
const TIFF_TAG_HEIGHT: u16 = 257;
const TIFF_TYPE_SHORT: u16 = 3;
const TIFF_TYPE_LONG: u16 = 4;

pub fn tiff_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    tiff_walk(data).ok().flatten()
}

fn tiff_walk(data: &[u8]) -> BinaryResult<Option<(u32, u32)>> {
    let order = match slice_at(data, 0, 2)? {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return Ok(None),
    };
    let ifd = order.read_u32(data, 4)? as usize;
    let count = order.read_u16(data, ifd)? as usize;

    let mut width = None;
    let mut height = None;
    for i in 0..count {
        let entry = ifd + 2 + i * 12;
        let tag = order.read_u16(data, entry)?;
        if tag != TIFF_TAG_WIDTH && tag != TIFF_TAG_HEIGHT {
            continue;
        }
        let value = match order.read_u16(data, entry + 2)? {
            TIFF_TYPE_SHORT => order.read_u16(data, entry + 8)? as u32,
            TIFF_TYPE_LONG => order.read_u32(data, entry + 8)?,
            _ => continue,
        };
        if tag == TIFF_TAG_WIDTH {
            width = Some(value);
        } else {
            height = Some(value);
        }
        if let (Some(w), Some(h)) = (width, height) {
            return Ok(Some((w, h)));
        }
    }
    Ok(None)
}

/// EMF header `rclFrame` (offsets 24–39), in hundredths of a millimetre.
pub fn emf_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let left = read_i32_le(data, 24).ok()? as i64;
    let top = read_i32_le(data, 28).ok()? as i64;
    let right = read_i32_le(data, 32).ok()? as i64;
    let bottom = read_i32_le(data, 36).ok()? as i64;
    Some((
        unit::hundredth_mm_to_px((right - left).abs()),
        unit::hundredth_mm_to_px((bottom - top).abs()),
    ))
}

/// Placeable WMF bounding box (offsets 6–13) scaled by units-per-inch (offset 14).
pub fn wmf_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if !data.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) {
        return None;
    }
    let left = read_i16_le(data, 6).ok()? as i64;
    let top = read_i16_le(data, 8).ok()? as i64;
    let right = read_i16_le(data, 10).ok()? as i64;
    let bottom = read_i16_le(data, 12).ok()? as i64;
    let units_per_inch = read_u16_le(data, 14).ok()? as u32;
    Some((
        unit::logical_units_to_px((right - left).abs(), units_per_inch),
        unit::logical_units_to_px((bottom - top).abs(), units_per_inch),
    ))
}

/// Root `width`/`height`, falling back to the `viewBox` extent.
pub fn svg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let head = &data[..data.len().min(SVG_SCAN_LIMIT)];
    let start = memmem::find(head, b"<svg")?;
    let rest = &head[start..];
    let end = memchr::memchr(b'>', rest).unwrap_or(rest.len());
    let tag = String::from_utf8_lossy(&rest[..end]);

    let width = svg_attr(&tag, "width").and_then(svg_length_px);
    let height = svg_attr(&tag, "height").and_then(svg_length_px);
    if let (Some(w), Some(h)) = (width, height) {
        return Some((w.round() as u32, h.round() as u32));
    }

    let view_box = svg_attr(&tag, "viewBox")?;
    let mut tokens = view_box
        .split(|c: char| c.is_ascii_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .skip(2)
        .map(|t| fast_float2::parse::<f64, _>(t).ok());
    let w = tokens.next()??;
    let h = tokens.next()??;
    (w > 0.0 && h > 0.0).then(|| (w.round() as u32, h.round() as u32))
}

/// Value of attribute `name` inside a start tag, honouring either quote style.
fn svg_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let bytes = tag.as_bytes();
    let mut search = 0;
    while let Some(found) = tag[search..].find(name) {
        let at = search + found;
        search = at + name.len();
        // Reject suffix matches such as `stroke-width`
        if at == 0 || !bytes[at - 1].is_ascii_whitespace() {
            continue;
        }
        let after = tag[search..].trim_start();
        let Some(after) = after.strip_prefix('=') else {
            continue;
        };
        let after = after.trim_start();
        let quote = match after.chars().next() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => continue,
        };
        let value = &after[1..];
        if let Some(close) = value.find(quote) {
            return Some(&value[..close]);
        }
    }
    None
}

/// Convert an SVG length to CSS pixels (96 per inch). Percentages are unresolvable.
fn svg_length_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let (number, used) = fast_float2::parse_partial::<f64, _>(value).ok()?;
    let factor = match value[used..].trim() {
        "" | "px" => 1.0,
        "pt" => 96.0 / 72.0,
        "pc" => 16.0,
        "in" => 96.0,
        "cm" => 96.0 / 2.54,
        "mm" => 96.0 / 25.4,
        _ => return None,
    };
    let px = number * factor;
    (px > 0.0).then_some(px)
}
