//! Hand-assembled image payloads for unit tests.

use super::png::{self, IDAT, IEND, IHDR, Ihdr, PLTE, PNG_SIGNATURE, TRNS, write_chunk};

/// RGB gradient scanlines with a leading filter byte per row.
pub(crate) fn rgb_scanlines(width: u32, height: u32) -> Vec<u8> {
    let mut raw = Vec::with_capacity(((width * 3 + 1) * height) as usize);
    for y in 0..height {
        raw.push(0);
        for x in 0..width {
            raw.push((x * 7 % 256) as u8);
            raw.push((y * 13 % 256) as u8);
            raw.push(((x + y) * 5 % 256) as u8);
        }
    }
    raw
}

/// 8-bit RGB PNG deflated at `level`, with `extra` chunks placed after IHDR.
pub(crate) fn png(width: u32, height: u32, level: u32, extra: &[([u8; 4], &[u8])]) -> Vec<u8> {
    let idat = png::deflate(&rgb_scanlines(width, height), level).unwrap();
    let mut out = PNG_SIGNATURE.to_vec();
    write_chunk(&mut out, &IHDR, &Ihdr::new(width, height, Ihdr::COLOR_RGB).to_bytes());
    for (kind, data) in extra {
        write_chunk(&mut out, kind, data);
    }
    write_chunk(&mut out, &IDAT, &idat);
    write_chunk(&mut out, &IEND, &[]);
    out
}

/// PNG carrying a pHYs chunk with the given pixels-per-metre and unit flag.
pub(crate) fn png_with_phys(width: u32, height: u32, ppm: u32, unit: u8) -> Vec<u8> {
    let mut phys = Vec::with_capacity(9);
    phys.extend_from_slice(&ppm.to_be_bytes());
    phys.extend_from_slice(&ppm.to_be_bytes());
    phys.push(unit);
    png(width, height, 6, &[(*b"pHYs", phys.as_slice())])
}

/// Indexed-colour PNG with a 4-entry palette and transparency.
pub(crate) fn png_with_palette(width: u32, height: u32) -> Vec<u8> {
    let mut raw = Vec::new();
    for y in 0..height {
        raw.push(0);
        for x in 0..width {
            raw.push(((x + y) % 4) as u8);
        }
    }
    let idat = png::deflate(&raw, 1).unwrap();
    let ihdr = Ihdr::new(width, height, 3);
    let mut out = PNG_SIGNATURE.to_vec();
    write_chunk(&mut out, &IHDR, &ihdr.to_bytes());
    write_chunk(&mut out, &PLTE, &[255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255]);
    write_chunk(&mut out, &TRNS, &[255, 128]);
    write_chunk(&mut out, &IDAT, &idat);
    write_chunk(&mut out, &IEND, &[]);
    out
}

/// RGB PNG whose zlib stream is spread over three IDAT chunks.
pub(crate) fn png_split_idat(width: u32, height: u32) -> Vec<u8> {
    let idat = png::deflate(&rgb_scanlines(width, height), 0).unwrap();
    let third = idat.len() / 3;
    let mut out = PNG_SIGNATURE.to_vec();
    write_chunk(&mut out, &IHDR, &Ihdr::new(width, height, Ihdr::COLOR_RGB).to_bytes());
    write_chunk(&mut out, &IDAT, &idat[..third]);
    write_chunk(&mut out, &IDAT, &idat[third..2 * third]);
    write_chunk(&mut out, &IDAT, &idat[2 * third..]);
    write_chunk(&mut out, &IEND, &[]);
    out
}

/// Colour of the pixel at (x, y) counted from the top-left, as RGBA.
pub(crate) fn bmp_pixel(x: u32, y: u32) -> [u8; 4] {
    [
        (x * 11 % 256) as u8,
        (y * 17 % 256) as u8,
        ((x * y) % 256) as u8,
        (255 - (x + y) % 256) as u8,
    ]
}

/// Uncompressed BMP. `bpp` is 24 or 32; `top_down` stores a negative height.
/// `compression` is written verbatim (0 = BI_RGB, 3 = BI_BITFIELDS).
pub(crate) fn bmp(width: u32, height: u32, bpp: u16, top_down: bool, compression: u32) -> Vec<u8> {
    let bytes_per_pixel = (bpp / 8) as u32;
    let stride = (width * bytes_per_pixel).div_ceil(4) * 4;
    let masks = if compression == 3 { 12 } else { 0 };
    let offset = 14 + 40 + masks;
    let image_size = stride * height;

    let mut out = Vec::with_capacity((offset + image_size) as usize);
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(offset + image_size).to_le_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]);
    out.extend_from_slice(&offset.to_le_bytes());

    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    let stored_height = if top_down {
        -(height as i32)
    } else {
        height as i32
    };
    out.extend_from_slice(&stored_height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&bpp.to_le_bytes());
    out.extend_from_slice(&compression.to_le_bytes());
    out.extend_from_slice(&image_size.to_le_bytes());
    out.extend_from_slice(&3780i32.to_le_bytes());
    out.extend_from_slice(&3780i32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    if compression == 3 {
        out.extend_from_slice(&0x00FF_0000u32.to_le_bytes());
        out.extend_from_slice(&0x0000_FF00u32.to_le_bytes());
        out.extend_from_slice(&0x0000_00FFu32.to_le_bytes());
    }

    for stored_row in 0..height {
        let y = if top_down {
            stored_row
        } else {
            height - 1 - stored_row
        };
        let row_start = out.len();
        for x in 0..width {
            let [r, g, b, a] = bmp_pixel(x, y);
            out.extend_from_slice(&[b, g, r]);
            if bpp == 32 {
                out.push(a);
            }
        }
        out.resize(row_start + stride as usize, 0);
    }
    out
}

/// Baseline JPEG skeleton: SOI, JFIF APP0, DQT stub, SOF0, SOS, EOI.
pub(crate) fn jpeg(width: u16, height: u16, density_unit: u8, density: u16) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    // APP0 JFIF
    out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[0x01, 0x01, density_unit]);
    out.extend_from_slice(&density.to_be_bytes());
    out.extend_from_slice(&density.to_be_bytes());
    out.extend_from_slice(&[0x00, 0x00]);
    // DQT with a 1-byte body, exercising the generic skip path
    out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x03, 0x00]);
    // SOF0
    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    // SOS header and a couple of entropy-coded bytes
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    out.extend_from_slice(&[0x12, 0x34]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

pub(crate) fn gif(width: u16, height: u16) -> Vec<u8> {
    let mut out = b"GIF89a".to_vec();
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&[0x00, 0x00, 0x00, 0x3B]);
    out
}

/// TIFF with one IFD: width as SHORT, height as LONG.
pub(crate) fn tiff(width: u16, height: u32, big_endian: bool) -> Vec<u8> {
    let u16b = |v: u16| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let u32b = |v: u32| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let mut out = if big_endian {
        b"MM\0*".to_vec()
    } else {
        b"II*\0".to_vec()
    };
    out.extend_from_slice(&u32b(8));
    out.extend_from_slice(&u16b(3));
    // tag 254 NewSubfileType, LONG
    out.extend_from_slice(&u16b(254));
    out.extend_from_slice(&u16b(4));
    out.extend_from_slice(&u32b(1));
    out.extend_from_slice(&u32b(0));
    // tag 256 ImageWidth, SHORT (left-justified in the value field)
    out.extend_from_slice(&u16b(256));
    out.extend_from_slice(&u16b(3));
    out.extend_from_slice(&u32b(1));
    out.extend_from_slice(&u16b(width));
    out.extend_from_slice(&[0, 0]);
    // tag 257 ImageLength, LONG
    out.extend_from_slice(&u16b(257));
    out.extend_from_slice(&u16b(4));
    out.extend_from_slice(&u32b(1));
    out.extend_from_slice(&u32b(height));
    out.extend_from_slice(&u32b(0));
    out
}

/// EMF header record with rclFrame in hundredths of a millimetre.
pub(crate) fn emf(frame: [i32; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(88);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&88u32.to_le_bytes());
    // rclBounds (device units), ignored
    for v in [0i32, 0, 99, 99] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    for v in frame {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(b" EMF");
    out.resize(88, 0);
    out
}

/// Placeable WMF header followed by a standard header stub.
pub(crate) fn wmf(bbox: [i16; 4], units_per_inch: u16) -> Vec<u8> {
    let mut out = vec![0xD7, 0xCD, 0xC6, 0x9A, 0x00, 0x00];
    for v in bbox {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&units_per_inch.to_le_bytes());
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out.extend_from_slice(&[0x01, 0x00, 0x09, 0x00]);
    out
}
