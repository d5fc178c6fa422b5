//! PNG chunk stream reader/writer and lossless re-compression.
//!
//! A PNG is the 8-byte signature followed by chunks of
//! `[length: u32 BE][type: 4 ASCII][data][crc: u32 BE]`. Re-compression keeps only
//! the chunks needed to render the image (IHDR, PLTE, tRNS, IDAT, IEND), joins and
//! inflates the IDAT stream, and deflates it again at the requested level.

use super::crc::chunk_crc;
use crate::common::binary::{BinaryError, BinaryResult, read_u32_be, slice_at};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use smallvec::SmallVec;
use std::io::{Read, Write};

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

pub const IHDR: [u8; 4] = *b"IHDR";
pub const PLTE: [u8; 4] = *b"PLTE";
pub const TRNS: [u8; 4] = *b"tRNS";
pub const IDAT: [u8; 4] = *b"IDAT";
pub const IEND: [u8; 4] = *b"IEND";
pub const PHYS: [u8; 4] = *b"pHYs";

/// Highest zlib compression level.
pub const MAX_COMPRESSION: u32 = 9;

/// One chunk borrowed from a PNG byte stream.
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    pub kind: [u8; 4],
    pub data: &'a [u8],
}

/// Iterator over the chunks following the PNG signature.
///
/// Stops after IEND. A truncated chunk yields one error and ends iteration.
pub struct ChunkIter<'a> {
    data: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = BinaryResult<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.data.len() {
            return None;
        }
        let result = self.read_chunk();
        match &result {
            Ok(chunk) if chunk.kind == IEND => self.done = true,
            Err(_) => self.done = true,
            Ok(_) => {},
        }
        Some(result)
    }
}

impl<'a> ChunkIter<'a> {
    fn read_chunk(&mut self) -> BinaryResult<Chunk<'a>> {
        let len = read_u32_be(self.data, self.pos)? as usize;
        let kind_bytes = slice_at(self.data, self.pos + 4, 4)?;
        let data = slice_at(self.data, self.pos + 8, len)?;
        // CRC is not verified on read; rebuilt chunks always get a fresh one.
        slice_at(self.data, self.pos + 8 + len, 4)?;
        self.pos += 12 + len;
        let mut kind = [0u8; 4];
        kind.copy_from_slice(kind_bytes);
        Ok(Chunk { kind, data })
    }
}

/// Iterate the chunks of a PNG. Fails if the signature is missing.
pub fn chunks(data: &[u8]) -> BinaryResult<ChunkIter<'_>> {
    if !data.starts_with(&PNG_SIGNATURE) {
        return Err(BinaryError::ParseError("missing PNG signature".to_string()));
    }
    Ok(ChunkIter {
        data,
        pos: PNG_SIGNATURE.len(),
        done: false,
    })
}

/// Append a chunk with its length prefix and CRC trailer.
pub fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(kind, data).to_be_bytes());
}

/// Parsed IHDR chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ihdr {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression: u8,
    pub filter: u8,
    pub interlace: u8,
}

impl Ihdr {
    pub const COLOR_RGB: u8 = 2;
    pub const COLOR_RGBA: u8 = 6;

    /// Non-interlaced 8-bit header for the given colour type.
    pub fn new(width: u32, height: u32, color_type: u8) -> Self {
        Self {
            width,
            height,
            bit_depth: 8,
            color_type,
            compression: 0,
            filter: 0,
            interlace: 0,
        }
    }

    pub fn parse(data: &[u8]) -> BinaryResult<Self> {
        let fields = slice_at(data, 8, 5)?;
        Ok(Self {
            width: read_u32_be(data, 0)?,
            height: read_u32_be(data, 4)?,
            bit_depth: fields[0],
            color_type: fields[1],
            compression: fields[2],
            filter: fields[3],
            interlace: fields[4],
        })
    }

    pub fn to_bytes(&self) -> [u8; 13] {
        let mut out = [0u8; 13];
        out[0..4].copy_from_slice(&self.width.to_be_bytes());
        out[4..8].copy_from_slice(&self.height.to_be_bytes());
        out[8] = self.bit_depth;
        out[9] = self.color_type;
        out[10] = self.compression;
        out[11] = self.filter;
        out[12] = self.interlace;
        out
    }
}

/// The rendering-essential pieces of a PNG.
#[derive(Debug)]
pub struct EssentialChunks<'a> {
    pub ihdr: Ihdr,
    pub plte: Option<&'a [u8]>,
    pub trns: Option<&'a [u8]>,
    pub idat: SmallVec<[&'a [u8]; 4]>,
}

impl<'a> EssentialChunks<'a> {
    /// Collect IHDR/PLTE/tRNS/IDAT, discarding everything else.
    pub fn collect(data: &'a [u8]) -> BinaryResult<Self> {
        let mut ihdr = None;
        let mut plte = None;
        let mut trns = None;
        let mut idat = SmallVec::new();

        for chunk in chunks(data)? {
            let chunk = chunk?;
            match chunk.kind {
                IHDR => ihdr = Some(Ihdr::parse(chunk.data)?),
                PLTE => plte = Some(chunk.data),
                TRNS => trns = Some(chunk.data),
                IDAT => idat.push(chunk.data),
                IEND => break,
                other => {
                    log::trace!("dropping PNG chunk {}", String::from_utf8_lossy(&other));
                },
            }
        }

        let ihdr = ihdr.ok_or_else(|| BinaryError::ParseError("PNG has no IHDR".to_string()))?;
        if idat.is_empty() {
            return Err(BinaryError::ParseError("PNG has no IDAT".to_string()));
        }
        Ok(Self {
            ihdr,
            plte,
            trns,
            idat,
        })
    }

    /// Inflate the joined IDAT stream into filtered scanline data.
    pub fn inflate(&self) -> std::io::Result<Vec<u8>> {
        let joined: Vec<u8> = self.idat.concat();
        let mut raw = Vec::with_capacity(joined.len() * 4);
        ZlibDecoder::new(joined.as_slice()).read_to_end(&mut raw)?;
        Ok(raw)
    }
}

/// Deflate raw scanline data into a zlib stream.
pub fn deflate(raw: &[u8], level: u32) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(raw.len() / 2 + 64),
        Compression::new(level.min(MAX_COMPRESSION)),
    );
    encoder.write_all(raw)?;
    encoder.finish()
}

/// Assemble a minimal PNG: signature, IHDR, optional PLTE/tRNS, one IDAT, IEND.
pub fn assemble(ihdr: &Ihdr, plte: Option<&[u8]>, trns: Option<&[u8]>, idat: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(PNG_SIGNATURE.len() + 25 + idat.len() + 12 + 12);
    out.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut out, &IHDR, &ihdr.to_bytes());
    if let Some(plte) = plte {
        write_chunk(&mut out, &PLTE, plte);
    }
    if let Some(trns) = trns {
        write_chunk(&mut out, &TRNS, trns);
    }
    write_chunk(&mut out, &IDAT, idat);
    write_chunk(&mut out, &IEND, &[]);
    out
}

/// Re-compress a PNG losslessly.
///
/// Returns the rebuilt file, or `None` when the payload is not a structurally valid
/// PNG. The result is not guaranteed to be smaller; callers compare sizes.
pub fn recompress(data: &[u8], level: u32) -> Option<Vec<u8>> {
    let essential = match EssentialChunks::collect(data) {
        Ok(essential) => essential,
        Err(e) => {
            log::debug!("PNG re-compression skipped: {}", e);
            return None;
        },
    };
    let raw = match essential.inflate() {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("PNG re-compression skipped, IDAT stream does not inflate: {}", e);
            return None;
        },
    };
    let idat = deflate(&raw, level).ok()?;
    Some(assemble(
        &essential.ihdr,
        essential.plte,
        essential.trns,
        &idat,
    ))
}

/// Decode a PNG down to its header and filtered scanline bytes.
///
/// Two PNGs that decode to the same pair render identically.
pub fn decode_scanlines(data: &[u8]) -> Option<(Ihdr, Vec<u8>)> {
    let essential = EssentialChunks::collect(data).ok()?;
    let raw = essential.inflate().ok()?;
    Some((essential.ihdr, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::fixtures;

    #[test]
    fn test_chunk_iteration() {
        let png = fixtures::png(3, 2, 1, &[(*b"tEXt", b"Comment\0hello".as_slice())]);
        let kinds: Vec<[u8; 4]> = chunks(&png)
            .unwrap()
            .map(|c| c.unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![IHDR, *b"tEXt", IDAT, IEND]);
    }

    #[test]
    fn test_missing_signature() {
        assert!(chunks(b"not a png").is_err());
        assert!(recompress(b"not a png", 9).is_none());
    }

    #[test]
    fn test_truncated_chunk_is_an_error() {
        let png = fixtures::png(4, 4, 1, &[]);
        let truncated = &png[..png.len() - 20];
        assert!(chunks(truncated).unwrap().any(|c| c.is_err()));
        assert!(recompress(truncated, 9).is_none());
    }

    #[test]
    fn test_ihdr_round_trip() {
        let ihdr = Ihdr::new(640, 480, Ihdr::COLOR_RGBA);
        assert_eq!(Ihdr::parse(&ihdr.to_bytes()).unwrap(), ihdr);
        assert!(Ihdr::parse(&[0u8; 12]).is_err());
    }

    #[test]
    fn test_recompress_drops_ancillary_chunks_and_keeps_pixels() {
        let png = fixtures::png(
            32,
            32,
            1,
            &[
                (*b"tEXt", b"Software\0some very long generator banner".as_slice()),
                (*b"gAMA", &[0, 0, 0xB1, 0x8F]),
            ],
        );
        let out = recompress(&png, MAX_COMPRESSION).unwrap();
        let kinds: Vec<[u8; 4]> = chunks(&out).unwrap().map(|c| c.unwrap().kind).collect();
        assert_eq!(kinds, vec![IHDR, IDAT, IEND]);
        assert_eq!(decode_scanlines(&out), decode_scanlines(&png));
    }

    #[test]
    fn test_recompress_keeps_palette_and_transparency() {
        let png = fixtures::png_with_palette(8, 8);
        let out = recompress(&png, MAX_COMPRESSION).unwrap();
        let kinds: Vec<[u8; 4]> = chunks(&out).unwrap().map(|c| c.unwrap().kind).collect();
        assert_eq!(kinds, vec![IHDR, PLTE, TRNS, IDAT, IEND]);
    }

    #[test]
    fn test_split_idat_is_joined() {
        let png = fixtures::png_split_idat(16, 16);
        let idat_count = chunks(&png)
            .unwrap()
            .filter(|c| c.as_ref().is_ok_and(|c| c.kind == IDAT))
            .count();
        assert!(idat_count > 1);
        let out = recompress(&png, MAX_COMPRESSION).unwrap();
        let idat_count = chunks(&out)
            .unwrap()
            .filter(|c| c.as_ref().is_ok_and(|c| c.kind == IDAT))
            .count();
        assert_eq!(idat_count, 1);
        assert_eq!(decode_scanlines(&out), decode_scanlines(&png));
    }

    #[test]
    fn test_recompress_is_idempotent_in_content() {
        let png = fixtures::png(20, 10, 1, &[]);
        let once = recompress(&png, MAX_COMPRESSION).unwrap();
        let twice = recompress(&once, MAX_COMPRESSION).unwrap();
        assert_eq!(decode_scanlines(&once), decode_scanlines(&twice));
        assert_eq!(once, twice);
    }
}
