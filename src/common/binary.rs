//! Endian-aware reads from raw image payloads.
//!
//! Every reader bounds-checks the requested range against the slice and returns
//! [`BinaryError::InsufficientData`] instead of panicking, so format parsers can
//! walk untrusted headers with `?` and bail out on truncated input.

use zerocopy::{BE, FromBytes, I16, I32, LE, U16, U32};

/// Binary parsing error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinaryError {
    /// Not enough data to read the requested type
    InsufficientData { expected: usize, available: usize },
    /// Failed to parse the data
    ParseError(String),
}

impl std::fmt::Display for BinaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryError::InsufficientData {
                expected,
                available,
            } => {
                write!(
                    f,
                    "Insufficient data: expected {}, got {}",
                    expected, available
                )
            },
            BinaryError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for BinaryError {}

/// Result type for binary operations
pub type BinaryResult<T> = Result<T, BinaryError>;

/// Borrow `len` bytes at `offset`, or report how far short the slice is.
#[inline]
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> BinaryResult<&[u8]> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| BinaryError::ParseError("offset overflow".to_string()))?;
    if end > data.len() {
        return Err(BinaryError::InsufficientData {
            expected: end,
            available: data.len(),
        });
    }
    Ok(&data[offset..end])
}

macro_rules! endian_reader {
    ($(#[$doc:meta])* $name:ident, $wire:ty, $out:ty) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(data: &[u8], offset: usize) -> BinaryResult<$out> {
            let bytes = slice_at(data, offset, std::mem::size_of::<$out>())?;
            <$wire>::read_from_bytes(bytes)
                .map(|v| v.get())
                .map_err(|_| BinaryError::ParseError(stringify!($name).to_string()))
        }
    };
}

endian_reader!(
    /// Read a little-endian u16 at `offset`.
    ///
    /// ```
    /// use quire::common::binary::read_u16_le;
    /// let data = [0x34, 0x12, 0x78, 0x56];
    /// assert_eq!(read_u16_le(&data, 2).unwrap(), 0x5678);
    /// ```
    read_u16_le, U16<LE>, u16
);
endian_reader!(
    /// Read a little-endian i16 at `offset`.
    read_i16_le, I16<LE>, i16
);
endian_reader!(
    /// Read a little-endian u32 at `offset`.
    read_u32_le, U32<LE>, u32
);
endian_reader!(
    /// Read a little-endian i32 at `offset`.
    read_i32_le, I32<LE>, i32
);
endian_reader!(
    /// Read a big-endian u16 at `offset`.
    read_u16_be, U16<BE>, u16
);
endian_reader!(
    /// Read a big-endian u32 at `offset`.
    ///
    /// ```
    /// use quire::common::binary::read_u32_be;
    /// let data = [0x00, 0x00, 0x01, 0x00];
    /// assert_eq!(read_u32_be(&data, 0).unwrap(), 256);
    /// ```
    read_u32_be, U32<BE>, u32
);

/// Byte order of a TIFF-style container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, data: &[u8], offset: usize) -> BinaryResult<u16> {
        match self {
            Self::Little => read_u16_le(data, offset),
            Self::Big => read_u16_be(data, offset),
        }
    }

    #[inline]
    pub fn read_u32(self, data: &[u8], offset: usize) -> BinaryResult<u32> {
        match self {
            Self::Little => read_u32_le(data, offset),
            Self::Big => read_u32_be(data, offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_le() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert!(read_u16_le(&data, 0).is_ok_and(|v| v == 0x1234));
        assert!(read_u16_le(&data, 2).is_ok_and(|v| v == 0x5678));
        assert!(read_u16_le(&data, 3).is_err());
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x78, 0x56, 0x34, 0x12];
        assert!(read_u32_le(&data, 0).is_ok_and(|v| v == 0x12345678));
        assert!(read_u32_le(&data, 1).is_err());
    }

    #[test]
    fn test_signed_reads() {
        let data = [0xFF, 0xFF, 0xEC, 0xFF, 0xFF, 0xFF];
        assert_eq!(read_i16_le(&data, 0), Ok(-1));
        assert_eq!(read_i32_le(&data, 2), Ok(-20));
    }

    #[test]
    fn test_big_endian() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(read_u16_be(&data, 0), Ok(0x1234));
        assert_eq!(read_u32_be(&data, 0), Ok(0x12345678));
        assert_eq!(ByteOrder::Big.read_u16(&data, 2), Ok(0x5678));
        assert_eq!(ByteOrder::Little.read_u16(&data, 2), Ok(0x7856));
    }

    #[test]
    fn test_out_of_bounds_never_panics() {
        let data = [0u8; 3];
        assert_eq!(
            read_u32_be(&data, 0),
            Err(BinaryError::InsufficientData {
                expected: 4,
                available: 3
            })
        );
        assert!(read_u16_le(&data, usize::MAX).is_err());
    }
}
