//! Unit conversion utilities.
//!
//! Drawing sizes in WordprocessingML are expressed in EMUs (English Metric Units),
//! page geometry in twips. Everything here is a plain arithmetic conversion.

pub const EMUS_PER_INCH: u64 = 914_400;
pub const EMUS_PER_CM: u64 = 360_000;
pub const EMUS_PER_PT: u64 = 12_700;
pub const TWIPS_PER_INCH: u32 = 1_440;
pub const DEFAULT_DPI: u32 = 96;
pub const MM_PER_INCH: f64 = 25.4;

/// Convert pixels to EMU at the given resolution: `round(px / dpi * 914400)`.
///
/// A zero `dpi` is treated as [`DEFAULT_DPI`]. The result saturates at `u32::MAX`.
#[inline]
pub fn px_to_emu(px: u32, dpi: u32) -> u32 {
    let dpi = if dpi == 0 { DEFAULT_DPI } else { dpi };
    let emu = (px as f64 / dpi as f64 * EMUS_PER_INCH as f64).round();
    emu.min(u32::MAX as f64) as u32
}

#[inline]
pub fn emu_to_px(emu: u32, dpi: u32) -> u32 {
    ((emu as f64) * dpi as f64 / EMUS_PER_INCH as f64).round() as u32
}

#[inline]
pub fn inches_to_emu(inches: f64) -> u32 {
    (inches * EMUS_PER_INCH as f64).round().clamp(0.0, u32::MAX as f64) as u32
}

#[inline]
pub fn cm_to_emu(cm: f64) -> u32 {
    (cm * EMUS_PER_CM as f64).round().clamp(0.0, u32::MAX as f64) as u32
}

#[inline]
pub fn pt_to_emu(pt: f64) -> u32 {
    (pt * EMUS_PER_PT as f64).round().clamp(0.0, u32::MAX as f64) as u32
}

#[inline]
pub fn inches_to_twips(inches: f64) -> u32 {
    (inches * TWIPS_PER_INCH as f64).round().max(0.0) as u32
}

/// Convert a length in hundredths of a millimetre to pixels at 96 DPI.
#[inline]
pub fn hundredth_mm_to_px(value: i64) -> u32 {
    let inches = value as f64 / 100.0 / MM_PER_INCH;
    (inches * DEFAULT_DPI as f64).round().max(0.0) as u32
}

/// Convert a length in metafile logical units to pixels at 96 DPI.
#[inline]
pub fn logical_units_to_px(value: i64, units_per_inch: u32) -> u32 {
    if units_per_inch == 0 {
        return 0;
    }
    (value as f64 / units_per_inch as f64 * DEFAULT_DPI as f64)
        .round()
        .max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_px_to_emu() {
        assert_eq!(px_to_emu(96, 96), 914_400);
        assert_eq!(px_to_emu(20, 96), 190_500);
        assert_eq!(px_to_emu(300, 300), 914_400);
        assert_eq!(px_to_emu(96, 0), 914_400);
    }

    #[test]
    fn test_round_trip_px() {
        assert_eq!(emu_to_px(px_to_emu(640, 96), 96), 640);
    }

    #[test]
    fn test_metafile_units() {
        // 2540 hundredths of a millimetre = 1 inch
        assert_eq!(hundredth_mm_to_px(2540), 96);
        assert_eq!(logical_units_to_px(1440, 1440), 96);
        assert_eq!(logical_units_to_px(1440, 0), 0);
    }

    #[test]
    fn test_inches() {
        assert_eq!(inches_to_emu(6.0), 5_486_400);
        assert_eq!(inches_to_twips(0.5), 720);
        assert_eq!(cm_to_emu(1.0), 360_000);
        assert_eq!(pt_to_emu(1.0), 12_700);
    }
}
