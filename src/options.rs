//! Document-wide settings for image sizing, optimization and packaging.

use crate::common::unit::{DEFAULT_DPI, inches_to_emu};
use crate::images::png::MAX_COMPRESSION;
use serde::{Deserialize, Serialize};

/// Settings consulted when images are inserted and when the package is written.
///
/// # Examples
///
/// ```rust
/// use quire::options::DocumentOptions;
///
/// let options = DocumentOptions::new()
///     .with_default_dpi(72)
///     .with_optimize_images_on_save(true);
/// assert_eq!(options.default_dpi, 72);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
    /// DPI assumed when an image does not record one
    pub default_dpi: u32,
    /// Size given to images whose dimensions cannot be detected, in EMU
    pub placeholder_width_emu: u32,
    pub placeholder_height_emu: u32,
    /// Deflate level for re-encoded PNG data (0-9)
    pub png_compression: u32,
    /// Run the lossless optimizer over every image before writing
    pub optimize_images_on_save: bool,
    /// Deflate level for ZIP members (0-9)
    pub zip_compression: u32,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            default_dpi: DEFAULT_DPI,
            placeholder_width_emu: inches_to_emu(6.0),
            placeholder_height_emu: inches_to_emu(4.0),
            png_compression: MAX_COMPRESSION,
            optimize_images_on_save: false,
            zip_compression: 6,
        }
    }
}

impl DocumentOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the DPI used for images without resolution metadata. Zero is ignored.
    pub fn with_default_dpi(mut self, dpi: u32) -> Self {
        if dpi > 0 {
            self.default_dpi = dpi;
        }
        self
    }

    /// Set the placeholder size in EMU. Zero sizes are ignored.
    pub fn with_placeholder_size(mut self, width_emu: u32, height_emu: u32) -> Self {
        if width_emu > 0 && height_emu > 0 {
            self.placeholder_width_emu = width_emu;
            self.placeholder_height_emu = height_emu;
        }
        self
    }

    pub fn with_png_compression(mut self, level: u32) -> Self {
        self.png_compression = level.min(MAX_COMPRESSION);
        self
    }

    pub fn with_optimize_images_on_save(mut self, optimize: bool) -> Self {
        self.optimize_images_on_save = optimize;
        self
    }

    pub fn with_zip_compression(mut self, level: u32) -> Self {
        self.zip_compression = level.min(9);
        self
    }

    #[inline]
    pub(crate) fn placeholder(&self) -> (u32, u32) {
        (self.placeholder_width_emu, self.placeholder_height_emu)
    }
}
