/// Image resources placed in Word documents.
///
/// An [`ImageResource`] owns an image payload together with everything the
/// drawing markup needs: the detected format, the display size in EMU, the
/// relationship id linking the drawing to its media part, and optional crop,
/// rotation, effects and floating placement.
///
/// File-backed resources are lazy. [`ImageResource::from_path`] records the
/// path only; [`ImageResource::ensure_loaded`] reads the bytes with `tokio::fs`
/// and sizes the image, and [`ImageResource::release`] drops them again.
/// Serialization never performs I/O: writing an unloaded payload fails with
/// [`OoxmlError::PayloadNotLoaded`].
///
/// # Example
///
/// ```rust
/// use quire::ooxml::docx::image::ImageResource;
///
/// let gif = b"GIF89a\x60\x00\x30\x00\x00\x00\x00\x3b".to_vec();
/// let image = ImageResource::from_bytes(gif);
/// assert_eq!(image.width_emu(), 914_400);
/// assert_eq!(image.height_emu(), 457_200);
/// ```
use crate::common::unit;
use crate::images::optimize::Optimized;
use crate::images::{ImageFormat, detect_size};
use crate::ooxml::error::{OoxmlError, Result};
use crate::options::DocumentOptions;
use std::path::{Path, PathBuf};

/// Where the bytes of an image live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Known only by path; bytes not read yet
    Unloaded { path: PathBuf },
    /// Bytes in memory. `path` is set for file-backed payloads.
    Loaded { bytes: Vec<u8>, path: Option<PathBuf> },
}

/// Crop insets, in thousandths of a percent of each edge (`a:srcRect`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crop {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Crop {
    /// Crop by percentages of the image size.
    pub fn from_percent(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        let scale = |p: f64| (p.clamp(0.0, 100.0) * 1000.0).round() as u32;
        Self {
            left: scale(left),
            top: scale(top),
            right: scale(right),
            bottom: scale(bottom),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Colour effects applied to the picture fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageEffects {
    pub grayscale: bool,
    /// Thousandths of a percent, -100000..=100000
    pub brightness: i32,
    /// Thousandths of a percent, -100000..=100000
    pub contrast: i32,
}

impl ImageEffects {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Text wrapping around a floating image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WrapStyle {
    #[default]
    Square,
    Tight,
    TopAndBottom,
    BehindText,
    InFrontOfText,
}

/// Position of a floating image relative to its anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingPosition {
    pub h_offset_emu: i64,
    pub v_offset_emu: i64,
    /// `relativeFrom` of `wp:positionH`, e.g. `column`, `page`, `margin`
    pub h_relative: String,
    /// `relativeFrom` of `wp:positionV`, e.g. `paragraph`, `page`, `margin`
    pub v_relative: String,
    pub wrap: WrapStyle,
}

impl FloatingPosition {
    /// Offsets from the anchoring column and paragraph.
    pub fn new(h_offset_emu: i64, v_offset_emu: i64) -> Self {
        Self {
            h_offset_emu,
            v_offset_emu,
            h_relative: "column".to_string(),
            v_relative: "paragraph".to_string(),
            wrap: WrapStyle::Square,
        }
    }

    pub fn with_wrap(mut self, wrap: WrapStyle) -> Self {
        self.wrap = wrap;
        self
    }

    /// Offsets measured from the page edges.
    pub fn relative_to_page(mut self) -> Self {
        self.h_relative = "page".to_string();
        self.v_relative = "page".to_string();
        self
    }
}

/// Inline with the text, or floating at a position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Placement {
    #[default]
    Inline,
    Floating(FloatingPosition),
}

/// An image and its presentation attributes.
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub(crate) payload: Payload,
    pub(crate) format: ImageFormat,
    /// Display size in EMU, always positive
    pub(crate) width_emu: u32,
    pub(crate) height_emu: u32,
    pub(crate) dpi: u32,
    /// The caller chose the size; loading must not overwrite it
    pub(crate) explicit_size: bool,
    pub(crate) relationship_id: Option<String>,
    /// File name under `word/media/`, assigned at staging
    pub(crate) media_name: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) description: String,
    /// Clockwise rotation in degrees
    pub(crate) rotation: f64,
    pub(crate) crop: Option<Crop>,
    pub(crate) effects: ImageEffects,
    pub(crate) placement: Placement,
}

impl ImageResource {
    fn with_payload(payload: Payload, format: ImageFormat, options: &DocumentOptions) -> Self {
        let (width_emu, height_emu) = options.placeholder();
        Self {
            payload,
            format,
            width_emu,
            height_emu,
            dpi: options.default_dpi,
            explicit_size: false,
            relationship_id: None,
            media_name: None,
            name: None,
            description: String::new(),
            rotation: 0.0,
            crop: None,
            effects: ImageEffects::default(),
            placement: Placement::Inline,
        }
    }

    /// Create an image from bytes, sized from its header at 96 DPI fallback.
    ///
    /// Never fails: an unrecognised payload gets the placeholder size.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::from_bytes_with_options(bytes, &DocumentOptions::default())
    }

    pub fn from_bytes_with_options(bytes: Vec<u8>, options: &DocumentOptions) -> Self {
        let mut image = Self::with_payload(
            Payload::Loaded {
                bytes: Vec::new(),
                path: None,
            },
            ImageFormat::Unknown,
            options,
        );
        image.set_loaded_bytes(bytes, None, options);
        image
    }

    /// Create a lazy, file-backed image. Nothing is read until
    /// [`ensure_loaded`](Self::ensure_loaded).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Unknown);
        Self::with_payload(Payload::Unloaded { path }, format, &DocumentOptions::default())
    }

    /// Read a file-backed image now.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut image = Self::from_path(path);
        image.ensure_loaded().await?;
        Ok(image)
    }

    /// An image read back from a package, with the size recorded in the drawing.
    pub(crate) fn from_package(
        bytes: Vec<u8>,
        media_name: String,
        relationship_id: String,
        width_emu: u32,
        height_emu: u32,
    ) -> Self {
        let options = DocumentOptions::default();
        let mut image = Self::from_bytes_with_options(bytes, &options);
        if image.format == ImageFormat::Unknown {
            let ext = media_name.rsplit('.').next().unwrap_or_default();
            image.format = ImageFormat::from_extension(ext);
        }
        if width_emu > 0 && height_emu > 0 {
            image.width_emu = width_emu;
            image.height_emu = height_emu;
            image.explicit_size = true;
        }
        image.media_name = Some(media_name);
        image.relationship_id = Some(relationship_id);
        image
    }

    fn set_loaded_bytes(&mut self, bytes: Vec<u8>, path: Option<PathBuf>, options: &DocumentOptions) {
        let detected = detect_size(&bytes, options.default_dpi, options.placeholder());
        if detected.format != ImageFormat::Unknown || self.format == ImageFormat::Unknown {
            self.format = detected.format;
        }
        self.dpi = detected.dpi;
        if !self.explicit_size {
            self.width_emu = detected.width_emu;
            self.height_emu = detected.height_emu;
        }
        self.payload = Payload::Loaded { bytes, path };
    }

    /// Complete an unloaded payload with bytes read elsewhere.
    pub(crate) fn attach_bytes(&mut self, bytes: Vec<u8>, options: &DocumentOptions) {
        if let Payload::Unloaded { path } = &mut self.payload {
            let path = std::mem::take(path);
            self.set_loaded_bytes(bytes, Some(path), options);
        }
    }

    /// Load a file-backed payload. A no-op when the bytes are already in memory.
    ///
    /// On I/O failure the payload stays unloaded and the error is returned.
    pub async fn ensure_loaded(&mut self) -> Result<()> {
        self.ensure_loaded_with(&DocumentOptions::default()).await
    }

    pub async fn ensure_loaded_with(&mut self, options: &DocumentOptions) -> Result<()> {
        let path = match &self.payload {
            Payload::Loaded { .. } => return Ok(()),
            Payload::Unloaded { path } => path.clone(),
        };
        let bytes = tokio::fs::read(&path).await?;
        log::debug!("loaded image {} ({} bytes)", path.display(), bytes.len());
        self.set_loaded_bytes(bytes, Some(path), options);
        Ok(())
    }

    /// Drop the bytes of a file-backed payload. Returns whether anything was
    /// released; buffer-backed payloads are never released.
    pub fn release(&mut self) -> bool {
        match &mut self.payload {
            Payload::Loaded {
                path: Some(path), ..
            } => {
                let path = std::mem::take(path);
                self.payload = Payload::Unloaded { path };
                true
            },
            _ => false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.payload, Payload::Loaded { .. })
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The image bytes, or [`OoxmlError::PayloadNotLoaded`].
    pub fn data(&self) -> Result<&[u8]> {
        match &self.payload {
            Payload::Loaded { bytes, .. } => Ok(bytes),
            Payload::Unloaded { path } => {
                Err(OoxmlError::PayloadNotLoaded(path.display().to_string()))
            },
        }
    }

    /// Source file of a file-backed image.
    pub fn path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Unloaded { path } => Some(path),
            Payload::Loaded { path, .. } => path.as_deref(),
        }
    }

    /// Swap in an optimized payload.
    ///
    /// The new bytes no longer match any source file, so the payload becomes
    /// buffer-backed and [`release`](Self::release) leaves it alone.
    pub(crate) fn replace_payload(&mut self, optimized: Optimized) {
        self.format = optimized.format;
        self.payload = Payload::Loaded {
            bytes: optimized.data,
            path: None,
        };
    }

    #[inline]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Extension of the media part this image is written to.
    #[inline]
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    #[inline]
    pub fn width_emu(&self) -> u32 {
        self.width_emu
    }

    #[inline]
    pub fn height_emu(&self) -> u32 {
        self.height_emu
    }

    #[inline]
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Set the display size in EMU. Both dimensions must be positive.
    pub fn set_size_emu(&mut self, width_emu: u32, height_emu: u32) -> Result<&mut Self> {
        if width_emu == 0 || height_emu == 0 {
            return Err(OoxmlError::MalformedInput(format!(
                "image size must be positive, got {}x{} EMU",
                width_emu, height_emu
            )));
        }
        self.width_emu = width_emu;
        self.height_emu = height_emu;
        self.explicit_size = true;
        Ok(self)
    }

    pub fn set_size_inches(&mut self, width: f64, height: f64) -> Result<&mut Self> {
        self.set_size_emu(unit::inches_to_emu(width), unit::inches_to_emu(height))
    }

    /// Scale to `width_emu`, keeping the aspect ratio.
    pub fn scale_to_width(&mut self, width_emu: u32) -> Result<&mut Self> {
        let height = (self.height_emu as f64 * width_emu as f64 / self.width_emu as f64).round();
        self.set_size_emu(width_emu, (height as u32).max(1))
    }

    pub fn relationship_id(&self) -> Option<&str> {
        self.relationship_id.as_deref()
    }

    pub fn media_name(&self) -> Option<&str> {
        self.media_name.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Alt text.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Rotate clockwise by `degrees`, normalised to `[0, 360)`.
    pub fn set_rotation(&mut self, degrees: f64) -> &mut Self {
        self.rotation = if degrees.is_finite() {
            degrees.rem_euclid(360.0)
        } else {
            0.0
        };
        self
    }

    pub fn crop(&self) -> Option<Crop> {
        self.crop
    }

    pub fn set_crop(&mut self, crop: Crop) -> &mut Self {
        self.crop = (!crop.is_empty()).then_some(crop);
        self
    }

    pub fn effects(&self) -> ImageEffects {
        self.effects
    }

    pub fn set_grayscale(&mut self, grayscale: bool) -> &mut Self {
        self.effects.grayscale = grayscale;
        self
    }

    /// Brightness and contrast in percent, each within -100..=100.
    pub fn set_brightness_contrast(&mut self, brightness: f64, contrast: f64) -> &mut Self {
        let scale = |p: f64| (p.clamp(-100.0, 100.0) * 1000.0).round() as i32;
        self.effects.brightness = scale(brightness);
        self.effects.contrast = scale(contrast);
        self
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn set_floating(&mut self, position: FloatingPosition) -> &mut Self {
        self.placement = Placement::Floating(position);
        self
    }

    pub fn set_inline(&mut self) -> &mut Self {
        self.placement = Placement::Inline;
        self
    }
}
