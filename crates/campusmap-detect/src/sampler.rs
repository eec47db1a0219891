//! Raster sampling: map image in, luminance buffer at render size out.
//!
//! Detection must agree with on-screen coordinates, so the image is
//! always resampled to the *current* render size before any
//! segmentation runs. The native resolution of the source never leaks
//! into the detection buffer.

use std::borrow::Cow;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use crate::types::{DetectError, RenderSize};

/// Something that can hand over the pixels of the displayed map image.
///
/// Implementations report [`DetectError::ImageUnavailable`] when the
/// pixels cannot be read (not loaded yet, access restricted, corrupt).
pub trait RasterSource {
    /// The full-resolution RGBA pixels of the image.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::ImageUnavailable`] if the pixels cannot be
    /// read.
    fn pixels(&self) -> Result<Cow<'_, RgbaImage>, DetectError>;
}

impl RasterSource for RgbaImage {
    fn pixels(&self) -> Result<Cow<'_, RgbaImage>, DetectError> {
        Ok(Cow::Borrowed(self))
    }
}

impl RasterSource for DynamicImage {
    fn pixels(&self) -> Result<Cow<'_, RgbaImage>, DetectError> {
        Ok(Cow::Owned(self.to_rgba8()))
    }
}

/// Encoded image bytes (PNG, JPEG, BMP, WebP), decoded on demand.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    bytes: Vec<u8>,
}

impl EncodedImage {
    /// Wrap raw encoded bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl RasterSource for EncodedImage {
    fn pixels(&self) -> Result<Cow<'_, RgbaImage>, DetectError> {
        if self.bytes.is_empty() {
            return Err(DetectError::ImageUnavailable(
                "image data is empty".to_string(),
            ));
        }
        let img = image::load_from_memory(&self.bytes)?;
        Ok(Cow::Owned(img.to_rgba8()))
    }
}

/// A map image that has not finished loading.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingImage;

impl RasterSource for PendingImage {
    fn pixels(&self) -> Result<Cow<'_, RgbaImage>, DetectError> {
        Err(DetectError::ImageUnavailable(
            "image has not finished loading".to_string(),
        ))
    }
}

/// Rasterize `source` at `size` and convert to 8-bit luminance.
///
/// Uses `0.299*R + 0.587*G + 0.114*B`; alpha is ignored. The buffer has
/// `size.pixel_dimensions()` pixels regardless of the source resolution.
///
/// # Errors
///
/// Returns [`DetectError::ImageUnavailable`] if the source cannot be
/// read or has no pixels.
pub fn sample<S>(source: &S, size: RenderSize) -> Result<GrayImage, DetectError>
where
    S: RasterSource + ?Sized,
{
    let rgba = source.pixels()?;
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(DetectError::ImageUnavailable(
            "image has no pixels".to_string(),
        ));
    }

    let (width, height) = size.pixel_dimensions();
    let scaled = if rgba.dimensions() == (width, height) {
        rgba
    } else {
        Cow::Owned(image::imageops::resize(
            &*rgba,
            width,
            height,
            FilterType::Triangle,
        ))
    };

    Ok(to_luminance(&scaled))
}

/// Per-pixel luminance of an RGBA image.
#[must_use]
pub fn to_luminance(rgba: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, _] = rgba.get_pixel(x, y).0;
        Luma([luminance(r, g, b)])
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.114f32.mul_add(
        f32::from(b),
        0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
    );
    y.round().clamp(0.0, 255.0) as u8
}
