//! Adaptive-threshold segmentation.
//!
//! Each pixel is compared with the mean of a square window around it
//! rather than with one global level, so faint line work on an unevenly
//! lit scan still separates from its surroundings.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;

use crate::contour;
use crate::types::{PixelPoint, PixelPolygon, StrategyFailure};

/// Binarize `buf` against its local mean and close the result.
///
/// With `invert` unset a pixel is foreground when it is darker than its
/// window mean by more than `offset`; with `invert` set, when it is
/// lighter by more than `offset`. The mask is closed with a 3×3 element.
#[must_use]
pub fn threshold(buf: &GrayImage, window: u32, offset: u8, invert: bool) -> GrayImage {
    let radius = (window / 2).max(1);
    let mean = box_filter(buf, radius, radius);

    let mask = GrayImage::from_fn(buf.width(), buf.height(), |x, y| {
        let v = buf.get_pixel(x, y).0[0];
        let m = mean.get_pixel(x, y).0[0];
        let foreground = if invert {
            v > m.saturating_add(offset)
        } else {
            v < m.saturating_sub(offset)
        };
        Luma([if foreground { 255 } else { 0 }])
    });

    imageproc::morphology::close(&mask, Norm::LInf, 1)
}

/// Closed outline around `containing` in a thresholded mask.
///
/// # Errors
///
/// Returns [`StrategyFailure::NoContourFound`] if no outer boundary in
/// the mask encloses `containing`.
pub fn contours(mask: &GrayImage, containing: PixelPoint) -> Result<PixelPolygon, StrategyFailure> {
    contour::select_enclosing(contour::outer_contours(mask), containing)
        .ok_or(StrategyFailure::NoContourFound)
}
