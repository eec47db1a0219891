//! Edge-based contour extraction.
//!
//! The luminance buffer is blurred, its Sobel gradient magnitude is
//! thresholded with hysteresis (low threshold is half the high one), and
//! the resulting edge map is dilated by one pixel so that small breaks in
//! printed outlines do not open the ring. The outer boundary of the
//! dilated edge band that encloses the click is the candidate.
//!
//! There is no non-maximum suppression step, so edge bands stay several
//! pixels wide. The traced outline is the *outer* side of the blurred and
//! dilated band: it lies up to about 5 px outside a thin printed line and
//! its corners are slightly skewed. Simplification absorbs the skew.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::filter::{filter_clamped, gaussian_blur_f32};
use imageproc::kernel;

use crate::contour;
use crate::types::{PixelPoint, PixelPolygon, StrategyFailure};

/// Minimum high threshold. Values below this would mark flat regions as
/// edges.
pub const MIN_HIGH_THRESHOLD: f32 = 1.0;

const EDGE: Luma<u8> = Luma([255]);

/// Sobel gradient magnitude of `buf`.
///
/// The one-pixel frame around the image is zero so that clamped border
/// sampling never produces spurious edges.
#[must_use]
pub fn sobel_magnitude(buf: &GrayImage) -> Image<Luma<f32>> {
    let gx: Image<Luma<i16>> = filter_clamped(buf, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(buf, kernel::SOBEL_VERTICAL_3X3);
    let (width, height) = buf.dimensions();

    Image::from_fn(width, height, |x, y| {
        if x == 0 || y == 0 || x + 1 >= width || y + 1 >= height {
            return Luma([0.0]);
        }
        let h = f32::from(gx.get_pixel(x, y).0[0]);
        let v = f32::from(gy.get_pixel(x, y).0[0]);
        Luma([h.hypot(v)])
    })
}

/// Binary edge map of `buf`.
///
/// `sigma` is the pre-blur (no blur when it is not positive) and
/// `high_threshold` is clamped to at least [`MIN_HIGH_THRESHOLD`].
#[must_use]
pub fn edges(buf: &GrayImage, sigma: f32, high_threshold: f32) -> GrayImage {
    let high = high_threshold.max(MIN_HIGH_THRESHOLD);
    let blurred = if sigma > 0.0 {
        gaussian_blur_f32(buf, sigma)
    } else {
        buf.clone()
    };
    hysteresis(&sobel_magnitude(&blurred), high / 2.0, high)
}

/// Closed outline around `containing` in an edge map.
///
/// # Errors
///
/// Returns [`StrategyFailure::NoContourFound`] if no outer boundary of
/// the dilated edges encloses `containing`.
pub fn contours(
    edge_map: &GrayImage,
    containing: PixelPoint,
) -> Result<PixelPolygon, StrategyFailure> {
    let thick = imageproc::morphology::dilate(edge_map, Norm::LInf, 1);
    contour::select_enclosing(contour::outer_contours(&thick), containing)
        .ok_or(StrategyFailure::NoContourFound)
}

/// Keep weak edges only where they connect (8-neighbour) to a strong one.
fn hysteresis(magnitude: &Image<Luma<f32>>, low: f32, high: f32) -> GrayImage {
    let (width, height) = magnitude.dimensions();
    let mut out = GrayImage::new(width, height);
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if magnitude.get_pixel(x, y).0[0] < high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, EDGE);
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (nx, ny) in neighbours8(cx, cy, width, height) {
                    let weak = magnitude.get_pixel(nx, ny).0[0] >= low;
                    if weak && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, EDGE);
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

/// In-bounds 8-connected neighbours of `(x, y)`.
pub(crate) fn neighbours8(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> impl Iterator<Item = (u32, u32)> {
    (-1i64..=1)
        .flat_map(|dy| (-1i64..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let nx = u32::try_from(i64::from(x) + dx).ok()?;
            let ny = u32::try_from(i64::from(y) + dy).ok()?;
            (nx < width && ny < height).then_some((nx, ny))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry;

    /// One-pixel dark outline of `[x0, x1] × [y0, y1]` on white.
    fn outlined_rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32, ink: u8) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let on_x = (x == x0 || x == x1) && (y0..=y1).contains(&y);
            let on_y = (y == y0 || y == y1) && (x0..=x1).contains(&x);
            Luma([if on_x || on_y { ink } else { 255 }])
        })
    }

    #[test]
    fn flat_image_has_no_edges() {
        let buf = GrayImage::from_pixel(30, 30, Luma([128]));
        let map = edges(&buf, 1.4, 60.0);
        assert!(map.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn magnitude_frame_is_zero() {
        let buf = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 0 } else { 255 }]));
        let mag = sobel_magnitude(&buf);
        for i in 0..10 {
            assert!(mag.get_pixel(i, 0).0[0].abs() < f32::EPSILON);
            assert!(mag.get_pixel(0, i).0[0].abs() < f32::EPSILON);
            assert!(mag.get_pixel(i, 9).0[0].abs() < f32::EPSILON);
            assert!(mag.get_pixel(9, i).0[0].abs() < f32::EPSILON);
        }
        assert!(mag.get_pixel(5, 5).0[0] > 500.0);
    }

    #[test]
    fn hysteresis_keeps_weak_pixels_attached_to_strong() {
        let mut mag: Image<Luma<f32>> = Image::from_pixel(10, 3, Luma([0.0]));
        mag.put_pixel(1, 1, Luma([100.0]));
        mag.put_pixel(2, 1, Luma([40.0]));
        mag.put_pixel(3, 2, Luma([40.0]));
        // Isolated weak pixel.
        mag.put_pixel(8, 1, Luma([40.0]));
        let out = hysteresis(&mag, 30.0, 60.0);
        assert_eq!(out.get_pixel(1, 1).0[0], 255);
        assert_eq!(out.get_pixel(2, 1).0[0], 255);
        assert_eq!(out.get_pixel(3, 2).0[0], 255);
        assert_eq!(out.get_pixel(8, 1).0[0], 0);
    }

    #[test]
    fn hysteresis_at_image_corner_does_not_underflow() {
        let mag: Image<Luma<f32>> = Image::from_pixel(4, 4, Luma([100.0]));
        let out = hysteresis(&mag, 1.0, 2.0);
        assert!(out.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn neighbours8_clips_at_corner() {
        let n: Vec<_> = neighbours8(0, 0, 5, 5).collect();
        assert_eq!(n.len(), 3);
        let n: Vec<_> = neighbours8(2, 2, 5, 5).collect();
        assert_eq!(n.len(), 8);
    }

    #[test]
    fn outlined_building_is_enclosed() {
        let buf = outlined_rect(80, 60, 20, 15, 60, 45, 0);
        let map = edges(&buf, 1.4, 60.0);
        let seed = PixelPoint::new(40.0, 30.0);
        let ring = contours(&map, seed).unwrap();
        assert!(geometry::contains(ring.points(), seed));
        let (lo, hi) = geometry::bounding_box(ring.points()).unwrap();
        assert!(lo.x < 20.0 && lo.y < 15.0, "lo {lo:?}");
        assert!(hi.x > 60.0 && hi.y > 45.0, "hi {hi:?}");
        // Outer side of the band: outside the line, but by less than 6 px.
        assert!(lo.x > 14.0 && lo.y > 9.0, "lo {lo:?}");
        assert!(hi.x < 66.0 && hi.y < 51.0, "hi {hi:?}");
    }

    #[test]
    fn click_outside_outline_finds_nothing() {
        let buf = outlined_rect(80, 60, 20, 15, 60, 45, 0);
        let map = edges(&buf, 1.4, 60.0);
        assert_eq!(
            contours(&map, PixelPoint::new(5.0, 5.0)),
            Err(StrategyFailure::NoContourFound)
        );
    }

    #[test]
    fn faint_outline_falls_below_threshold() {
        let buf = outlined_rect(80, 60, 20, 15, 60, 45, 250);
        let map = edges(&buf, 1.4, 60.0);
        assert!(map.pixels().all(|p| p.0[0] == 0));
    }
}
