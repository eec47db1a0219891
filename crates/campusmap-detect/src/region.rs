//! Region growing: flood fill from the click within a brightness
//! tolerance.
//!
//! The fill is 4-connected and compares each candidate pixel with the
//! running mean of the region grown so far, so slow gradients inside a
//! building are followed while a sharp step to the surrounding ground
//! stops the fill. A fill that reaches the image border has leaked: the
//! click was not inside a bounded silhouette at that tolerance.
//!
//! The accepted mask is closed with a 3×3 structuring element to seal
//! single-pixel gaps before its outer boundary is traced.

use std::collections::VecDeque;

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;

use crate::contour;
use crate::strategy::seed_pixel;
use crate::types::{PixelPoint, PixelPolygon, StrategyFailure};

const FOREGROUND: Luma<u8> = Luma([255]);

/// Grow a region from `seed` at a single tolerance and trace its outline.
///
/// # Errors
///
/// - [`StrategyFailure::SeedOutOfBounds`] if `seed` is off the buffer.
/// - [`StrategyFailure::SeedLeaked`] if the fill reaches the border.
/// - [`StrategyFailure::NoContourFound`] if the closed mask has no outer
///   boundary enclosing the seed.
pub fn grow(
    buf: &GrayImage,
    seed: PixelPoint,
    tolerance: u8,
) -> Result<PixelPolygon, StrategyFailure> {
    let (sx, sy) = seed_pixel(buf, seed)?;
    let mask =
        flood_mask(buf, sx, sy, tolerance).ok_or(StrategyFailure::SeedLeaked { tolerance })?;
    let closed = imageproc::morphology::close(&mask, Norm::LInf, 1);
    contour::select_enclosing(contour::outer_contours(&closed), seed)
        .ok_or(StrategyFailure::NoContourFound)
}

/// Try each tolerance in `ladder`, tightest first, and return the first
/// outline together with the tolerance that produced it.
///
/// # Errors
///
/// Returns the failure from the loosest tolerance when every rung fails,
/// or [`StrategyFailure::NoContourFound`] for an empty ladder.
pub fn grow_with_ladder(
    buf: &GrayImage,
    seed: PixelPoint,
    ladder: &[u8],
) -> Result<(PixelPolygon, u8), StrategyFailure> {
    let mut last = StrategyFailure::NoContourFound;
    for &tolerance in ladder {
        match grow(buf, seed, tolerance) {
            Ok(contour) => return Ok((contour, tolerance)),
            Err(StrategyFailure::SeedOutOfBounds) => {
                return Err(StrategyFailure::SeedOutOfBounds);
            }
            Err(failure) => {
                tracing::trace!(tolerance, %failure, "region growth rung failed");
                last = failure;
            }
        }
    }
    Err(last)
}

/// 4-connected flood fill against the running region mean.
///
/// Returns `None` if the region touches the image border.
fn flood_mask(buf: &GrayImage, sx: u32, sy: u32, tolerance: u8) -> Option<GrayImage> {
    let (w, h) = buf.dimensions();
    let on_border = |x: u32, y: u32| x == 0 || y == 0 || x + 1 == w || y + 1 == h;
    if on_border(sx, sy) {
        return None;
    }

    let mut mask = GrayImage::new(w, h);
    let mut queue = VecDeque::new();
    let mut sum = u64::from(buf.get_pixel(sx, sy).0[0]);
    let mut count: u64 = 1;
    mask.put_pixel(sx, sy, FOREGROUND);
    queue.push_back((sx, sy));

    while let Some((x, y)) = queue.pop_front() {
        // (x, y) is never on the border, so every neighbour is in range.
        for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            if mask.get_pixel(nx, ny).0[0] != 0 {
                continue;
            }
            let value = u64::from(buf.get_pixel(nx, ny).0[0]);
            // |value - mean| <= tolerance, in integers: |value*count - sum| <= tolerance*count
            if (value * count).abs_diff(sum) > u64::from(tolerance) * count {
                continue;
            }
            if on_border(nx, ny) {
                return None;
            }
            mask.put_pixel(nx, ny, FOREGROUND);
            sum += value;
            count += 1;
            queue.push_back((nx, ny));
        }
    }

    Some(mask)
}
