//! Contour extraction and selection around a seed point.
//!
//! All three strategies end the same way: a binary image goes through
//! Suzuki-Abe border following (`imageproc::contours::find_contours`),
//! only outer borders are kept, and the largest ring that encloses the
//! click wins.
//!
//! Contour vertices are placed at pixel centres (`x + 0.5`, `y + 0.5`) so
//! that rings line up with the rendered image rather than with the
//! top-left corner of each pixel.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour};

use crate::geometry;
use crate::types::{PixelPoint, PixelPolygon};

/// Two candidate areas closer than this are considered tied.
pub const AREA_TIE_EPSILON: f64 = 0.5;

/// Trace the outer borders of every foreground component.
///
/// Foreground is any non-zero pixel. Hole borders and rings with fewer
/// than three points are discarded. Rings are returned in discovery
/// (raster scan) order.
#[must_use]
pub fn outer_contours(binary: &GrayImage) -> Vec<PixelPolygon> {
    let contours: Vec<Contour<u32>> = imageproc::contours::find_contours(binary);

    contours
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.points.len() >= 3)
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| PixelPoint::new(f64::from(p.x) + 0.5, f64::from(p.y) + 0.5))
                .collect();
            PixelPolygon::new(points)
        })
        .collect()
}

/// Pick the ring that encloses `seed` with the largest area.
///
/// Rings whose areas differ by at most [`AREA_TIE_EPSILON`] are ordered
/// by smaller perimeter, then by position in `candidates`.
#[must_use]
pub fn select_enclosing(candidates: Vec<PixelPolygon>, seed: PixelPoint) -> Option<PixelPolygon> {
    let mut best: Option<(usize, f64, f64)> = None;

    for (idx, ring) in candidates.iter().enumerate() {
        if !geometry::contains(ring.points(), seed) {
            continue;
        }
        let area = geometry::area(ring.points());
        let perimeter = geometry::perimeter(ring.points());
        let better = match best {
            None => true,
            Some((_, best_area, best_perimeter)) => {
                if (area - best_area).abs() <= AREA_TIE_EPSILON {
                    perimeter < best_perimeter
                } else {
                    area > best_area
                }
            }
        };
        if better {
            best = Some((idx, area, perimeter));
        }
    }

    let (idx, _, _) = best?;
    candidates.into_iter().nth(idx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled_rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        })
    }

    fn ring(points: &[(f64, f64)]) -> PixelPolygon {
        PixelPolygon::new(points.iter().map(|&(x, y)| PixelPoint::new(x, y)).collect())
    }

    #[test]
    fn empty_image_has_no_contours() {
        let img = GrayImage::new(10, 10);
        assert!(outer_contours(&img).is_empty());
    }

    #[test]
    fn rectangle_outer_contour_sits_on_pixel_centres() {
        let img = filled_rect(20, 20, 5, 5, 15, 12);
        let contours = outer_contours(&img);
        assert_eq!(contours.len(), 1);
        let (lo, hi) = geometry::bounding_box(contours[0].points()).unwrap();
        assert_eq!(lo, PixelPoint::new(5.5, 5.5));
        assert_eq!(hi, PixelPoint::new(14.5, 11.5));
    }

    #[test]
    fn hollow_square_keeps_only_outer_border() {
        let img = GrayImage::from_fn(20, 20, |x, y| {
            let on_ring = (3..17).contains(&x)
                && (3..17).contains(&y)
                && !((5..15).contains(&x) && (5..15).contains(&y));
            image::Luma([if on_ring { 255 } else { 0 }])
        });
        let contours = outer_contours(&img);
        assert_eq!(contours.len(), 1);
        assert!(geometry::contains(
            contours[0].points(),
            PixelPoint::new(10.0, 10.0)
        ));
    }

    #[test]
    fn select_enclosing_prefers_largest_area() {
        let small = ring(&[(4.0, 4.0), (6.0, 4.0), (6.0, 6.0), (4.0, 6.0)]);
        let large = ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let elsewhere = ring(&[(20.0, 20.0), (90.0, 20.0), (90.0, 90.0), (20.0, 90.0)]);
        let picked =
            select_enclosing(vec![small, large.clone(), elsewhere], PixelPoint::new(5.0, 5.0));
        assert_eq!(picked, Some(large));
    }

    #[test]
    fn select_enclosing_none_when_nothing_contains_seed() {
        let far = ring(&[(20.0, 20.0), (30.0, 20.0), (30.0, 30.0)]);
        assert!(select_enclosing(vec![far], PixelPoint::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn tie_breaks_on_smaller_perimeter() {
        // Both have area 16; the square has the shorter perimeter.
        let strip = ring(&[(0.0, 4.0), (16.0, 4.0), (16.0, 5.0), (0.0, 5.0)]);
        let square = ring(&[(2.0, 2.0), (6.0, 2.0), (6.0, 6.0), (2.0, 6.0)]);
        let seed = PixelPoint::new(4.0, 4.5);
        let picked = select_enclosing(vec![strip, square.clone()], seed);
        assert_eq!(picked, Some(square));
    }

    #[test]
    fn tie_with_equal_perimeter_keeps_discovery_order() {
        let a = ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]);
        let b = ring(&[(0.0, 4.0), (0.0, 0.0), (4.0, 0.0), (4.0, 4.0)]);
        let picked = select_enclosing(vec![a.clone(), b], PixelPoint::new(2.0, 2.0));
        assert_eq!(picked, Some(a));
    }
}
