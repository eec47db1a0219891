//! Pixel ⇄ unit-space coordinate transform.
//!
//! Stored outlines live in unit space so they survive window resizes and
//! different devices:
//!
//! ```text
//! unit_x  = pixel_x / render_width
//! unit_y  = pixel_y / render_height
//! pixel_x = unit_x  * render_width
//! pixel_y = unit_y  * render_height
//! ```
//!
//! [`RenderSize`] guarantees both dimensions are positive, so these
//! functions cannot fail on their own.

use crate::types::{DetectError, PixelPoint, PixelPolygon, RenderSize, UnitPoint, UnitPolygon};

/// Convert a pixel-space point to unit space.
#[must_use]
pub fn normalize(p: PixelPoint, size: RenderSize) -> UnitPoint {
    UnitPoint::new(p.x / size.width(), p.y / size.height())
}

/// Convert a unit-space point to pixel space.
#[must_use]
pub fn denormalize(p: UnitPoint, size: RenderSize) -> PixelPoint {
    PixelPoint::new(p.x * size.width(), p.y * size.height())
}

/// Normalize every vertex of a pixel-space ring.
///
/// # Errors
///
/// Returns [`DetectError::DegeneratePolygon`] if the ring has fewer than
/// three vertices and [`DetectError::OutsideUnitSquare`] if any vertex
/// lies outside the rendered image.
pub fn normalize_polygon(
    polygon: &PixelPolygon,
    size: RenderSize,
) -> Result<UnitPolygon, DetectError> {
    UnitPolygon::new(
        polygon
            .points()
            .iter()
            .map(|&p| normalize(p, size))
            .collect(),
    )
}

/// Denormalize every vertex of a stored outline against `size`.
#[must_use]
pub fn denormalize_polygon(polygon: &UnitPolygon, size: RenderSize) -> PixelPolygon {
    PixelPolygon::new(
        polygon
            .points()
            .iter()
            .map(|&p| denormalize(p, size))
            .collect(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn size(w: f64, h: f64) -> RenderSize {
        RenderSize::new(w, h).unwrap()
    }

    #[test]
    fn normalize_divides_by_size() {
        let u = normalize(PixelPoint::new(100.0, 75.0), size(400.0, 300.0));
        assert!((u.x - 0.25).abs() < 1e-12);
        assert!((u.y - 0.25).abs() < 1e-12);
    }

    #[test]
    fn denormalize_multiplies_by_size() {
        let p = denormalize(UnitPoint::new(0.5, 0.1), size(800.0, 600.0));
        assert!((p.x - 400.0).abs() < 1e-12);
        assert!((p.y - 60.0).abs() < 1e-12);
    }

    #[test]
    fn round_trip_across_many_sizes_and_points() {
        let sizes = [
            size(1.0, 1.0),
            size(0.37, 1920.0),
            size(400.0, 300.0),
            size(1234.5, 987.25),
            size(1e6, 3.0),
        ];
        let points = [
            PixelPoint::new(0.0, 0.0),
            PixelPoint::new(-12.5, 7.25),
            PixelPoint::new(399.9, 299.9),
            PixelPoint::new(1e5, -1e5),
        ];
        for s in sizes {
            for p in points {
                let back = denormalize(normalize(p, s), s);
                assert!(
                    (back.x - p.x).abs() < 1e-6 && (back.y - p.y).abs() < 1e-6,
                    "round trip failed for {p:?} at {s}: got {back:?}",
                );
            }
        }
    }

    #[test]
    fn stored_outline_survives_denormalize_renormalize() {
        let stored = UnitPolygon::new(vec![
            UnitPoint::new(0.125, 0.1666),
            UnitPoint::new(0.375, 0.1666),
            UnitPoint::new(0.375, 0.4),
            UnitPoint::new(0.125, 0.4),
        ])
        .unwrap();
        let s1 = size(1013.0, 771.0);
        let again = normalize_polygon(&denormalize_polygon(&stored, s1), s1).unwrap();
        for (a, b) in stored.points().iter().zip(again.points()) {
            assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
        }
    }

    #[test]
    fn rescaling_preserves_edge_length_ratios() {
        let stored = UnitPolygon::new(vec![
            UnitPoint::new(0.1, 0.1),
            UnitPoint::new(0.4, 0.1),
            UnitPoint::new(0.4, 0.3),
            UnitPoint::new(0.2, 0.35),
        ])
        .unwrap();
        let edge_lengths = |poly: &PixelPolygon| -> Vec<f64> {
            let pts = poly.points();
            (0..pts.len())
                .map(|i| pts[i].distance(pts[(i + 1) % pts.len()]))
                .collect()
        };
        let small = edge_lengths(&denormalize_polygon(&stored, size(400.0, 300.0)));
        let large = edge_lengths(&denormalize_polygon(&stored, size(1000.0, 750.0)));
        for i in 0..small.len() {
            for j in 0..small.len() {
                let r_small = small[i] / small[j];
                let r_large = large[i] / large[j];
                assert!((r_small - r_large).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn normalize_polygon_rejects_points_off_image() {
        let ring = PixelPolygon::new(vec![
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(500.0, 10.0),
            PixelPoint::new(10.0, 50.0),
        ]);
        let err = normalize_polygon(&ring, size(400.0, 300.0));
        assert!(matches!(err, Err(DetectError::OutsideUnitSquare { .. })));
    }
}
