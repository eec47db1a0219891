//! Planar geometry on pixel-space vertex rings.
//!
//! Containment uses the even-odd (ray casting) rule so that vertex order
//! does not matter. Area goes through [`geo`].

use geo::{Area, LineString, Polygon};

use crate::types::PixelPoint;

/// Even-odd point-in-polygon test.
///
/// Casts a horizontal ray from `p` towards +x and counts edge crossings.
/// The ring is treated as closed. Rings with fewer than three vertices
/// contain nothing.
#[must_use]
pub fn contains(ring: &[PixelPoint], p: PixelPoint) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Unsigned enclosed area of a closed ring.
#[must_use]
pub fn area(ring: &[PixelPoint]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let exterior: LineString<f64> = ring.iter().map(|p| (p.x, p.y)).collect();
    Polygon::new(exterior, vec![]).unsigned_area()
}

/// Length of the closed ring, including the closing edge.
#[must_use]
pub fn perimeter(ring: &[PixelPoint]) -> f64 {
    match ring {
        [] | [_] => 0.0,
        [first, .., last] => {
            let open: f64 = ring.windows(2).map(|w| w[0].distance(w[1])).sum();
            open + last.distance(*first)
        }
    }
}

/// Mean of the vertices, or `None` for an empty ring.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn vertex_centroid(ring: &[PixelPoint]) -> Option<PixelPoint> {
    if ring.is_empty() {
        return None;
    }
    let n = ring.len() as f64;
    let (sx, sy) = ring
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(PixelPoint::new(sx / n, sy / n))
}

/// Axis-aligned bounding box as `(min, max)` corners.
#[must_use]
pub fn bounding_box(ring: &[PixelPoint]) -> Option<(PixelPoint, PixelPoint)> {
    let first = *ring.first()?;
    Some(ring.iter().fold((first, first), |(lo, hi), p| {
        (
            PixelPoint::new(lo.x.min(p.x), lo.y.min(p.y)),
            PixelPoint::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}
