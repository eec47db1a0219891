//! Outline simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! A traced contour has one vertex per boundary pixel. Simplification
//! reduces it to the handful of corners a person would click by hand,
//! with epsilon scaled to the contour perimeter so large and small
//! buildings end up with similar vertex counts.
//!
//! The input is a closed ring, so it is split at the vertex farthest
//! from the first one and each half is simplified as an open chain.

use crate::geometry;
use crate::types::{PixelPoint, PixelPolygon, StrategyFailure};

/// Simplify a closed contour with epsilon `factor * perimeter`.
///
/// Consecutive duplicate vertices are removed first. The first vertex of
/// the ring is dropped as well when it lies within epsilon of the segment
/// joining its neighbours, so the result does not depend on where the
/// tracer happened to start.
///
/// # Errors
///
/// Returns [`StrategyFailure::DegeneratePolygon`] if fewer than three
/// vertices remain.
pub fn simplify(contour: &PixelPolygon, factor: f64) -> Result<PixelPolygon, StrategyFailure> {
    let points = dedup_ring(contour.points());
    if points.len() < 3 {
        return Err(StrategyFailure::DegeneratePolygon);
    }

    let epsilon = factor.max(0.0) * geometry::perimeter(&points);
    let n = points.len();

    // Close the ring explicitly: index n is vertex 0 again.
    let mut ring = points;
    ring.push(ring[0]);

    let far = farthest_from(&ring[..n], ring[0]);
    let mut kept = vec![false; n + 1];
    kept[0] = true;
    kept[far] = true;
    kept[n] = true;

    rdp_recurse(&ring, 0, far, epsilon, &mut kept);
    rdp_recurse(&ring, far, n, epsilon, &mut kept);

    let mut simplified: Vec<PixelPoint> = ring[..n]
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    if simplified.len() > 3 {
        let last = simplified[simplified.len() - 1];
        if perpendicular_distance(simplified[0], last, simplified[1]) <= epsilon {
            simplified.remove(0);
        }
    }

    if simplified.len() < 3 {
        return Err(StrategyFailure::DegeneratePolygon);
    }
    Ok(PixelPolygon::new(simplified))
}

/// Drop consecutive repeats, including a trailing copy of the first vertex.
fn dedup_ring(points: &[PixelPoint]) -> Vec<PixelPoint> {
    let mut out: Vec<PixelPoint> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn farthest_from(points: &[PixelPoint], origin: PixelPoint) -> usize {
    let mut best = 0;
    let mut best_dist = 0.0;
    for (i, &p) in points.iter().enumerate() {
        let d = p.distance_squared(origin);
        if d > best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// segment between them. If that distance exceeds `epsilon`, the point is
/// kept and both halves are processed recursively.
fn rdp_recurse(points: &[PixelPoint], start: usize, end: usize, epsilon: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, epsilon, kept);
        rdp_recurse(points, max_idx, end, epsilon, kept);
    }
}

/// Distance from `p` to the line through `a` and `b`, or to `a` when the
/// two coincide.
fn perpendicular_distance(p: PixelPoint, a: PixelPoint, b: PixelPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}
