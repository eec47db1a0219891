//! Edge-snap tracing: outline a building by hand, one click per corner,
//! with every click pulled onto the strongest nearby image edge.
//!
//! This is the manual counterpart to [`Detector`](crate::Detector) for
//! buildings no strategy can segment.

use image::Luma;
use imageproc::definitions::Image;

use crate::normalize::normalize_polygon;
use crate::types::{DetectError, GrayImage, PixelPoint, PixelPolygon, RenderSize, UnitPolygon};

/// Default search radius around a click, in buffer pixels.
pub const DEFAULT_SNAP_RADIUS: u32 = 22;

/// Unblurred Sobel gradient magnitude of a luminance buffer.
#[derive(Debug, Clone)]
pub struct GradientField {
    magnitude: Image<Luma<f32>>,
    max: f32,
}

impl GradientField {
    /// Compute the gradient magnitude of `buf`. The one-pixel frame is
    /// zero.
    #[must_use]
    pub fn compute(buf: &GrayImage) -> Self {
        let magnitude = crate::edge::sobel_magnitude(buf);
        let max = magnitude.pixels().map(|p| p.0[0]).fold(0.0, f32::max);
        Self { magnitude, max }
    }

    /// Width of the field.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.magnitude.width()
    }

    /// Height of the field.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.magnitude.height()
    }

    /// Strongest magnitude anywhere in the field.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Centre of the strongest pixel within `radius` of `point`.
    ///
    /// The search window is clamped to `[1, w-2] × [1, h-2]`; the first
    /// maximum in row-major order wins. Returns `None` when the clamped
    /// window is empty.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn snap(&self, point: PixelPoint, radius: u32) -> Option<PixelPoint> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        let (w, h) = (i64::from(self.width()), i64::from(self.height()));
        let r = i64::from(radius);
        let cx = point.x.floor() as i64;
        let cy = point.y.floor() as i64;

        // `as i64` saturates, so far-off clicks must not overflow here.
        let (x0, x1) = (cx.saturating_sub(r).max(1), cx.saturating_add(r).min(w - 2));
        let (y0, y1) = (cy.saturating_sub(r).max(1), cy.saturating_add(r).min(h - 2));
        if x0 > x1 || y0 > y1 {
            return None;
        }

        let mut best: Option<(u32, u32)> = None;
        let mut best_val = f32::NEG_INFINITY;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (ux, uy) = (u32::try_from(x).ok()?, u32::try_from(y).ok()?);
                let v = self.magnitude.get_pixel(ux, uy).0[0];
                if v > best_val {
                    best_val = v;
                    best = Some((ux, uy));
                }
            }
        }

        best.map(|(x, y)| PixelPoint::new(f64::from(x) + 0.5, f64::from(y) + 0.5))
    }
}

/// An in-progress hand trace.
///
/// Clicks are in render-space pixels; the gradient field is sampled at
/// the render size, so buffer and render coordinates are scaled between
/// when the two grids differ.
#[derive(Debug, Clone)]
pub struct SnapTrace {
    field: GradientField,
    size: RenderSize,
    radius: u32,
    points: Vec<PixelPoint>,
}

impl SnapTrace {
    /// Start a trace over `buf`, the luminance buffer sampled at `size`.
    #[must_use]
    pub fn new(buf: &GrayImage, size: RenderSize) -> Self {
        Self {
            field: GradientField::compute(buf),
            size,
            radius: DEFAULT_SNAP_RADIUS,
            points: Vec::new(),
        }
    }

    /// Use a different search radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Snap `click` and append it. Returns the snapped point, or `None`
    /// (appending nothing) when the click cannot snap.
    pub fn push(&mut self, click: PixelPoint) -> Option<PixelPoint> {
        let sx = f64::from(self.field.width()) / self.size.width();
        let sy = f64::from(self.field.height()) / self.size.height();
        let snapped = self
            .field
            .snap(PixelPoint::new(click.x * sx, click.y * sy), self.radius)?;
        let point = PixelPoint::new(snapped.x / sx, snapped.y / sy);
        self.points.push(point);
        Some(point)
    }

    /// Remove the last point.
    pub fn undo(&mut self) -> Option<PixelPoint> {
        self.points.pop()
    }

    /// Remove every point.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// The points placed so far, in render-space pixels.
    #[must_use]
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    /// Normalize the trace into a storable outline.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::DegeneratePolygon`] with fewer than three
    /// points.
    pub fn finish(&self) -> Result<UnitPolygon, DetectError> {
        normalize_polygon(&PixelPolygon::new(self.points.clone()), self.size)
    }
}
