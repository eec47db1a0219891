//! Shared types for the campusmap detection core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// Re-export `GrayImage` so downstream crates can reference sampled
/// luminance buffers without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can hand decoded map
/// images to the sampler without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in pixel space, relative to the top-left corner of the
/// currently rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl PixelPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A resolution-independent point in unit space (`[0, 1]` per axis).
///
/// Serialized as an `[x, y]` pair, the shape stored in the area table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct UnitPoint {
    /// Fraction of the render width.
    pub x: f64,
    /// Fraction of the render height.
    pub y: f64,
}

impl UnitPoint {
    /// Create a new unit-space point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates are finite and inside `[0, 1]`.
    #[must_use]
    pub fn is_in_unit_square(self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl From<[f64; 2]> for UnitPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<UnitPoint> for [f64; 2] {
    fn from(p: UnitPoint) -> Self {
        [p.x, p.y]
    }
}

/// The on-screen size of the rendered map image, in device-independent
/// pixels.
///
/// Both dimensions are strictly positive and finite; this is checked
/// once in [`RenderSize::new`] so normalization can never divide by
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RenderSizeRepr", into = "RenderSizeRepr")]
pub struct RenderSize {
    width: f64,
    height: f64,
}

#[derive(Serialize, Deserialize)]
struct RenderSizeRepr {
    width: f64,
    height: f64,
}

impl RenderSize {
    /// Create a render size.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidRenderSize`] if either dimension is
    /// not a positive finite number.
    pub fn new(width: f64, height: f64) -> Result<Self, DetectError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(width) && valid(height) {
            Ok(Self { width, height })
        } else {
            Err(DetectError::InvalidRenderSize { width, height })
        }
    }

    /// Render size matching a raster's native pixel grid.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidRenderSize`] for a zero-sized raster.
    pub fn from_pixels(width: u32, height: u32) -> Result<Self, DetectError> {
        Self::new(f64::from(width), f64::from(height))
    }

    /// Width in device-independent pixels.
    #[must_use]
    pub const fn width(self) -> f64 {
        self.width
    }

    /// Height in device-independent pixels.
    #[must_use]
    pub const fn height(self) -> f64 {
        self.height
    }

    /// Whole-pixel buffer dimensions for sampling at this size.
    ///
    /// Fractional sizes are rounded; each axis is at least one pixel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_dimensions(self) -> (u32, u32) {
        let px = |v: f64| v.round().clamp(1.0, f64::from(u32::MAX)) as u32;
        (px(self.width), px(self.height))
    }
}

impl TryFrom<RenderSizeRepr> for RenderSize {
    type Error = DetectError;

    fn try_from(repr: RenderSizeRepr) -> Result<Self, Self::Error> {
        Self::new(repr.width, repr.height)
    }
}

impl From<RenderSize> for RenderSizeRepr {
    fn from(size: RenderSize) -> Self {
        Self {
            width: size.width,
            height: size.height,
        }
    }
}

impl fmt::Display for RenderSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A closed ring of pixel-space vertices.
///
/// Used both for dense traced contours and for simplified outlines. The
/// ring is implicitly closed: the last vertex connects back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelPolygon(Vec<PixelPoint>);

impl PixelPolygon {
    /// Create a polygon from its vertices in winding order.
    #[must_use]
    pub const fn new(points: Vec<PixelPoint>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[PixelPoint] {
        &self.0
    }

    /// Consumes the polygon and returns its vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<PixelPoint> {
        self.0
    }
}

/// A valid unit-space outline: at least three vertices, all inside the
/// unit square.
///
/// This is the only polygon shape that crosses the persistence boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<UnitPoint>", into = "Vec<UnitPoint>")]
pub struct UnitPolygon(Vec<UnitPoint>);

impl UnitPolygon {
    /// Minimum number of vertices of a fillable polygon.
    pub const MIN_POINTS: usize = 3;

    /// Validate and wrap unit-space vertices.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::DegeneratePolygon`] for fewer than
    /// [`Self::MIN_POINTS`] vertices and
    /// [`DetectError::OutsideUnitSquare`] if any vertex lies outside
    /// `[0, 1]²` or is not finite.
    pub fn new(points: Vec<UnitPoint>) -> Result<Self, DetectError> {
        if points.len() < Self::MIN_POINTS {
            return Err(DetectError::DegeneratePolygon {
                points: points.len(),
            });
        }
        if let Some(p) = points.iter().find(|p| !p.is_in_unit_square()) {
            return Err(DetectError::OutsideUnitSquare { x: p.x, y: p.y });
        }
        Ok(Self(points))
    }

    /// Returns the number of vertices (always at least three).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[UnitPoint] {
        &self.0
    }

    /// Vertex mean, used as the default label position.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> UnitPoint {
        let n = self.0.len() as f64;
        let (sx, sy) = self
            .0
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        UnitPoint::new(sx / n, sy / n)
    }
}

impl TryFrom<Vec<UnitPoint>> for UnitPolygon {
    type Error = DetectError;

    fn try_from(points: Vec<UnitPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<UnitPolygon> for Vec<UnitPoint> {
    fn from(polygon: UnitPolygon) -> Self {
        polygon.0
    }
}

/// Opaque area identifier assigned by an area store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub u64);

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named building outline in unit space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    /// Store-assigned identifier; immutable once created.
    pub id: AreaId,
    /// Human-readable building label.
    pub name: String,
    /// Outline vertices in winding order.
    pub points: UnitPolygon,
    /// Optional label position; the vertex centroid is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<UnitPoint>,
}

impl Area {
    /// Where the label should be drawn, in unit space.
    #[must_use]
    pub fn label_position(&self) -> UnitPoint {
        self.center.unwrap_or_else(|| self.points.centroid())
    }
}

/// Configuration for a detection attempt.
///
/// All parameters have sensible defaults; see the `DEFAULT_*`
/// associated constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Strategies to try, in order.
    pub strategies: Vec<StrategyKind>,

    /// Region-growing tolerances, tightest first.
    pub tolerance_ladder: Vec<u8>,

    /// Gaussian sigma applied before gradient computation.
    pub edge_blur_sigma: f32,

    /// High hysteresis threshold on Sobel gradient magnitude. The low
    /// threshold is always half of this.
    pub edge_high_threshold: f32,

    /// Side length of the adaptive-threshold averaging window, in pixels.
    pub adaptive_window: u32,

    /// Amount a pixel must fall below its local mean to be foreground.
    pub adaptive_offset: u8,

    /// Treat light line work on a dark base as foreground in the
    /// adaptive-threshold strategy.
    pub invert: bool,

    /// Simplification epsilon as a fraction of the contour perimeter.
    pub simplify_factor: f64,
}

impl DetectConfig {
    /// Default region-growing tolerance ladder.
    pub const DEFAULT_TOLERANCE_LADDER: [u8; 4] = [12, 18, 24, 32];
    /// Default pre-blur sigma for the edge strategy.
    pub const DEFAULT_EDGE_BLUR_SIGMA: f32 = 1.4;
    /// Default high edge threshold.
    pub const DEFAULT_EDGE_HIGH_THRESHOLD: f32 = 60.0;
    /// Default adaptive window side length.
    pub const DEFAULT_ADAPTIVE_WINDOW: u32 = 15;
    /// Default adaptive offset.
    pub const DEFAULT_ADAPTIVE_OFFSET: u8 = 2;
    /// Default simplification factor.
    pub const DEFAULT_SIMPLIFY_FACTOR: f64 = 0.015;
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyKind::LADDER.to_vec(),
            tolerance_ladder: Self::DEFAULT_TOLERANCE_LADDER.to_vec(),
            edge_blur_sigma: Self::DEFAULT_EDGE_BLUR_SIGMA,
            edge_high_threshold: Self::DEFAULT_EDGE_HIGH_THRESHOLD,
            adaptive_window: Self::DEFAULT_ADAPTIVE_WINDOW,
            adaptive_offset: Self::DEFAULT_ADAPTIVE_OFFSET,
            invert: false,
            simplify_factor: Self::DEFAULT_SIMPLIFY_FACTOR,
        }
    }
}

/// Why a single strategy failed to produce an outline.
///
/// These are recovered by the orchestrator, which moves on to the next
/// strategy. They only reach callers bundled inside
/// [`DetectError::AllStrategiesFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StrategyFailure {
    /// The flood fill reached the image border at every tolerance.
    #[error("region leaked to the image border (loosest tolerance {tolerance})")]
    SeedLeaked {
        /// The last tolerance tried.
        tolerance: u8,
    },

    /// No closed contour contains the click point.
    #[error("no closed contour contains the click point")]
    NoContourFound,

    /// Simplification collapsed the outline below three vertices.
    #[error("outline collapsed below three vertices")]
    DegeneratePolygon,

    /// The click lies outside the sampled buffer.
    #[error("click point is outside the rendered image")]
    SeedOutOfBounds,
}

/// Errors returned to callers of the detection core.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The map image cannot be read (not loaded, restricted, or corrupt).
    #[error("map not ready: {0}")]
    ImageUnavailable(String),

    /// A render size was zero, negative, or not finite.
    #[error("invalid render size {width}x{height}: both dimensions must be positive")]
    InvalidRenderSize {
        /// Offending width.
        width: f64,
        /// Offending height.
        height: f64,
    },

    /// A polygon had fewer than three vertices.
    #[error("polygon needs at least 3 points, got {points}")]
    DegeneratePolygon {
        /// Number of vertices supplied.
        points: usize,
    },

    /// A unit-space vertex lies outside `[0, 1]²`.
    #[error("unit-space point ({x}, {y}) is outside the unit square")]
    OutsideUnitSquare {
        /// Offending x.
        x: f64,
        /// Offending y.
        y: f64,
    },

    /// Every strategy in the ladder failed.
    #[error(
        "no building outline found ({}); try toggling invert, or click nearer an interior edge",
        join_reasons(.reasons)
    )]
    AllStrategiesFailed {
        /// One entry per strategy attempted, in ladder order.
        reasons: Vec<(StrategyKind, StrategyFailure)>,
    },
}

fn join_reasons(reasons: &[(StrategyKind, StrategyFailure)]) -> String {
    if reasons.is_empty() {
        return "no strategies configured".to_string();
    }
    reasons
        .iter()
        .map(|(kind, failure)| format!("{kind}: {failure}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<image::ImageError> for DetectError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageUnavailable(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn pixel_point_distance() {
        let a = PixelPoint::new(0.0, 0.0);
        let b = PixelPoint::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn render_size_rejects_non_positive() {
        assert!(matches!(
            RenderSize::new(0.0, 10.0),
            Err(DetectError::InvalidRenderSize { .. })
        ));
        assert!(matches!(
            RenderSize::new(10.0, -1.0),
            Err(DetectError::InvalidRenderSize { .. })
        ));
        assert!(matches!(
            RenderSize::new(f64::NAN, 10.0),
            Err(DetectError::InvalidRenderSize { .. })
        ));
        assert!(RenderSize::new(0.5, 0.5).is_ok());
    }

    #[test]
    fn render_size_pixel_dimensions_round_and_floor_at_one() {
        let size = RenderSize::new(399.6, 0.2).unwrap();
        assert_eq!(size.pixel_dimensions(), (400, 1));
    }

    #[test]
    fn render_size_deserialize_validates() {
        let ok: RenderSize = serde_json::from_str(r#"{"width":400.0,"height":300.0}"#).unwrap();
        assert_eq!(ok, RenderSize::new(400.0, 300.0).unwrap());
        let bad = serde_json::from_str::<RenderSize>(r#"{"width":0.0,"height":300.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn unit_polygon_requires_three_points() {
        let err = UnitPolygon::new(vec![UnitPoint::new(0.1, 0.1), UnitPoint::new(0.2, 0.2)]);
        assert!(matches!(err, Err(DetectError::DegeneratePolygon { points: 2 })));
    }

    #[test]
    fn unit_polygon_rejects_points_outside_unit_square() {
        let err = UnitPolygon::new(vec![
            UnitPoint::new(0.1, 0.1),
            UnitPoint::new(1.2, 0.1),
            UnitPoint::new(0.1, 0.5),
        ]);
        assert!(matches!(err, Err(DetectError::OutsideUnitSquare { .. })));
    }

    #[test]
    fn unit_polygon_centroid_is_vertex_mean() {
        let poly = UnitPolygon::new(vec![
            UnitPoint::new(0.0, 0.0),
            UnitPoint::new(0.6, 0.0),
            UnitPoint::new(0.6, 0.3),
            UnitPoint::new(0.0, 0.3),
        ])
        .unwrap();
        let c = poly.centroid();
        assert!((c.x - 0.3).abs() < 1e-12);
        assert!((c.y - 0.15).abs() < 1e-12);
    }

    #[test]
    fn area_serializes_points_as_pairs() {
        let area = Area {
            id: AreaId(7),
            name: "Building A".to_string(),
            points: UnitPolygon::new(vec![
                UnitPoint::new(0.0, 0.0),
                UnitPoint::new(0.5, 0.0),
                UnitPoint::new(0.5, 0.5),
            ])
            .unwrap(),
            center: None,
        };
        let json = serde_json::to_string(&area).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"name":"Building A","points":[[0.0,0.0],[0.5,0.0],[0.5,0.5]]}"#
        );
        let back: Area = serde_json::from_str(&json).unwrap();
        assert_eq!(back, area);
    }

    #[test]
    fn area_with_two_points_fails_to_deserialize() {
        let json = r#"{"id":1,"name":"x","points":[[0.0,0.0],[0.5,0.5]]}"#;
        assert!(serde_json::from_str::<Area>(json).is_err());
    }

    #[test]
    fn area_label_prefers_explicit_center() {
        let points = UnitPolygon::new(vec![
            UnitPoint::new(0.0, 0.0),
            UnitPoint::new(1.0, 0.0),
            UnitPoint::new(1.0, 1.0),
        ])
        .unwrap();
        let mut area = Area {
            id: AreaId(1),
            name: "Sports".to_string(),
            points,
            center: None,
        };
        let c = area.label_position();
        assert!((c.x - 2.0 / 3.0).abs() < 1e-12);
        area.center = Some(UnitPoint::new(0.9, 0.1));
        assert_eq!(area.label_position(), UnitPoint::new(0.9, 0.1));
    }

    #[test]
    fn detect_config_defaults() {
        let config = DetectConfig::default();
        assert_eq!(config.tolerance_ladder, vec![12, 18, 24, 32]);
        assert_eq!(config.strategies, StrategyKind::LADDER.to_vec());
        assert_eq!(config.adaptive_window, 15);
        assert_eq!(config.adaptive_offset, 2);
        assert!((config.simplify_factor - 0.015).abs() < f64::EPSILON);
        assert!(!config.invert);
    }

    #[test]
    fn detect_config_partial_json_fills_defaults() {
        let config: DetectConfig = serde_json::from_str(r#"{"invert":true}"#).unwrap();
        assert!(config.invert);
        assert_eq!(config.tolerance_ladder, vec![12, 18, 24, 32]);
    }

    #[test]
    fn all_strategies_failed_message_has_guidance() {
        let err = DetectError::AllStrategiesFailed {
            reasons: vec![
                (
                    StrategyKind::RegionGrowth,
                    StrategyFailure::SeedLeaked { tolerance: 32 },
                ),
                (StrategyKind::Edges, StrategyFailure::NoContourFound),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("region growth: region leaked"));
        assert!(msg.contains("edges: no closed contour"));
        assert!(msg.contains("try toggling invert"));
    }
}
