//! campusmap-detect: click-to-outline building detection (sans-IO).
//!
//! Turns a single click on a raster campus map into a building outline:
//! sample the map at its rendered size -> try region growing, edges,
//! and adaptive threshold in turn -> simplify -> normalize to unit space.
//!
//! This crate has **no I/O dependencies**. Images arrive through the
//! [`RasterSource`] trait and outlines leave through the [`AreaStore`]
//! trait; file and terminal handling live in `campusmap-cli`.

pub mod adaptive;
pub mod contour;
pub mod detect;
pub mod diagnostics;
pub mod edge;
pub mod geometry;
pub mod normalize;
pub mod region;
pub mod render;
pub mod sampler;
pub mod simplify;
pub mod snap;
pub mod store;
pub mod strategy;
pub mod types;

pub use detect::{Detection, DetectionState, Detector};
pub use diagnostics::DetectionDiagnostics;
pub use render::{RenderedArea, denormalize_all};
pub use sampler::{EncodedImage, PendingImage, RasterSource};
pub use snap::{GradientField, SnapTrace};
pub use store::{AreaStore, InMemoryAreaStore, StoreError};
pub use strategy::{Segmenter, StrategyKind};
pub use types::{
    Area, AreaId, DetectConfig, DetectError, PixelPoint, PixelPolygon, RenderSize,
    StrategyFailure, UnitPoint, UnitPolygon,
};

/// Detect the building under `click` with the default configuration.
///
/// Shorthand for `Detector::default().detect(source, size, click)`.
///
/// # Errors
///
/// See [`Detector::detect`].
pub fn detect<S>(source: &S, size: RenderSize, click: PixelPoint) -> Result<Detection, DetectError>
where
    S: RasterSource + ?Sized,
{
    Detector::default().detect(source, size, click)
}
