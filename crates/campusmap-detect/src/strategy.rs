//! Segmentation strategies and the ladder they are tried in.
//!
//! This module defines the [`Segmenter`] trait shared by every
//! segmentation approach and the [`StrategyKind`] enum used to select
//! and order them at runtime.
//!
//! # Strategy pattern
//!
//! Each strategy turns a luminance buffer plus a seed point into a dense
//! closed contour around the seed, or explains why it could not. The
//! orchestrator walks an ordered list of kinds and stops at the first
//! contour that survives simplification and still encloses the seed.

use std::fmt;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::types::{DetectConfig, PixelPoint, PixelPolygon, StrategyFailure};

/// Selects a segmentation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Tolerance flood fill from the seed, escalating through
    /// [`DetectConfig::tolerance_ladder`].
    ///
    /// Best for filled building silhouettes on a contrasting base.
    RegionGrowth,

    /// Gradient-magnitude edges with hysteresis, dilated and traced.
    ///
    /// Handles outlined buildings whose fill matches the background.
    Edges,

    /// Local-mean adaptive threshold, closed and traced.
    ///
    /// Last resort for faint or uneven line work.
    AdaptiveThreshold,
}

impl StrategyKind {
    /// The default fallback order.
    pub const LADDER: [Self; 3] = [Self::RegionGrowth, Self::Edges, Self::AdaptiveThreshold];
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegionGrowth => f.write_str("region growth"),
            Self::Edges => f.write_str("edges"),
            Self::AdaptiveThreshold => f.write_str("adaptive threshold"),
        }
    }
}

/// A dense contour produced by one strategy, before simplification.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Closed ring in buffer pixel coordinates.
    pub contour: PixelPolygon,
    /// Flood-fill tolerance that produced the contour, for region growth.
    pub tolerance: Option<u8>,
}

/// Trait for segmentation strategies.
///
/// Input: a luminance buffer and a seed in buffer pixel coordinates.
/// Output: a closed contour enclosing the seed, or the reason there is
/// none.
pub trait Segmenter {
    /// Try to recover the outline around `seed`.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyFailure`] describing why no outline was found.
    fn attempt(
        &self,
        buf: &GrayImage,
        seed: PixelPoint,
        config: &DetectConfig,
    ) -> Result<Candidate, StrategyFailure>;
}

impl Segmenter for StrategyKind {
    fn attempt(
        &self,
        buf: &GrayImage,
        seed: PixelPoint,
        config: &DetectConfig,
    ) -> Result<Candidate, StrategyFailure> {
        match *self {
            Self::RegionGrowth => {
                crate::region::grow_with_ladder(buf, seed, &config.tolerance_ladder).map(
                    |(contour, tolerance)| Candidate {
                        contour,
                        tolerance: Some(tolerance),
                    },
                )
            }
            Self::Edges => {
                seed_pixel(buf, seed)?;
                let edge_map =
                    crate::edge::edges(buf, config.edge_blur_sigma, config.edge_high_threshold);
                crate::edge::contours(&edge_map, seed).map(|contour| Candidate {
                    contour,
                    tolerance: None,
                })
            }
            Self::AdaptiveThreshold => {
                seed_pixel(buf, seed)?;
                let mask = crate::adaptive::threshold(
                    buf,
                    config.adaptive_window,
                    config.adaptive_offset,
                    config.invert,
                );
                crate::adaptive::contours(&mask, seed).map(|contour| Candidate {
                    contour,
                    tolerance: None,
                })
            }
        }
    }
}

/// The buffer pixel under `seed`.
///
/// # Errors
///
/// Returns [`StrategyFailure::SeedOutOfBounds`] if `seed` falls outside
/// the buffer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn seed_pixel(buf: &GrayImage, seed: PixelPoint) -> Result<(u32, u32), StrategyFailure> {
    let in_range = |v: f64, len: u32| v.is_finite() && v >= 0.0 && v < f64::from(len);
    if in_range(seed.x, buf.width()) && in_range(seed.y, buf.height()) {
        Ok((seed.x.floor() as u32, seed.y.floor() as u32))
    } else {
        Err(StrategyFailure::SeedOutOfBounds)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ladder_order() {
        assert_eq!(
            StrategyKind::LADDER,
            [
                StrategyKind::RegionGrowth,
                StrategyKind::Edges,
                StrategyKind::AdaptiveThreshold,
            ]
        );
    }

    #[test]
    fn kinds_serialize_snake_case() {
        let json = serde_json::to_string(&StrategyKind::AdaptiveThreshold).unwrap();
        assert_eq!(json, r#""adaptive_threshold""#);
        let back: StrategyKind = serde_json::from_str(r#""region_growth""#).unwrap();
        assert_eq!(back, StrategyKind::RegionGrowth);
    }

    #[test]
    fn seed_pixel_floors_and_bounds_checks() {
        let buf = GrayImage::new(10, 5);
        assert_eq!(seed_pixel(&buf, PixelPoint::new(3.7, 4.99)), Ok((3, 4)));
        assert_eq!(
            seed_pixel(&buf, PixelPoint::new(10.0, 1.0)),
            Err(StrategyFailure::SeedOutOfBounds)
        );
        assert_eq!(
            seed_pixel(&buf, PixelPoint::new(-0.1, 1.0)),
            Err(StrategyFailure::SeedOutOfBounds)
        );
    }

    #[test]
    fn every_strategy_rejects_out_of_bounds_seed() {
        let buf = GrayImage::from_pixel(20, 20, image::Luma([255]));
        let config = DetectConfig::default();
        for kind in StrategyKind::LADDER {
            let result = kind.attempt(&buf, PixelPoint::new(25.0, 5.0), &config);
            assert_eq!(result, Err(StrategyFailure::SeedOutOfBounds), "{kind}");
        }
    }
}
