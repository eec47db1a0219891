//! The detection orchestrator: one click in, one outline (or a reason)
//! out.
//!
//! ```text
//! Idle → Sampling → TryingRegionGrowth → TryingEdges → TryingAdaptive → Found | Failed
//! ```
//!
//! Each `Trying*` state runs one [`Segmenter`]. A candidate is accepted
//! only if it simplifies to at least three vertices and the simplified
//! ring still contains the click; otherwise the next strategy runs.
//! [`Detector`] holds nothing but its configuration, so every call starts
//! from `Idle`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::diagnostics::{AttemptOutcome, DetectionDiagnostics, StrategyAttempt};
use crate::geometry;
use crate::normalize::normalize_polygon;
use crate::sampler::{RasterSource, sample};
use crate::simplify::simplify;
use crate::strategy::{Segmenter, StrategyKind};
use crate::types::{
    DetectConfig, DetectError, GrayImage, PixelPoint, PixelPolygon, RenderSize, StrategyFailure,
    UnitPolygon,
};

/// Where a detection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionState {
    /// No detection in progress.
    Idle,
    /// Rasterizing the map image.
    Sampling,
    /// Running the region-growing strategy.
    TryingRegionGrowth,
    /// Running the edge strategy.
    TryingEdges,
    /// Running the adaptive-threshold strategy.
    TryingAdaptive,
    /// An outline was accepted.
    Found,
    /// Every strategy failed.
    Failed,
}

impl DetectionState {
    /// The `Trying*` state for a strategy.
    #[must_use]
    pub const fn trying(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::RegionGrowth => Self::TryingRegionGrowth,
            StrategyKind::Edges => Self::TryingEdges,
            StrategyKind::AdaptiveThreshold => Self::TryingAdaptive,
        }
    }
}

/// An accepted outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Strategy that produced the outline.
    pub strategy: StrategyKind,
    /// Region-growing tolerance, when `strategy` is region growth.
    pub tolerance: Option<u8>,
    /// Simplified outline in render-space pixels.
    pub pixel_polygon: PixelPolygon,
    /// The same outline in unit space, ready to store.
    pub unit_polygon: UnitPolygon,
    /// Render size the click and outline refer to.
    pub render_size: RenderSize,
    /// Timing and per-strategy outcomes.
    pub diagnostics: DetectionDiagnostics,
}

/// Runs the strategy ladder for single clicks.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: DetectConfig,
}

impl Detector {
    /// Create a detector with the given configuration.
    #[must_use]
    pub const fn new(config: DetectConfig) -> Self {
        Self { config }
    }

    /// The configuration this detector runs with.
    #[must_use]
    pub const fn config(&self) -> &DetectConfig {
        &self.config
    }

    /// Sample `source` at `size` and detect the outline under `click`.
    ///
    /// `click` is in render-space pixels, relative to the top-left of the
    /// rendered image.
    ///
    /// # Errors
    ///
    /// - [`DetectError::ImageUnavailable`] if the image cannot be read.
    /// - [`DetectError::AllStrategiesFailed`] if no strategy produced an
    ///   acceptable outline.
    pub fn detect<S>(
        &self,
        source: &S,
        size: RenderSize,
        click: PixelPoint,
    ) -> Result<Detection, DetectError>
    where
        S: RasterSource + ?Sized,
    {
        let start = Instant::now();
        tracing::debug!(%size, x = click.x, y = click.y, "sampling map image");
        let buf = sample(source, size)?;

        let run = Run {
            start,
            sampling: start.elapsed(),
            states: vec![DetectionState::Idle, DetectionState::Sampling],
        };
        self.run(&buf, size, click, run)
    }

    /// Detect the outline under `click` in an already sampled buffer.
    ///
    /// `buf` is normally the output of [`sample`] at `size`; if its
    /// dimensions differ, the click and the outline are scaled between
    /// the two.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::AllStrategiesFailed`] if no strategy
    /// produced an acceptable outline, or
    /// [`DetectError::ImageUnavailable`] for an empty buffer.
    pub fn detect_in_buffer(
        &self,
        buf: &GrayImage,
        size: RenderSize,
        click: PixelPoint,
    ) -> Result<Detection, DetectError> {
        let run = Run {
            start: Instant::now(),
            sampling: Duration::ZERO,
            states: vec![DetectionState::Idle],
        };
        self.run(buf, size, click, run)
    }

    fn run(
        &self,
        buf: &GrayImage,
        size: RenderSize,
        click: PixelPoint,
        mut run: Run,
    ) -> Result<Detection, DetectError> {
        if buf.width() == 0 || buf.height() == 0 {
            return Err(DetectError::ImageUnavailable(
                "luminance buffer is empty".to_string(),
            ));
        }

        let scale = BufferScale::new(buf, size);
        let seed = scale.to_buffer(click);
        let mut diagnostics = DetectionDiagnostics {
            sampling: run.sampling,
            buffer_width: buf.width(),
            buffer_height: buf.height(),
            ..DetectionDiagnostics::default()
        };
        let mut reasons = Vec::new();

        for &kind in &self.config.strategies {
            run.states.push(DetectionState::trying(kind));
            let attempt_start = Instant::now();
            let result = self.attempt(kind, buf, seed);
            let duration = attempt_start.elapsed();

            match result {
                Ok((candidate_points, tolerance, simplified)) => {
                    diagnostics.attempts.push(StrategyAttempt {
                        strategy: kind,
                        duration,
                        outcome: AttemptOutcome::Accepted {
                            tolerance,
                            raw_points: candidate_points,
                            simplified_points: simplified.len(),
                        },
                    });

                    let pixel_polygon = scale.to_render(&simplified);
                    let unit_polygon = normalize_polygon(&pixel_polygon, size)?;
                    run.states.push(DetectionState::Found);
                    diagnostics.states = run.states;
                    diagnostics.total_duration = run.start.elapsed();

                    tracing::info!(
                        strategy = %kind,
                        ?tolerance,
                        vertices = pixel_polygon.len(),
                        "building outline found",
                    );
                    return Ok(Detection {
                        strategy: kind,
                        tolerance,
                        pixel_polygon,
                        unit_polygon,
                        render_size: size,
                        diagnostics,
                    });
                }
                Err(failure) => {
                    tracing::debug!(strategy = %kind, %failure, "strategy failed");
                    diagnostics.attempts.push(StrategyAttempt {
                        strategy: kind,
                        duration,
                        outcome: AttemptOutcome::Rejected {
                            failure: failure.clone(),
                        },
                    });
                    reasons.push((kind, failure));
                }
            }
        }

        run.states.push(DetectionState::Failed);
        tracing::info!(
            path = ?run.states,
            elapsed_ms = run.start.elapsed().as_secs_f64() * 1000.0,
            "no building outline found",
        );
        Err(DetectError::AllStrategiesFailed { reasons })
    }

    /// Run one strategy and validate its candidate.
    ///
    /// Returns the raw contour length, the tolerance, and the simplified
    /// ring in buffer coordinates.
    fn attempt(
        &self,
        kind: StrategyKind,
        buf: &GrayImage,
        seed: PixelPoint,
    ) -> Result<(usize, Option<u8>, PixelPolygon), StrategyFailure> {
        let candidate = kind.attempt(buf, seed, &self.config)?;
        let simplified = simplify(&candidate.contour, self.config.simplify_factor)?;
        if !geometry::contains(simplified.points(), seed) {
            return Err(StrategyFailure::NoContourFound);
        }
        Ok((candidate.contour.len(), candidate.tolerance, simplified))
    }
}

/// Bookkeeping carried from sampling into the strategy ladder.
struct Run {
    start: Instant,
    sampling: Duration,
    states: Vec<DetectionState>,
}

/// Maps between render-space pixels and luminance-buffer pixels.
#[derive(Debug, Clone, Copy)]
struct BufferScale {
    sx: f64,
    sy: f64,
    size: RenderSize,
}

impl BufferScale {
    fn new(buf: &GrayImage, size: RenderSize) -> Self {
        Self {
            sx: f64::from(buf.width()) / size.width(),
            sy: f64::from(buf.height()) / size.height(),
            size,
        }
    }

    fn to_buffer(self, p: PixelPoint) -> PixelPoint {
        PixelPoint::new(p.x * self.sx, p.y * self.sy)
    }

    /// Scale a ring back to render space, clamped to the rendered image.
    fn to_render(self, ring: &PixelPolygon) -> PixelPolygon {
        PixelPolygon::new(
            ring.points()
                .iter()
                .map(|p| {
                    PixelPoint::new(
                        (p.x / self.sx).clamp(0.0, self.size.width()),
                        (p.y / self.sy).clamp(0.0, self.size.height()),
                    )
                })
                .collect(),
        )
    }
}
