//! Detection diagnostics: timing and outcome of every strategy attempt.
//!
//! Every call to [`Detector::detect`](crate::Detector::detect) collects
//! diagnostics alongside its result, so the CLI can show why a click fell
//! through to a later strategy.
//!
//! Timestamps are captured with the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::detect::DetectionState;
use crate::strategy::StrategyKind;
use crate::types::StrategyFailure;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom("duration seconds must be finite and non-negative")
        })
    }
}

/// Diagnostics collected from a single detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionDiagnostics {
    /// Time spent rasterizing the map image. Zero when the caller supplied
    /// a buffer directly.
    #[serde(with = "duration_serde")]
    pub sampling: Duration,
    /// Width of the luminance buffer.
    pub buffer_width: u32,
    /// Height of the luminance buffer.
    pub buffer_height: u32,
    /// One entry per strategy run, in order.
    pub attempts: Vec<StrategyAttempt>,
    /// States the detection passed through, ending in `Found`.
    #[serde(default)]
    pub states: Vec<DetectionState>,
    /// Wall-clock duration of the whole detection.
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Timing and result of one strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAttempt {
    /// Which strategy ran.
    pub strategy: StrategyKind,
    /// Time spent in the strategy, including simplification.
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// What it produced.
    pub outcome: AttemptOutcome,
}

/// Result of a strategy attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The strategy produced an outline that passed every check.
    Accepted {
        /// Region-growing tolerance, if applicable.
        tolerance: Option<u8>,
        /// Vertices in the traced contour.
        raw_points: usize,
        /// Vertices after simplification.
        simplified_points: usize,
    },
    /// The strategy failed; the next one was tried.
    Rejected {
        /// Why.
        failure: StrategyFailure,
    },
}

impl DetectionDiagnostics {
    /// The strategy whose outline was accepted, if any.
    #[must_use]
    pub fn accepted_strategy(&self) -> Option<StrategyKind> {
        self.attempts
            .iter()
            .find(|a| matches!(a.outcome, AttemptOutcome::Accepted { .. }))
            .map(|a| a.strategy)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Detection Diagnostics\n{}", "=".repeat(60)));
        lines.push(format!(
            "Buffer: {}x{}  |  Sampling: {:.3}ms  |  Total: {:.3}ms",
            self.buffer_width,
            self.buffer_height,
            duration_ms(self.sampling),
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());
        lines.push(format!("{:<20} {:>10}  {}", "Strategy", "Duration", "Outcome"));
        lines.push("-".repeat(60));

        for attempt in &self.attempts {
            let name = attempt.strategy.to_string();
            let ms = duration_ms(attempt.duration);
            let outcome = match &attempt.outcome {
                AttemptOutcome::Accepted {
                    tolerance,
                    raw_points,
                    simplified_points,
                } => {
                    let tol = tolerance.map_or_else(String::new, |t| format!(" tol={t}"));
                    format!("accepted{tol} {raw_points}->{simplified_points} pts")
                }
                AttemptOutcome::Rejected { failure } => format!("rejected: {failure}"),
            };
            lines.push(format!("{name:<20} {ms:>8.3}ms  {outcome}"));
        }

        if !self.states.is_empty() {
            let path: Vec<String> = self.states.iter().map(|s| format!("{s:?}")).collect();
            lines.push(String::new());
            lines.push(format!("Path: {}", path.join(" -> ")));
        }

        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
