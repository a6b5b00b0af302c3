use thiserror::Error;

use crate::knot::{KnotError, KnotSequence};
use crate::spline::{BSpline, SplineError, SplineMode};
use crate::waveform::{time_grid, SampleSequence, WaveformError};

/// Result of fitting a spline through the knots of a sampled waveform.
///
/// `derivatives[j][i]` is the `(j + 1)`-th derivative of the spline at `knot_times[i]`;
/// there is one array per spline degree.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    knot_times: Vec<f64>,
    knot_voltages: Vec<f64>,
    derivatives: Vec<Vec<f64>>,
    spline: BSpline,
}

impl Interpolation {
    pub fn knot_times(&self) -> &[f64] {
        &self.knot_times
    }

    pub fn knot_voltages(&self) -> &[f64] {
        &self.knot_voltages
    }

    pub fn derivatives(&self) -> &[Vec<f64>] {
        &self.derivatives
    }

    pub fn spline(&self) -> &BSpline {
        &self.spline
    }

    pub fn segment_count(&self) -> usize {
        self.knot_times.len().saturating_sub(1)
    }
}

/// Subsamples `samples` every `stride` points, fits a spline of degree `mode` through the
/// knots and evaluates derivatives 1 through `mode` at every knot.
///
/// Every knot is returned, including the first and the last.
/// # Example
/// ```
/// use dac_spline::{interpolate_waveform, SampleSequence, SplineMode};
/// use assert_approx_eq::assert_approx_eq;
///
/// let samples = SampleSequence::new(
///     vec![0.0, 1.0, 2.0, 3.0, 4.0],
///     vec![1.0, 2.0, 4.0, 8.0, 16.0],
/// ).unwrap();
/// let interpolation = interpolate_waveform(&samples, 2, SplineMode::Linear).unwrap();
///
/// assert_eq!(interpolation.knot_times(), &[0.0, 2.0, 4.0]);
/// assert_approx_eq!(1.5, interpolation.derivatives()[0][0], 1e-12);
/// ```
pub fn interpolate_waveform(
    samples: &SampleSequence,
    stride: usize,
    mode: SplineMode,
) -> Result<Interpolation, InterpolationError> {
    let knots = KnotSequence::subsample(samples, stride)?;
    let spline = BSpline::interpolate(knots.times(), knots.voltages(), mode)?;

    let derivatives: Vec<Vec<f64>> = (1..=mode.degree())
        .map(|order| spline.batch_evaluate_derivative(knots.times(), order))
        .collect();

    log::info!(
        "fitted degree {} spline through {} knots ({} segments)",
        mode.degree(),
        knots.len(),
        knots.len() - 1
    );

    let (knot_times, knot_voltages) = knots.into_parts();
    Ok(Interpolation { knot_times, knot_voltages, derivatives, spline })
}

/// Optional diagnostic hook invoked by the caller after a fit.
pub trait FitReporter {
    fn report(&self, samples: &SampleSequence, interpolation: &Interpolation);
}

/// Reports the fit through the `log` facade: the spline resampled on a regular grid and the
/// largest deviation from the raw samples.
pub struct LogReporter {
    resolution: f64,
}

impl LogReporter {
    /// Fails with [WaveformError::InvalidStep] unless `resolution` is positive and finite.
    pub fn new(resolution: f64) -> Result<Self, WaveformError> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(WaveformError::InvalidStep(resolution));
        }
        Ok(LogReporter { resolution })
    }

    /// Fitted curve on `[samples[1], samples[last])` every `resolution` time units.
    pub fn resampled_curve(&self, samples: &SampleSequence, interpolation: &Interpolation) -> Vec<(f64, f64)> {
        let times = samples.times();
        if times.len() < 2 {
            return Vec::new();
        }

        let grid = match time_grid(times[1], times[times.len() - 1], self.resolution) {
            Ok(grid) => grid,
            Err(err) => {
                log::warn!("skipping resampled fit curve: {}", err);
                return Vec::new();
            }
        };
        let values = interpolation.spline().batch_evaluate(&grid);
        grid.into_iter().zip(values).collect()
    }

    pub fn max_deviation(&self, samples: &SampleSequence, interpolation: &Interpolation) -> f64 {
        interpolation
            .spline()
            .batch_evaluate(samples.times())
            .iter()
            .zip(samples.voltages())
            .map(|(fitted, raw)| (fitted - raw).abs())
            .fold(0.0, f64::max)
    }
}

impl Default for LogReporter {
    fn default() -> Self {
        LogReporter { resolution: 0.1 }
    }
}

impl FitReporter for LogReporter {
    fn report(&self, samples: &SampleSequence, interpolation: &Interpolation) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }

        for (time, voltage) in self.resampled_curve(samples, interpolation) {
            log::trace!("fit {:.4} {:.4}", time, voltage);
        }
        log::debug!(
            "fit over {} samples, max deviation {:.6}",
            samples.len(),
            self.max_deviation(samples, interpolation)
        );
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InterpolationError {
    #[error(transparent)]
    Knot(#[from] KnotError),

    #[error(transparent)]
    Spline(#[from] SplineError),
}
