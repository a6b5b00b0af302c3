use thiserror::Error;

use crate::config::RampConfig;

/// Dense, ordered set of (time, voltage) samples.
/// Times are strictly increasing and every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSequence {
    times: Vec<f64>,
    voltages: Vec<f64>,
}

impl SampleSequence {
    /// Creates [SampleSequence] from equally long time and voltage vectors.
    /// # Example
    /// ```
    /// use dac_spline::SampleSequence;
    ///
    /// let samples = SampleSequence::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 4.0]);
    /// assert!(samples.is_ok());
    ///
    /// let unordered = SampleSequence::new(vec![0.0, 2.0, 1.0], vec![1.0, 2.0, 4.0]);
    /// assert!(unordered.is_err());
    /// ```
    /// # Errors
    /// Error is returned when lengths differ, the sequence is empty, a value is not finite
    /// or times are not strictly increasing.
    pub fn new(times: Vec<f64>, voltages: Vec<f64>) -> Result<Self, WaveformError> {
        if times.len() != voltages.len() {
            return Err(WaveformError::LengthMismatch { times: times.len(), voltages: voltages.len() });
        }
        if times.is_empty() {
            return Err(WaveformError::Empty);
        }
        if let Some(index) = times.iter().chain(voltages.iter()).position(|v| !v.is_finite()) {
            return Err(WaveformError::NonFinite(index % times.len()));
        }
        if let Some(index) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(WaveformError::NotIncreasing(index + 1));
        }

        Ok(SampleSequence { times, voltages })
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn voltages(&self) -> &[f64] {
        &self.voltages
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn last(&self) -> (f64, f64) {
        let last = self.times.len() - 1;
        (self.times[last], self.voltages[last])
    }
}

/// Upper bound on the length of a generated time grid.
pub const MAX_GRID_POINTS: usize = 1 << 26;

/// Evenly spaced values on the half-open interval `[start, stop)`.
///
/// The point count is `ceil((stop - start) / step)` and every value is computed as
/// `start + i * step`, so no rounding error accumulates along the grid.
pub fn time_grid(start: f64, stop: f64, step: f64) -> Result<Vec<f64>, WaveformError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(WaveformError::InvalidStep(step));
    }
    if !(start.is_finite() && stop.is_finite()) || stop <= start {
        return Err(WaveformError::EmptyRange(start, stop));
    }

    let count = ((stop - start) / step).ceil();
    if !(count <= MAX_GRID_POINTS as f64) {
        return Err(WaveformError::TooManyPoints(count));
    }
    let count = count as usize;
    Ok((0..count).map(|i| start + i as f64 * step).collect())
}

/// Exponential ramp from `amplitude^2` at `t = 0` to `amplitude^2 * final_value`
/// at `t = total_time`.
pub fn exponential_ramp(config: &RampConfig) -> Result<SampleSequence, WaveformError> {
    if !(config.total_time.is_finite() && config.total_time > 0.0) {
        return Err(WaveformError::InvalidParameter("total_time must be positive"));
    }
    if !(config.final_value.is_finite() && config.final_value > 0.0) {
        return Err(WaveformError::InvalidParameter("final_value must be positive"));
    }

    let times = time_grid(0.0, config.total_time + config.time_res, config.time_res)?;
    let time_factor = config.final_value.ln() / config.total_time;
    let voltages = times
        .iter()
        .map(|t| config.amplitude * (config.amplitude * (t * time_factor).exp()))
        .collect();

    log::debug!(
        "generated {} samples of exponential ramp, time factor {:.6}",
        times.len(),
        time_factor
    );

    SampleSequence::new(times, voltages)
}

#[derive(Debug, Error, PartialEq)]
pub enum WaveformError {
    #[error("times and voltages differ in length: {times} != {voltages}")]
    LengthMismatch { times: usize, voltages: usize },

    #[error("sample sequence is empty")]
    Empty,

    #[error("sample {0} is not a finite number")]
    NonFinite(usize),

    #[error("times are not strictly increasing at index {0}")]
    NotIncreasing(usize),

    #[error("time step must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("time grid would hold {0} points, more than {max}", max = MAX_GRID_POINTS)]
    TooManyPoints(f64),

    #[error("time range [{0}, {1}) is empty")]
    EmptyRange(f64, f64),

    #[error("invalid ramp parameter: {0}")]
    InvalidParameter(&'static str),
}
