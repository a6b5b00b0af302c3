use thiserror::Error;

use crate::waveform::SampleSequence;

/// Knot represents a sample chosen to anchor the fitted spline.
/// - `time` - abscissa,
/// - `voltage` - value the spline passes through at `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knot {
    time: f64,
    voltage: f64,
}

impl Knot {
    pub fn new(time: f64, voltage: f64) -> Self {
        Knot { time, voltage }
    }

    pub fn get_time(&self) -> f64 {
        self.time
    }

    pub fn get_voltage(&self) -> f64 {
        self.voltage
    }
}

/// Strided subsequence of a [SampleSequence] whose last knot is always the last sample.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotSequence {
    times: Vec<f64>,
    voltages: Vec<f64>,
}

impl KnotSequence {
    /// Takes every `stride`-th sample starting at index 0. When the stride does not land on
    /// the final sample, the final sample is appended so the knots cover the full time range.
    /// # Example
    /// ```
    /// use dac_spline::{KnotSequence, SampleSequence};
    ///
    /// let samples = SampleSequence::new(
    ///     vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    ///     vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
    /// ).unwrap();
    /// let knots = KnotSequence::subsample(&samples, 2).unwrap();
    ///
    /// assert_eq!(knots.times(), &[0.0, 2.0, 4.0, 5.0]);
    /// ```
    /// # Errors
    /// Error is returned when `stride` is 0.
    pub fn subsample(samples: &SampleSequence, stride: usize) -> Result<Self, KnotError> {
        if stride == 0 {
            return Err(KnotError::ZeroStride);
        }

        let mut times: Vec<f64> = samples.times().iter().step_by(stride).copied().collect();
        let mut voltages: Vec<f64> = samples.voltages().iter().step_by(stride).copied().collect();

        let (last_time, last_voltage) = samples.last();
        if times[times.len() - 1] != last_time {
            times.push(last_time);
            voltages.push(last_voltage);
        }

        log::debug!("extracted {} knots from {} samples with stride {}", times.len(), samples.len(), stride);

        Ok(KnotSequence { times, voltages })
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

    pub fn iter(&self) -> impl Iterator<Item = Knot> + '_ {
        self.times.iter().zip(self.voltages.iter()).map(|(t, v)| Knot::new(*t, *v))
    }

    pub(crate) fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.times, self.voltages)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum KnotError {
    #[error("knot stride must be at least 1")]
    ZeroStride,
}
