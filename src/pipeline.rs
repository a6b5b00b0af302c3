use std::fs::File;
use std::io::{self, BufWriter, Write};

use thiserror::Error;

use crate::config::{OutputConfig, PipelineConfig};
use crate::interpolate::{interpolate_waveform, FitReporter, InterpolationError};
use crate::spline::SplineMode;
use crate::waveform::{exponential_ramp, SampleSequence, WaveformError};
use crate::writer::{SegmentWriter, WriteError};

/// Fits `samples` and writes the segments to `out`, returning the number of rows written.
pub fn fit_and_write<W: Write>(
    samples: &SampleSequence,
    knot_stride: usize,
    mode: SplineMode,
    output: &OutputConfig,
    out: &mut W,
    reporter: Option<&dyn FitReporter>,
) -> Result<usize, PipelineError> {
    let interpolation = interpolate_waveform(samples, knot_stride, mode)?;
    if let Some(reporter) = reporter {
        reporter.report(samples, &interpolation);
    }

    let rows = SegmentWriter::new(output).write_interpolation(&interpolation, out)?;
    Ok(rows)
}

/// Generates the configured ramp, fits it and writes the segments to `out`.
pub fn run_pipeline<W: Write>(
    config: &PipelineConfig,
    out: &mut W,
    reporter: Option<&dyn FitReporter>,
) -> Result<usize, PipelineError> {
    let samples = exponential_ramp(&config.ramp)?;
    fit_and_write(&samples, config.knot_stride, config.mode, &config.output, out, reporter)
}

/// Runs [run_pipeline] into `config.output_path`, creating or truncating the file.
///
/// The rows are rendered in memory first, so a failed fit leaves an existing file untouched.
pub fn write_waveform_file(config: &PipelineConfig, reporter: Option<&dyn FitReporter>) -> Result<usize, PipelineError> {
    let mut buffer: Vec<u8> = Vec::new();
    let rows = run_pipeline(config, &mut buffer, reporter)?;

    let mut out = BufWriter::new(File::create(&config.output_path)?);
    out.write_all(&buffer)?;
    out.flush()?;

    log::info!("wrote {} rows to {}", rows, config.output_path.display());
    Ok(rows)
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid waveform: {0}")]
    Waveform(#[from] WaveformError),

    #[error("interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        PipelineError::Write(WriteError::Io(err))
    }
}
