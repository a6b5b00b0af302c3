//! Piecewise-polynomial approximation of voltage waveforms for a DAC sequencer.
//!
//! A dense voltage curve is subsampled into knots, a B-spline of degree 1 to 3 is fitted through
//! them and every segment between two knots is written as one text row.
//!
//! # Example
//! ```
//! use dac_spline::{fit_and_write, OutputConfig, SampleSequence, SplineMode};
//!
//! let samples = SampleSequence::new(
//!     vec![0.0, 1.0, 2.0, 3.0, 4.0],
//!     vec![1.0, 2.0, 4.0, 8.0, 16.0],
//! ).unwrap();
//! let mut out = Vec::new();
//! fit_and_write(&samples, 2, SplineMode::Linear, &OutputConfig::default(), &mut out, None).unwrap();
//!
//! assert_eq!(String::from_utf8(out).unwrap(), "2.0000 1.0000 4.0000\n4.0000 4.0000 16.0000\n");
//! ```

mod config;
mod interpolate;
mod knot;
mod pipeline;
mod polynomial;
mod reader;
mod spline;
mod waveform;
mod writer;

pub use config::{OutputConfig, PipelineConfig, RampConfig};
pub use interpolate::{interpolate_waveform, FitReporter, Interpolation, InterpolationError, LogReporter};
pub use knot::{Knot, KnotError, KnotSequence};
pub use pipeline::{fit_and_write, run_pipeline, write_waveform_file, PipelineError};
pub use polynomial::SegmentPolynomial;
pub use reader::{read_segments, ReadError};
pub use spline::{BSpline, SplineError, SplineMode};
pub use waveform::{exponential_ramp, time_grid, SampleSequence, WaveformError, MAX_GRID_POINTS};
pub use writer::{SegmentFormat, SegmentRow, SegmentWriter, WriteError};
