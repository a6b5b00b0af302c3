use std::path::PathBuf;

use crate::spline::SplineMode;
use crate::writer::SegmentFormat;

/// Shape of the generated exponential ramp. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RampConfig {
    pub total_time: f64,
    pub time_res: f64,
    pub final_value: f64,
    pub amplitude: f64,
}

impl Default for RampConfig {
    fn default() -> Self {
        RampConfig { total_time: 10.0, time_res: 0.02, final_value: 10.0, amplitude: 1.0 }
    }
}

/// Channel identification and layout of the emitted rows.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub channel: u32,
    /// Added to `channel` in the `wvfcdef` header of [SegmentFormat::FullCubic].
    pub channel_offset: u32,
    pub waveform_name: String,
    pub branch: u32,
    pub time_scale: f64,
    pub format: SegmentFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            channel: 0,
            channel_offset: 0,
            waveform_name: "null".to_string(),
            branch: 0,
            time_scale: 1.0,
            format: SegmentFormat::Simple,
        }
    }
}

/// Every constant of one generate, fit and write run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub ramp: RampConfig,
    pub knot_stride: usize,
    pub mode: SplineMode,
    pub output: OutputConfig,
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            ramp: RampConfig::default(),
            knot_stride: 20,
            mode: SplineMode::Linear,
            output: OutputConfig::default(),
            output_path: PathBuf::from("exp1.dat"),
        }
    }
}
