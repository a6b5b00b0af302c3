use std::io::{self, Write};

use thiserror::Error;

use crate::config::OutputConfig;
use crate::interpolate::Interpolation;
use crate::polynomial::SegmentPolynomial;

/// Layout of the per-segment rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentFormat {
    /// `end_time start_voltage end_voltage`, space separated, no header or trailer.
    #[default]
    Simple,
    /// `wvfcdef(...)` header, five tab separated fields per row ending in `;`, `wvfend` trailer.
    FullCubic,
}

/// One emitted row of [SegmentFormat::Simple].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentRow {
    pub end_time: f64,
    pub start_voltage: f64,
    pub end_voltage: f64,
}

/// Writes the segments of one waveform channel.
pub struct SegmentWriter<'a> {
    config: &'a OutputConfig,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(config: &'a OutputConfig) -> Self {
        SegmentWriter { config }
    }

    pub fn write_interpolation<W: Write>(&self, interpolation: &Interpolation, out: &mut W) -> Result<usize, WriteError> {
        self.write(interpolation.knot_times(), interpolation.knot_voltages(), interpolation.derivatives(), out)
    }

    /// Appends one row per segment between consecutive knots and returns the number of rows.
    ///
    /// `derivatives[j]` holds the `(j + 1)`-th derivative at every knot. Orders that are not
    /// given are taken as 0.
    /// # Errors
    /// Error is returned for fewer than 2 knots, inconsistent lengths, no first derivative,
    /// or when writing to `out` fails.
    pub fn write<W: Write>(
        &self,
        times: &[f64],
        voltages: &[f64],
        derivatives: &[Vec<f64>],
        out: &mut W,
    ) -> Result<usize, WriteError> {
        if times.len() < 2 {
            return Err(WriteError::TooFewKnots(times.len()));
        }
        if voltages.len() != times.len() {
            return Err(WriteError::LengthMismatch { what: "voltages", expected: times.len(), found: voltages.len() });
        }
        if derivatives.is_empty() {
            return Err(WriteError::MissingDerivatives);
        }
        if let Some(array) = derivatives.iter().find(|d| d.len() != times.len()) {
            return Err(WriteError::LengthMismatch { what: "derivatives", expected: times.len(), found: array.len() });
        }

        let durations: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();

        match self.config.format {
            SegmentFormat::Simple => self.write_simple(times, voltages, derivatives, &durations, out)?,
            SegmentFormat::FullCubic => self.write_full_cubic(times, voltages, derivatives, &durations, out)?,
        }

        log::debug!(
            "wrote {} segments for channel {} ({:?})",
            durations.len(),
            self.config.channel,
            self.config.format
        );
        Ok(durations.len())
    }

    fn simple_rows(&self, times: &[f64], voltages: &[f64], derivatives: &[Vec<f64>], durations: &[f64]) -> Vec<SegmentRow> {
        durations
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let polynomial = SegmentPolynomial::from_derivatives(voltages[i], &[derivatives[0][i]]).truncated(1);
                SegmentRow {
                    end_time: (times[i] + h) * self.config.time_scale,
                    start_voltage: voltages[i],
                    end_voltage: polynomial.evaluate(*h),
                }
            })
            .collect()
    }

    fn write_simple<W: Write>(
        &self,
        times: &[f64],
        voltages: &[f64],
        derivatives: &[Vec<f64>],
        durations: &[f64],
        out: &mut W,
    ) -> io::Result<()> {
        for row in self.simple_rows(times, voltages, derivatives, durations) {
            writeln!(out, "{:.4} {:.4} {:.4}", row.end_time, row.start_voltage, row.end_voltage)?;
        }
        Ok(())
    }

    // Coefficients of the FPGA's discrete summed polynomial, matched term by term
    // against the spline's Taylor expansion at the segment start.
    fn write_full_cubic<W: Write>(
        &self,
        times: &[f64],
        voltages: &[f64],
        derivatives: &[Vec<f64>],
        durations: &[f64],
        out: &mut W,
    ) -> io::Result<()> {
        let channel = self.config.channel + self.config.channel_offset;
        writeln!(out, "wvfcdef({}_{}, {}, {})", self.config.waveform_name, channel, channel, self.config.branch)?;

        let order = |j: usize, i: usize| derivatives.get(j).map_or(0.0, |d| d[i]);
        for (i, h) in durations.iter().enumerate() {
            let (d1, d2, d3) = (order(0, i), order(1, i), order(2, i));
            writeln!(
                out,
                "{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4};",
                (times[i] + h) * self.config.time_scale,
                voltages[i],
                h * (d1 - d2 / 2.0 + d3 / 6.0),
                h * (h + 1.0) * (d2 - d3) / 2.0,
                h * (h + 1.0) * (h + 2.0) * d3 / 6.0,
            )?;
        }

        write!(out, "wvfend\n\n")
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("at least 2 knots are needed to write a segment, got {0}")]
    TooFewKnots(usize),

    #[error("expected {expected} {what}, found {found}")]
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    #[error("first derivatives are required")]
    MissingDerivatives,

    #[error("failed to write segments: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_to_string(config: &OutputConfig, times: &[f64], voltages: &[f64], derivatives: &[Vec<f64>]) -> String {
        let mut out: Vec<u8> = Vec::new();
        SegmentWriter::new(config).write(times, voltages, derivatives, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn simple_rows_for_linear_fit() {
        let text = write_to_string(
            &OutputConfig::default(),
            &[0.0, 2.0, 4.0],
            &[1.0, 4.0, 16.0],
            &[vec![1.5, 6.0, 6.0]],
        );

        assert_eq!(text, "2.0000 1.0000 4.0000\n4.0000 4.0000 16.0000\n");
    }

    #[test]
    fn every_simple_line_has_three_fixed_point_fields() {
        let times: Vec<f64> = (0..8).map(|i| i as f64 * 0.37).collect();
        let voltages: Vec<f64> = times.iter().map(|t| t.cos()).collect();
        let slopes: Vec<f64> = times.iter().map(|t| -t.sin()).collect();

        let text = write_to_string(&OutputConfig::default(), &times, &voltages, &[slopes]);

        assert_eq!(7, text.lines().count());
        for line in text.lines() {
            let fields: Vec<&str> = line.split(' ').collect();
            assert_eq!(3, fields.len());
            for field in fields {
                let (_, decimals) = field.split_once('.').unwrap();
                assert_eq!(4, decimals.len());
                assert!(field.parse::<f64>().is_ok());
            }
        }
    }

    #[test]
    fn time_scale_applies_to_end_time_only() {
        let config = OutputConfig { time_scale: 1000.0, ..OutputConfig::default() };
        let text = write_to_string(&config, &[0.0, 0.5], &[1.0, 2.0], &[vec![2.0, 2.0]]);

        assert_eq!(text, "500.0000 1.0000 2.0000\n");
    }

    #[test]
    fn higher_derivatives_ignored_in_simple_format() {
        let text = write_to_string(
            &OutputConfig::default(),
            &[0.0, 1.0],
            &[0.0, 1.0],
            &[vec![0.0, 3.0], vec![6.0, 6.0], vec![6.0, 6.0]],
        );

        assert_eq!(text, "1.0000 0.0000 0.0000\n");
    }

    #[test]
    fn full_cubic_format() {
        let config = OutputConfig {
            channel: 2,
            channel_offset: 1,
            waveform_name: "ramp".to_string(),
            branch: 4,
            format: SegmentFormat::FullCubic,
            ..OutputConfig::default()
        };
        // x^3 sampled at 0 and 1
        let text = write_to_string(
            &config,
            &[0.0, 1.0],
            &[0.0, 1.0],
            &[vec![0.0, 3.0], vec![0.0, 6.0], vec![6.0, 6.0]],
        );

        assert_eq!(
            text,
            "wvfcdef(ramp_3, 3, 4)\n1.0000\t0.0000\t1.0000\t-6.0000\t6.0000;\nwvfend\n\n"
        );
    }

    #[test]
    fn full_cubic_treats_missing_orders_as_zero() {
        let config = OutputConfig { format: SegmentFormat::FullCubic, ..OutputConfig::default() };
        let text = write_to_string(&config, &[0.0, 2.0], &[1.0, 4.0], &[vec![1.5, 1.5]]);

        assert_eq!(text, "wvfcdef(null_0, 0, 0)\n2.0000\t1.0000\t3.0000\t0.0000\t0.0000;\nwvfend\n\n");
    }

    #[test]
    fn too_few_knots() {
        let mut out: Vec<u8> = Vec::new();
        let config = OutputConfig::default();
        let result = SegmentWriter::new(&config).write(&[1.0], &[1.0], &[vec![0.0]], &mut out);

        assert!(matches!(result, Err(WriteError::TooFewKnots(1))));
        assert!(out.is_empty());
    }

    #[test]
    fn short_derivative_array() {
        let mut out: Vec<u8> = Vec::new();
        let config = OutputConfig::default();
        let result = SegmentWriter::new(&config).write(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], &[vec![1.0, 1.0]], &mut out);

        assert!(matches!(result, Err(WriteError::LengthMismatch { what: "derivatives", expected: 3, found: 2 })));
    }

    #[test]
    fn missing_derivatives() {
        let mut out: Vec<u8> = Vec::new();
        let config = OutputConfig::default();
        let result = SegmentWriter::new(&config).write(&[0.0, 1.0], &[0.0, 1.0], &[], &mut out);

        assert!(matches!(result, Err(WriteError::MissingDerivatives)));
    }

    #[test]
    fn io_failure_is_propagated() {
        struct FailingWriter;

        impl Write for FailingWriter {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "disk full"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let config = OutputConfig::default();
        let result = SegmentWriter::new(&config).write(&[0.0, 1.0], &[0.0, 1.0], &[vec![1.0, 1.0]], &mut FailingWriter);

        assert!(matches!(result, Err(WriteError::Io(_))));
    }
}
