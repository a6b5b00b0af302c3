use std::io::{self, BufRead};

use thiserror::Error;

use crate::writer::SegmentRow;

/// Parses rows of [crate::SegmentFormat::Simple] the way the DAC sequencer loads a waveform
/// file: three whitespace separated numbers per line, blank lines skipped.
/// # Example
/// ```
/// use dac_spline::read_segments;
///
/// let rows = read_segments("2.0000 1.0000 4.0000\n4.0000 4.0000 16.0000\n".as_bytes()).unwrap();
///
/// assert_eq!(2, rows.len());
/// assert_eq!(16.0, rows[1].end_voltage);
/// ```
pub fn read_segments<R: BufRead>(input: R) -> Result<Vec<SegmentRow>, ReadError> {
    let mut rows = Vec::new();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let fields = line
            .split_whitespace()
            .map(|field| {
                field.parse::<f64>().map_err(|_| ReadError::InvalidNumber { line: line_number, field: field.to_string() })
            })
            .collect::<Result<Vec<f64>, ReadError>>()?;

        if fields.len() != 3 {
            return Err(ReadError::FieldCount { line: line_number, found: fields.len() });
        }

        rows.push(SegmentRow { end_time: fields[0], start_voltage: fields[1], end_voltage: fields[2] });
    }

    log::debug!("read {} segment rows", rows.len());
    Ok(rows)
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("line {line}: expected 3 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: `{field}` is not a number")]
    InvalidNumber { line: usize, field: String },

    #[error("failed to read segments: {0}")]
    Io(#[from] io::Error),
}
