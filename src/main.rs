use std::process::ExitCode;

use dac_spline::{write_waveform_file, LogReporter, PipelineConfig};
use log::LevelFilter;

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = PipelineConfig::default();
    let reporter = LogReporter::default();

    match write_waveform_file(&config, Some(&reporter)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
