use std::time::Duration;

use crate::aggregate::HistogramScale;
use crate::error::{ConfigError, ScheduleError};
use crate::schedule::{ScheduleStep, parse_duration_ms};

pub(crate) fn parse_schedule_step(s: &str) -> Result<ScheduleStep, ScheduleError> {
    s.parse()
}

pub(crate) fn parse_duration_arg(s: &str) -> Result<Duration, ConfigError> {
    let millis = parse_duration_ms(s).map_err(|source| ConfigError::InvalidDuration {
        field: "duration",
        source,
    })?;
    if millis == 0 {
        return Err(ConfigError::MustBePositive { field: "duration" });
    }
    Ok(Duration::from_millis(millis))
}

pub(crate) fn parse_histogram_scale(s: &str) -> Result<HistogramScale, ConfigError> {
    s.parse()
}

pub(crate) fn parse_chunk_size(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("Chunk size must be > 0.".to_owned()),
        Ok(size) => Ok(size),
        Err(err) => Err(format!("Invalid chunk size '{}': {}", s, err)),
    }
}
