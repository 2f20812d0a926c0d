//! Entry points for the `fuzz/` crate. Each wraps one parser or builder so
//! the targets stay free of crate internals.
use crate::aggregate::{AggregatorConfig, HistogramScale, QuantileHistogram, bin_index};
use crate::config::EngineConfig;
use crate::data::{ResultRow, parse_phout_line};
use crate::error::{AppError, AppResult};
use crate::pipeline::PipelineConfig;
use crate::plan::{InstancePlan, LoadPlan};
use crate::schedule::{ScheduleStep, parse_duration_ms};

/// Parses one schedule step such as `line(1, 10, 30s)`.
///
/// # Errors
///
/// Returns an error when the step is malformed.
pub fn schedule_step_input(input: &str) -> AppResult<ScheduleStep> {
    input.parse::<ScheduleStep>().map_err(AppError::from)
}

/// Parses a schedule duration into milliseconds.
///
/// # Errors
///
/// Returns an error when the duration is invalid.
pub fn duration_input(input: &str) -> AppResult<u64> {
    parse_duration_ms(input).map_err(AppError::from)
}

/// Parses one tab-separated phout line.
///
/// # Errors
///
/// Returns an error when the line is malformed.
pub fn phout_line_input(input: &str) -> AppResult<ResultRow> {
    parse_phout_line(input).map_err(AppError::from)
}

/// Compiles newline-separated steps into a rate plan.
///
/// # Errors
///
/// Returns an error when a step is malformed or belongs to the instance
/// family.
pub fn load_plan_input(input: &str) -> AppResult<LoadPlan> {
    let steps: Vec<&str> = input.lines().collect();
    LoadPlan::from_schedule(&steps).map_err(AppError::from)
}

/// Compiles newline-separated steps into an instance plan.
///
/// # Errors
///
/// Returns an error when a step is malformed or needs a negative count.
pub fn instance_plan_input(input: &str) -> AppResult<InstancePlan> {
    let steps: Vec<&str> = input.lines().collect();
    InstancePlan::from_schedule(&steps).map_err(AppError::from)
}

fn resolve(config: &EngineConfig) -> AppResult<(AggregatorConfig, PipelineConfig)> {
    config.validate()?;
    Ok((config.aggregator_config()?, config.pipeline_config()?))
}

/// Parses and validates a TOML engine config.
///
/// # Errors
///
/// Returns an error when the config does not parse or fails validation.
pub fn config_toml_input(input: &str) -> AppResult<(AggregatorConfig, PipelineConfig)> {
    let config: EngineConfig = toml::from_str(input).map_err(|err| {
        AppError::config(crate::error::ConfigError::ParseToml {
            path: "fuzz.toml".into(),
            source: err,
        })
    })?;
    resolve(&config)
}

/// Parses and validates a JSON engine config.
///
/// # Errors
///
/// Returns an error when the config does not parse or fails validation.
pub fn config_json_input(input: &str) -> AppResult<(AggregatorConfig, PipelineConfig)> {
    let config: EngineConfig = serde_json::from_str(input).map_err(|err| {
        AppError::config(crate::error::ConfigError::ParseJson {
            path: "fuzz.json".into(),
            source: err,
        })
    })?;
    resolve(&config)
}

/// Bin index of `value` in the selected edge table.
#[must_use]
pub fn histogram_bin_input(verbose: bool, value: i64) -> (usize, usize) {
    let edges = if verbose {
        HistogramScale::Verbose.edges()
    } else {
        HistogramScale::Compact.edges()
    };
    (bin_index(edges, value), edges.len())
}

/// Records `values` and returns the quantile row.
///
/// # Errors
///
/// Returns an error when the histogram cannot be created or a value cannot
/// be recorded.
pub fn quantiles_input(values: &[i64]) -> Result<Vec<u64>, String> {
    let mut hist = QuantileHistogram::new()?;
    for value in values {
        hist.record(*value)?;
    }
    Ok(hist.quantiles())
}
