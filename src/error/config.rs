use super::ScheduleError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Unknown result field '{name}'.")]
    UnknownField { name: String },
    #[error("Unknown statistic '{name}'.")]
    UnknownStatistic { name: String },
    #[error("Statistic '{statistic}' cannot be computed for categorical field '{field}'.")]
    StatisticNotApplicable {
        field: &'static str,
        statistic: &'static str,
    },
    #[error("Invalid histogram scale '{value}'. Use compact or verbose.")]
    InvalidHistogramScale { value: String },
    #[error("Invalid duration for '{field}': {source}")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: ScheduleError,
    },
    #[error("Config '{field}' must be > 0.")]
    MustBePositive { field: &'static str },
    #[error("No schedule steps given on the command line and config has no '{field}'.")]
    MissingSchedule { field: &'static str },
    #[error("Config cannot set both '{left}' and '{right}'.")]
    Conflict {
        left: &'static str,
        right: &'static str,
    },
}
