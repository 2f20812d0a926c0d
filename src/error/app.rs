use thiserror::Error;

use super::{ConfigError, DataError, JoinError, PipelineError, ScheduleError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("Task error: {source}")]
    Task {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Join error: {0}")]
    Join(#[from] JoinError),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn schedule<E>(error: E) -> Self
    where
        E: Into<ScheduleError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn data<E>(error: E) -> Self
    where
        E: Into<DataError>,
    {
        error.into().into()
    }

    pub fn pipeline<E>(error: E) -> Self
    where
        E: Into<PipelineError>,
    {
        error.into().into()
    }
}
