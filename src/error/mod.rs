mod app;
mod config;
mod data;
mod join;
mod pipeline;
mod schedule;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use data::DataError;
pub use join::JoinError;
pub use pipeline::PipelineError;
pub use schedule::{PlanFamily, ScheduleError};
