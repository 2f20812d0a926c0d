//! Engine configuration files.
//!
//! A config file is read into [`EngineConfig`] (plain serde types) and only
//! then validated into the typed runtime settings the plan builders, the
//! aggregator and the pipeline consume.
mod loader;
mod types;
mod validate;

#[cfg(test)]
mod test_support;

pub use loader::{load_config, load_config_file};
pub use types::{AggregatorSection, DurationValue, EngineConfig, PipelineSection};
