use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::schedule::parse_duration_ms;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct EngineConfig {
    pub rps_schedule: Option<Vec<String>>,
    pub instances_schedule: Option<Vec<String>>,
    pub aggregator: Option<AggregatorSection>,
    pub pipeline: Option<PipelineSection>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct AggregatorSection {
    pub bucket: Option<DurationValue>,
    pub histogram: Option<String>,
    pub overall: Option<bool>,
    /// Field name to statistic names, e.g. `latency = ["total", "q"]`.
    /// Replaces the default field set when present.
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct PipelineSection {
    pub poll_interval: Option<DurationValue>,
    pub stall_timeout: Option<DurationValue>,
    pub queue_capacity: Option<usize>,
}

/// Either whole seconds or a duration string such as `"250ms"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    /// Positive duration in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns an error when the text does not parse or the value is zero.
    pub fn to_millis(&self, field: &'static str) -> Result<u64, ConfigError> {
        let millis = match self {
            DurationValue::Seconds(secs) => secs.saturating_mul(1_000),
            DurationValue::Text(text) => parse_duration_ms(text)
                .map_err(|source| ConfigError::InvalidDuration { field, source })?,
        };
        if millis == 0 {
            return Err(ConfigError::MustBePositive { field });
        }
        Ok(millis)
    }
}
