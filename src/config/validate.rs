use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::aggregate::{AggregatorConfig, HistogramScale, Statistic};
use crate::data::Field;
use crate::error::{AppResult, ConfigError, ScheduleError};
use crate::pipeline::PipelineConfig;
use crate::schedule::{ScheduleStep, parse_schedule};

use super::types::{AggregatorSection, DurationValue, EngineConfig, PipelineSection};

const MICROS_PER_MILLI: u64 = 1_000;

impl EngineConfig {
    /// Checks every section at once, so a broken config fails before any
    /// work starts.
    ///
    /// # Errors
    ///
    /// Returns the first schedule or config error found.
    pub fn validate(&self) -> AppResult<()> {
        if self.rps_schedule.as_ref().is_some_and(|steps| !steps.is_empty())
            && self
                .instances_schedule
                .as_ref()
                .is_some_and(|steps| !steps.is_empty())
        {
            return Err(ConfigError::Conflict {
                left: "rps_schedule",
                right: "instances_schedule",
            }
            .into());
        }
        self.rps_steps()?;
        self.instance_steps()?;
        self.aggregator_config()?;
        self.pipeline_config()?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error when a step does not parse.
    pub fn rps_steps(&self) -> Result<Vec<ScheduleStep>, ScheduleError> {
        self.rps_schedule
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), parse_schedule)
    }

    /// # Errors
    ///
    /// Returns an error when a step does not parse.
    pub fn instance_steps(&self) -> Result<Vec<ScheduleStep>, ScheduleError> {
        self.instances_schedule
            .as_deref()
            .map_or_else(|| Ok(Vec::new()), parse_schedule)
    }

    /// # Errors
    ///
    /// Returns an error when the `[aggregator]` section is invalid.
    pub fn aggregator_config(&self) -> Result<AggregatorConfig, ConfigError> {
        self.aggregator
            .as_ref()
            .map_or_else(|| Ok(AggregatorConfig::default()), AggregatorSection::resolve)
    }

    /// # Errors
    ///
    /// Returns an error when the `[pipeline]` section is invalid.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        self.pipeline
            .as_ref()
            .map_or_else(|| Ok(PipelineConfig::default()), PipelineSection::resolve)
    }
}

impl AggregatorSection {
    fn resolve(&self) -> Result<AggregatorConfig, ConfigError> {
        let mut config = match self.fields.as_ref() {
            Some(fields) => AggregatorConfig::with_fields(parse_fields(fields)?)?,
            None => AggregatorConfig::default(),
        };
        if let Some(bucket) = self.bucket.as_ref() {
            config.bucket_width_us = bucket_width_us(bucket)?;
        }
        if let Some(histogram) = self.histogram.as_deref() {
            config.histogram = histogram.parse::<HistogramScale>()?;
        }
        if let Some(overall) = self.overall {
            config.overall = overall;
        }
        debug!(
            "Aggregator: {} fields, {}us buckets, {} histogram",
            config.fields.len(),
            config.bucket_width_us,
            config.histogram.as_str()
        );
        Ok(config)
    }
}

impl PipelineSection {
    fn resolve(&self) -> Result<PipelineConfig, ConfigError> {
        let mut config = PipelineConfig::default();
        if let Some(value) = self.poll_interval.as_ref() {
            config.poll_interval = Duration::from_millis(value.to_millis("poll_interval")?);
        }
        if let Some(value) = self.stall_timeout.as_ref() {
            config.stall_timeout = Duration::from_millis(value.to_millis("stall_timeout")?);
        }
        if let Some(capacity) = self.queue_capacity {
            if capacity == 0 {
                return Err(ConfigError::MustBePositive {
                    field: "queue_capacity",
                });
            }
            config.queue_capacity = capacity;
        }
        Ok(config)
    }
}

fn parse_fields(
    fields: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<(Field, Vec<Statistic>)>, ConfigError> {
    let mut parsed = Vec::with_capacity(fields.len());
    for (name, statistics) in fields {
        let field: Field = name.parse()?;
        let statistics = statistics
            .iter()
            .map(|statistic| statistic.parse::<Statistic>())
            .collect::<Result<Vec<_>, _>>()?;
        parsed.push((field, statistics));
    }
    Ok(parsed)
}

fn bucket_width_us(bucket: &DurationValue) -> Result<i64, ConfigError> {
    let millis = bucket.to_millis("bucket")?;
    millis
        .checked_mul(MICROS_PER_MILLI)
        .and_then(|micros| i64::try_from(micros).ok())
        .ok_or_else(|| ConfigError::InvalidDuration {
            field: "bucket",
            source: ScheduleError::DurationOverflow {
                value: format!("{}ms", millis),
            },
        })
}
