use crate::args::{AggregateArgs, Command, VolleyArgs};
use crate::config::{EngineConfig, load_config};
use crate::error::{AppError, AppResult, ConfigError, ScheduleError};
use crate::plan::{InstancePlan, LoadPlan};
use crate::schedule::ScheduleStep;

use super::types::{AggregatePlan, InstancesPlan, RatePlan, RunPlan};

const MICROS_PER_MILLI: u128 = 1_000;

pub(crate) fn build_plan(args: VolleyArgs) -> AppResult<RunPlan> {
    let config = load_config(args.config.as_deref())?.unwrap_or_default();
    config.validate()?;

    match args.command {
        Command::Plan(plan) => {
            let steps = steps_or_config(plan.steps, "rps_schedule", || config.rps_steps())?;
            Ok(RunPlan::Rate(RatePlan {
                plan: LoadPlan::from_steps(&steps)?,
                info: plan.info,
                limit: plan.limit,
            }))
        }
        Command::Instances(instances) => {
            let steps = steps_or_config(instances.steps, "instances_schedule", || {
                config.instance_steps()
            })?;
            Ok(RunPlan::Instances(InstancesPlan {
                plan: InstancePlan::from_steps(&steps)?,
                info: instances.info,
            }))
        }
        Command::Aggregate(aggregate) => build_aggregate(aggregate, &config).map(RunPlan::Aggregate),
    }
}

fn steps_or_config<F>(
    cli: Vec<ScheduleStep>,
    field: &'static str,
    from_config: F,
) -> AppResult<Vec<ScheduleStep>>
where
    F: FnOnce() -> Result<Vec<ScheduleStep>, ScheduleError>,
{
    if !cli.is_empty() {
        return Ok(cli);
    }
    let steps = from_config()?;
    if steps.is_empty() {
        return Err(AppError::config(ConfigError::MissingSchedule { field }));
    }
    Ok(steps)
}

fn build_aggregate(args: AggregateArgs, config: &EngineConfig) -> AppResult<AggregatePlan> {
    let mut aggregator = config.aggregator_config()?;
    let mut pipeline = config.pipeline_config()?;

    if let Some(bucket) = args.bucket {
        aggregator.bucket_width_us = bucket
            .as_millis()
            .checked_mul(MICROS_PER_MILLI)
            .and_then(|micros| i64::try_from(micros).ok())
            .ok_or_else(|| {
                AppError::config(ConfigError::InvalidDuration {
                    field: "bucket",
                    source: ScheduleError::DurationOverflow {
                        value: format!("{:?}", bucket),
                    },
                })
            })?;
    }
    if let Some(histogram) = args.histogram {
        aggregator.histogram = histogram;
    }
    if args.no_overall {
        aggregator.overall = false;
    }
    if let Some(stall_timeout) = args.stall_timeout {
        pipeline.stall_timeout = stall_timeout;
    }

    Ok(AggregatePlan {
        files: args.files,
        aggregator,
        pipeline,
        chunk_size: args.chunk_size,
    })
}
