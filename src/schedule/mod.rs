//! Declarative schedule steps and their textual form.
//!
//! A schedule is a list of steps such as `const(100, 10s)`,
//! `line(1, 10, 5m)`, `step(1, 5, 1, 5s)`, `wait(30s)`, `start(10)` or
//! `ramp(10, 1m)`. Each string is resolved into a [`ScheduleStep`] once; the
//! plan builders in [`crate::plan`] decide which variants their family
//! accepts.
mod duration;

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use crate::error::ScheduleError;

pub use duration::{format_duration_ms, parse_duration_ms};

const CONST_FORMAT: &str = "const(<rate>, <duration>)";
const LINE_FORMAT: &str = "line(<start>, <end>, <duration>)";
const STEP_FORMAT: &str = "step(<start>, <end>, <step>, <step_duration>)";
const WAIT_FORMAT: &str = "wait(<duration>)";
const START_FORMAT: &str = "start(<instances>)";
const RAMP_FORMAT: &str = "ramp(<instances>, <duration>)";

/// One declarative load segment.
///
/// For the rate family the numeric values are requests per second; for the
/// instance family `Const`, `Line` and `Stairway` carry instance counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduleStep {
    Const {
        rate: f64,
        duration_ms: u64,
    },
    Line {
        rate_start: f64,
        rate_end: f64,
        duration_ms: u64,
    },
    Stairway {
        rate_start: f64,
        rate_end: f64,
        step_size: f64,
        step_duration_ms: u64,
    },
    Wait {
        duration_ms: u64,
    },
    InstanceStart {
        count: i64,
    },
    InstanceRamp {
        count: i64,
        duration_ms: u64,
    },
}

impl ScheduleStep {
    /// Wall-clock length of the step in milliseconds, as written.
    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        match self {
            ScheduleStep::Const { duration_ms, .. }
            | ScheduleStep::Line { duration_ms, .. }
            | ScheduleStep::Wait { duration_ms }
            | ScheduleStep::InstanceRamp { duration_ms, .. } => *duration_ms,
            ScheduleStep::Stairway {
                step_duration_ms, ..
            } => *step_duration_ms,
            ScheduleStep::InstanceStart { .. } => 0,
        }
    }
}

impl FromStr for ScheduleStep {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let step = s.trim();
        if step.is_empty() {
            return Err(ScheduleError::EmptyStep);
        }
        let (name, params) = step
            .split_once('(')
            .ok_or_else(|| ScheduleError::MalformedStep {
                step: step.to_owned(),
            })?;
        let params = params
            .trim_end()
            .strip_suffix(')')
            .ok_or_else(|| ScheduleError::MalformedStep {
                step: step.to_owned(),
            })?;
        let args: Vec<&str> = if params.trim().is_empty() {
            Vec::new()
        } else {
            params.split(',').map(str::trim).collect()
        };

        match name.trim() {
            "const" => {
                let [rate, duration] = take_args::<2>(step, &args, CONST_FORMAT)?;
                Ok(ScheduleStep::Const {
                    rate: parse_rate(step, rate)?,
                    duration_ms: parse_duration_ms(duration)?,
                })
            }
            "line" => {
                let [start, end, duration] = take_args::<3>(step, &args, LINE_FORMAT)?;
                Ok(ScheduleStep::Line {
                    rate_start: parse_rate(step, start)?,
                    rate_end: parse_rate(step, end)?,
                    duration_ms: parse_duration_ms(duration)?,
                })
            }
            "step" => {
                let [start, end, size, duration] = take_args::<4>(step, &args, STEP_FORMAT)?;
                let step_size = parse_rate(step, size)?;
                if step_size <= 0.0 {
                    return Err(ScheduleError::ZeroStepSize {
                        step: step.to_owned(),
                    });
                }
                Ok(ScheduleStep::Stairway {
                    rate_start: parse_rate(step, start)?,
                    rate_end: parse_rate(step, end)?,
                    step_size,
                    step_duration_ms: parse_duration_ms(duration)?,
                })
            }
            "wait" => {
                let [duration] = take_args::<1>(step, &args, WAIT_FORMAT)?;
                Ok(ScheduleStep::Wait {
                    duration_ms: parse_duration_ms(duration)?,
                })
            }
            "start" => {
                let [count] = take_args::<1>(step, &args, START_FORMAT)?;
                Ok(ScheduleStep::InstanceStart {
                    count: parse_count(count)?,
                })
            }
            "ramp" => {
                let [count, duration] = take_args::<2>(step, &args, RAMP_FORMAT)?;
                Ok(ScheduleStep::InstanceRamp {
                    count: parse_count(count)?,
                    duration_ms: parse_duration_ms(duration)?,
                })
            }
            other => Err(ScheduleError::UnknownStepType {
                name: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ScheduleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStep::Const { rate, duration_ms } => {
                write!(f, "const({}, {})", rate, format_duration_ms(*duration_ms))
            }
            ScheduleStep::Line {
                rate_start,
                rate_end,
                duration_ms,
            } => write!(
                f,
                "line({}, {}, {})",
                rate_start,
                rate_end,
                format_duration_ms(*duration_ms)
            ),
            ScheduleStep::Stairway {
                rate_start,
                rate_end,
                step_size,
                step_duration_ms,
            } => write!(
                f,
                "step({}, {}, {}, {})",
                rate_start,
                rate_end,
                step_size,
                format_duration_ms(*step_duration_ms)
            ),
            ScheduleStep::Wait { duration_ms } => {
                write!(f, "wait({})", format_duration_ms(*duration_ms))
            }
            ScheduleStep::InstanceStart { count } => write!(f, "start({})", count),
            ScheduleStep::InstanceRamp { count, duration_ms } => {
                write!(f, "ramp({}, {})", count, format_duration_ms(*duration_ms))
            }
        }
    }
}

/// Parses every step of a schedule, failing on the first bad one.
///
/// # Errors
///
/// Returns the error of the first step that does not parse.
pub fn parse_schedule<S>(steps: &[S]) -> Result<Vec<ScheduleStep>, ScheduleError>
where
    S: AsRef<str>,
{
    steps.iter().map(|step| step.as_ref().parse()).collect()
}

fn take_args<'input, const N: usize>(
    step: &str,
    args: &[&'input str],
    expected: &'static str,
) -> Result<[&'input str; N], ScheduleError> {
    <[&str; N]>::try_from(args).map_err(|_err| ScheduleError::WrongArguments {
        step: step.to_owned(),
        expected,
    })
}

fn parse_rate(step: &str, value: &str) -> Result<f64, ScheduleError> {
    let rate: f64 = value
        .parse()
        .map_err(|err| ScheduleError::InvalidNumber {
            step: step.to_owned(),
            value: value.to_owned(),
            source: err,
        })?;
    if !rate.is_finite() {
        return Err(ScheduleError::NonFiniteNumber {
            step: step.to_owned(),
            value: value.to_owned(),
        });
    }
    if rate < 0.0 {
        return Err(ScheduleError::NegativeRate {
            step: step.to_owned(),
        });
    }
    Ok(rate)
}

fn parse_count(value: &str) -> Result<i64, ScheduleError> {
    value
        .parse()
        .map_err(|_err| ScheduleError::NonIntegralInstances {
            value: value.to_owned(),
        })
}
