use std::iter::{Copied, FusedIterator};
use std::slice;

use serde::Serialize;
use tracing::debug;

use crate::error::ScheduleError;
use crate::schedule::{ScheduleStep, parse_schedule};

/// "Start one more worker at `offset_ms`"; `concurrency` is the number of
/// workers running once this one is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceEvent {
    pub concurrency: u64,
    pub offset_ms: u64,
}

/// A run of constant concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceStep {
    pub instances: u64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstancePlanInfo {
    pub duration_ms: u64,
    pub instances: u64,
    pub steps: Vec<InstanceStep>,
}

/// Accumulates instance-family steps. Every method fails instead of ever
/// lowering the running concurrency.
#[derive(Debug, Default)]
pub struct InstancePlanBuilder {
    events: Vec<InstanceEvent>,
    steps: Vec<InstanceStep>,
    instances: u64,
    offset_ms: u64,
}

impl InstancePlanBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `count` workers at the current offset.
    ///
    /// # Errors
    ///
    /// Returns an error when `count` is negative.
    pub fn start(&mut self, count: i64) -> Result<&mut Self, ScheduleError> {
        let count = non_negative(count)?;
        debug!("Start {} instances at {}ms", count, self.offset_ms);
        for _ in 0..count {
            self.instances = self.instances.saturating_add(1);
            self.events.push(InstanceEvent {
                concurrency: self.instances,
                offset_ms: self.offset_ms,
            });
        }
        Ok(self)
    }

    pub fn wait(&mut self, duration_ms: u64) -> &mut Self {
        debug!("Wait for {}ms from {}ms", duration_ms, self.offset_ms);
        self.offset_ms = self.offset_ms.saturating_add(duration_ms);
        self.steps.push(InstanceStep {
            instances: self.instances,
            duration_ms,
        });
        self
    }

    /// Starts `count` workers evenly over `duration_ms`; worker `i` starts at
    /// `offset + i * duration / count`.
    ///
    /// # Errors
    ///
    /// Returns an error when `count` is negative.
    pub fn ramp(&mut self, count: i64, duration_ms: u64) -> Result<&mut Self, ScheduleError> {
        let count = non_negative(count)?;
        debug!(
            "Ramp {} instances in {}ms from {}ms",
            count, duration_ms, self.offset_ms
        );
        let interval_ms = duration_ms.checked_div(count).unwrap_or(0);
        for worker in 0..count {
            let shift = u128::from(worker)
                .saturating_mul(u128::from(duration_ms))
                .checked_div(u128::from(count))
                .unwrap_or(0);
            self.instances = self.instances.saturating_add(1);
            self.events.push(InstanceEvent {
                concurrency: self.instances,
                offset_ms: self
                    .offset_ms
                    .saturating_add(u64::try_from(shift).unwrap_or(u64::MAX)),
            });
            self.steps.push(InstanceStep {
                instances: self.instances,
                duration_ms: interval_ms,
            });
        }
        self.offset_ms = self.offset_ms.saturating_add(duration_ms);
        Ok(self)
    }

    /// Brings concurrency up to `instances` and holds it for `duration_ms`.
    ///
    /// # Errors
    ///
    /// Returns an error when `instances` is below the running concurrency.
    pub fn hold(&mut self, instances: u64, duration_ms: u64) -> Result<&mut Self, ScheduleError> {
        self.start(self.delta_to(instances))?;
        Ok(self.wait(duration_ms))
    }

    /// Brings concurrency to `from`, then ramps linearly to `to` over
    /// `duration_ms`.
    ///
    /// When `from` is above the running concurrency the first ramped worker
    /// counts as the `from`-th, so the ramp starts exactly at `from`.
    ///
    /// # Errors
    ///
    /// Returns an error when `to < from` or `from` is below the running
    /// concurrency.
    pub fn line(&mut self, from: u64, to: u64, duration_ms: u64) -> Result<&mut Self, ScheduleError> {
        if to < from {
            return Err(ScheduleError::NegativeInstances {
                count: signed_delta(to, from),
            });
        }
        if from > self.instances {
            self.start(self.delta_to(from).saturating_sub(1))?;
            self.ramp(signed_delta(to, from).saturating_add(1), duration_ms)
        } else {
            self.start(self.delta_to(from))?;
            self.ramp(signed_delta(to, from), duration_ms)
        }
    }

    /// Starts up to `from`, then every `step_duration_ms` starts `step_size`
    /// more until `to` is reached exactly, then holds for one more step.
    ///
    /// # Errors
    ///
    /// Returns an error when `step_size` is zero or a step would lower the
    /// running concurrency.
    pub fn stairway(
        &mut self,
        from: u64,
        to: u64,
        step_size: u64,
        step_duration_ms: u64,
    ) -> Result<&mut Self, ScheduleError> {
        if step_size == 0 {
            return Err(ScheduleError::ZeroStepSize {
                step: format!("step({}, {}, {}, {}ms)", from, to, step_size, step_duration_ms),
            });
        }
        let step_count = to.saturating_sub(from).checked_div(step_size).unwrap_or(0);
        debug!("Making a stairway: {} steps", step_count);
        self.start(self.delta_to(from))?;
        for _ in 0..step_count {
            self.wait(step_duration_ms);
            self.start(signed_delta(step_size, 0))?;
        }
        if self.instances != to {
            self.wait(step_duration_ms);
            self.start(self.delta_to(to))?;
        }
        Ok(self.wait(step_duration_ms))
    }

    /// Applies one parsed step.
    ///
    /// # Errors
    ///
    /// Returns an error when instance counts are negative or fractional, or
    /// the step would lower concurrency.
    pub fn push(&mut self, step: ScheduleStep) -> Result<&mut Self, ScheduleError> {
        match step {
            ScheduleStep::InstanceStart { count } => self.start(count),
            ScheduleStep::InstanceRamp { count, duration_ms } => self.ramp(count, duration_ms),
            ScheduleStep::Wait { duration_ms } => Ok(self.wait(duration_ms)),
            ScheduleStep::Const { rate, duration_ms } => {
                self.hold(whole_instances(rate)?, duration_ms)
            }
            ScheduleStep::Line {
                rate_start,
                rate_end,
                duration_ms,
            } => self.line(
                whole_instances(rate_start)?,
                whole_instances(rate_end)?,
                duration_ms,
            ),
            ScheduleStep::Stairway {
                rate_start,
                rate_end,
                step_size,
                step_duration_ms,
            } => self.stairway(
                whole_instances(rate_start)?,
                whole_instances(rate_end)?,
                whole_instances(step_size)?,
                step_duration_ms,
            ),
        }
    }

    #[must_use]
    pub fn build(self) -> InstancePlan {
        InstancePlan {
            events: self.events,
            steps: self.steps,
            instances: self.instances,
            duration_ms: self.offset_ms,
        }
    }

    fn delta_to(&self, target: u64) -> i64 {
        signed_delta(target, self.instances)
    }
}

fn signed_delta(target: u64, current: u64) -> i64 {
    if target >= current {
        i64::try_from(target.saturating_sub(current)).unwrap_or(i64::MAX)
    } else {
        i64::try_from(current.saturating_sub(target))
            .map_or(i64::MIN, |delta| delta.saturating_neg())
    }
}

fn non_negative(count: i64) -> Result<u64, ScheduleError> {
    u64::try_from(count).map_err(|_err| ScheduleError::NegativeInstances { count })
}

fn whole_instances(value: f64) -> Result<u64, ScheduleError> {
    if !value.is_finite() || value < 0.0 || value >= u64::MAX as f64 || value.fract() > 0.0 {
        return Err(ScheduleError::NonIntegralInstances {
            value: value.to_string(),
        });
    }
    Ok(value as u64)
}

/// A compiled instance schedule: one start event per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePlan {
    events: Vec<InstanceEvent>,
    steps: Vec<InstanceStep>,
    instances: u64,
    duration_ms: u64,
}

impl InstancePlan {
    /// # Errors
    ///
    /// Returns an error when a step is rejected by the builder.
    pub fn from_steps(steps: &[ScheduleStep]) -> Result<Self, ScheduleError> {
        let mut builder = InstancePlanBuilder::new();
        for step in steps {
            builder.push(*step)?;
        }
        Ok(builder.build())
    }

    /// Parses and builds a plan from schedule strings such as
    /// `["start(10)", "ramp(90, 1m)"]`.
    ///
    /// # Errors
    ///
    /// Returns an error when a step does not parse or is rejected by the
    /// builder.
    pub fn from_schedule<S>(schedule: &[S]) -> Result<Self, ScheduleError>
    where
        S: AsRef<str>,
    {
        let steps = parse_schedule(schedule)?;
        let plan = Self::from_steps(&steps)?;
        debug!(
            "Instance plan compiled: {} workers over {}ms",
            plan.instances, plan.duration_ms
        );
        Ok(plan)
    }

    #[must_use]
    pub fn iter(&self) -> InstancePlanCursor<'_> {
        InstancePlanCursor {
            inner: self.events.iter().copied(),
        }
    }

    /// Peak concurrency.
    #[must_use]
    pub const fn instances(&self) -> u64 {
        self.instances
    }

    #[must_use]
    pub const fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    #[must_use]
    pub fn info(&self) -> InstancePlanInfo {
        InstancePlanInfo {
            duration_ms: self.duration_ms,
            instances: self.instances,
            steps: self.steps.clone(),
        }
    }
}

impl<'plan> IntoIterator for &'plan InstancePlan {
    type Item = InstanceEvent;
    type IntoIter = InstancePlanCursor<'plan>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct InstancePlanCursor<'plan> {
    inner: Copied<slice::Iter<'plan, InstanceEvent>>,
}

impl Iterator for InstancePlanCursor<'_> {
    type Item = InstanceEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for InstancePlanCursor<'_> {}

impl FusedIterator for InstancePlanCursor<'_> {}
