use std::iter::FusedIterator;

use tracing::debug;

use crate::error::{PlanFamily, ScheduleError};
use crate::schedule::{ScheduleStep, parse_schedule};

use super::{PlanInfo, RateStep};

const MS_PER_SEC: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Const {
        rate: f64,
        duration_ms: u64,
    },
    Line {
        rate_start: f64,
        rate_end: f64,
        duration_ms: u64,
    },
}

#[expect(
    clippy::float_arithmetic,
    reason = "Arrival times are solved in floating point seconds."
)]
impl Segment {
    const fn duration_ms(&self) -> u64 {
        match self {
            Segment::Const { duration_ms, .. } | Segment::Line { duration_ms, .. } => *duration_ms,
        }
    }

    const fn duration_secs(&self) -> f64 {
        self.duration_ms() as f64 / MS_PER_SEC
    }

    /// Slope of the rate line in requests per second squared.
    fn slope(&self) -> f64 {
        match self {
            Segment::Const { .. } => 0.0,
            Segment::Line {
                rate_start,
                rate_end,
                duration_ms,
            } => {
                if *duration_ms == 0 {
                    return 0.0;
                }
                (rate_end - rate_start) / self.duration_secs()
            }
        }
    }

    fn count(&self) -> u64 {
        let total = match self {
            Segment::Const { rate, .. } => rate * self.duration_secs(),
            Segment::Line {
                rate_start,
                rate_end,
                ..
            } => (rate_start + rate_end) / 2.0 * self.duration_secs(),
        };
        float_to_u64(total.floor())
    }

    /// Offset of the `n`-th request from the segment start, in milliseconds.
    fn timestamp(&self, n: u64) -> u64 {
        match self {
            Segment::Const { rate, .. } => {
                if *rate <= 0.0 {
                    return 0;
                }
                float_to_u64((n as f64 * MS_PER_SEC / rate).round())
            }
            Segment::Line { rate_start, .. } => {
                let secs = line_arrival_secs(*rate_start, self.slope(), n as f64);
                float_to_u64((secs * MS_PER_SEC).trunc())
            }
        }
    }

    fn rate_at(&self, secs: f64) -> f64 {
        if secs < 0.0 || secs > self.duration_secs() {
            return 0.0;
        }
        match self {
            Segment::Const { rate, .. } => *rate,
            Segment::Line { rate_start, .. } => rate_start + self.slope() * secs,
        }
    }

    fn rate_steps(&self) -> Vec<RateStep> {
        match self {
            Segment::Const { rate, duration_ms } => vec![RateStep {
                rps: float_to_u64(rate.trunc()),
                duration_ms: *duration_ms,
            }],
            Segment::Line { .. } => {
                let whole_secs = float_to_u64(self.duration_secs().trunc());
                let mut steps: Vec<RateStep> = Vec::new();
                for second in 0..=whole_secs {
                    let rps = float_to_u64((self.rate_at(second as f64) + 0.5).floor());
                    match steps.last_mut() {
                        Some(last) if last.rps == rps => {
                            last.duration_ms = last.duration_ms.saturating_add(1_000);
                        }
                        Some(_) | None => steps.push(RateStep {
                            rps,
                            duration_ms: 1_000,
                        }),
                    }
                }
                steps
            }
        }
    }
}

/// Time in seconds at which the cumulative count `N(t) = b*t + k/2*t^2`
/// reaches `n`.
///
/// This is the non-negative root `(-b + sqrt(b^2 + 2kn)) / k` of
/// `k/2*t^2 + b*t - n = 0`, written as `2n / (b + sqrt(b^2 + 2kn))` so the
/// same expression covers `k == 0` (giving `n / b`) without cancellation for
/// small slopes.
#[expect(
    clippy::float_arithmetic,
    reason = "Arrival times are solved in floating point seconds."
)]
fn line_arrival_secs(rate_start: f64, slope: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let discriminant = (rate_start * rate_start + 2.0 * slope * n).max(0.0);
    let denominator = rate_start + discriminant.sqrt();
    if denominator <= 0.0 {
        return 0.0;
    }
    2.0 * n / denominator
}

const fn float_to_u64(value: f64) -> u64 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    if value >= u64::MAX as f64 {
        return u64::MAX;
    }
    value as u64
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CompiledSegment {
    base_ms: u64,
    count: u64,
    segment: Segment,
}

/// Accumulates rate-family steps. Consumed by [`LoadPlanBuilder::build`].
#[derive(Debug, Default)]
pub struct LoadPlanBuilder {
    segments: Vec<Segment>,
}

impl LoadPlanBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one step.
    ///
    /// # Errors
    ///
    /// Returns an error for instance-only steps (`start`, `ramp`).
    pub fn push(&mut self, step: ScheduleStep) -> Result<&mut Self, ScheduleError> {
        match step {
            ScheduleStep::Const { rate, duration_ms } => {
                self.segments.push(Segment::Const { rate, duration_ms });
            }
            ScheduleStep::Line {
                rate_start,
                rate_end,
                duration_ms,
            } => {
                self.segments.push(Segment::Line {
                    rate_start,
                    rate_end,
                    duration_ms,
                });
            }
            ScheduleStep::Stairway {
                rate_start,
                rate_end,
                step_size,
                step_duration_ms,
            } => self.push_stairway(rate_start, rate_end, step_size, step_duration_ms, step)?,
            ScheduleStep::Wait { duration_ms } => {
                self.segments.push(Segment::Const {
                    rate: 0.0,
                    duration_ms,
                });
            }
            ScheduleStep::InstanceStart { .. } | ScheduleStep::InstanceRamp { .. } => {
                return Err(ScheduleError::UnsupportedStep {
                    step: step.to_string(),
                    family: PlanFamily::Rate,
                });
            }
        }
        Ok(self)
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "Stair rates are derived from fractional rate bounds."
    )]
    fn push_stairway(
        &mut self,
        rate_start: f64,
        rate_end: f64,
        step_size: f64,
        step_duration_ms: u64,
        step: ScheduleStep,
    ) -> Result<(), ScheduleError> {
        if step_size <= 0.0 {
            return Err(ScheduleError::ZeroStepSize {
                step: step.to_string(),
            });
        }
        let increment = if rate_end < rate_start {
            -step_size
        } else {
            step_size
        };
        let stairs = float_to_u64(((rate_end - rate_start) / increment).trunc());
        for stair in 0..=stairs {
            self.segments.push(Segment::Const {
                rate: rate_start + stair as f64 * increment,
                duration_ms: step_duration_ms,
            });
        }
        let reached = rate_start + stairs as f64 * increment;
        let short = if increment > 0.0 {
            reached < rate_end
        } else {
            reached > rate_end
        };
        if short {
            self.segments.push(Segment::Const {
                rate: rate_end,
                duration_ms: step_duration_ms,
            });
        }
        Ok(())
    }

    /// Compiles the accumulated steps into an immutable plan.
    #[must_use]
    pub fn build(self) -> LoadPlan {
        let mut base_ms: u64 = 0;
        let mut total_count: u64 = 0;
        let mut segments = Vec::with_capacity(self.segments.len());
        for segment in self.segments {
            let count = segment.count();
            segments.push(CompiledSegment {
                base_ms,
                count,
                segment,
            });
            base_ms = base_ms.saturating_add(segment.duration_ms());
            total_count = total_count.saturating_add(count);
        }
        LoadPlan {
            segments,
            total_count,
            total_duration_ms: base_ms,
        }
    }
}

/// A compiled rate schedule.
///
/// The plan itself holds no iteration state; call [`LoadPlan::iter`] for a
/// fresh cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    segments: Vec<CompiledSegment>,
    total_count: u64,
    total_duration_ms: u64,
}

impl LoadPlan {
    /// Builds a plan from already parsed steps.
    ///
    /// # Errors
    ///
    /// Returns an error when a step is not valid for the rate family.
    pub fn from_steps(steps: &[ScheduleStep]) -> Result<Self, ScheduleError> {
        let mut builder = LoadPlanBuilder::new();
        for step in steps {
            builder.push(*step)?;
        }
        Ok(builder.build())
    }

    /// Parses and builds a plan from schedule strings such as
    /// `["const(10, 1m)", "line(10, 100, 5m)"]`.
    ///
    /// # Errors
    ///
    /// Returns an error when a step does not parse or is not valid for the
    /// rate family.
    pub fn from_schedule<S>(schedule: &[S]) -> Result<Self, ScheduleError>
    where
        S: AsRef<str>,
    {
        let steps = parse_schedule(schedule)?;
        let plan = Self::from_steps(&steps)?;
        debug!(
            "Load plan compiled: {} steps, {} requests over {}ms",
            steps.len(),
            plan.total_count,
            plan.total_duration_ms
        );
        Ok(plan)
    }

    #[must_use]
    pub fn iter(&self) -> LoadPlanCursor<'_> {
        LoadPlanCursor {
            segments: &self.segments,
            segment_idx: 0,
            index: 0,
            remaining: self.total_count,
        }
    }

    #[must_use]
    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub const fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Requested rate at `offset_ms` from plan start.
    #[must_use]
    pub fn rate_at(&self, offset_ms: u64) -> f64 {
        self.segments
            .iter()
            .find(|compiled| {
                offset_ms >= compiled.base_ms
                    && offset_ms < compiled.base_ms.saturating_add(compiled.segment.duration_ms())
            })
            .map_or(0.0, |compiled| {
                let local_ms = offset_ms.saturating_sub(compiled.base_ms);
                compiled.segment.rate_at(millis_to_secs(local_ms))
            })
    }

    /// Per-second runs of requested rate, concatenated over all steps.
    #[must_use]
    pub fn rate_steps(&self) -> Vec<RateStep> {
        self.segments
            .iter()
            .flat_map(|compiled| compiled.segment.rate_steps())
            .collect()
    }

    #[must_use]
    pub fn info(&self) -> PlanInfo {
        PlanInfo {
            duration_ms: self.total_duration_ms,
            total_count: self.total_count,
            steps: self.rate_steps(),
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "Segment rates are evaluated in floating point seconds."
)]
const fn millis_to_secs(value: u64) -> f64 {
    value as f64 / MS_PER_SEC
}

impl<'plan> IntoIterator for &'plan LoadPlan {
    type Item = u64;
    type IntoIter = LoadPlanCursor<'plan>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iteration state over a [`LoadPlan`]; yields millisecond offsets.
#[derive(Debug, Clone)]
pub struct LoadPlanCursor<'plan> {
    segments: &'plan [CompiledSegment],
    segment_idx: usize,
    index: u64,
    remaining: u64,
}

impl Iterator for LoadPlanCursor<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let compiled = self.segments.get(self.segment_idx)?;
            if self.index < compiled.count {
                let offset = compiled
                    .base_ms
                    .saturating_add(compiled.segment.timestamp(self.index));
                self.index = self.index.saturating_add(1);
                self.remaining = self.remaining.saturating_sub(1);
                return Some(offset);
            }
            self.segment_idx = self.segment_idx.saturating_add(1);
            self.index = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LoadPlanCursor<'_> {}

impl FusedIterator for LoadPlanCursor<'_> {}
