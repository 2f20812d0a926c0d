//! Load plans: compiled, immutable schedules.
//!
//! Two families share the [`crate::schedule::ScheduleStep`] vocabulary:
//!
//! * [`LoadPlan`] (rate family) yields one millisecond offset per request.
//! * [`InstancePlan`] (instance family) yields one start event per worker.
//!
//! Both are built through a builder that is consumed on `build()`, and both
//! are iterated through a separate cursor so one plan can feed any number of
//! consumers.
mod instance;
mod load;


use serde::Serialize;

pub use instance::{
    InstanceEvent, InstancePlan, InstancePlanBuilder, InstancePlanCursor, InstancePlanInfo,
    InstanceStep,
};
pub use load::{LoadPlan, LoadPlanBuilder, LoadPlanCursor};

/// A run of constant requested rate, as reported to other subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateStep {
    pub rps: u64,
    pub duration_ms: u64,
}

/// Summary of a compiled rate plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanInfo {
    pub duration_ms: u64,
    pub total_count: u64,
    pub steps: Vec<RateStep>,
}
