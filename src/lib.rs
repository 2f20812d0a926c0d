//! Core library for the `volley` CLI.
//!
//! The crate has two halves. The plan side compiles textual schedules
//! (`const`, `line`, `step`, `wait`, `start`, `ramp`) into exact request
//! timestamps ([`plan::LoadPlan`]) or worker start events
//! ([`plan::InstancePlan`]). The result side joins per-request result rows
//! from several sources into time buckets behind a watermark
//! ([`join::TimeWindowJoiner`]), summarises each bucket
//! ([`aggregate::WindowAggregator`]) and runs both on a tokio drain task
//! ([`pipeline::Pipeline`]).
pub mod aggregate;
pub mod args;
pub mod config;
pub mod data;
pub mod entry;
pub mod error;
pub mod join;
pub mod logger;
pub mod pipeline;
pub mod plan;
pub mod schedule;
pub mod shutdown;
pub mod shutdown_handlers;

#[cfg(feature = "fuzzing")]
pub mod fuzzing;
