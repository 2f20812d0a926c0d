use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::aggregate::HistogramScale;
use crate::schedule::ScheduleStep;

use super::parsers::{
    parse_chunk_size, parse_duration_arg, parse_histogram_scale, parse_schedule_step,
};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Load-plan generation and windowed result aggregation for load tests - exact arrival schedules, multi-source watermark joins, per-bucket statistics."
)]
pub struct VolleyArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML or JSON). Defaults to volley.toml / volley.json.
    #[arg(long = "config", short = 'c', global = true, env = "VOLLEY_CONFIG")]
    pub config: Option<String>,

    /// Enable debug logging (overridden by VOLLEY_LOG / RUST_LOG)
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the request timestamps (ms) of a rate schedule
    Plan(PlanArgs),
    /// Print the worker start events of an instance schedule
    Instances(InstancesArgs),
    /// Aggregate phout result logs into per-second JSONL statistics
    Aggregate(AggregateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    /// Schedule steps, e.g. "line(1, 100, 1m)" "const(100, 5m)". Falls back
    /// to rps_schedule from the config file.
    #[arg(value_name = "STEP", value_parser = parse_schedule_step)]
    pub steps: Vec<ScheduleStep>,

    /// Print plan duration, request count and per-second rate steps as JSON
    #[arg(long = "info")]
    pub info: bool,

    /// Stop after this many timestamps
    #[arg(long = "limit")]
    pub limit: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct InstancesArgs {
    /// Schedule steps, e.g. "ramp(10, 30s)" "const(10, 1m)". Falls back to
    /// instances_schedule from the config file.
    #[arg(value_name = "STEP", value_parser = parse_schedule_step)]
    pub steps: Vec<ScheduleStep>,

    /// Print plan duration, peak instances and steps as JSON
    #[arg(long = "info")]
    pub info: bool,
}

#[derive(Debug, Args, Clone)]
pub struct AggregateArgs {
    /// Phout files; each one is a separate source for the time-window join
    #[arg(value_name = "PHOUT", required = true)]
    pub files: Vec<PathBuf>,

    /// Bucket width (supports ms/s/m/h, bare numbers are seconds)
    #[arg(long = "bucket", value_parser = parse_duration_arg)]
    pub bucket: Option<Duration>,

    /// Histogram bin table
    #[arg(long = "histogram", value_parser = parse_histogram_scale)]
    pub histogram: Option<HistogramScale>,

    /// Skip the all-tags result emitted ahead of each bucket's per-tag results
    #[arg(long = "no-overall")]
    pub no_overall: bool,

    /// Warn when no file produced rows for this long
    #[arg(long = "stall-timeout", value_parser = parse_duration_arg)]
    pub stall_timeout: Option<Duration>,

    /// Bytes read from each file per poll
    #[arg(long = "chunk-size", value_parser = parse_chunk_size)]
    pub chunk_size: Option<usize>,
}
