use std::path::PathBuf;

use crate::aggregate::AggregatorConfig;
use crate::pipeline::PipelineConfig;
use crate::plan::{InstancePlan, LoadPlan};

/// Everything a command needs, resolved from CLI arguments and config.
#[derive(Debug)]
pub(crate) enum RunPlan {
    Rate(RatePlan),
    Instances(InstancesPlan),
    Aggregate(AggregatePlan),
}

#[derive(Debug)]
pub(crate) struct RatePlan {
    pub(crate) plan: LoadPlan,
    pub(crate) info: bool,
    pub(crate) limit: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct InstancesPlan {
    pub(crate) plan: InstancePlan,
    pub(crate) info: bool,
}

#[derive(Debug)]
pub(crate) struct AggregatePlan {
    pub(crate) files: Vec<PathBuf>,
    pub(crate) aggregator: AggregatorConfig,
    pub(crate) pipeline: PipelineConfig,
    pub(crate) chunk_size: Option<usize>,
}
