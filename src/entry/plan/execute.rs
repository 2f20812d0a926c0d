use std::fs::File;
use std::io::{BufWriter, Write};

use tracing::{info, warn};

use crate::data::PhoutReader;
use crate::error::{AppError, AppResult, DataError};
use crate::join::BoxedSource;
use crate::pipeline::{Pipeline, PipelineEvent};
use crate::shutdown::{StopMode, stop_channel};
use crate::shutdown_handlers::setup_signal_stop_handler;

use super::types::{AggregatePlan, InstancesPlan, RatePlan, RunPlan};

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    match plan {
        RunPlan::Rate(plan) => print_rate_plan(&plan),
        RunPlan::Instances(plan) => print_instances_plan(&plan),
        RunPlan::Aggregate(plan) => run_aggregate(plan).await,
    }
}

fn print_rate_plan(plan: &RatePlan) -> AppResult<()> {
    let mut out = BufWriter::new(std::io::stdout().lock());
    if plan.info {
        serde_json::to_writer_pretty(&mut out, &plan.plan.info())?;
        writeln!(out)?;
    } else {
        for offset_ms in plan.plan.iter().take(plan.limit.unwrap_or(usize::MAX)) {
            writeln!(out, "{}", offset_ms)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn print_instances_plan(plan: &InstancesPlan) -> AppResult<()> {
    let mut out = BufWriter::new(std::io::stdout().lock());
    if plan.info {
        serde_json::to_writer_pretty(&mut out, &plan.plan.info())?;
        writeln!(out)?;
    } else {
        for event in &plan.plan {
            writeln!(out, "{}\t{}", event.offset_ms, event.concurrency)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn open_sources(plan: &AggregatePlan) -> AppResult<Vec<BoxedSource>> {
    let mut sources: Vec<BoxedSource> = Vec::with_capacity(plan.files.len());
    for path in &plan.files {
        let file = File::open(path).map_err(|err| {
            AppError::data(DataError::Io {
                context: "opening phout file",
                source: err,
            })
        })?;
        let label = path.display().to_string();
        let mut reader = match plan.chunk_size {
            Some(chunk_size) => PhoutReader::with_chunk_size(label, file, chunk_size),
            None => PhoutReader::new(label, file),
        };
        // The files are complete, so end of input means the source is done.
        reader.close();
        sources.push(Box::new(reader));
    }
    Ok(sources)
}

async fn run_aggregate(plan: AggregatePlan) -> AppResult<()> {
    let sources = open_sources(&plan)?;
    let pipeline = Pipeline::new(sources, plan.aggregator, plan.pipeline)?;

    let (stop_tx, stop_rx) = stop_channel();
    let signal_handle = setup_signal_stop_handler(&stop_tx);
    let (mut results, task) = pipeline.spawn(stop_rx);

    let mut out = BufWriter::new(std::io::stdout());
    let mut written: u64 = 0;
    while let Some(event) = results.recv().await {
        match event {
            PipelineEvent::Result(result) => {
                serde_json::to_writer(&mut out, &result)?;
                writeln!(out)?;
                written = written.saturating_add(1);
            }
            PipelineEvent::Stalled { idle } => {
                warn!("No rows from any input for {:?}", idle);
            }
        }
    }
    out.flush()?;

    signal_handle.abort();
    let stats = task.wait().await?;
    if stats.stopped_by == Some(StopMode::Abort) {
        warn!("Aggregation aborted; buffered buckets were discarded");
    }
    info!(
        "Wrote {} results from {} rows ({} buckets, {} malformed batches)",
        written, stats.join.rows, stats.join.buckets_emitted, stats.join.malformed_batches
    );
    Ok(())
}
