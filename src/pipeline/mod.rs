//! Joiner → aggregator → bounded queue, driven by one tokio task.
//!
//! The drain task pulls a cycle from the [`TimeWindowJoiner`], aggregates
//! every released bucket and pushes the results into a bounded channel.
//! Sources are pulled on tokio's blocking pool, since a pull may read a
//! file. When no source has anything to offer it sleeps `poll_interval`; when that
//! goes on for `stall_timeout` the consumer gets a
//! [`PipelineEvent::Stalled`] notice. A [`StopMode`] watch channel is
//! checked between cycles.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregateResult, AggregatorConfig, WindowAggregator};
use crate::error::{JoinError, PipelineError};
use crate::join::{BoxedSource, Cycle, JoinStats, TimeWindowJoiner};
use crate::shutdown::{StopMode, StopReceiver};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub poll_interval: Duration,
    pub stall_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Result(AggregateResult),
    /// No source produced rows for `idle`. Reported once per quiet spell.
    Stalled { idle: Duration },
}

/// Outcome of a bounded wait on the results channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsPoll {
    Event(PipelineEvent),
    Timeout,
    /// The drain task has ended and every event was consumed.
    Finished,
}

#[derive(Debug)]
pub struct PipelineResults {
    rx: mpsc::Receiver<PipelineEvent>,
}

impl PipelineResults {
    pub async fn recv_timeout(&mut self, timeout: Duration) -> ResultsPoll {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(event)) => ResultsPoll::Event(event),
            Ok(None) => ResultsPoll::Finished,
            Err(_elapsed) => ResultsPoll::Timeout,
        }
    }

    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        self.rx.recv().await
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub join: JoinStats,
    pub results: u64,
    pub stalls: u64,
    pub stopped_by: Option<StopMode>,
}

/// Handle on the spawned drain task.
#[derive(Debug)]
pub struct PipelineTask {
    handle: JoinHandle<Result<PipelineStats, PipelineError>>,
}

impl PipelineTask {
    /// Waits for the drain task to end.
    ///
    /// # Errors
    ///
    /// Returns the task's own error (a join invariant violation) or
    /// [`PipelineError::DrainTask`] when the task panicked or was cancelled.
    pub async fn wait(self) -> Result<PipelineStats, PipelineError> {
        self.handle
            .await
            .map_err(|source| PipelineError::DrainTask { source })?
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

enum Delivery {
    Sent,
    Aborted,
    Closed,
}

pub struct Pipeline {
    joiner: TimeWindowJoiner,
    aggregator: WindowAggregator,
    config: PipelineConfig,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns an error when there are no sources or two share a label.
    pub fn new(
        sources: Vec<BoxedSource>,
        aggregator: AggregatorConfig,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        if sources.is_empty() {
            return Err(PipelineError::NoSources);
        }
        let joiner = TimeWindowJoiner::new(sources, aggregator.bucket_width_us)?;
        Ok(Self {
            joiner,
            aggregator: WindowAggregator::new(aggregator),
            config,
        })
    }

    /// Spawns the drain task on the current tokio runtime.
    #[must_use]
    pub fn spawn(self, stop_rx: StopReceiver) -> (PipelineResults, PipelineTask) {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        let handle = tokio::spawn(self.drain(tx, stop_rx));
        (PipelineResults { rx }, PipelineTask { handle })
    }

    async fn drain(
        self,
        tx: mpsc::Sender<PipelineEvent>,
        mut stop_rx: StopReceiver,
    ) -> Result<PipelineStats, PipelineError> {
        let Self {
            mut joiner,
            aggregator,
            config,
        } = self;
        let mut stats = PipelineStats::default();
        let mut last_progress = Instant::now();
        let mut stall_reported = false;
        info!("Pipeline started with {} sources", joiner.active_sources());

        loop {
            let mode = *stop_rx.borrow_and_update();
            match mode {
                StopMode::Running => {}
                StopMode::Drain => {
                    let buckets = joiner.flush();
                    debug!("Draining {} buffered buckets", buckets.len());
                    for bucket in buckets {
                        for result in aggregator.aggregate(&bucket) {
                            match deliver(&tx, &mut stop_rx, PipelineEvent::Result(result)).await {
                                Delivery::Sent => stats.results = stats.results.saturating_add(1),
                                Delivery::Aborted => {
                                    return Ok(finish(&joiner, stats, Some(StopMode::Abort)));
                                }
                                Delivery::Closed => {
                                    warn!("Results receiver dropped while draining");
                                    return Ok(finish(&joiner, stats, None));
                                }
                            }
                        }
                    }
                    return Ok(finish(&joiner, stats, Some(StopMode::Drain)));
                }
                StopMode::Abort => {
                    debug!("Aborting with {} buffered buckets", joiner.buffered_buckets());
                    return Ok(finish(&joiner, stats, Some(StopMode::Abort)));
                }
            }

            let (returned, polled) = pull(joiner).await?;
            joiner = returned;
            let cycle = match polled {
                Ok(cycle) => cycle,
                Err(err) => {
                    error!("Pipeline stopped: {}", err);
                    return Err(err.into());
                }
            };

            for bucket in &cycle.buckets {
                for result in aggregator.aggregate(bucket) {
                    match deliver(&tx, &mut stop_rx, PipelineEvent::Result(result)).await {
                        Delivery::Sent => stats.results = stats.results.saturating_add(1),
                        Delivery::Aborted => {
                            return Ok(finish(&joiner, stats, Some(StopMode::Abort)));
                        }
                        Delivery::Closed => {
                            warn!("Results receiver dropped; stopping pipeline");
                            return Ok(finish(&joiner, stats, None));
                        }
                    }
                }
            }

            if cycle.finished {
                return Ok(finish(&joiner, stats, None));
            }
            if cycle.progressed {
                last_progress = Instant::now();
                stall_reported = false;
                tokio::task::yield_now().await;
                continue;
            }

            let idle = last_progress.elapsed();
            if !stall_reported && idle >= config.stall_timeout {
                warn!("No data from any source for {:?}", idle);
                stall_reported = true;
                stats.stalls = stats.stalls.saturating_add(1);
                match deliver(&tx, &mut stop_rx, PipelineEvent::Stalled { idle }).await {
                    Delivery::Sent => {}
                    Delivery::Aborted => {
                        return Ok(finish(&joiner, stats, Some(StopMode::Abort)));
                    }
                    Delivery::Closed => return Ok(finish(&joiner, stats, None)),
                }
            }

            tokio::select! {
                () = tokio::time::sleep(config.poll_interval) => {}
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        // Nobody can ask us to stop any more; keep polling.
                        tokio::time::sleep(config.poll_interval).await;
                    }
                }
            }
        }
    }
}

/// Runs one pull cycle on the blocking pool; sources may do file I/O.
async fn pull(
    mut joiner: TimeWindowJoiner,
) -> Result<(TimeWindowJoiner, Result<Cycle, JoinError>), PipelineError> {
    tokio::task::spawn_blocking(move || {
        let polled = joiner.poll_cycle();
        (joiner, polled)
    })
    .await
    .map_err(|source| PipelineError::DrainTask { source })
}

fn finish(
    joiner: &TimeWindowJoiner,
    mut stats: PipelineStats,
    stopped_by: Option<StopMode>,
) -> PipelineStats {
    stats.join = joiner.stats();
    stats.stopped_by = stopped_by;
    info!(
        "Pipeline finished: {} results, {} rows, {} malformed batches",
        stats.results, stats.join.rows, stats.join.malformed_batches
    );
    stats
}

/// Sends with backpressure; gives up only on abort or a closed receiver.
async fn deliver(
    tx: &mpsc::Sender<PipelineEvent>,
    stop_rx: &mut StopReceiver,
    event: PipelineEvent,
) -> Delivery {
    tokio::select! {
        biased;
        sent = tx.send(event) => {
            if sent.is_ok() { Delivery::Sent } else { Delivery::Closed }
        }
        () = wait_for_abort(stop_rx) => Delivery::Aborted,
    }
}

async fn wait_for_abort(stop_rx: &mut StopReceiver) {
    if stop_rx
        .wait_for(|mode| *mode == StopMode::Abort)
        .await
        .is_err()
    {
        std::future::pending::<()>().await;
    }
}
