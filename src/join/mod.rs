//! Multi-source time-window join.
//!
//! [`TimeWindowJoiner`] pulls batches from several labeled sources, files
//! their rows into time buckets, and releases a bucket only once every
//! active source has moved past it. Releasing is driven by a watermark: the
//! smallest "most recent bucket" across active sources, minus one.
#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, warn};

use crate::data::{Batch, ResultRow};
use crate::error::{DataError, JoinError};

/// Default bucket width: one second, in microseconds.
pub const DEFAULT_BUCKET_WIDTH_US: i64 = 1_000_000;

/// Result of asking a source for more data.
#[derive(Debug)]
pub enum SourcePoll {
    Ready(Batch),
    Malformed(DataError),
    Pending,
    Exhausted,
}

/// A labeled producer of result batches.
///
/// `poll_batch` must not block; return [`SourcePoll::Pending`] when nothing
/// is available yet.
pub trait BatchSource {
    fn label(&self) -> &str;

    fn poll_batch(&mut self) -> SourcePoll;
}

/// Adapts any iterator of polls into a [`BatchSource`]; the source is
/// exhausted once the iterator ends.
#[derive(Debug)]
pub struct IterSource<I> {
    label: String,
    polls: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = SourcePoll>,
{
    pub fn new(label: impl Into<String>, polls: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            label: label.into(),
            polls: polls.into_iter(),
        }
    }
}

impl<I> BatchSource for IterSource<I>
where
    I: Iterator<Item = SourcePoll>,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn poll_batch(&mut self) -> SourcePoll {
        self.polls.next().unwrap_or(SourcePoll::Exhausted)
    }
}

pub type BoxedSource = Box<dyn BatchSource + Send>;

/// All rows of one time bucket, across every source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub key: i64,
    pub rows: Vec<ResultRow>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub cycles: u64,
    pub rows: u64,
    pub buckets_emitted: u64,
    pub malformed_batches: u64,
    pub regressions: u64,
}

/// What one pull cycle produced.
#[derive(Debug, Default)]
pub struct Cycle {
    /// Buckets released this cycle, ascending by key.
    pub buckets: Vec<Bucket>,
    /// Whether any source delivered rows.
    pub progressed: bool,
    /// Every source is exhausted and nothing is buffered.
    pub finished: bool,
}

struct SourceSlot {
    source: BoxedSource,
    recent: Option<i64>,
}

pub struct TimeWindowJoiner {
    active: Vec<SourceSlot>,
    buckets: BTreeMap<i64, Vec<ResultRow>>,
    bucket_width_us: i64,
    emitted_through: Option<i64>,
    stats: JoinStats,
}

impl TimeWindowJoiner {
    /// # Errors
    ///
    /// Returns an error when two sources share a label.
    pub fn new(sources: Vec<BoxedSource>, bucket_width_us: i64) -> Result<Self, JoinError> {
        let mut labels = HashSet::new();
        for source in &sources {
            if !labels.insert(source.label().to_owned()) {
                return Err(JoinError::DuplicateSource {
                    label: source.label().to_owned(),
                });
            }
        }
        Ok(Self {
            active: sources
                .into_iter()
                .map(|source| SourceSlot {
                    source,
                    recent: None,
                })
                .collect(),
            buckets: BTreeMap::new(),
            bucket_width_us: bucket_width_us.max(1),
            emitted_through: None,
            stats: JoinStats::default(),
        })
    }

    #[must_use]
    pub const fn stats(&self) -> JoinStats {
        self.stats
    }

    #[must_use]
    pub fn active_sources(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn buffered_buckets(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.active.is_empty() && self.buckets.is_empty()
    }

    /// Bucket key for a timestamp.
    #[must_use]
    pub fn bucket_key(&self, timestamp_us: i64) -> i64 {
        timestamp_us
            .checked_div_euclid(self.bucket_width_us)
            .unwrap_or(timestamp_us)
    }

    /// Pulls one item from every active source and releases the buckets
    /// that are now behind the watermark.
    ///
    /// # Errors
    ///
    /// Returns [`JoinError::LateRow`] when a source delivers a row for a
    /// bucket that was already released. The joiner must not be used after
    /// that.
    pub fn poll_cycle(&mut self) -> Result<Cycle, JoinError> {
        self.stats.cycles = self.stats.cycles.saturating_add(1);
        let mut progressed = false;
        let mut idx = 0;
        while idx < self.active.len() {
            let poll = match self.active.get_mut(idx) {
                Some(slot) => slot.source.poll_batch(),
                None => break,
            };
            match poll {
                SourcePoll::Ready(batch) => {
                    progressed |= !batch.is_empty();
                    self.absorb(idx, batch)?;
                    idx = idx.saturating_add(1);
                }
                SourcePoll::Malformed(err) => {
                    self.stats.malformed_batches = self.stats.malformed_batches.saturating_add(1);
                    if let Some(slot) = self.active.get(idx) {
                        warn!(
                            "Dropping malformed batch from '{}': {}",
                            slot.source.label(),
                            err
                        );
                    }
                    idx = idx.saturating_add(1);
                }
                SourcePoll::Pending => idx = idx.saturating_add(1),
                SourcePoll::Exhausted => {
                    let slot = self.active.remove(idx);
                    debug!("Source '{}' exhausted", slot.source.label());
                }
            }
        }

        let buckets = if self.active.is_empty() {
            self.flush()
        } else {
            match self.watermark() {
                Some(watermark) => self.release_through(watermark),
                None => Vec::new(),
            }
        };
        Ok(Cycle {
            buckets,
            progressed,
            finished: self.is_finished(),
        })
    }

    /// Releases every buffered bucket regardless of the watermark.
    pub fn flush(&mut self) -> Vec<Bucket> {
        self.release_through(i64::MAX)
    }

    fn absorb(&mut self, idx: usize, batch: Batch) -> Result<(), JoinError> {
        let width = self.bucket_width_us;
        let key_of = |row: &ResultRow| {
            row.timestamp_us
                .checked_div_euclid(width)
                .unwrap_or(row.timestamp_us)
        };
        let Some(slot) = self.active.get_mut(idx) else {
            return Ok(());
        };
        let label = slot.source.label().to_owned();
        let rows = batch.into_rows();
        let Some(batch_recent) = rows.iter().map(key_of).max() else {
            return Ok(());
        };

        if let Some(emitted_through) = self.emitted_through {
            if let Some(late) = rows.iter().map(key_of).find(|key| *key <= emitted_through) {
                let err = JoinError::LateRow {
                    source_label: label,
                    key: late,
                    emitted_through,
                };
                error!("{}", err);
                return Err(err);
            }
        }

        match slot.recent {
            Some(recent) if batch_recent < recent => {
                self.stats.regressions = self.stats.regressions.saturating_add(1);
                warn!(
                    "Source '{}' went back from bucket {} to {}; merging into open buckets",
                    label, recent, batch_recent
                );
            }
            Some(_) | None => slot.recent = Some(batch_recent),
        }

        self.stats.rows = self
            .stats
            .rows
            .saturating_add(u64::try_from(rows.len()).unwrap_or(u64::MAX));
        for row in rows {
            self.buckets.entry(key_of(&row)).or_default().push(row);
        }
        Ok(())
    }

    /// `min(recent) - 1` over active sources; `None` while any active source
    /// has not reported yet.
    fn watermark(&self) -> Option<i64> {
        let mut lowest: Option<i64> = None;
        for slot in &self.active {
            let recent = slot.recent?;
            lowest = Some(lowest.map_or(recent, |current| current.min(recent)));
        }
        lowest.map(|recent| recent.saturating_sub(1))
    }

    fn release_through(&mut self, watermark: i64) -> Vec<Bucket> {
        let kept = match watermark.checked_add(1) {
            Some(first_kept) => self.buckets.split_off(&first_kept),
            None => BTreeMap::new(),
        };
        let ready = std::mem::replace(&mut self.buckets, kept);
        let released: Vec<Bucket> = ready
            .into_iter()
            .map(|(key, rows)| Bucket { key, rows })
            .collect();
        if let Some(last) = released.last() {
            self.emitted_through = Some(last.key);
            self.stats.buckets_emitted = self
                .stats
                .buckets_emitted
                .saturating_add(u64::try_from(released.len()).unwrap_or(u64::MAX));
            debug!("Released {} buckets through {}", released.len(), last.key);
        }
        released
    }
}
