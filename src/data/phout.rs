use std::io::{ErrorKind, Read};

use tracing::warn;

use crate::error::DataError;
use crate::join::{BatchSource, SourcePoll};

use super::{Batch, ResultRow};

const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
const MICROS_PER_SEC: i64 = 1_000_000;
const FRACTION_DIGITS: usize = 6;

const INTEGER_COLUMNS: [&str; 10] = [
    "interval_real",
    "connect_time",
    "send_time",
    "latency",
    "receive_time",
    "interval_event",
    "size_out",
    "size_in",
    "net_code",
    "proto_code",
];

/// Parses one tab-separated phout line.
///
/// The row timestamp is the receive time, `send_ts` plus `interval_real`, in
/// microseconds. Anything after the last `#` in the tag is dropped.
///
/// # Errors
///
/// Returns an error when a column is missing, extra columns follow, or a
/// value does not parse.
pub fn parse_phout_line(line: &str) -> Result<ResultRow, DataError> {
    let mut columns = line.split('\t');
    let mut next_column = |name: &'static str| {
        columns.next().ok_or_else(|| DataError::MissingField {
            field: name,
            line: line.to_owned(),
        })
    };
    let send_us = parse_send_ts(next_column("send_ts")?)?;
    let raw_tag = next_column("tag")?;
    let tag = raw_tag
        .rsplit_once('#')
        .map_or(raw_tag, |(prefix, _suffix)| prefix);
    let mut integers = [0_i64; 10];
    for (slot, name) in integers.iter_mut().zip(INTEGER_COLUMNS) {
        *slot = parse_integer(name, next_column(name)?)?;
    }
    let [
        interval_real,
        connect_time,
        send_time,
        latency,
        receive_time,
        interval_event,
        size_out,
        size_in,
        net_code,
        proto_code,
    ] = integers;
    if columns.next().is_some() {
        return Err(DataError::TrailingFields {
            line: line.to_owned(),
        });
    }

    let timestamp_us =
        send_us
            .checked_add(interval_real)
            .ok_or_else(|| DataError::TimestampOutOfRange {
                value: line.to_owned(),
            })?;

    Ok(ResultRow {
        timestamp_us,
        tag: tag.to_owned(),
        interval_real,
        connect_time,
        send_time,
        latency,
        receive_time,
        interval_event,
        size_out,
        size_in,
        net_code,
        proto_code,
    })
}

fn parse_integer(field: &'static str, value: &str) -> Result<i64, DataError> {
    value
        .trim()
        .parse()
        .map_err(|err| DataError::InvalidInteger {
            field,
            value: value.to_owned(),
            source: err,
        })
}

/// `<seconds>[.<fraction>]` to whole microseconds, without going through
/// floating point. Digits past the sixth fractional place are truncated.
fn parse_send_ts(value: &str) -> Result<i64, DataError> {
    let trimmed = value.trim();
    let invalid = || DataError::InvalidTimestamp {
        value: trimmed.to_owned(),
    };
    let out_of_range = || DataError::TimestampOutOfRange {
        value: trimmed.to_owned(),
    };
    let (secs, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if secs.is_empty() || !is_digits(secs) || !is_digits(fraction) {
        return Err(invalid());
    }

    let secs: i64 = secs.parse().map_err(|_err| out_of_range())?;
    let kept = fraction.get(..FRACTION_DIGITS).unwrap_or(fraction);
    let mut micros: i64 = 0;
    for digit in kept.bytes() {
        micros = micros
            .saturating_mul(10)
            .saturating_add(i64::from(digit.saturating_sub(b'0')));
    }
    for _ in kept.len()..FRACTION_DIGITS {
        micros = micros.saturating_mul(10);
    }

    secs.checked_mul(MICROS_PER_SEC)
        .and_then(|whole| whole.checked_add(micros))
        .ok_or_else(out_of_range)
}

fn is_digits(value: &str) -> bool {
    value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Incremental phout reader.
///
/// Each poll reads at most one chunk, parses every complete line and keeps
/// the trailing partial line for the next poll. End of input means "nothing
/// yet" until [`PhoutReader::close`] is called; after that it means the
/// source is exhausted. A read error other than an interrupt is reported
/// once as [`SourcePoll::Malformed`]; the buffered tail is then flushed and
/// the source ends.
#[derive(Debug)]
pub struct PhoutReader<R> {
    label: String,
    reader: R,
    chunk: Vec<u8>,
    pending: Vec<u8>,
    closed: bool,
    exhausted: bool,
    failed: bool,
    malformed_lines: u64,
}

impl<R> PhoutReader<R>
where
    R: Read,
{
    pub fn new(label: impl Into<String>, reader: R) -> Self {
        Self::with_chunk_size(label, reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(label: impl Into<String>, reader: R, chunk_size: usize) -> Self {
        Self {
            label: label.into(),
            reader,
            chunk: vec![0; chunk_size.max(1)],
            pending: Vec::new(),
            closed: false,
            exhausted: false,
            failed: false,
            malformed_lines: 0,
        }
    }

    /// Marks the writer side as finished: the next end of input exhausts the
    /// reader.
    pub const fn close(&mut self) {
        self.closed = true;
    }

    #[must_use]
    pub const fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }

    fn parse_lines(&mut self, text: &str) -> Batch {
        let mut rows = Vec::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_phout_line(line) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    self.malformed_lines = self.malformed_lines.saturating_add(1);
                    warn!("Dropping result line from '{}': {}", self.label, err);
                }
            }
        }
        Batch::new(rows)
    }

    fn finish(&mut self) -> SourcePoll {
        self.exhausted = true;
        if self.pending.is_empty() {
            return SourcePoll::Exhausted;
        }
        let tail = std::mem::take(&mut self.pending);
        let batch = self.parse_lines(&String::from_utf8_lossy(&tail));
        if batch.is_empty() {
            SourcePoll::Exhausted
        } else {
            SourcePoll::Ready(batch)
        }
    }
}

impl<R> BatchSource for PhoutReader<R>
where
    R: Read,
{
    fn label(&self) -> &str {
        &self.label
    }

    fn poll_batch(&mut self) -> SourcePoll {
        if self.exhausted {
            return SourcePoll::Exhausted;
        }
        if self.failed {
            return self.finish();
        }
        let read = match self.reader.read(&mut self.chunk) {
            Ok(read) => read,
            Err(err) if matches!(err.kind(), ErrorKind::Interrupted | ErrorKind::WouldBlock) => {
                return SourcePoll::Pending;
            }
            Err(err) => {
                warn!("Giving up on '{}' after read error: {}", self.label, err);
                self.failed = true;
                return SourcePoll::Malformed(DataError::Io {
                    context: "reading phout",
                    source: err,
                });
            }
        };
        if read == 0 {
            return if self.closed {
                self.finish()
            } else {
                SourcePoll::Pending
            };
        }

        self.pending
            .extend_from_slice(self.chunk.get(..read).unwrap_or_default());
        let Some(newline) = self.pending.iter().rposition(|byte| *byte == b'\n') else {
            return SourcePoll::Pending;
        };
        let complete: Vec<u8> = self.pending.drain(..=newline).collect();
        SourcePoll::Ready(self.parse_lines(&String::from_utf8_lossy(&complete)))
    }
}
