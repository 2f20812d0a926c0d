//! Result rows as they arrive from load generators.
mod phout;


use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DataError};

pub use phout::{PhoutReader, parse_phout_line};

/// One completed request. Timings are microseconds, sizes are bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultRow {
    pub timestamp_us: i64,
    pub tag: String,
    pub interval_real: i64,
    pub connect_time: i64,
    pub send_time: i64,
    pub latency: i64,
    pub receive_time: i64,
    pub interval_event: i64,
    pub size_out: i64,
    pub size_in: i64,
    pub net_code: i64,
    pub proto_code: i64,
}

impl ResultRow {
    #[must_use]
    pub const fn value(&self, field: Field) -> i64 {
        match field {
            Field::IntervalReal => self.interval_real,
            Field::ConnectTime => self.connect_time,
            Field::SendTime => self.send_time,
            Field::Latency => self.latency,
            Field::ReceiveTime => self.receive_time,
            Field::IntervalEvent => self.interval_event,
            Field::SizeOut => self.size_out,
            Field::SizeIn => self.size_in,
            Field::NetCode => self.net_code,
            Field::ProtoCode => self.proto_code,
        }
    }
}

/// Rows from one source, ordered by `timestamp_us`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Batch {
    rows: Vec<ResultRow>,
}

impl Batch {
    /// Orders `rows` by timestamp, keeping the arrival order of equal
    /// timestamps.
    #[must_use]
    pub fn new(mut rows: Vec<ResultRow>) -> Self {
        rows.sort_by_key(|row| row.timestamp_us);
        Self { rows }
    }

    /// Wraps rows that the producer promises are already ordered.
    ///
    /// # Errors
    ///
    /// Returns an error when a row is older than its predecessor.
    pub fn ordered(source_label: &str, rows: Vec<ResultRow>) -> Result<Self, DataError> {
        let unordered = rows
            .windows(2)
            .any(|pair| matches!(pair, [prev, next] if next.timestamp_us < prev.timestamp_us));
        if unordered {
            return Err(DataError::UnorderedBatch {
                source_label: source_label.to_owned(),
            });
        }
        Ok(Self { rows })
    }

    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<ResultRow> {
        self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn last_timestamp_us(&self) -> Option<i64> {
        self.rows.last().map(|row| row.timestamp_us)
    }
}

/// Per-row fields the aggregator can summarise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    IntervalReal,
    ConnectTime,
    SendTime,
    Latency,
    ReceiveTime,
    IntervalEvent,
    SizeOut,
    SizeIn,
    NetCode,
    ProtoCode,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::IntervalReal,
        Field::ConnectTime,
        Field::SendTime,
        Field::Latency,
        Field::ReceiveTime,
        Field::IntervalEvent,
        Field::SizeOut,
        Field::SizeIn,
        Field::NetCode,
        Field::ProtoCode,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Field::IntervalReal => "interval_real",
            Field::ConnectTime => "connect_time",
            Field::SendTime => "send_time",
            Field::Latency => "latency",
            Field::ReceiveTime => "receive_time",
            Field::IntervalEvent => "interval_event",
            Field::SizeOut => "size_out",
            Field::SizeIn => "size_in",
            Field::NetCode => "net_code",
            Field::ProtoCode => "proto_code",
        }
    }

    /// Codes are labels, not magnitudes; only frequency counts make sense.
    #[must_use]
    pub const fn is_categorical(self) -> bool {
        matches!(self, Field::NetCode | Field::ProtoCode)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownField {
                name: name.to_owned(),
            })
    }
}
