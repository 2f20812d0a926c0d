//! Per-bucket statistics.
//!
//! [`WindowAggregator`] turns one released [`Bucket`] into one
//! [`AggregateResult`] per tag, plus an optional "overall" result covering
//! every row of the bucket. It keeps no state between buckets.
mod bins;
mod quantiles;


use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{Field, ResultRow};
use crate::error::ConfigError;
use crate::join::{Bucket, DEFAULT_BUCKET_WIDTH_US};

pub use bins::{HistogramScale, bin_index};
pub use quantiles::{PERCENTILES, QuantileHistogram};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Total,
    Mean,
    Min,
    Max,
    Len,
    Count,
    Hist,
    #[serde(rename = "q")]
    Quantiles,
}

impl Statistic {
    pub const ALL: [Statistic; 8] = [
        Statistic::Total,
        Statistic::Mean,
        Statistic::Min,
        Statistic::Max,
        Statistic::Len,
        Statistic::Count,
        Statistic::Hist,
        Statistic::Quantiles,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Statistic::Total => "total",
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Len => "len",
            Statistic::Count => "count",
            Statistic::Hist => "hist",
            Statistic::Quantiles => "q",
        }
    }

    /// Statistics that still mean something for label-like fields.
    #[must_use]
    pub const fn applies_to_categorical(self) -> bool {
        matches!(self, Statistic::Count | Statistic::Len)
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Statistic::ALL
            .into_iter()
            .find(|statistic| statistic.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownStatistic {
                name: name.to_owned(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Counts(BTreeMap<String, u64>),
    Histogram { bins: Vec<i64>, data: Vec<u64> },
    Quantiles { q: Vec<u8>, value: Vec<u64> },
}

pub type FieldMetrics = BTreeMap<Statistic, StatValue>;

/// Summary of one tag (or of every row, when `tag` is `None`) in one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub tag: Option<String>,
    pub bucket_key: i64,
    pub metrics: BTreeMap<Field, FieldMetrics>,
}

impl AggregateResult {
    #[must_use]
    pub fn metric(&self, field: Field, statistic: Statistic) -> Option<&StatValue> {
        self.metrics.get(&field)?.get(&statistic)
    }
}

/// Runtime aggregation settings, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub fields: BTreeMap<Field, Vec<Statistic>>,
    pub histogram: HistogramScale,
    pub overall: bool,
    pub bucket_width_us: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        let timing = [
            Statistic::Total,
            Statistic::Max,
            Statistic::Min,
            Statistic::Len,
        ];
        let mut fields = BTreeMap::new();
        fields.insert(
            Field::IntervalReal,
            vec![
                Statistic::Total,
                Statistic::Max,
                Statistic::Min,
                Statistic::Hist,
                Statistic::Quantiles,
                Statistic::Len,
            ],
        );
        for field in [
            Field::ConnectTime,
            Field::SendTime,
            Field::Latency,
            Field::ReceiveTime,
            Field::IntervalEvent,
            Field::SizeOut,
            Field::SizeIn,
        ] {
            fields.insert(field, timing.to_vec());
        }
        fields.insert(Field::NetCode, vec![Statistic::Count]);
        fields.insert(Field::ProtoCode, vec![Statistic::Count]);
        Self {
            fields,
            histogram: HistogramScale::default(),
            overall: true,
            bucket_width_us: DEFAULT_BUCKET_WIDTH_US,
        }
    }
}

impl AggregatorConfig {
    /// Field config for just the listed pairs, everything else default.
    ///
    /// # Errors
    ///
    /// Returns an error when a statistic is not meaningful for its field.
    pub fn with_fields<I>(fields: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (Field, Vec<Statistic>)>,
    {
        let config = Self {
            fields: fields.into_iter().collect(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an error when a categorical field asks for a numeric
    /// statistic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, statistics) in &self.fields {
            if !field.is_categorical() {
                continue;
            }
            if let Some(statistic) = statistics
                .iter()
                .find(|statistic| !statistic.applies_to_categorical())
            {
                return Err(ConfigError::StatisticNotApplicable {
                    field: field.as_str(),
                    statistic: statistic.as_str(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WindowAggregator {
    config: AggregatorConfig,
    edges: &'static [i64],
}

impl WindowAggregator {
    #[must_use]
    pub fn new(config: AggregatorConfig) -> Self {
        let edges = config.histogram.edges();
        Self { config, edges }
    }

    #[must_use]
    pub const fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Summarises one bucket: the overall result first (when enabled), then
    /// one result per tag in tag order. An empty bucket yields nothing.
    #[must_use]
    pub fn aggregate(&self, bucket: &Bucket) -> Vec<AggregateResult> {
        if bucket.rows.is_empty() {
            return Vec::new();
        }
        let started = Instant::now();
        let mut by_tag: BTreeMap<&str, Vec<&ResultRow>> = BTreeMap::new();
        for row in &bucket.rows {
            by_tag.entry(row.tag.as_str()).or_default().push(row);
        }

        let mut results = Vec::with_capacity(by_tag.len().saturating_add(1));
        if self.config.overall {
            let all: Vec<&ResultRow> = bucket.rows.iter().collect();
            results.push(AggregateResult {
                tag: None,
                bucket_key: bucket.key,
                metrics: self.summarise(&all),
            });
        }
        for (tag, rows) in by_tag {
            results.push(AggregateResult {
                tag: Some(tag.to_owned()),
                bucket_key: bucket.key,
                metrics: self.summarise(&rows),
            });
        }
        debug!(
            "Aggregated bucket {} ({} rows, {} results) in {:?}",
            bucket.key,
            bucket.rows.len(),
            results.len(),
            started.elapsed()
        );
        results
    }

    fn summarise(&self, rows: &[&ResultRow]) -> BTreeMap<Field, FieldMetrics> {
        let mut metrics = BTreeMap::new();
        for (field, statistics) in &self.config.fields {
            let values: Vec<i64> = rows.iter().map(|row| row.value(*field)).collect();
            let mut field_metrics = FieldMetrics::new();
            for statistic in statistics {
                if let Some(value) = self.compute(*statistic, &values) {
                    field_metrics.insert(*statistic, value);
                }
            }
            metrics.insert(*field, field_metrics);
        }
        metrics
    }

    fn compute(&self, statistic: Statistic, values: &[i64]) -> Option<StatValue> {
        match statistic {
            Statistic::Total => Some(StatValue::Int(total(values))),
            Statistic::Mean => mean(values).map(StatValue::Float),
            Statistic::Min => values.iter().min().copied().map(StatValue::Int),
            Statistic::Max => values.iter().max().copied().map(StatValue::Int),
            Statistic::Len => Some(StatValue::Int(
                i64::try_from(values.len()).unwrap_or(i64::MAX),
            )),
            Statistic::Count => Some(StatValue::Counts(frequencies(values))),
            Statistic::Hist => Some(self.histogram(values)),
            Statistic::Quantiles => quantiles(values),
        }
    }

    fn histogram(&self, values: &[i64]) -> StatValue {
        let mut counts = vec![0_u64; self.edges.len()];
        for value in values {
            if let Some(slot) = counts.get_mut(bin_index(self.edges, *value)) {
                *slot = slot.saturating_add(1);
            }
        }
        let (bins, data): (Vec<i64>, Vec<u64>) = self
            .edges
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(edge, count)| (*edge, count))
            .unzip();
        StatValue::Histogram { bins, data }
    }
}

fn total(values: &[i64]) -> i64 {
    values
        .iter()
        .fold(0_i64, |sum, value| sum.saturating_add(*value))
}

#[expect(
    clippy::float_arithmetic,
    reason = "The mean is reported as a float."
)]
fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i128 = values.iter().map(|value| i128::from(*value)).sum();
    Some(sum as f64 / values.len() as f64)
}

fn frequencies(values: &[i64]) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for value in values {
        let slot = counts.entry(*value).or_default();
        *slot = slot.saturating_add(1);
    }
    counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect()
}

fn quantiles(values: &[i64]) -> Option<StatValue> {
    let mut hist = match QuantileHistogram::new() {
        Ok(hist) => hist,
        Err(err) => {
            warn!("Skipping quantiles: {}", err);
            return None;
        }
    };
    for value in values {
        if let Err(err) = hist.record(*value) {
            warn!("Skipping quantile sample: {}", err);
        }
    }
    let value = hist.quantiles();
    if value.is_empty() {
        return None;
    }
    Some(StatValue::Quantiles {
        q: PERCENTILES.to_vec(),
        value,
    })
}
