use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// `(first, last, step)` in microseconds, both ends included.
type Band = (i64, i64, i64);

const COMPACT_BANDS: [Band; 9] = [
    (0, 9_000, 1_000),
    (10_000, 90_000, 10_000),
    (100_000, 450_000, 50_000),
    (500_000, 500_000, 1),
    (600_000, 950_000, 50_000),
    (1_000_000, 4_500_000, 500_000),
    (5_000_000, 10_000_000, 500_000),
    (11_000_000, 15_000_000, 1_000_000),
    (20_000_000, 60_000_000, 5_000_000),
];

// 10us up to 5ms, then progressively coarser up to 1s steps at 300s.
const VERBOSE_BANDS: [Band; 8] = [
    (0, 4_990, 10),
    (5_000, 9_900, 100),
    (10_000, 499_000, 1_000),
    (500_000, 2_995_000, 5_000),
    (3_000_000, 9_990_000, 10_000),
    (10_000_000, 29_950_000, 50_000),
    (30_000_000, 119_900_000, 100_000),
    (120_000_000, 300_000_000, 1_000_000),
];

static COMPACT_EDGES: Lazy<Vec<i64>> = Lazy::new(|| expand(&COMPACT_BANDS));
static VERBOSE_EDGES: Lazy<Vec<i64>> = Lazy::new(|| expand(&VERBOSE_BANDS));

fn expand(bands: &[Band]) -> Vec<i64> {
    let mut edges = Vec::new();
    for &(first, last, step) in bands {
        let mut edge = first;
        while edge <= last {
            edges.push(edge);
            edge = match edge.checked_add(step.max(1)) {
                Some(next) => next,
                None => break,
            };
        }
    }
    edges
}

/// Which static bin-edge table `hist` uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramScale {
    /// 69 edges from 0 to 60s, millisecond resolution at the low end.
    #[default]
    Compact,
    /// 3721 edges from 0 to 300s, 10us resolution at the low end.
    Verbose,
}

impl HistogramScale {
    #[must_use]
    pub fn edges(self) -> &'static [i64] {
        match self {
            HistogramScale::Compact => &COMPACT_EDGES,
            HistogramScale::Verbose => &VERBOSE_EDGES,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HistogramScale::Compact => "compact",
            HistogramScale::Verbose => "verbose",
        }
    }
}

impl FromStr for HistogramScale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "compact" => Ok(HistogramScale::Compact),
            "verbose" => Ok(HistogramScale::Verbose),
            other => Err(ConfigError::InvalidHistogramScale {
                value: other.to_owned(),
            }),
        }
    }
}

/// Index of the half-open bin `[edges[i], edges[i + 1])` holding `value`.
///
/// Values below the first edge land in the first bin, values at or above
/// the last edge in the last one, so every value is counted.
#[must_use]
pub fn bin_index(edges: &[i64], value: i64) -> usize {
    edges
        .partition_point(|edge| *edge <= value)
        .saturating_sub(1)
}
