use hdrhistogram::Histogram;

/// Percent points reported by the `q` statistic.
pub const PERCENTILES: [u8; 9] = [50, 75, 80, 85, 90, 95, 98, 99, 100];

#[derive(Debug)]
pub struct QuantileHistogram {
    hist: Histogram<u64>,
}

impl QuantileHistogram {
    /// Create an auto-resizing histogram with three significant digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> Result<Self, String> {
        let hist = Histogram::<u64>::new(3)
            .map_err(|err| format!("Failed to create histogram: {}", err))?;
        Ok(Self { hist })
    }

    /// Record one value; negatives are clamped to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be recorded.
    pub fn record(&mut self, value: i64) -> Result<(), String> {
        let value = u64::try_from(value).unwrap_or(0);
        self.hist
            .record(value)
            .map_err(|err| format!("Failed to record value {}: {}", value, err))
    }

    /// Values at each of [`PERCENTILES`]; empty when nothing was recorded.
    #[must_use]
    pub fn quantiles(&self) -> Vec<u64> {
        if self.count() == 0 {
            return Vec::new();
        }
        PERCENTILES
            .iter()
            .map(|percent| self.hist.value_at_percentile(f64::from(*percent)))
            .collect()
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }
}
