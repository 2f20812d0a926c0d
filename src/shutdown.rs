use tokio::sync::watch;

/// What the drain task should do at its next cycle boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopMode {
    #[default]
    Running,
    /// Release every buffered bucket, then stop.
    Drain,
    /// Stop now and discard buffered buckets.
    Abort,
}

pub type StopSender = watch::Sender<StopMode>;
pub type StopReceiver = watch::Receiver<StopMode>;

#[must_use]
pub fn stop_channel() -> (StopSender, StopReceiver) {
    watch::channel(StopMode::Running)
}
