use crate::shutdown::{StopMode, StopSender};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Escalates the stop mode on signals: the first Ctrl+C asks for a drain,
/// the second (or SIGTERM) aborts. The task ends once the mode is `Abort`.
pub fn setup_signal_stop_handler(stop_tx: &StopSender) -> tokio::task::JoinHandle<()> {
    let stop_tx = stop_tx.clone();
    tokio::spawn(async move {
        let mut stop_rx = stop_tx.subscribe();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        loop {
            if *stop_rx.borrow_and_update() == StopMode::Abort {
                break;
            }

            #[cfg(unix)]
            let terminate = async {
                if let Some(signal) = term_signal.as_mut() {
                    signal.recv().await;
                } else {
                    std::future::pending::<()>().await;
                }
            };
            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    let next = escalate(*stop_tx.borrow());
                    tracing::info!("Interrupt received, switching to {:?}", next);
                    stop_tx.send_replace(next);
                }
                () = terminate => {
                    tracing::info!("SIGTERM received, aborting");
                    stop_tx.send_replace(StopMode::Abort);
                }
            }
        }
    })
}

const fn escalate(current: StopMode) -> StopMode {
    match current {
        StopMode::Running => StopMode::Drain,
        StopMode::Drain | StopMode::Abort => StopMode::Abort,
    }
}
