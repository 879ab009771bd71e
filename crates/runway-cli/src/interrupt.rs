//! Ctrl-C handling for a report run.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit status of a process stopped by SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cancels `cancel` on the first interrupt and calls `exit` on the second.
///
/// Returns once `exit` has been called or the signal source fails.
pub async fn watch_interrupts<S, F>(
    mut next_signal: S,
    cancel: CancellationToken,
    exit: impl FnOnce(),
) where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    while next_signal().await.is_ok() {
        if cancel.is_cancelled() {
            warn!("interrupted again, exiting");
            exit();
            return;
        }
        warn!("interrupted, cancelling the run (press Ctrl-C again to exit)");
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io;

    use super::*;

    #[tokio::test]
    async fn first_interrupt_cancels_second_exits() {
        let cancel = CancellationToken::new();
        let exited = Cell::new(false);

        watch_interrupts(|| async { Ok(()) }, cancel.clone(), || exited.set(true)).await;

        assert!(cancel.is_cancelled());
        assert!(exited.get());
    }

    #[tokio::test]
    async fn failed_signal_source_stops_watching() {
        let cancel = CancellationToken::new();
        let exited = Cell::new(false);
        let mut received = 0;

        watch_interrupts(
            move || {
                received += 1;
                let signal = if received == 1 {
                    Ok(())
                } else {
                    Err(io::Error::other("signal handler unavailable"))
                };
                async move { signal }
            },
            cancel.clone(),
            || exited.set(true),
        )
        .await;

        assert!(cancel.is_cancelled());
        assert!(!exited.get());
    }
}
