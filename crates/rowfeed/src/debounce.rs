use core::time::Duration;
use tokio::{sync::watch, time::sleep};

/// Default quiet period before a configuration change is forwarded.
pub const DEFAULT_QUIET: Duration = Duration::from_millis(500);

/// Coalesces bursts of changes on a [`watch`] channel.
///
/// Each call to [`Debouncer::next`] waits for an unseen change, then keeps
/// restarting a `quiet` timer for as long as further changes arrive. Only the
/// value present once the timer runs out is returned; intermediate values
/// are never observed.
///
/// The value held by the channel when the debouncer is created counts as
/// already seen.
#[derive(Debug)]
pub struct Debouncer<T> {
    rx: watch::Receiver<T>,
    quiet: Duration,
}

impl<T: Clone> Debouncer<T> {
    pub fn new(mut rx: watch::Receiver<T>, quiet: Duration) -> Self {
        rx.mark_unchanged();
        Self { rx, quiet }
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Returns the settled value after the next burst of changes.
    ///
    /// Returns `None` once the sender is gone and no change is pending. If
    /// the sender goes away mid-burst, the latest value is returned
    /// immediately.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;

        loop {
            tokio::select! {
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = sleep(self.quiet) => break,
            }
        }

        Some(self.rx.borrow_and_update().clone())
    }
}
