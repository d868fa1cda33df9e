//! Background batch generator.
//!
//! The generator is a single Tokio task that owns its timer. It listens for
//! [`GeneratorRequest`]s on a bounded MPSC channel and publishes every batch
//! into a single-slot [`watch`] channel, so a slow consumer only ever sees the
//! most recent batch.
//!
//! At most one timer exists at any time: the schedule lives in an
//! `Option<Schedule>` owned by the task, and a `Configure` request drops the
//! old schedule before installing the new one.

use crate::{Error, RandSource, Record, Result, Settings, try_generate_batch};
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot, watch},
    task::{JoinHandle, spawn_blocking},
    time::{Instant, Interval, MissedTickBehavior, interval_at, timeout},
};
use tokio_util::sync::CancellationToken;

/// Capacity of the request channel into the generator task.
const REQUEST_BUFFER_SIZE: usize = 8;

/// How long [`Generator::terminate`] waits for the task before aborting it.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(3);

/// Batches larger than this are synthesized on the blocking pool so a big tick
/// does not stall other tasks on the same worker.
const INLINE_BATCH_LIMIT: usize = 10_000;

/// One timer tick's worth of records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    /// Number of `Configure` requests the generator had handled when this
    /// batch was produced.
    pub epoch: u64,
    /// 1-based tick count within the current epoch.
    pub tick: u64,
    pub records: Vec<Record>,
}

/// Latest-value slot shared between the generator and its consumers.
pub type BatchSlot = watch::Receiver<Option<Arc<Batch>>>;

/// Messages understood by [`generator_loop`].
#[derive(Debug)]
pub enum GeneratorRequest {
    /// Replace the current schedule (if any) with one built from `Settings`.
    Configure(Settings),
    /// Stop the task and acknowledge on `response`.
    Shutdown { response: oneshot::Sender<()> },
}

/// The single active timer and what it produces.
struct Schedule {
    ticker: Interval,
    array_size: usize,
    epoch: u64,
    tick: u64,
}

impl Schedule {
    fn new(settings: Settings, epoch: u64) -> Self {
        // A zero period would panic inside `interval_at`.
        let period = settings.period().max(Duration::from_millis(1));
        // First emission happens one full period after configuration.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ticker,
            array_size: settings.array_size,
            epoch,
            tick: 0,
        }
    }
}

async fn next_tick(schedule: &mut Option<Schedule>) {
    match schedule {
        Some(schedule) => {
            schedule.ticker.tick().await;
        }
        None => core::future::pending().await,
    }
}

/// Synthesizes one batch, handing the random source back afterwards.
///
/// Returns `None` if the blocking task panicked, taking the source with it.
async fn produce<R>(mut rng: R, array_size: usize) -> Option<(Result<Vec<Record>>, R)>
where
    R: RandSource + Send + 'static,
{
    if array_size <= INLINE_BATCH_LIMIT {
        let records = try_generate_batch(array_size, &mut rng);
        return Some((records, rng));
    }
    spawn_blocking(move || {
        let records = try_generate_batch(array_size, &mut rng);
        (records, rng)
    })
    .await
    .ok()
}

enum Event {
    Cancelled,
    Request(Option<GeneratorRequest>),
    Tick,
}

/// Generator task body.
///
/// Runs until the `token` is cancelled, a `Shutdown` request arrives, the
/// request channel closes, or every batch receiver has been dropped. A tick
/// whose batch cannot be allocated is skipped; the schedule stays active.
///
/// # Arguments
///
/// - `rx`: Receiver through which [`GeneratorRequest`]s arrive.
/// - `batch_tx`: Single-slot output; each tick replaces its content.
/// - `rng`: Random source owned by this task.
/// - `token`: Cancels the task immediately, dropping any pending tick.
pub async fn generator_loop<R>(
    mut rx: mpsc::Receiver<GeneratorRequest>,
    batch_tx: watch::Sender<Option<Arc<Batch>>>,
    mut rng: R,
    token: CancellationToken,
) where
    R: RandSource + Send + 'static,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Generator started");

    let mut schedule: Option<Schedule> = None;
    let mut epoch = 0;

    loop {
        let event = tokio::select! {
            biased;
            () = token.cancelled() => Event::Cancelled,
            req = rx.recv() => Event::Request(req),
            () = next_tick(&mut schedule) => Event::Tick,
        };

        match event {
            Event::Cancelled => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Generator cancelled");
                break;
            }
            Event::Request(Some(GeneratorRequest::Configure(settings))) => {
                // Drop the previous timer before the new one exists.
                if schedule.take().is_some() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Cancelled previous schedule (epoch {epoch})");
                }
                epoch += 1;
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Scheduling {} records every {}ms (epoch {epoch})",
                    settings.array_size,
                    settings.interval
                );
                schedule = Some(Schedule::new(settings, epoch));
            }
            Event::Request(Some(GeneratorRequest::Shutdown { response })) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Generator received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Generator failed to acknowledge shutdown");
                }
                break;
            }
            Event::Request(None) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Generator request channel closed");
                break;
            }
            Event::Tick => {
                let Some(active) = schedule.as_mut() else {
                    continue;
                };
                active.tick += 1;
                let Some((records, returned)) = produce(rng, active.array_size).await else {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Batch synthesis panicked, stopping generator");
                    break;
                };
                rng = returned;
                let records = match records {
                    Ok(records) => records,
                    Err(_e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("Skipping tick {}: {_e}", active.tick);
                        continue;
                    }
                };
                let batch = Batch {
                    epoch: active.epoch,
                    tick: active.tick,
                    records,
                };
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    "Emitting batch {}/{} ({} records)",
                    batch.epoch,
                    batch.tick,
                    batch.records.len()
                );
                if batch_tx.send(Some(Arc::new(batch))).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("No batch receivers left, stopping generator");
                    break;
                }
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Generator stopped");
}

/// Owning handle to a running generator task.
///
/// Dropping the handle cancels the task; [`Generator::terminate`] does the
/// same but also waits for it to finish.
#[derive(Debug)]
pub struct Generator {
    tx: mpsc::Sender<GeneratorRequest>,
    batches: BatchSlot,
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Generator {
    /// Spawns a generator task on the current Tokio runtime.
    ///
    /// The generator stays idle until the first [`Generator::configure`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::RuntimeUnavailable`] when called outside a Tokio
    /// runtime.
    pub fn spawn<R>(rng: R) -> Result<Self>
    where
        R: RandSource + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;

        let (tx, rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
        let (batch_tx, batches) = watch::channel(None);
        let token = CancellationToken::new();

        let task = handle.spawn(generator_loop(rx, batch_tx, rng, token.clone()));

        Ok(Self {
            tx,
            batches,
            token,
            task: Mutex::new(Some(task)),
        })
    }

    /// Replaces the active schedule. Takes effect from the next tick.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSettings`] if the interval is zero or the batch size
    ///   is too large.
    /// - [`Error::ServiceShutdown`] if the generator was terminated.
    /// - [`Error::ChannelError`] if the task is gone.
    pub async fn configure(&self, settings: Settings) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }
        // `Settings` fields are public; re-check what `Settings::new` enforces.
        let settings = Settings::new(settings.interval, settings.array_size)?;
        self.tx
            .send(GeneratorRequest::Configure(settings))
            .await
            .map_err(|e| Error::ChannelError {
                context: format!("Generator channel closed: {e}"),
            })
    }

    /// Returns a receiver of the latest batch.
    ///
    /// The slot holds `None` until the first tick.
    pub fn subscribe(&self) -> BatchSlot {
        self.batches.clone()
    }

    /// Whether [`Generator::terminate`] has been called.
    pub fn is_terminated(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the task is still able to emit batches.
    ///
    /// `false` after [`Generator::terminate`] and also once the task has
    /// exited on its own.
    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
            && self
                .task
                .lock()
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }

    /// Stops the generator task.
    ///
    /// - Sends a best-effort [`GeneratorRequest::Shutdown`] (never blocks).
    /// - Cancels the task's token so no further tick is emitted.
    /// - Waits up to 3 seconds for the task, then aborts it.
    ///
    /// Calling this more than once is a no-op.
    pub async fn terminate(&self) {
        let Some(task) = self.task.lock().take() else {
            return;
        };

        let (response, ack) = oneshot::channel();
        let acked = self
            .tx
            .try_send(GeneratorRequest::Shutdown { response })
            .is_ok();
        self.token.cancel();

        if acked {
            // The token usually wins the race; a dropped sender is fine too.
            let _ = timeout(TERMINATE_TIMEOUT, ack).await;
        }

        let abort = task.abort_handle();
        match timeout(TERMINATE_TIMEOUT, task).await {
            Ok(Ok(())) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Generator terminated");
            }
            Ok(Err(_e)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Generator task failed: {_e}");
            }
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Generator shutdown timed out, aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for Generator {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SeededRandom;
    use tokio::time::sleep;

    fn latest(slot: &BatchSlot) -> Option<Arc<Batch>> {
        slot.borrow().clone()
    }

    #[test]
    fn spawn_without_runtime_is_reported() {
        let err = Generator::spawn(SeededRandom::new(0)).unwrap_err();
        assert_eq!(err, Error::RuntimeUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_until_configured() {
        let generator = Generator::spawn(SeededRandom::new(0)).unwrap();
        let slot = generator.subscribe();
        sleep(Duration::from_secs(10)).await;
        assert!(latest(&slot).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn first_batch_after_one_interval() {
        let generator = Generator::spawn(SeededRandom::new(0)).unwrap();
        let slot = generator.subscribe();
        generator.configure(Settings::new(100, 3).unwrap()).await.unwrap();

        sleep(Duration::from_millis(50)).await;
        assert!(latest(&slot).is_none());

        sleep(Duration::from_millis(100)).await;
        let batch = latest(&slot).expect("one tick elapsed");
        assert_eq!(batch.epoch, 1);
        assert_eq!(batch.tick, 1);
        assert_eq!(batch.records.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn emits_once_per_interval() {
        let generator = Generator::spawn(SeededRandom::new(1)).unwrap();
        let mut slot = generator.subscribe();
        generator.configure(Settings::new(100, 2).unwrap()).await.unwrap();

        for expected in 1..=5 {
            slot.changed().await.unwrap();
            let batch = slot.borrow_and_update().clone().unwrap();
            assert_eq!(batch.tick, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconfigure_leaves_a_single_stream() {
        let generator = Generator::spawn(SeededRandom::new(2)).unwrap();
        let slot = generator.subscribe();

        generator.configure(Settings::new(100, 3).unwrap()).await.unwrap();
        sleep(Duration::from_millis(250)).await;
        let before = latest(&slot).unwrap();
        assert_eq!((before.epoch, before.tick), (1, 2));

        generator.configure(Settings::new(1000, 5).unwrap()).await.unwrap();
        sleep(Duration::from_millis(3500)).await;

        // A surviving 100ms timer would have overwritten the slot with an
        // epoch 1 batch long after the last 1000ms tick.
        let after = latest(&slot).unwrap();
        assert_eq!(after.epoch, 2);
        assert_eq!(after.tick, 3);
        assert_eq!(after.records.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_configures_keep_only_the_last() {
        let generator = Generator::spawn(SeededRandom::new(3)).unwrap();
        let mut slot = generator.subscribe();

        generator.configure(Settings::new(100, 1).unwrap()).await.unwrap();
        generator.configure(Settings::new(100, 4).unwrap()).await.unwrap();

        for expected in 1..=3 {
            slot.changed().await.unwrap();
            let batch = slot.borrow_and_update().clone().unwrap();
            assert_eq!(batch.epoch, 2);
            assert_eq!(batch.tick, expected);
            assert_eq!(batch.records.len(), 4);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_refused() {
        let generator = Generator::spawn(SeededRandom::new(6)).unwrap();
        let settings = Settings {
            interval: 0,
            array_size: 1,
        };
        assert!(matches!(
            generator.configure(settings).await,
            Err(Error::InvalidSettings { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unallocatable_batch_size_is_refused() {
        let generator = Generator::spawn(SeededRandom::new(7)).unwrap();
        let mut slot = generator.subscribe();
        let settings = Settings {
            interval: 10,
            array_size: usize::MAX / 2,
        };
        assert!(matches!(
            generator.configure(settings).await,
            Err(Error::InvalidSettings { .. })
        ));

        sleep(Duration::from_millis(100)).await;
        assert!(generator.is_running());
        generator.configure(Settings::new(10, 5).unwrap()).await.unwrap();
        slot.changed().await.unwrap();
        assert_eq!(slot.borrow_and_update().clone().unwrap().records.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_allocation_skips_the_tick() {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER_SIZE);
        let (batch_tx, mut slot) = watch::channel(None);
        let token = CancellationToken::new();
        let task = tokio::spawn(generator_loop(rx, batch_tx, SeededRandom::new(8), token.clone()));

        // Bypasses `Settings::new`, as a raw request sender could.
        let oversized = Settings {
            interval: 10,
            array_size: usize::MAX / 2,
        };
        tx.send(GeneratorRequest::Configure(oversized)).await.unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(slot.borrow().is_none());
        assert!(!task.is_finished());

        tx.send(GeneratorRequest::Configure(Settings::new(10, 5).unwrap()))
            .await
            .unwrap();
        slot.changed().await.unwrap();
        let batch = slot.borrow_and_update().clone().unwrap();
        assert_eq!((batch.epoch, batch.tick), (2, 1));
        assert_eq!(batch.records.len(), 5);

        token.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn large_batches_are_built_off_the_runtime() {
        let generator = Generator::spawn(SeededRandom::new(9)).unwrap();
        let mut slot = generator.subscribe();
        let size = INLINE_BATCH_LIMIT + 1;
        generator.configure(Settings::new(50, size).unwrap()).await.unwrap();

        for expected in 1..=2 {
            slot.changed().await.unwrap();
            let batch = slot.borrow_and_update().clone().unwrap();
            assert_eq!(batch.tick, expected);
            assert_eq!(batch.records.len(), size);
            assert_eq!(batch.records[size - 1].id, size.to_string());
        }
        assert!(generator.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_sized_batches_are_still_emitted() {
        let generator = Generator::spawn(SeededRandom::new(4)).unwrap();
        let mut slot = generator.subscribe();
        generator.configure(Settings::new(10, 0).unwrap()).await.unwrap();

        slot.changed().await.unwrap();
        let batch = slot.borrow_and_update().clone().unwrap();
        assert!(batch.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn terminate_stops_emission_and_is_idempotent() {
        let generator = Generator::spawn(SeededRandom::new(5)).unwrap();
        let slot = generator.subscribe();
        generator.configure(Settings::new(100, 1).unwrap()).await.unwrap();
        sleep(Duration::from_millis(350)).await;
        let last = latest(&slot).unwrap();

        assert!(generator.is_running());
        generator.terminate().await;
        generator.terminate().await;
        assert!(generator.is_terminated());
        assert!(!generator.is_running());

        sleep(Duration::from_secs(5)).await;
        assert_eq!(latest(&slot).unwrap(), last);
        assert_eq!(
            generator.configure(Settings::default()).await,
            Err(Error::ServiceShutdown)
        );
    }
}
