//! Display controller: configuration owner, settings relay and view builder.
//!
//! [`DisplayController`] ties the pieces together:
//!
//! - it owns the [`DisplayConfig`] in a [`watch`] channel; every edit feeds a
//!   [`Debouncer`] whose settled value is forwarded to the [`Generator`]
//! - a pump task moves each new [`Batch`] into
//!   [`DisplayController::on_batch_received`], which derives and publishes
//!   the bounded [`DisplayView`]
//! - [`DisplayController::shutdown`] cancels both tasks and terminates the
//!   generator
//!
//! Without a Tokio runtime the controller still works as a plain view
//! builder; it just never receives live batches.

use crate::{
    Batch, BatchSlot, ConfigEdit, DEFAULT_QUIET, Debouncer, DisplayConfig, Generator, RandSource,
    Record, Result, Settings, ThreadRandom, display_view,
};
use core::time::Duration;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::{runtime::Handle, sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// The bounded, possibly id-overridden view of the latest batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayView {
    /// Epoch of the batch this view was derived from (0 before any batch).
    pub epoch: u64,
    /// Tick of the batch this view was derived from (0 before any batch).
    pub tick: u64,
    pub records: Vec<Record>,
}

struct ViewState {
    all_records: Option<Arc<Batch>>,
    view: Arc<DisplayView>,
    closed: bool,
}

struct Inner {
    config_tx: watch::Sender<DisplayConfig>,
    view_tx: watch::Sender<Arc<DisplayView>>,
    state: Mutex<ViewState>,
    generator: Option<Generator>,
    shutdown_token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

/// Cheaply cloneable handle to a running display controller.
#[derive(Clone)]
pub struct DisplayController {
    inner: Arc<Inner>,
}

impl DisplayController {
    /// Starts a controller with a thread-local RNG and the default 500ms
    /// debounce window.
    pub fn start(config: DisplayConfig) -> Self {
        Self::start_with(config, ThreadRandom, DEFAULT_QUIET)
    }

    /// Starts a controller with an explicit random source and debounce
    /// window.
    ///
    /// When a Tokio runtime is available this spawns the generator, the
    /// debounced settings relay and the batch pump. Otherwise the controller
    /// runs degraded: no generator, no live updates, every other operation
    /// still works.
    ///
    /// The initial `config` is not forwarded to the generator; only later
    /// changes are. Call [`DisplayController::update_settings`] to start
    /// generation right away.
    pub fn start_with<R>(config: DisplayConfig, rng: R, quiet: Duration) -> Self
    where
        R: RandSource + Send + 'static,
    {
        let (config_tx, config_rx) = watch::channel(config);
        let (view_tx, _) = watch::channel(Arc::new(DisplayView::default()));
        let shutdown_token = CancellationToken::new();

        let generator = match Generator::spawn(rng) {
            Ok(generator) => Some(generator),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Generator unavailable, running without live updates: {_e}");
                None
            }
        };
        let batches = generator.as_ref().map(Generator::subscribe);

        let inner = Arc::new(Inner {
            config_tx,
            view_tx,
            state: Mutex::new(ViewState {
                all_records: None,
                view: Arc::new(DisplayView::default()),
                closed: false,
            }),
            generator,
            shutdown_token,
            tasks: Mutex::new(Vec::new()),
        });

        if let (Ok(handle), Some(batches)) = (Handle::try_current(), batches) {
            let token = inner.shutdown_token.clone();
            let relay = handle.spawn(relay_settings(
                Debouncer::new(config_rx, quiet),
                Arc::downgrade(&inner),
                token.clone(),
            ));
            let pump = handle.spawn(pump_batches(batches, Arc::downgrade(&inner), token));
            inner.tasks.lock().extend([relay, pump]);
        }

        Self { inner }
    }

    /// Replaces the whole configuration.
    ///
    /// The new `interval`/`array_size` reach the generator only after the
    /// debounce window passes without further changes. `additional_ids`
    /// applies from the next batch. Ignored after shutdown.
    pub fn on_configuration_changed(&self, config: DisplayConfig) {
        if self.inner.shutdown_token.is_cancelled() {
            return;
        }
        self.inner.config_tx.send_replace(config);
    }

    /// Applies a single-field edit, with the same semantics as
    /// [`DisplayController::on_configuration_changed`].
    pub fn apply_edit(&self, edit: ConfigEdit) {
        if self.inner.shutdown_token.is_cancelled() {
            return;
        }
        self.inner.config_tx.send_modify(|config| config.apply(edit));
    }

    /// Stores `batch` and publishes its display view.
    ///
    /// Returns `false`, leaving all state untouched, once the controller has
    /// been shut down.
    pub fn on_batch_received(&self, batch: impl Into<Arc<Batch>>) -> bool {
        let batch = batch.into();
        let additional_ids = self.inner.config_tx.borrow().additional_ids.clone();

        let view = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return false;
            }
            let view = Arc::new(DisplayView {
                epoch: batch.epoch,
                tick: batch.tick,
                records: display_view(&batch.records, &additional_ids),
            });
            state.all_records = Some(batch);
            state.view = Arc::clone(&view);
            view
        };

        self.inner.view_tx.send_replace(view);
        true
    }

    /// Sends `settings` straight to the generator.
    ///
    /// Returns `Ok(false)` without doing anything when there is no active
    /// generator (degraded mode or after shutdown).
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ChannelError`] if the generator task died.
    pub async fn update_settings(&self, settings: Settings) -> Result<bool> {
        match &self.inner.generator {
            Some(generator) if !generator.is_terminated() => {
                generator.configure(settings).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// The current display view.
    pub fn display_view(&self) -> Arc<DisplayView> {
        Arc::clone(&self.inner.state.lock().view)
    }

    /// The latest full batch, if any has arrived.
    pub fn all_records(&self) -> Option<Arc<Batch>> {
        self.inner.state.lock().all_records.clone()
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> DisplayConfig {
        self.inner.config_tx.borrow().clone()
    }

    /// Subscribes to view refreshes. Each published view marks the receiver
    /// as changed.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DisplayView>> {
        self.inner.view_tx.subscribe()
    }

    /// Whether a generator exists and its task is still running.
    pub fn is_live(&self) -> bool {
        self.inner
            .generator
            .as_ref()
            .is_some_and(Generator::is_running)
    }

    /// Tears the controller down.
    ///
    /// - Cancels the settings relay; a pending debounced change is dropped.
    /// - Stops accepting batches.
    /// - Terminates the generator, if one was created.
    /// - Waits for the background tasks to finish.
    ///
    /// Safe to call more than once and in degraded mode.
    pub async fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::info!("Shutting down display controller");

        self.inner.shutdown_token.cancel();
        self.inner.state.lock().closed = true;

        if let Some(generator) = &self.inner.generator {
            generator.terminate().await;
        }

        let tasks = core::mem::take(&mut *self.inner.tasks.lock());
        let joins = tasks.into_iter().map(|task| async move {
            if let Err(_e) = task.await {
                #[cfg(feature = "tracing")]
                tracing::error!("Controller task failed: {_e}");
            }
        });
        futures::future::join_all(joins).await;
    }
}

/// Forwards settled configuration changes to the generator.
async fn relay_settings(
    mut debouncer: Debouncer<DisplayConfig>,
    controller: Weak<Inner>,
    token: CancellationToken,
) {
    loop {
        let config = tokio::select! {
            biased;
            () = token.cancelled() => break,
            next = debouncer.next() => match next {
                Some(config) => config,
                None => break,
            },
        };

        let Some(inner) = controller.upgrade() else {
            break;
        };
        let controller = DisplayController { inner };

        match config.settings() {
            Ok(settings) => {
                if let Err(_e) = controller.update_settings(settings).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Failed to forward settings: {_e}");
                }
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Not forwarding configuration: {_e}");
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Settings relay stopped");
}

/// Moves each new batch from the generator into the controller.
async fn pump_batches(mut batches: BatchSlot, controller: Weak<Inner>, token: CancellationToken) {
    loop {
        let changed = tokio::select! {
            biased;
            () = token.cancelled() => break,
            changed = batches.changed() => changed,
        };
        if changed.is_err() {
            break;
        }

        let Some(batch) = batches.borrow_and_update().clone() else {
            continue;
        };
        let Some(inner) = controller.upgrade() else {
            break;
        };
        DisplayController { inner }.on_batch_received(batch);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Batch pump stopped");
}
