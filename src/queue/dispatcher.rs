//! Dispatcher
//!
//! Drains the store one item at a time: take the oldest entry, build its
//! payload, remove it, submit it, report the settlement, repeat. The loop
//! ends when the store is empty or a pause was requested, and `complete`
//! fires once per run.
//!
//! Locks are never held across an `.await` or while a hook runs, so hooks
//! may call back into the queue.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};

use super::bulk::BulkBatch;
use super::observer::{OptionsUpdate, UploadOptions};
use super::store::QueueStore;
use super::types::{DispatchState, QueueEntry, QueueIndex, UploadItem};
use crate::error::UploadError;
use crate::transport::{Collaborators, SubmitHooks};

// ============================================================================
// Upload Queue
// ============================================================================

/// Handle to an upload queue; clones share the same queue
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<UploadQueueInner>,
}

struct UploadQueueInner {
    store: Mutex<QueueStore>,
    state: Mutex<DispatchState>,
    options: RwLock<Arc<UploadOptions>>,
    collaborators: Collaborators,
}

impl UploadQueue {
    /// Create a queue; `options` is applied over the defaults
    pub fn new(collaborators: Collaborators, options: OptionsUpdate) -> Self {
        let mut defaults = UploadOptions::default();
        defaults.merge(options);

        Self {
            inner: Arc::new(UploadQueueInner {
                store: Mutex::new(QueueStore::new()),
                state: Mutex::new(DispatchState::Idle),
                options: RwLock::new(Arc::new(defaults)),
                collaborators,
            }),
        }
    }

    // ========================================================================
    // Queue Management
    // ========================================================================

    /// Admit items, skipping duplicates
    ///
    /// Ignored entirely while a run is in progress; add the whole batch
    /// before calling [`start`](Self::start). Returns the admitted indices.
    pub fn add<I>(&self, items: I) -> Vec<QueueIndex>
    where
        I: IntoIterator<Item = UploadItem>,
    {
        if self.state().is_running() {
            tracing::debug!("Queue is running, ignoring add");
            return Vec::new();
        }

        let mut admitted = Vec::new();
        for item in items {
            let index = self.inner.store.lock().admit(item.clone());
            if let Some(index) = index {
                tracing::debug!(
                    index = %index,
                    name = %item.name,
                    size = item.size,
                    "Queued upload"
                );
                self.options().announce(&index, &item);
                admitted.push(index);
            }
        }
        admitted
    }

    /// Override some hooks, keeping the rest
    pub fn configure(&self, update: OptionsUpdate) {
        let mut options = self.inner.options.write();
        let mut merged = UploadOptions::clone(&options);
        merged.merge(update);
        *options = Arc::new(merged);
    }

    /// Drop an entry; unknown indices are ignored
    pub fn remove(&self, index: &QueueIndex) {
        if self.inner.store.lock().remove(index).is_some() {
            tracing::debug!(index = %index, "Removed upload");
        }
    }

    /// Drop every entry; indices keep counting from where they were
    pub fn reset(&self) {
        self.inner.store.lock().reset();
        tracing::debug!("Upload queue reset");
    }

    /// Number of pending entries
    pub fn size(&self) -> usize {
        self.inner.store.lock().len()
    }

    /// Pending indices in dispatch order
    pub fn pending(&self) -> Vec<QueueIndex> {
        self.inner.store.lock().indices()
    }

    pub fn state(&self) -> DispatchState {
        *self.inner.state.lock()
    }

    fn options(&self) -> Arc<UploadOptions> {
        self.inner.options.read().clone()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Run the queue until it is empty or paused
    ///
    /// With `bulk`, queued remote-fetch items are first pulled out and sent
    /// as one batch alongside the regular run. A second call while a run is
    /// in progress does not start another drain.
    pub async fn start(&self, bulk: bool) {
        let batch = if bulk {
            let entries = self
                .inner
                .store
                .lock()
                .extract_where(UploadItem::is_remote_fetch);
            BulkBatch::enrich(entries, &self.options())
        } else {
            None
        };

        let bulk_run = async move {
            if let Some(batch) = batch {
                batch.submit(&self.inner.collaborators, &self.options()).await;
            }
        };

        let drain = async {
            if let Some(run) = self.begin_run() {
                self.drain(run).await;
            } else {
                tracing::debug!("Upload queue already running");
            }
        };

        futures::join!(bulk_run, drain);
    }

    /// Ask the running loop to halt after the in-flight item settles
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        match *state {
            DispatchState::Running | DispatchState::Draining => {
                *state = DispatchState::PauseRequested;
                tracing::info!(pending = self.inner.store.lock().len(), "Pause requested");
            }
            DispatchState::PauseRequested => {}
            DispatchState::Idle => tracing::debug!("Upload queue idle, nothing to stop"),
        }
    }

    fn begin_run(&self) -> Option<RunGuard<'_>> {
        let mut state = self.inner.state.lock();
        if state.is_running() {
            return None;
        }
        *state = DispatchState::Running;
        tracing::info!(pending = self.inner.store.lock().len(), "Upload run started");
        Some(RunGuard {
            state: &self.inner.state,
            finished: false,
        })
    }

    /// Oldest entry, or `None` once the run should end
    ///
    /// Ending the run puts the dispatcher back to idle and clears any pause.
    fn next_entry(&self) -> Option<QueueEntry> {
        let mut state = self.inner.state.lock();
        let store = self.inner.store.lock();

        let next = match *state {
            DispatchState::PauseRequested => None,
            _ => store.oldest(),
        };

        *state = if next.is_some() {
            DispatchState::Draining
        } else {
            DispatchState::Idle
        };
        next
    }

    async fn drain(&self, mut run: RunGuard<'_>) {
        while let Some(QueueEntry { index, item }) = self.next_entry() {
            let options = self.options();
            let item = options.get(&index).unwrap_or(item);
            let payload = self
                .inner
                .collaborators
                .payload
                .build(std::slice::from_ref(&item), options.history_id());

            // Out of the store before submission so it is never picked twice
            self.remove(&index);

            let outcome = match payload {
                Ok(payload) => {
                    let hooks = SubmitHooks::new(index, options.clone());
                    let submission = self.inner.collaborators.submitter.submit(payload, hooks);
                    AssertUnwindSafe(submission)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(UploadError::Panicked(panic_message(&*panic))))
                }
                Err(e) => Err(e),
            };

            self.settle();

            match outcome {
                Ok(message) => {
                    tracing::info!(index = %index, name = %item.name, "Upload succeeded");
                    options.success(&index, &message);
                }
                Err(e) => {
                    tracing::warn!(index = %index, name = %item.name, error = %e, "Upload failed");
                    options.error(&index, &e.to_string());
                }
            }
        }

        run.finished = true;
        drop(run);

        tracing::info!(pending = self.size(), "Upload run complete");
        self.options().complete();
    }

    /// In-flight item settled; keep any pause request
    fn settle(&self) {
        let mut state = self.inner.state.lock();
        if *state == DispatchState::Draining {
            *state = DispatchState::Running;
        }
    }
}

/// Returns the dispatcher to idle if a run is dropped before it finishes
///
/// Covers a cancelled `start` future and a panic unwinding out of a hook or
/// the payload builder. The in-flight item, already out of the store, is
/// not reported.
struct RunGuard<'a> {
    state: &'a Mutex<DispatchState>,
    finished: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = DispatchState::Idle;
            tracing::warn!("Upload run interrupted");
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
