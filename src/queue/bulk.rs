//! Bulk remote-fetch path
//!
//! Items already sitting server-side (queued, `ftp` mode) skip FIFO dispatch:
//! they are pulled out of the store together, sent as one combined payload,
//! and the single outcome is reported to each of them.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::dispatcher::panic_message;
use super::observer::UploadOptions;
use super::types::{QueueEntry, QueueIndex, UploadItem};
use crate::error::UploadError;
use crate::transport::Collaborators;

/// Entries taken out of the store for one remote fetch
#[derive(Debug)]
pub(crate) struct BulkBatch {
    indices: Vec<QueueIndex>,
    items: Vec<UploadItem>,
}

impl BulkBatch {
    /// Batch for entries already removed from the store
    ///
    /// Each item is replaced by the caller's enriched copy when `get` has one,
    /// so this must run with no queue lock held. Returns `None` for no entries.
    pub(crate) fn enrich(entries: Vec<QueueEntry>, options: &UploadOptions) -> Option<Self> {
        if entries.is_empty() {
            return None;
        }

        let (indices, items) = entries
            .into_iter()
            .map(|QueueEntry { index, item }| {
                let item = options.get(&index).unwrap_or(item);
                (index, item)
            })
            .unzip();

        Some(Self { indices, items })
    }

    fn len(&self) -> usize {
        self.indices.len()
    }

    /// Send the batch and fan the outcome out to every index
    pub(crate) async fn submit(self, collaborators: &Collaborators, options: &UploadOptions) {
        tracing::info!(count = self.len(), "Submitting bulk remote fetch");

        let send = async {
            let payload = collaborators.payload.build(&self.items, options.history_id())?;
            collaborators.remote_fetch.fetch(payload).await
        };
        let outcome = AssertUnwindSafe(send)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(UploadError::Panicked(panic_message(&*panic))));

        match outcome {
            Ok(message) => {
                tracing::info!(count = self.len(), "Bulk remote fetch accepted");
                for index in &self.indices {
                    options.success(index, &message);
                }
            }
            Err(e) => {
                tracing::warn!(
                    count = self.len(),
                    server_error = e.is_server_error(),
                    error = %e,
                    "Bulk remote fetch failed"
                );
                let message = e.to_string();
                for index in &self.indices {
                    options.error(index, &message);
                }
            }
        }
    }
}
