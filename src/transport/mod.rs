//! Transport Module
//!
//! The capabilities the queue consumes but does not implement:
//! - building a request body from items
//! - submitting one request, with progress and warning hooks
//! - the remote-fetch endpoint used by the bulk path
//!
//! HTTP implementations live in [`http`]; the fetch-API body in [`payload`].

mod http;
mod payload;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Result;
use crate::queue::{QueueIndex, UploadItem, UploadOptions};

pub use http::{HttpRemoteFetch, HttpSubmitter};
pub use payload::{
    Destination, ElementSource, FetchElement, FetchPayloadBuilder, FetchTarget, UploadPayload,
};

// ============================================================================
// Capability Traits
// ============================================================================

/// Turns enriched items into a transport-ready request body
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, items: &[UploadItem], history_id: Option<&str>) -> Result<UploadPayload>;
}

/// Sends one request
///
/// The returned result is the settlement: `Ok` carries the success message,
/// `Err` the failure. Progress and warnings go through `hooks` while the
/// request is in flight.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, payload: UploadPayload, hooks: SubmitHooks) -> Result<String>;
}

/// Endpoint that fetches a combined batch server-side
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn fetch(&self, payload: UploadPayload) -> Result<String>;
}

// ============================================================================
// Submission Hooks
// ============================================================================

/// In-flight notifications for one queue index
#[derive(Clone)]
pub struct SubmitHooks {
    index: QueueIndex,
    options: Arc<UploadOptions>,
}

impl SubmitHooks {
    pub(crate) fn new(index: QueueIndex, options: Arc<UploadOptions>) -> Self {
        Self { index, options }
    }

    pub fn index(&self) -> QueueIndex {
        self.index
    }

    pub fn progress(&self, percentage: f64) {
        self.options.progress(&self.index, percentage.clamp(0.0, 100.0));
    }

    /// Informational; does not settle the submission
    pub fn warning(&self, message: &str) {
        tracing::warn!(index = %self.index, "Upload warning: {}", message);
        self.options.warning(&self.index, message);
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// The three injected capabilities, bundled
#[derive(Clone)]
pub struct Collaborators {
    pub payload: Arc<dyn PayloadBuilder>,
    pub submitter: Arc<dyn Submitter>,
    pub remote_fetch: Arc<dyn RemoteFetch>,
}

impl Collaborators {
    pub fn new(
        payload: Arc<dyn PayloadBuilder>,
        submitter: Arc<dyn Submitter>,
        remote_fetch: Arc<dyn RemoteFetch>,
    ) -> Self {
        Self {
            payload,
            submitter,
            remote_fetch,
        }
    }

    /// Fetch-API payloads sent over HTTP to `config.server.app_root`
    pub fn http(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("upload-queue/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            payload: Arc::new(FetchPayloadBuilder),
            submitter: Arc::new(HttpSubmitter::new(client.clone(), &config.server.app_root)),
            remote_fetch: Arc::new(HttpRemoteFetch::new(client, &config.server.app_root)),
        })
    }
}

/// Recording collaborators for tests
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio::sync::oneshot;

    use super::*;
    use crate::error::UploadError;

    /// What a scripted submission should do
    pub enum Script {
        Succeed(String),
        Fail(String),
        /// Report progress and a warning, then succeed
        Chatty,
        /// Wait for the test to release it
        Gate(oneshot::Receiver<std::result::Result<String, String>>),
        Panic,
    }

    /// Submitter driven by per-item scripts, keyed by item name
    #[derive(Default)]
    pub struct MockSubmitter {
        scripts: Mutex<HashMap<String, Script>>,
        pub submitted: Mutex<Vec<String>>,
    }

    impl MockSubmitter {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn script(&self, name: &str, script: Script) {
            self.scripts.lock().insert(name.to_string(), script);
        }

        /// Release channel for a gated item
        pub fn gate(&self, name: &str) -> oneshot::Sender<std::result::Result<String, String>> {
            let (tx, rx) = oneshot::channel();
            self.script(name, Script::Gate(rx));
            tx
        }
    }

    #[async_trait]
    impl Submitter for MockSubmitter {
        async fn submit(&self, payload: UploadPayload, hooks: SubmitHooks) -> Result<String> {
            let name = payload
                .element_names()
                .into_iter()
                .next()
                .unwrap_or_default();
            self.submitted.lock().push(name.clone());

            let script = self.scripts.lock().remove(&name);
            match script {
                None => Ok(format!("stored {name}")),
                Some(Script::Succeed(message)) => Ok(message),
                Some(Script::Fail(message)) => Err(UploadError::Status {
                    status: 500,
                    body: message,
                }),
                Some(Script::Chatty) => {
                    hooks.progress(50.0);
                    hooks.warning("slow");
                    hooks.progress(100.0);
                    Ok(format!("stored {name}"))
                }
                Some(Script::Gate(rx)) => match rx.await {
                    Ok(Ok(message)) => Ok(message),
                    Ok(Err(message)) => Err(UploadError::Status {
                        status: 500,
                        body: message,
                    }),
                    Err(_) => Err(UploadError::Config("gate dropped".to_string())),
                },
                Some(Script::Panic) => panic!("transport exploded"),
            }
        }
    }

    /// Remote fetch that records each batch and answers with a fixed outcome
    pub struct MockRemoteFetch {
        outcome: std::result::Result<String, String>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        panics: bool,
        pub batches: Mutex<Vec<Vec<String>>>,
    }

    impl MockRemoteFetch {
        fn with_outcome(outcome: std::result::Result<String, String>) -> Self {
            Self {
                outcome,
                gate: Mutex::new(None),
                panics: false,
                batches: Mutex::new(Vec::new()),
            }
        }

        pub fn succeeding(message: &str) -> Arc<Self> {
            Arc::new(Self::with_outcome(Ok(message.to_string())))
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self::with_outcome(Err(message.to_string())))
        }

        /// Succeeds with `message` once the returned sender fires or drops
        pub fn gated(message: &str) -> (Arc<Self>, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            let fetch = Self::with_outcome(Ok(message.to_string()));
            *fetch.gate.lock() = Some(rx);
            (Arc::new(fetch), tx)
        }

        pub fn panicking() -> Arc<Self> {
            Arc::new(Self {
                panics: true,
                ..Self::with_outcome(Err(String::new()))
            })
        }
    }

    #[async_trait]
    impl RemoteFetch for MockRemoteFetch {
        async fn fetch(&self, payload: UploadPayload) -> Result<String> {
            self.batches.lock().push(payload.element_names());
            tokio::task::yield_now().await;
            if self.panics {
                panic!("remote fetch exploded");
            }
            let gate = self.gate.lock().take();
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            self.outcome.clone().map_err(|body| UploadError::Status { status: 400, body })
        }
    }
}
