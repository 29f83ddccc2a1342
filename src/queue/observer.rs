//! Observer options
//!
//! The callback set a caller hands to the queue. Every hook has a default;
//! [`OptionsUpdate`] overrides only the hooks it names.

use std::fmt;
use std::sync::Arc;

use super::types::{QueueIndex, UploadItem};

pub type AnnounceHook = Arc<dyn Fn(&QueueIndex, &UploadItem) + Send + Sync>;
pub type GetHook = Arc<dyn Fn(&QueueIndex) -> Option<UploadItem> + Send + Sync>;
pub type ProgressHook = Arc<dyn Fn(&QueueIndex, f64) + Send + Sync>;
pub type MessageHook = Arc<dyn Fn(&QueueIndex, &str) + Send + Sync>;
pub type CompleteHook = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Options
// ============================================================================

/// Lifecycle hooks plus the destination history
#[derive(Clone)]
pub struct UploadOptions {
    announce: AnnounceHook,
    get: GetHook,
    progress: ProgressHook,
    success: MessageHook,
    warning: MessageHook,
    error: MessageHook,
    complete: CompleteHook,
    history_id: Option<String>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            announce: Arc::new(|_: &QueueIndex, _: &UploadItem| {}),
            get: Arc::new(|_: &QueueIndex| None),
            progress: Arc::new(|_: &QueueIndex, _: f64| {}),
            success: Arc::new(|_: &QueueIndex, _: &str| {}),
            warning: Arc::new(|_: &QueueIndex, _: &str| {}),
            error: Arc::new(|index: &QueueIndex, message: &str| {
                tracing::error!(index = %index, "Upload failed: {}", message);
            }),
            complete: Arc::new(|| {}),
            history_id: None,
        }
    }
}

impl UploadOptions {
    /// Apply a partial update, keeping every hook it does not set
    pub fn merge(&mut self, update: OptionsUpdate) {
        let OptionsUpdate {
            announce,
            get,
            progress,
            success,
            warning,
            error,
            complete,
            history_id,
        } = update;

        if let Some(hook) = announce {
            self.announce = hook;
        }
        if let Some(hook) = get {
            self.get = hook;
        }
        if let Some(hook) = progress {
            self.progress = hook;
        }
        if let Some(hook) = success {
            self.success = hook;
        }
        if let Some(hook) = warning {
            self.warning = hook;
        }
        if let Some(hook) = error {
            self.error = hook;
        }
        if let Some(hook) = complete {
            self.complete = hook;
        }
        if let Some(id) = history_id {
            self.history_id = Some(id);
        }
    }

    pub fn history_id(&self) -> Option<&str> {
        self.history_id.as_deref()
    }

    pub fn announce(&self, index: &QueueIndex, item: &UploadItem) {
        (self.announce)(index, item)
    }

    /// Enriched item for `index`, if the caller tracks one
    pub fn get(&self, index: &QueueIndex) -> Option<UploadItem> {
        (self.get)(index)
    }

    pub fn progress(&self, index: &QueueIndex, percentage: f64) {
        (self.progress)(index, percentage)
    }

    pub fn success(&self, index: &QueueIndex, message: &str) {
        (self.success)(index, message)
    }

    pub fn warning(&self, index: &QueueIndex, message: &str) {
        (self.warning)(index, message)
    }

    pub fn error(&self, index: &QueueIndex, message: &str) {
        (self.error)(index, message)
    }

    pub fn complete(&self) {
        (self.complete)()
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("history_id", &self.history_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Partial Update
// ============================================================================

/// Hooks to override; unset fields keep their current value
#[derive(Clone, Default)]
pub struct OptionsUpdate {
    announce: Option<AnnounceHook>,
    get: Option<GetHook>,
    progress: Option<ProgressHook>,
    success: Option<MessageHook>,
    warning: Option<MessageHook>,
    error: Option<MessageHook>,
    complete: Option<CompleteHook>,
    history_id: Option<String>,
}

impl OptionsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_announce<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueIndex, &UploadItem) + Send + Sync + 'static,
    {
        self.announce = Some(Arc::new(hook));
        self
    }

    pub fn on_get<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueIndex) -> Option<UploadItem> + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(hook));
        self
    }

    pub fn on_progress<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueIndex, f64) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(hook));
        self
    }

    pub fn on_success<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueIndex, &str) + Send + Sync + 'static,
    {
        self.success = Some(Arc::new(hook));
        self
    }

    pub fn on_warning<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueIndex, &str) + Send + Sync + 'static,
    {
        self.warning = Some(Arc::new(hook));
        self
    }

    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&QueueIndex, &str) + Send + Sync + 'static,
    {
        self.error = Some(Arc::new(hook));
        self
    }

    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.complete = Some(Arc::new(hook));
        self
    }

    pub fn history_id(mut self, id: impl Into<String>) -> Self {
        self.history_id = Some(id.into());
        self
    }
}
