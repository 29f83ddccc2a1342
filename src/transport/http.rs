//! HTTP collaborators
//!
//! Both post to the fetch API under the configured application root.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use super::{RemoteFetch, SubmitHooks, Submitter, UploadPayload};
use crate::error::{Result, UploadError};

const FETCH_PATH: &str = "api/tools/fetch";

fn fetch_url(app_root: &str) -> String {
    if app_root.ends_with('/') {
        format!("{}{}", app_root, FETCH_PATH)
    } else {
        format!("{}/{}", app_root, FETCH_PATH)
    }
}

/// Read the body of a finished request, mapping non-2xx to an error
async fn settle(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(UploadError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

// ============================================================================
// Submitter
// ============================================================================

/// Sends one payload per request
///
/// Payloads without local files go out as JSON; otherwise as multipart with
/// each file under `files_{n}|file_data`.
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
}

impl HttpSubmitter {
    pub fn new(client: reqwest::Client, app_root: &str) -> Self {
        Self {
            client,
            url: fetch_url(app_root),
        }
    }

    async fn multipart(&self, payload: &UploadPayload) -> Result<Form> {
        let mut form = Form::new()
            .text("history_id", payload.history_id.clone())
            .text("targets", serde_json::to_string(&payload.targets)?)
            .text("auto_decompress", payload.auto_decompress.to_string());

        for (n, path) in payload.files.iter().enumerate() {
            let data = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("file_{}", n));
            form = form.part(
                format!("files_{}|file_data", n),
                Part::bytes(data).file_name(file_name),
            );
        }

        Ok(form)
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, payload: UploadPayload, hooks: SubmitHooks) -> Result<String> {
        hooks.progress(0.0);

        let request = if payload.files.is_empty() {
            self.client.post(&self.url).json(&payload)
        } else {
            self.client.post(&self.url).multipart(self.multipart(&payload).await?)
        };

        tracing::debug!(
            index = %hooks.index(),
            url = %self.url,
            files = payload.files.len(),
            "Submitting upload"
        );

        let response = request.send().await?;
        let body = settle(response).await?;

        hooks.progress(100.0);
        Ok(body)
    }
}

// ============================================================================
// Remote Fetch
// ============================================================================

/// Posts a combined batch for the server to fetch itself
pub struct HttpRemoteFetch {
    client: reqwest::Client,
    url: String,
}

impl HttpRemoteFetch {
    pub fn new(client: reqwest::Client, app_root: &str) -> Self {
        Self {
            client,
            url: fetch_url(app_root),
        }
    }
}

#[async_trait]
impl RemoteFetch for HttpRemoteFetch {
    async fn fetch(&self, payload: UploadPayload) -> Result<String> {
        let response = self.client.post(&self.url).json(&payload).send().await?;
        settle(response).await
    }
}

// ============================================================================
// Tests
// ============================================================================
