//! Error types for the upload queue

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, UploadError>;

/// Upload error type
///
/// None of these ever escape [`UploadQueue::start`](crate::UploadQueue::start):
/// the dispatcher turns them into `error` notifications for the affected
/// queue indices.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No target history configured")]
    MissingHistory,

    #[error("Nothing to upload for {0}")]
    MissingSource(String),

    #[error("Upload batch is empty")]
    EmptyBatch,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Submission panicked: {0}")]
    Panicked(String),
}

impl UploadError {
    /// Whether the failure came back from the server rather than from the
    /// request never being built or sent
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = UploadError::Status {
            status: 413,
            body: "too large".to_string(),
        };
        assert_eq!(err.to_string(), "Server returned 413: too large");
        assert!(err.is_server_error());
    }

    #[test]
    fn test_missing_source_message() {
        let err = UploadError::MissingSource("reads.fastq".to_string());
        assert_eq!(err.to_string(), "Nothing to upload for reads.fastq");
        assert!(!err.is_server_error());
    }
}
