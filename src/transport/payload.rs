//! Fetch-API request bodies
//!
//! One target per request, writing datasets into a history. Local files are
//! not embedded: their paths ride along in [`UploadPayload::files`] and the
//! submitter attaches them as multipart parts.

use std::path::PathBuf;

use serde::Serialize;

use super::PayloadBuilder;
use crate::error::{Result, UploadError};
use crate::queue::{FileMode, UploadItem};

/// Default datatype when the caller did not pick one
pub const DEFAULT_EXTENSION: &str = "auto";

/// Default genome build
pub const DEFAULT_DBKEY: &str = "?";

/// Complete request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadPayload {
    pub history_id: String,
    pub targets: Vec<FetchTarget>,
    pub auto_decompress: bool,

    /// Local files to attach, in element order
    #[serde(skip)]
    pub files: Vec<PathBuf>,
}

impl UploadPayload {
    /// Names of every element, in order
    pub fn element_names(&self) -> Vec<String> {
        self.targets
            .iter()
            .flat_map(|target| target.elements.iter().map(|e| e.name.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchTarget {
    pub destination: Destination,
    pub elements: Vec<FetchElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Destination {
    /// Plain datasets in the history
    Hdas,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchElement {
    #[serde(flatten)]
    pub source: ElementSource,
    pub name: String,
    pub ext: String,
    pub dbkey: String,
    pub space_to_tab: bool,
    pub to_posix_lines: bool,
}

/// Where the server finds the bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "src", rename_all = "snake_case")]
pub enum ElementSource {
    /// Attached multipart file
    Files,
    Url { url: String },
    Pasted { paste_content: String },
    FtpImport { ftp_path: String },
}

// ============================================================================
// Builder
// ============================================================================

/// Builds fetch-API payloads into a single history target
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchPayloadBuilder;

impl PayloadBuilder for FetchPayloadBuilder {
    fn build(&self, items: &[UploadItem], history_id: Option<&str>) -> Result<UploadPayload> {
        let history_id = history_id.ok_or(UploadError::MissingHistory)?;
        if items.is_empty() {
            return Err(UploadError::EmptyBatch);
        }

        let mut files = Vec::new();
        let mut elements = Vec::with_capacity(items.len());

        for item in items {
            let source = match item.file_mode {
                FileMode::Local => {
                    let path = item
                        .file_path
                        .clone()
                        .ok_or_else(|| UploadError::MissingSource(item.name.clone()))?;
                    files.push(path);
                    ElementSource::Files
                }
                FileMode::Ftp => ElementSource::FtpImport {
                    ftp_path: item.file_uri.clone().unwrap_or_else(|| item.name.clone()),
                },
                FileMode::New => {
                    let content = item
                        .file_content
                        .as_deref()
                        .filter(|c| !c.trim().is_empty())
                        .ok_or_else(|| UploadError::MissingSource(item.name.clone()))?;
                    content_source(content)
                }
            };

            elements.push(FetchElement {
                source,
                name: item.name.clone(),
                ext: item
                    .extension
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
                dbkey: item.dbkey.clone().unwrap_or_else(|| DEFAULT_DBKEY.to_string()),
                space_to_tab: item.space_to_tab,
                to_posix_lines: item.to_posix_lines,
            });
        }

        Ok(UploadPayload {
            history_id: history_id.to_string(),
            targets: vec![FetchTarget {
                destination: Destination::Hdas,
                elements,
            }],
            auto_decompress: true,
            files,
        })
    }
}

/// Pasted content that is nothing but URLs is fetched by the server
fn content_source(content: &str) -> ElementSource {
    let trimmed = content.trim();
    let all_urls = trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(is_url);

    if all_urls {
        ElementSource::Url {
            url: trimmed.to_string(),
        }
    } else {
        ElementSource::Pasted {
            paste_content: content.to_string(),
        }
    }
}

fn is_url(line: &str) -> bool {
    ["http://", "https://", "ftp://"]
        .iter()
        .any(|scheme| line.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_item_attaches_file() {
        let item = UploadItem::local("reads.fastq", 100, "/data/reads.fastq")
            .with_extension("fastqsanger")
            .with_dbkey("hg38");

        let payload = FetchPayloadBuilder.build(&[item], Some("h1")).unwrap();

        assert_eq!(payload.files, vec![PathBuf::from("/data/reads.fastq")]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "history_id": "h1",
                "targets": [{
                    "destination": {"type": "hdas"},
                    "elements": [{
                        "src": "files",
                        "name": "reads.fastq",
                        "ext": "fastqsanger",
                        "dbkey": "hg38",
                        "space_to_tab": false,
                        "to_posix_lines": false
                    }]
                }],
                "auto_decompress": true
            })
        );
    }

    #[test]
    fn test_ftp_and_pasted_sources() {
        let items = vec![
            UploadItem::ftp("a.bed", 10, "sub/a.bed"),
            UploadItem::pasted("Pasted Entry", "chr1\t1\t2\n"),
            UploadItem::pasted("Links", "https://example.org/a.bed\nftp://example.org/b.bed\n"),
        ];

        let payload = FetchPayloadBuilder.build(&items, Some("h1")).unwrap();
        let sources: Vec<_> = payload.targets[0]
            .elements
            .iter()
            .map(|e| e.source.clone())
            .collect();

        assert_eq!(
            sources,
            vec![
                ElementSource::FtpImport {
                    ftp_path: "sub/a.bed".to_string()
                },
                ElementSource::Pasted {
                    paste_content: "chr1\t1\t2\n".to_string()
                },
                ElementSource::Url {
                    url: "https://example.org/a.bed\nftp://example.org/b.bed".to_string()
                },
            ]
        );
        assert!(payload.files.is_empty());
        assert_eq!(payload.targets[0].elements[0].ext, DEFAULT_EXTENSION);
        assert_eq!(payload.targets[0].elements[0].dbkey, DEFAULT_DBKEY);
    }

    #[test]
    fn test_missing_history_rejected() {
        let item = UploadItem::local("a.txt", 1, "/a.txt");
        let err = FetchPayloadBuilder.build(&[item], None).unwrap_err();
        assert!(matches!(err, UploadError::MissingHistory));
    }

    #[test]
    fn test_missing_source_rejected() {
        let err = FetchPayloadBuilder
            .build(&[UploadItem::new("a.txt", 1)], Some("h1"))
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingSource(name) if name == "a.txt"));

        let err = FetchPayloadBuilder
            .build(&[UploadItem::pasted("empty", "  \n")], Some("h1"))
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingSource(_)));
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = FetchPayloadBuilder.build(&[], Some("h1")).unwrap_err();
        assert!(matches!(err, UploadError::EmptyBatch));
    }
}
