//! Configuration management for the upload queue

use std::env;

use crate::error::{Result, UploadError};

const DEFAULT_APP_ROOT: &str = "http://localhost:8080/";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Application root; always ends in `/`
    pub app_root: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Destination history
    pub history_id: Option<String>,
    /// Send queued FTP items as one remote fetch on start
    pub bulk: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                app_root: DEFAULT_APP_ROOT.to_string(),
            },
            upload: UploadConfig {
                history_id: None,
                bulk: false,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            server: ServerConfig {
                app_root: normalize_root(
                    &env::var("UPLOAD_APP_ROOT").unwrap_or_else(|_| DEFAULT_APP_ROOT.to_string()),
                ),
            },
            upload: UploadConfig {
                history_id: env::var("UPLOAD_HISTORY_ID")
                    .ok()
                    .filter(|id| !id.trim().is_empty()),
                bulk: match env::var("UPLOAD_BULK") {
                    Ok(value) => parse_bool(&value)?,
                    Err(_) => false,
                },
            },
        })
    }
}

fn normalize_root(root: &str) -> String {
    let root = root.trim();
    if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{}/", root)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(UploadError::Config(format!(
            "UPLOAD_BULK must be a boolean, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root("http://host/galaxy"), "http://host/galaxy/");
        assert_eq!(normalize_root(" http://host/ "), "http://host/");
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("off").unwrap());
        assert!(matches!(parse_bool("maybe"), Err(UploadError::Config(_))));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.app_root, DEFAULT_APP_ROOT);
        assert!(config.upload.history_id.is_none());
        assert!(!config.upload.bulk);
    }
}
