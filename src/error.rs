use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum SolarError {
    #[error("invalid calendar date: {0}")]
    InvalidDate(String),

    #[error("invalid source descriptor: {0}")]
    InvalidSource(String),

    #[error("invalid template for source {source_name}: {message}")]
    InvalidTemplate {
        source_name: String,
        message: String,
    },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned status {status}: {message}")]
    TransportStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("run deadline exceeded before {date} could be processed")]
    DeadlineExceeded { date: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read manifest at {0}")]
    ManifestRead(PathBuf),

    #[error("failed to encode manifest: {0}")]
    ManifestEncode(String),

    #[error("malformed manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    #[error("no usable {source_name} images: all {attempted} dates failed or were not found")]
    #[diagnostic(help("the source may be lagging or unreachable; rerun later"))]
    NothingUsable {
        source_name: String,
        attempted: usize,
    },
}

impl SolarError {
    /// HTTP status carried by the error, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            SolarError::TransportStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            SolarError::Transport { url, .. } | SolarError::TransportStatus { url, .. } => {
                Some(url)
            }
            _ => None,
        }
    }
}
