//! Error types for staging prebuilt archives.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for staging operations.
pub type StageResult<T> = Result<T, StageError>;

/// Errors that can occur while staging release archives.
///
/// A missing output directory at reset time is not represented here: the
/// reset step checks for it and skips the removal.
#[derive(Debug, Error)]
pub enum StageError {
    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// Failed to retrieve archive bytes.
    #[error("failed to download {url}: {reason}")]
    Network { url: String, reason: String },

    /// Network timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The archive filename has no recognized suffix.
    #[error("unsupported archive format: {filename}")]
    UnsupportedFormat { filename: String },

    /// Archive content could not be decompressed or unpacked.
    #[error("failed to extract {archive}: {reason}")]
    Extraction { archive: String, reason: String },

    /// Failed to remove a directory tree.
    #[error("failed to remove directory {}: {source}", path.display())]
    RemoveDir { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// Failed to read a directory listing.
    #[error("failed to read directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Failed to remove a file.
    #[error("failed to remove {}: {source}", path.display())]
    RemoveFile { path: PathBuf, source: io::Error },

    /// Failed to move a staged bundle into place.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    /// The relocation target is already occupied.
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// A release entry failed at some step.
    #[error("failed to stage {filename} for {platform_id}")]
    Entry {
        filename: String,
        platform_id: String,
        #[source]
        source: Box<StageError>,
    },
}

impl StageError {
    /// Wrap this error with the release entry it occurred in.
    pub fn for_entry(self, filename: &str, platform_id: &str) -> Self {
        Self::Entry {
            filename: filename.to_string(),
            platform_id: platform_id.to_string(),
            source: Box::new(self),
        }
    }

    /// Whether the failure came from the network layer.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::HttpClient(_) => true,
            Self::Entry { source, .. } => source.is_network(),
            _ => false,
        }
    }
}
