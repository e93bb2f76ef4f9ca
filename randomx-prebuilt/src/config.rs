//! Configuration for staging prebuilt release archives.

use std::path::PathBuf;
use std::time::Duration;

/// Release download location for the librandomx C API archives.
pub const DEFAULT_BASE_URL: &str = "https://github.com/core-coin/RandomY/releases/download/c-api/";

/// Output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// File suffixes of dynamic libraries removed after staging.
pub const SHARED_LIBRARY_SUFFIXES: &[&str] = &[".dll", ".dylib", ".so"];

/// Archives published for the C API release, in staging order.
pub const DEFAULT_RELEASES: &[ReleaseEntry] = &[
    ReleaseEntry::new("randomx-x86_64-mingw.zip", "windows-x86_64"),
    ReleaseEntry::new("randomx-x86_64-linux.tar.xz", "linux-x86_64"),
    ReleaseEntry::new("randomx-x86_64-macos.tar.xz", "macos-x86_64"),
];

/// A release archive and the platform directory it is staged into.
///
/// Platform ids must be distinct across a release list; two entries with the
/// same id would collide on relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseEntry {
    /// Archive filename, appended to the base URL.
    pub archive_filename: &'static str,
    /// Destination subdirectory under the output root.
    pub platform_id: &'static str,
}

impl ReleaseEntry {
    pub const fn new(archive_filename: &'static str, platform_id: &'static str) -> Self {
        Self {
            archive_filename,
            platform_id,
        }
    }

    /// Full download URL for this entry under `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        if base_url.ends_with('/') {
            format!("{}{}", base_url, self.archive_filename)
        } else {
            format!("{}/{}", base_url, self.archive_filename)
        }
    }
}

/// Configuration for a staging run.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Base URL the archive filenames are appended to.
    pub base_url: String,

    /// Directory that receives one subdirectory per platform.
    ///
    /// Deleted and recreated at the start of every run.
    pub output_dir: PathBuf,

    /// Archives to stage, in order.
    pub releases: Vec<ReleaseEntry>,

    /// Filename suffixes swept from the output tree after staging.
    pub shared_library_suffixes: Vec<String>,

    /// HTTP request timeout.
    ///
    /// `None` waits for as long as the transfer takes.
    pub timeout: Option<Duration>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            releases: DEFAULT_RELEASES.to_vec(),
            shared_library_suffixes: SHARED_LIBRARY_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout: None,
        }
    }
}

impl StageConfig {
    /// Create a configuration with the built-in releases staged into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Replace the release list.
    pub fn with_releases(mut self, releases: impl IntoIterator<Item = ReleaseEntry>) -> Self {
        self.releases = releases.into_iter().collect();
        self
    }

    /// Replace the swept suffixes.
    pub fn with_shared_library_suffixes<S: Into<String>>(
        mut self,
        suffixes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.shared_library_suffixes = suffixes.into_iter().map(Into::into).collect();
        self
    }

    /// Bound each download by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
