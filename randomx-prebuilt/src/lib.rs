//! randomx-prebuilt - staging of prebuilt librandomx binaries
//!
//! Downloads the librandomx C API release archives, unpacks each into
//! `<output>/<platform_id>`, and removes shared libraries so only static
//! artifacts remain for the build that follows.
//!
//! # Example
//!
//! ```ignore
//! use randomx_prebuilt::{HttpFetcher, StageConfig, Stager};
//!
//! let stager = Stager::new(StageConfig::default(), HttpFetcher::new()?);
//! let report = stager.run()?;
//! for bundle in &report.bundles {
//!     println!("{} -> {}", bundle.platform_id, bundle.path.display());
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod format;
pub mod stager;
pub mod sweep;

pub use config::{ReleaseEntry, StageConfig, DEFAULT_BASE_URL, DEFAULT_RELEASES};
pub use error::{StageError, StageResult};
pub use fetch::{ArchiveFetcher, HttpFetcher, LocalFetcher};
pub use format::{ArchiveFormat, TarCompression};
pub use stager::{relocate, reset_output_dir, StageReport, StagedBundle, Stager};
pub use sweep::sweep_shared_libraries;
