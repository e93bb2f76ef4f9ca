//! Staging pipeline for prebuilt release archives.
//!
//! A run proceeds strictly in order:
//! 1. Reset the output directory
//! 2. For each release: fetch, extract, move into `<output>/<platform_id>`
//! 3. Sweep shared libraries from the whole output tree
//!
//! Any failure aborts the run. A partially populated output directory is
//! left behind and cleared by the reset step of the next run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{ReleaseEntry, StageConfig};
use crate::error::{StageError, StageResult};
use crate::extract::extract_archive;
use crate::fetch::ArchiveFetcher;
use crate::format::ArchiveFormat;
use crate::sweep::sweep_shared_libraries;

/// Prefix of the scratch directory archives are extracted into.
const SCRATCH_PREFIX: &str = ".staging-";

/// A release archive extracted and moved into its platform directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBundle {
    /// Platform the bundle was staged for.
    pub platform_id: String,
    /// Final location of the bundle.
    pub path: PathBuf,
    /// Size of the downloaded archive.
    pub bytes_fetched: u64,
    /// Number of regular files extracted.
    pub files_extracted: usize,
}

/// Outcome of a complete staging run.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    /// Bundles in release order.
    pub bundles: Vec<StagedBundle>,
    /// Shared libraries removed by the sweep.
    pub removed: Vec<PathBuf>,
}

impl StageReport {
    /// Total bytes downloaded across all bundles.
    pub fn bytes_fetched(&self) -> u64 {
        self.bundles.iter().map(|b| b.bytes_fetched).sum()
    }
}

/// Delete `path` if present and recreate it empty.
///
/// A missing directory is skipped; every other removal error propagates.
pub fn reset_output_dir(path: &Path) -> StageResult<()> {
    let removed = match path.symlink_metadata() {
        Ok(_) => fs::remove_dir_all(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    removed.map_err(|e| StageError::RemoveDir {
        path: path.to_path_buf(),
        source: e,
    })?;

    fs::create_dir_all(path).map_err(|e| StageError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Move an extracted bundle directory to its final location.
///
/// The destination must not exist. `fs::rename` is atomic when both paths are
/// on the same filesystem.
pub fn relocate(from: &Path, to: &Path) -> StageResult<()> {
    if to.symlink_metadata().is_ok() {
        return Err(StageError::DestinationExists(to.to_path_buf()));
    }

    fs::rename(from, to).map_err(|e| StageError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })
}

/// Stages a list of release archives into a per-platform directory layout.
pub struct Stager<F: ArchiveFetcher> {
    config: StageConfig,
    fetcher: F,
}

impl<F: ArchiveFetcher> Stager<F> {
    /// Create a stager.
    ///
    /// # Arguments
    ///
    /// * `config` - Release list, base URL and output directory
    /// * `fetcher` - Source of archive bytes
    pub fn new(config: StageConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Get the configuration.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Run the full pipeline.
    pub fn run(&self) -> StageResult<StageReport> {
        let output_dir = &self.config.output_dir;

        tracing::info!(output = %output_dir.display(), "Resetting output directory");
        reset_output_dir(output_dir)?;

        let mut report = StageReport::default();
        for entry in &self.config.releases {
            let bundle = self.stage_entry(entry)?;
            report.bundles.push(bundle);
        }

        report.removed = sweep_shared_libraries(output_dir, &self.config.shared_library_suffixes)?;
        tracing::info!(
            bundles = report.bundles.len(),
            removed = report.removed.len(),
            "Staging complete"
        );

        Ok(report)
    }

    /// Fetch one archive and stage it under `<output>/<platform_id>`.
    ///
    /// The output directory must already exist. Errors are wrapped with the
    /// entry they occurred in.
    pub fn stage_entry(&self, entry: &ReleaseEntry) -> StageResult<StagedBundle> {
        self.try_stage_entry(entry)
            .map_err(|e| e.for_entry(entry.archive_filename, entry.platform_id))
    }

    fn try_stage_entry(&self, entry: &ReleaseEntry) -> StageResult<StagedBundle> {
        let filename = entry.archive_filename;
        let format = ArchiveFormat::from_filename(filename)?;
        let bundle_name = ArchiveFormat::bundle_name(filename)?;

        let url = entry.url(&self.config.base_url);
        tracing::info!(url = %url, "Download");
        let bytes = self.fetcher.fetch(&url)?;
        let bytes_fetched = bytes.len() as u64;

        // Extract beside the final location so the rename stays on one filesystem.
        let output_dir = &self.config.output_dir;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(output_dir)
            .map_err(|e| StageError::CreateDir {
                path: output_dir.clone(),
                source: e,
            })?;

        let files_extracted = extract_archive(filename, &bytes, format, scratch.path())?;
        drop(bytes);

        let extracted = scratch.path().join(bundle_name);
        if !extracted.is_dir() {
            return Err(StageError::Extraction {
                archive: filename.to_string(),
                reason: format!("archive does not contain a top-level {} directory", bundle_name),
            });
        }

        let dest = output_dir.join(entry.platform_id);
        relocate(&extracted, &dest)?;

        scratch.close().map_err(|e| StageError::RemoveDir {
            path: output_dir.clone(),
            source: e,
        })?;

        tracing::info!(
            platform = entry.platform_id,
            format = %format,
            files = files_extracted,
            path = %dest.display(),
            "Staged"
        );

        Ok(StagedBundle {
            platform_id: entry.platform_id.to_string(),
            path: dest,
            bytes_fetched,
            files_extracted,
        })
    }
}
