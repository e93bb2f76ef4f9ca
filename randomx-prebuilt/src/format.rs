//! Archive format detection from filename suffixes.

use std::fmt;

use crate::error::{StageError, StageResult};

/// Compression wrapped around a tar stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    Xz,
    Gzip,
}

/// Container format of a release archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarCompressed(TarCompression),
}

/// Recognized suffixes, longest first so `.tar.xz` wins over shorter matches.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.xz", ArchiveFormat::TarCompressed(TarCompression::Xz)),
    (".tar.gz", ArchiveFormat::TarCompressed(TarCompression::Gzip)),
    (".zip", ArchiveFormat::Zip),
    (".txz", ArchiveFormat::TarCompressed(TarCompression::Xz)),
    (".tgz", ArchiveFormat::TarCompressed(TarCompression::Gzip)),
];

impl ArchiveFormat {
    /// Classify an archive by its filename.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::UnsupportedFormat`] if no known suffix matches.
    pub fn from_filename(filename: &str) -> StageResult<Self> {
        split_suffix(filename)
            .map(|(_, format)| format)
            .ok_or_else(|| StageError::UnsupportedFormat {
                filename: filename.to_string(),
            })
    }

    /// Name of the top-level directory an archive unpacks to.
    ///
    /// This is the filename with its archive suffix removed, e.g.
    /// `randomx-x86_64-linux.tar.xz` unpacks to `randomx-x86_64-linux`.
    pub fn bundle_name(filename: &str) -> StageResult<&str> {
        split_suffix(filename)
            .map(|(stem, _)| stem)
            .ok_or_else(|| StageError::UnsupportedFormat {
                filename: filename.to_string(),
            })
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zip => write!(f, "zip"),
            Self::TarCompressed(TarCompression::Xz) => write!(f, "tar.xz"),
            Self::TarCompressed(TarCompression::Gzip) => write!(f, "tar.gz"),
        }
    }
}

fn split_suffix(filename: &str) -> Option<(&str, ArchiveFormat)> {
    SUFFIXES.iter().find_map(|(suffix, format)| {
        filename
            .strip_suffix(suffix)
            .filter(|stem| !stem.is_empty())
            .map(|stem| (stem, *format))
    })
}
