//! In-memory archive extraction.
//!
//! Archives are decoded straight from the downloaded buffer:
//! - zip entries keep their relative paths and unix mode bits
//! - compressed tars keep permission bits and symbolic links

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::error::{StageError, StageResult};
use crate::format::{ArchiveFormat, TarCompression};

/// Extract an archive held in memory into `dest_dir`.
///
/// # Arguments
///
/// * `archive_name` - Filename of the archive, used in error messages
/// * `bytes` - Complete archive content
/// * `format` - Container format of `bytes`
/// * `dest_dir` - Directory the archive's top-level entries are written to
///
/// # Returns
///
/// The number of regular files written.
pub fn extract_archive(
    archive_name: &str,
    bytes: &[u8],
    format: ArchiveFormat,
    dest_dir: &Path,
) -> StageResult<usize> {
    fs::create_dir_all(dest_dir).map_err(|e| StageError::CreateDir {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    match format {
        ArchiveFormat::Zip => extract_zip(archive_name, bytes, dest_dir),
        ArchiveFormat::TarCompressed(TarCompression::Xz) => {
            extract_tar(archive_name, XzDecoder::new(bytes), dest_dir)
        }
        ArchiveFormat::TarCompressed(TarCompression::Gzip) => {
            extract_tar(archive_name, GzDecoder::new(bytes), dest_dir)
        }
    }
}

fn extract_zip(archive_name: &str, bytes: &[u8], dest_dir: &Path) -> StageResult<usize> {
    let failed = |reason: String| StageError::Extraction {
        archive: archive_name.to_string(),
        reason,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| failed(e.to_string()))?;
    let mut count = 0;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| failed(e.to_string()))?;

        let relative = match entry.enclosed_name() {
            Some(path) => path,
            None => {
                return Err(failed(format!(
                    "entry escapes the destination: {}",
                    entry.name()
                )))
            }
        };
        let out_path = dest_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| StageError::CreateDir {
                path: out_path.clone(),
                source: e,
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StageError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut out_file = File::create(&out_path).map_err(|e| StageError::Write {
            path: out_path.clone(),
            source: e,
        })?;
        io::copy(&mut entry, &mut out_file).map_err(|e| failed(e.to_string()))?;

        if let Some(mode) = entry.unix_mode() {
            set_mode(&out_path, mode)?;
        }

        tracing::debug!(path = %out_path.display(), "Extracted");
        count += 1;
    }

    Ok(count)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> StageResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777)).map_err(|e| {
        StageError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> StageResult<()> {
    Ok(())
}

fn extract_tar<R: Read>(archive_name: &str, decoder: R, dest_dir: &Path) -> StageResult<usize> {
    let failed = |reason: String| StageError::Extraction {
        archive: archive_name.to_string(),
        reason,
    };

    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut count = 0;
    let mut directories = Vec::new();
    let entries = archive.entries().map_err(|e| failed(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| failed(e.to_string()))?;
        let entry_type = entry.header().entry_type();

        // Directory modes are applied last so read-only directories can still be filled.
        if entry_type.is_dir() {
            directories.push(entry);
            continue;
        }

        unpack_entry(&mut entry, dest_dir).map_err(failed)?;
        if entry_type.is_file() {
            count += 1;
        }
    }

    // Deepest first, so a parent's mode is set after its children.
    directories.sort_by(|a, b| b.path_bytes().cmp(&a.path_bytes()));
    for mut dir in directories {
        unpack_entry(&mut dir, dest_dir).map_err(failed)?;
    }

    tracing::debug!(archive = archive_name, files = count, "Unpacked tar archive");
    Ok(count)
}

fn unpack_entry<R: Read>(entry: &mut tar::Entry<'_, R>, dest_dir: &Path) -> Result<(), String> {
    // unpack_in refuses paths that would land outside dest_dir
    let unpacked = entry.unpack_in(dest_dir).map_err(|e| e.to_string())?;
    if !unpacked {
        let path = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        return Err(format!("entry escapes the destination: {}", path));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, mode) in entries {
            let options = SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored)
                .unix_permissions(*mode);
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn build_tar(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn xz(data: &[u8]) -> Vec<u8> {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_extract_zip_preserves_paths() {
        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[
            ("bundle/lib/librandomx.a", b"static", 0o644),
            ("bundle/include/randomx.h", b"header", 0o644),
        ]);

        let count = extract_archive("bundle.zip", &bytes, ArchiveFormat::Zip, temp.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            fs::read(temp.path().join("bundle/lib/librandomx.a")).unwrap(),
            b"static"
        );
        assert_eq!(
            fs::read(temp.path().join("bundle/include/randomx.h")).unwrap(),
            b"header"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_zip_preserves_executable_bit() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let bytes = build_zip(&[("bundle/bin/randomx-bench", b"#!/bin/sh\n", 0o755)]);

        extract_archive("bundle.zip", &bytes, ArchiveFormat::Zip, temp.path()).unwrap();

        let mode = fs::metadata(temp.path().join("bundle/bin/randomx-bench"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn test_extract_tar_xz() {
        let temp = TempDir::new().unwrap();
        let tar = build_tar(&[
            ("bundle/lib/librandomx.a", b"static", 0o644),
            ("bundle/lib/librandomx.so", b"shared", 0o755),
        ]);

        let count = extract_archive(
            "bundle.tar.xz",
            &xz(&tar),
            ArchiveFormat::TarCompressed(TarCompression::Xz),
            temp.path(),
        )
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            fs::read(temp.path().join("bundle/lib/librandomx.so")).unwrap(),
            b"shared"
        );
    }

    #[test]
    fn test_extract_tar_gz() {
        let temp = TempDir::new().unwrap();
        let tar = build_tar(&[("bundle/lib/librandomx.a", b"static", 0o644)]);

        let count = extract_archive(
            "bundle.tgz",
            &gzip(&tar),
            ArchiveFormat::TarCompressed(TarCompression::Gzip),
            temp.path(),
        )
        .unwrap();

        assert_eq!(count, 1);
        assert!(temp.path().join("bundle/lib/librandomx.a").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_preserves_symlinks_and_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut builder = tar::Builder::new(Vec::new());

        let mut header = tar::Header::new_gnu();
        header.set_size(6);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, "bundle/lib/librandomx.so.1", &b"shared"[..])
            .unwrap();

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_size(0);
        link.set_mode(0o777);
        builder
            .append_link(&mut link, "bundle/lib/librandomx.so", "librandomx.so.1")
            .unwrap();
        let tar = builder.into_inner().unwrap();

        extract_archive(
            "bundle.tar.xz",
            &xz(&tar),
            ArchiveFormat::TarCompressed(TarCompression::Xz),
            temp.path(),
        )
        .unwrap();

        let link_path = temp.path().join("bundle/lib/librandomx.so");
        assert!(link_path.is_symlink());
        assert_eq!(
            fs::read_link(&link_path).unwrap(),
            Path::new("librandomx.so.1")
        );
        let mode = fs::metadata(temp.path().join("bundle/lib/librandomx.so.1"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_tar_read_only_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let mut builder = tar::Builder::new(Vec::new());

        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o555);
        builder
            .append_data(&mut dir, "bundle/lib/", io::empty())
            .unwrap();

        let mut file = tar::Header::new_gnu();
        file.set_size(6);
        file.set_mode(0o644);
        builder
            .append_data(&mut file, "bundle/lib/librandomx.a", &b"static"[..])
            .unwrap();
        let tar = builder.into_inner().unwrap();

        let count = extract_archive(
            "bundle.tar.xz",
            &xz(&tar),
            ArchiveFormat::TarCompressed(TarCompression::Xz),
            temp.path(),
        )
        .unwrap();

        let lib = temp.path().join("bundle/lib");
        assert_eq!(count, 1);
        assert_eq!(fs::read(lib.join("librandomx.a")).unwrap(), b"static");
        let mode = fs::metadata(&lib).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o555);

        // Let TempDir clean up.
        fs::set_permissions(&lib, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_corrupt_zip_fails() {
        let temp = TempDir::new().unwrap();
        let err = extract_archive("bad.zip", b"not a zip", ArchiveFormat::Zip, temp.path())
            .unwrap_err();
        assert!(matches!(err, StageError::Extraction { .. }));
        assert!(err.to_string().contains("bad.zip"));
    }

    #[test]
    fn test_truncated_tar_xz_fails() {
        let temp = TempDir::new().unwrap();
        let tar = build_tar(&[("bundle/lib/librandomx.a", &[7u8; 4096], 0o644)]);
        let compressed = xz(&tar);
        let truncated = &compressed[..compressed.len() / 2];

        let err = extract_archive(
            "bad.tar.xz",
            truncated,
            ArchiveFormat::TarCompressed(TarCompression::Xz),
            temp.path(),
        )
        .unwrap_err();
        assert!(matches!(err, StageError::Extraction { .. }));
    }

    #[test]
    fn test_zip_path_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("dest");
        let bytes = build_zip(&[("../escape.txt", b"nope", 0o644)]);

        let err = extract_archive("evil.zip", &bytes, ArchiveFormat::Zip, &dest).unwrap_err();

        assert!(matches!(err, StageError::Extraction { .. }));
        assert!(!temp.path().join("escape.txt").exists());
    }
}
