//! Archive extraction for downloaded installer releases.
//!
//! Releases are gzip-compressed tarballs on Unix-like systems and zip files
//! on Windows. The format is chosen from the archive's file name.

use flate2::read::GzDecoder;
use projenv_core::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tar::Archive;
use tracing::debug;

use crate::source::ArchiveFormat;

impl ArchiveFormat {
    /// Detect the format from an archive file name.
    ///
    /// Anything not ending in `.tar.gz` is treated as a zip file.
    #[must_use]
    pub fn from_path(archive: &Path) -> Self {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".tar.gz") {
            Self::TarGz
        } else {
            Self::Zip
        }
    }
}

/// Extract `archive` into `target`, creating `target` if needed.
pub fn extract(archive: &Path, target: &Path) -> Result<()> {
    let format = ArchiveFormat::from_path(archive);
    debug!(?archive, ?target, ?format, "Extracting archive");

    fs::create_dir_all(target).map_err(|e| Error::extraction(archive, e.to_string()))?;

    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive, target),
        ArchiveFormat::Zip => extract_zip(archive, target),
    }
}

fn extract_tar_gz(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::extraction(archive, e.to_string()))?;
    let mut tar = Archive::new(GzDecoder::new(file));
    tar.set_preserve_permissions(true);
    tar.unpack(target)
        .map_err(|e| Error::extraction(archive, e.to_string()))
}

fn extract_zip(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive).map_err(|e| Error::extraction(archive, e.to_string()))?;
    let mut zip =
        zip::ZipArchive::new(file).map_err(|e| Error::extraction(archive, e.to_string()))?;

    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| Error::extraction(archive, e.to_string()))?;

        // Entries escaping the target directory are skipped.
        let Some(relative) = entry.enclosed_name() else {
            continue;
        };
        let outpath = target.join(relative);

        let written: io::Result<()> = (|| {
            if entry.is_dir() {
                return fs::create_dir_all(&outpath);
            }
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&outpath)?;
            io::copy(&mut entry, &mut out)?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode))?;
            }
            Ok(())
        })();

        written.map_err(|e| {
            Error::extraction(archive, format!("writing {}: {e}", outpath.display()))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ArchiveFormat::from_path(Path::new("cli-1.0-linux-amd64.tar.gz")),
            ArchiveFormat::TarGz
        );
        assert_eq!(
            ArchiveFormat::from_path(Path::new("/tmp/x/cli-1.0-windows-amd64.zip")),
            ArchiveFormat::Zip
        );
        assert_eq!(
            ArchiveFormat::from_path(&PathBuf::from("archive.tgz")),
            ArchiveFormat::Zip
        );
    }

    #[test]
    fn test_missing_archive() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = extract(&temp.path().join("nope.tar.gz"), temp.path()).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }
}
