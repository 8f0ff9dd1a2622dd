// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Archive extraction for downloaded packages (.tar.gz and .zip).
// Every entry is validated before anything is written, so an archive with a
// single unsafe path leaves the destination untouched.

use crate::error::{InstallError, InstallResult};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io;
use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Extract `archive_path` into `dest_dir` on the blocking pool.
///
/// The archive is left in place; deleting it is up to the caller.
pub async fn extract_archive(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> InstallResult<()> {
    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    // tar/zip readers are synchronous
    tokio::task::spawn_blocking(move || extract_archive_sync(&archive_path, &dest_dir, format))
        .await
        .map_err(|e| InstallError::Filesystem(format!("Extraction task failed: {}", e)))?
}

pub fn extract_archive_sync(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> InstallResult<()> {
    if !archive_path.exists() {
        return Err(InstallError::NotFound(archive_path.to_path_buf()));
    }

    crate::debug::log(&format!(
        "Extracting {:?} ({}) into {:?}",
        archive_path,
        format.extension(),
        dest_dir
    ));

    match format {
        ArchiveFormat::TarGz => {
            validate_tar_gz(archive_path)?;
            std::fs::create_dir_all(dest_dir)
                .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", dest_dir), e))?;
            unpack_tar_gz(archive_path, dest_dir)
        }
        ArchiveFormat::Zip => {
            let mut archive = open_zip(archive_path)?;
            validate_zip(&mut archive)?;
            std::fs::create_dir_all(dest_dir)
                .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", dest_dir), e))?;
            unpack_zip(&mut archive, dest_dir)
        }
    }?;

    crate::debug::log(&format!("Extraction into {:?} complete", dest_dir));
    Ok(())
}

/// True when `path` stays below the directory it is joined onto.
fn is_enclosed(path: &Path) -> bool {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// A link target resolved relative to the entry's own directory must stay
/// inside the archive root.
fn link_is_enclosed(entry_path: &Path, target: &Path) -> bool {
    let parent = entry_path.parent().unwrap_or(Path::new(""));
    is_enclosed(&parent.join(target))
}

fn read_error(archive_path: &Path, err: io::Error) -> InstallError {
    InstallError::CorruptArchive(format!("{}: {}", archive_path.display(), err))
}

// ----------------------------------------------------------------------------
// TAR.GZ
// ----------------------------------------------------------------------------

fn open_tar_gz(archive_path: &Path) -> InstallResult<tar::Archive<GzDecoder<File>>> {
    let file = File::open(archive_path)
        .map_err(|e| InstallError::filesystem(format!("Failed to open {:?}", archive_path), e))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

fn validate_tar_gz(archive_path: &Path) -> InstallResult<()> {
    let mut archive = open_tar_gz(archive_path)?;
    let entries = archive.entries().map_err(|e| read_error(archive_path, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| read_error(archive_path, e))?;
        let path = entry.path().map_err(|e| read_error(archive_path, e))?.into_owned();

        if !is_enclosed(&path) {
            return Err(InstallError::CorruptArchive(format!(
                "entry {:?} escapes the install directory",
                path
            )));
        }

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            if let Some(target) = entry.link_name().map_err(|e| read_error(archive_path, e))? {
                let enclosed = if kind.is_hard_link() {
                    is_enclosed(&target)
                } else {
                    link_is_enclosed(&path, &target)
                };
                if !enclosed {
                    return Err(InstallError::CorruptArchive(format!(
                        "link {:?} -> {:?} escapes the install directory",
                        path, target
                    )));
                }
            }
        }
    }
    Ok(())
}

fn unpack_tar_gz(archive_path: &Path, dest_dir: &Path) -> InstallResult<()> {
    let mut archive = open_tar_gz(archive_path)?;
    archive.set_preserve_permissions(true);
    let entries = archive.entries().map_err(|e| read_error(archive_path, e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| read_error(archive_path, e))?;
        let unpacked = entry.unpack_in(dest_dir).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => read_error(archive_path, e),
            _ => InstallError::filesystem(format!("Failed to extract into {:?}", dest_dir), e),
        })?;
        if !unpacked {
            return Err(InstallError::CorruptArchive(format!(
                "entry in {} was refused by the unpacker",
                archive_path.display()
            )));
        }
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// ZIP
// ----------------------------------------------------------------------------

fn open_zip(archive_path: &Path) -> InstallResult<zip::ZipArchive<File>> {
    let file = File::open(archive_path)
        .map_err(|e| InstallError::filesystem(format!("Failed to open {:?}", archive_path), e))?;
    zip::ZipArchive::new(file).map_err(|e| {
        InstallError::CorruptArchive(format!("{}: {}", archive_path.display(), e))
    })
}

fn validate_zip(archive: &mut zip::ZipArchive<File>) -> InstallResult<()> {
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| InstallError::CorruptArchive(format!("entry {}: {}", i, e)))?;
        if entry.enclosed_name().is_none() {
            return Err(InstallError::CorruptArchive(format!(
                "entry {:?} escapes the install directory",
                entry.name()
            )));
        }
    }
    Ok(())
}

fn unpack_zip(archive: &mut zip::ZipArchive<File>, dest_dir: &Path) -> InstallResult<()> {
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| InstallError::CorruptArchive(format!("entry {}: {}", i, e)))?;

        let entry_path = entry.enclosed_name().ok_or_else(|| {
            InstallError::CorruptArchive(format!("invalid entry path {:?}", entry.name()))
        })?;
        let dest_path = dest_dir.join(entry_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&dest_path)
                .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", dest_path), e))?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", parent), e))?;
        }

        let mut out = File::create(&dest_path)
            .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", dest_path), e))?;
        io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
                InstallError::CorruptArchive(format!("{}: {}", entry.name(), e))
            }
            _ => InstallError::filesystem(format!("Failed to write {:?}", dest_path), e),
        })?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dest_path, std::fs::Permissions::from_mode(mode))
                .map_err(|e| {
                    InstallError::filesystem(format!("Failed to set permissions on {:?}", dest_path), e)
                })?;
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_enclosed() {
        assert!(is_enclosed(Path::new("whive/bin/whive-qt")));
        assert!(is_enclosed(Path::new("./a/../b")));
        assert!(!is_enclosed(Path::new("../../etc/passwd")));
        assert!(!is_enclosed(Path::new("a/../../b")));
        assert!(!is_enclosed(Path::new("/etc/passwd")));
        assert!(link_is_enclosed(Path::new("lib/libx.so"), Path::new("libx.so.1")));
        assert!(link_is_enclosed(Path::new("bin/tool"), Path::new("../lib/tool")));
        assert!(!link_is_enclosed(Path::new("bin/tool"), Path::new("../../tool")));
    }

    #[test]
    fn test_extract_tar_gz_preserves_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("whive.tar.gz");
        std::fs::write(
            &archive,
            fixtures::tar_gz(&[
                ("whive/bin/whive-qt", b"#!/bin/sh\n"),
                ("whive/README", b"hello"),
            ]),
        )
        .unwrap();

        let dest = dir.path().join("whive-core");
        extract_archive_sync(&archive, &dest, ArchiveFormat::TarGz).unwrap();

        assert_eq!(std::fs::read(dest.join("whive/README")).unwrap(), b"hello");
        assert!(dest.join("whive/bin/whive-qt").is_file());
        // The caller decides when the archive goes away
        assert!(archive.exists());
    }

    #[test]
    fn test_extract_zip_preserves_layout() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bitcoin.zip");
        std::fs::write(
            &archive,
            fixtures::zip(&[("bitcoin-22.0/bin/bitcoin-qt.exe", b"MZ")]),
        )
        .unwrap();

        let dest = dir.path().join("bitcoin-core");
        extract_archive_sync(&archive, &dest, ArchiveFormat::Zip).unwrap();
        assert_eq!(
            std::fs::read(dest.join("bitcoin-22.0/bin/bitcoin-qt.exe")).unwrap(),
            b"MZ"
        );
    }

    #[test]
    fn test_tar_traversal_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.tar.gz");
        std::fs::write(
            &archive,
            fixtures::tar_gz(&[("good.txt", b"ok"), ("../../etc/passwd", b"root::0:0")]),
        )
        .unwrap();

        let dest = dir.path().join("a").join("dest");
        let err = extract_archive_sync(&archive, &dest, ArchiveFormat::TarGz).unwrap_err();
        assert!(matches!(err, InstallError::CorruptArchive(_)), "{:?}", err);
        assert!(!dest.join("good.txt").exists());
        assert!(!dir.path().join("etc").exists());
    }

    #[test]
    fn test_zip_traversal_is_rejected_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        std::fs::write(
            &archive,
            fixtures::zip(&[("good.txt", b"ok"), ("../escaped.txt", b"x")]),
        )
        .unwrap();

        let dest = dir.path().join("dest");
        let err = extract_archive_sync(&archive, &dest, ArchiveFormat::Zip).unwrap_err();
        assert!(matches!(err, InstallError::CorruptArchive(_)), "{:?}", err);
        assert!(!dest.join("good.txt").exists());
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[test]
    fn test_garbage_is_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("junk.zip");
        std::fs::write(&archive, b"definitely not a zip").unwrap();
        assert!(matches!(
            extract_archive_sync(&archive, &dir.path().join("d"), ArchiveFormat::Zip),
            Err(InstallError::CorruptArchive(_))
        ));

        let archive = dir.path().join("junk.tar.gz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();
        assert!(matches!(
            extract_archive_sync(&archive, &dir.path().join("d"), ArchiveFormat::TarGz),
            Err(InstallError::CorruptArchive(_))
        ));
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.tar.gz");
        assert!(matches!(
            extract_archive_sync(&missing, dir.path(), ArchiveFormat::TarGz),
            Err(InstallError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_async_extract_runs_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("m.tar.gz");
        std::fs::write(&archive, fixtures::tar_gz(&[("cpuminer", b"bin")])).unwrap();
        extract_archive(&archive, &dir.path().join("out"), ArchiveFormat::TarGz)
            .await
            .unwrap();
        assert!(dir.path().join("out/cpuminer").exists());
    }
}
