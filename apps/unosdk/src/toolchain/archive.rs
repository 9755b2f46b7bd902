//! Archive extraction for downloaded toolchains.
//!
//! ZIP and tar.gz archives are unpacked as-is: the top-level layout of the
//! archive is reproduced under the destination directory. Deciding whether a
//! single wrapping folder should become the install path is left to the
//! caller.

use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::errors::SdkError;

/// Unpacks an archive file into a directory.
pub trait Extractor {
    /// Extracts `archive` into `dest`, creating `dest` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Extraction`] if the archive is unreadable or any
    /// entry would land outside `dest`.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), SdkError>;
}

/// [`Extractor`] for `.zip`, `.tar.gz` and `.tgz` files, chosen by extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), SdkError> {
        let name = archive.to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            extract_tar_gz(archive, dest)
        } else if name.ends_with(".zip") {
            extract_zip(archive, dest)
        } else {
            Err(SdkError::extraction(format!(
                "unsupported archive format: {}",
                archive.display()
            )))
        }
    }
}

fn io_error(message: String) -> impl FnOnce(std::io::Error) -> SdkError {
    move |e| SdkError::extraction_with_source(message, Box::new(e))
}

/// Rejects absolute entries and entries containing `..`.
fn checked_entry_path(raw: &Path) -> Result<PathBuf, SdkError> {
    let escapes = raw.is_absolute()
        || raw.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(SdkError::extraction(format!(
            "refusing to extract entry outside the destination: {}",
            raw.display()
        )));
    }
    Ok(raw.to_path_buf())
}

/// Rejects link entries whose target resolves outside the archive root.
///
/// Hard-link targets are archive-relative; symlink targets are relative to
/// the link's own directory.
fn check_link_target(entry_path: &Path, target: &Path, hard: bool) -> Result<(), SdkError> {
    let base = if hard {
        Path::new("")
    } else {
        entry_path.parent().unwrap_or(Path::new(""))
    };
    let mut depth: usize = base.components().count();
    let mut escapes = target.is_absolute();
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => escapes = true,
            },
            Component::RootDir | Component::Prefix(_) => escapes = true,
        }
    }
    if escapes {
        return Err(SdkError::extraction(format!(
            "refusing to extract link {} pointing outside the destination: {}",
            entry_path.display(),
            target.display()
        )));
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<(), SdkError> {
    let file = std::fs::File::open(archive_path)
        .map_err(io_error(format!("failed to open {}", archive_path.display())))?;

    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        SdkError::extraction_with_source(
            format!("failed to read ZIP archive {}", archive_path.display()),
            Box::new(e),
        )
    })?;

    std::fs::create_dir_all(dest_dir)
        .map_err(io_error(format!("failed to create {}", dest_dir.display())))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            SdkError::extraction_with_source(format!("failed to read archive entry {i}"), Box::new(e))
        })?;

        // `enclosed_name` returns None for names that escape the archive root.
        let raw_name = entry.name().to_string();
        let entry_path = entry
            .enclosed_name()
            .ok_or_else(|| {
                SdkError::extraction(format!(
                    "refusing to extract entry outside the destination: {raw_name}"
                ))
            })
            .and_then(|p| checked_entry_path(&p))?;

        let output_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path)
                .map_err(io_error(format!("failed to create {}", output_path.display())))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(io_error(format!("failed to create {}", parent.display())))?;
        }
        let mut outfile = std::fs::File::create(&output_path)
            .map_err(io_error(format!("failed to create {}", output_path.display())))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(io_error(format!("failed to extract {}", output_path.display())))?;

        restore_mode(&output_path, entry.unix_mode())?;
    }

    Ok(())
}

/// Applies the permission bits stored in a ZIP entry, so launch scripts stay executable.
#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> Result<(), SdkError> {
    use std::os::unix::fs::PermissionsExt;

    let Some(mode) = mode else {
        return Ok(());
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))
        .map_err(io_error(format!("failed to set permissions on {}", path.display())))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> Result<(), SdkError> {
    Ok(())
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<(), SdkError> {
    std::fs::create_dir_all(dest_dir)
        .map_err(io_error(format!("failed to create {}", dest_dir.display())))?;

    let file = std::fs::File::open(archive_path)
        .map_err(io_error(format!("failed to open {}", archive_path.display())))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(io_error(format!("failed to read {}", archive_path.display())))?;

    for entry in entries {
        let mut entry =
            entry.map_err(io_error(format!("failed to read entry of {}", archive_path.display())))?;

        let entry_path = entry
            .path()
            .map_err(io_error("failed to read entry path".to_string()))?
            .into_owned();
        let entry_path = checked_entry_path(&entry_path)?;
        if entry_path.as_os_str().is_empty() {
            continue;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let target = entry
                .link_name()
                .map_err(io_error(format!("failed to read link target of {}", entry_path.display())))?
                .ok_or_else(|| {
                    SdkError::extraction(format!("link without target: {}", entry_path.display()))
                })?
                .into_owned();
            check_link_target(&entry_path, &target, entry_type.is_hard_link())?;
        }

        // `unpack_in` also refuses to write through links created by earlier entries.
        let unpacked = entry
            .unpack_in(dest_dir)
            .map_err(io_error(format!("failed to extract {}", entry_path.display())))?;
        if !unpacked {
            return Err(SdkError::extraction(format!(
                "refusing to extract entry outside the destination: {}",
                entry_path.display()
            )));
        }
    }

    Ok(())
}
