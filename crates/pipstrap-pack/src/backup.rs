//! Timestamped zip of the project sources, written next to the build output.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PackError;

const SKIPPED_DIRS: &[&str] = &["__pycache__", ".git"];

/// `<name>_source_<YYYYmmdd_HHMMSS>.zip`
pub fn backup_file_name(name: &str, timestamp: &DateTime<Local>) -> String {
    format!("{}_source_{}.zip", name, timestamp.format("%Y%m%d_%H%M%S"))
}

/// Zip each existing path of `include` (relative to `project_root`) into
/// `dist_dir`. Missing paths are skipped. Returns the archive path.
pub fn create_source_backup(
    project_root: &Path,
    dist_dir: &Path,
    name: &str,
    include: &[String],
    timestamp: DateTime<Local>,
) -> Result<PathBuf, PackError> {
    fs::create_dir_all(dist_dir)
        .map_err(|e| PackError::io(format!("create {}", dist_dir.display()), e))?;
    let archive = dist_dir.join(backup_file_name(name, &timestamp));
    let file = File::create(&archive)
        .map_err(|e| PackError::io(format!("create {}", archive.display()), e))?;

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut added = 0usize;
    for rel in include {
        let path = project_root.join(rel);
        if path.is_dir() {
            added += add_dir(&mut zip, project_root, &path, options)?;
        } else if path.is_file() {
            add_file(&mut zip, project_root, &path, options)?;
            added += 1;
        } else {
            tracing::debug!("backup: skipping missing {}", rel);
        }
    }
    zip.finish()?;

    tracing::info!("Source backup created: {} ({} files)", archive.display(), added);
    Ok(archive)
}

/// Archive name: path relative to the project root with `/` separators.
fn entry_name(project_root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(project_root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn add_file(
    zip: &mut ZipWriter<File>,
    project_root: &Path,
    path: &Path,
    options: FileOptions,
) -> Result<(), PackError> {
    let mut buf = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut buf))
        .map_err(|e| PackError::io(format!("read {}", path.display()), e))?;
    zip.start_file(entry_name(project_root, path), options)?;
    zip.write_all(&buf)
        .map_err(|e| PackError::io(format!("write {}", path.display()), e))?;
    Ok(())
}

fn add_dir(
    zip: &mut ZipWriter<File>,
    project_root: &Path,
    dir: &Path,
    options: FileOptions,
) -> Result<usize, PackError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| PackError::io(format!("read {}", dir.display()), e))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut added = 0;
    for path in entries {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let is_link = fs::symlink_metadata(&path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        // Follows symlinks: a linked file is archived with its target's content.
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("backup: skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if meta.is_dir() {
            if SKIPPED_DIRS.contains(&file_name.as_str()) {
                continue;
            }
            if is_link {
                tracing::warn!("backup: not following directory link {}", path.display());
                continue;
            }
            added += add_dir(zip, project_root, &path, options)?;
        } else if meta.is_file() {
            add_file(zip, project_root, &path, options)?;
            added += 1;
        }
    }
    Ok(added)
}
