//! Binary artifact records and their discovery on disk.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Plain shared library (`.so`, `.dll`, `.dylib`).
    Binary,
    /// Python extension module (`.pyd`, `*.cpython-*.so`, `*.abi3.so`).
    Extension,
}

/// One file to bundle: where it comes from and where it lands in the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub source: PathBuf,
    /// Directory inside the bundle, `.` for the top level.
    pub dest: PathBuf,
    pub kind: ArtifactKind,
}

impl ArtifactRecord {
    pub fn new(source: impl Into<PathBuf>, dest: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            kind,
        }
    }
}

const SKIPPED_DIRS: &[&str] = &["__pycache__", ".git"];

/// `libfoo.so`, `libfoo.so.1.2`, `foo.dll`, `foo.dylib`, `foo.pyd`.
pub fn is_shared_library(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    if [".dll", ".dylib", ".pyd", ".so"]
        .iter()
        .any(|ext| lower.ends_with(ext))
    {
        return true;
    }
    match lower.find(".so.") {
        Some(i) => lower[i + 4..]
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

pub fn classify(name: &str) -> ArtifactKind {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".pyd") || lower.contains(".cpython-") || lower.ends_with(".abi3.so") {
        ArtifactKind::Extension
    } else {
        ArtifactKind::Binary
    }
}

/// Walk each search dir (sorted, recursive) and record every shared library.
///
/// The same library reachable from two search dirs is reported twice; that is
/// what [`crate::dedupe`] is for. Unreadable or missing dirs are skipped.
pub fn collect_binaries(search_dirs: &[PathBuf]) -> Vec<ArtifactRecord> {
    let mut out = Vec::new();
    for dir in search_dirs {
        if !dir.is_dir() {
            tracing::debug!("binary search dir missing: {}", dir.display());
            continue;
        }
        let mut visited = HashSet::new();
        walk(dir, dir, &mut visited, &mut out);
    }
    out
}

fn walk(root: &Path, current: &Path, visited: &mut HashSet<PathBuf>, out: &mut Vec<ArtifactRecord>) {
    // symlink loops
    if let Ok(real) = current.canonicalize() {
        if !visited.insert(real) {
            return;
        }
    }
    let Ok(entries) = fs::read_dir(current) else {
        return;
    };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if path.is_dir() {
            if !SKIPPED_DIRS.contains(&&*name) {
                walk(root, &path, visited, out);
            }
            continue;
        }
        if !path.is_file() || !is_shared_library(&name) {
            continue;
        }
        let dest = current
            .strip_prefix(root)
            .ok()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        out.push(ArtifactRecord::new(&path, dest, classify(&name)));
    }
}
