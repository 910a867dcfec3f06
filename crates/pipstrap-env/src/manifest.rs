//! Dependency manifest (`requirements.txt` style). Read-only input.
//!
//! The installer consumes the file verbatim via `-r`; parsing here only feeds
//! logging, diagnostics and the install fingerprint.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// One `name[constraint]` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    /// Everything after the name, e.g. `==2.0` or `[socks]>=2.31`.
    pub constraint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLine {
    Requirement(Requirement),
    /// Installer option such as `-e .` or `--extra-index-url ...`.
    Option(String),
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub path: PathBuf,
    pub lines: Vec<ManifestLine>,
    raw: String,
}

const NAME_TERMINATORS: &[char] = &['=', '<', '>', '!', '~', ';', '[', ' ', '@', '\t'];

impl Manifest {
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::parse(path, raw))
    }

    pub fn parse(path: &Path, raw: String) -> Self {
        let lines = raw
            .lines()
            .map(strip_comment)
            .filter(|l| !l.is_empty())
            .map(parse_line)
            .collect();
        Self {
            path: path.to_path_buf(),
            lines,
            raw,
        }
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.lines.iter().filter_map(|l| match l {
            ManifestLine::Requirement(r) => Some(r),
            ManifestLine::Option(_) => None,
        })
    }

    /// Nothing for the installer to do.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// SHA-256 over the raw content and the index in use.
    pub fn fingerprint(&self, index_url: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.raw.as_bytes());
        hasher.update([0u8]);
        hasher.update(index_url.unwrap_or("").as_bytes());
        hex::encode(hasher.finalize())
    }
}

fn strip_comment(line: &str) -> &str {
    let line = line.trim();
    if line.starts_with('#') {
        return "";
    }
    match line.find(" #") {
        Some(i) => line[..i].trim_end(),
        None => line,
    }
}

fn parse_line(line: &str) -> ManifestLine {
    if line.starts_with('-') {
        return ManifestLine::Option(line.to_string());
    }
    let (name, rest) = match line.find(NAME_TERMINATORS) {
        Some(i) => (&line[..i], line[i..].trim()),
        None => (line, ""),
    };
    ManifestLine::Requirement(Requirement {
        name: name.trim().to_string(),
        constraint: (!rest.is_empty()).then(|| rest.to_string()),
    })
}
