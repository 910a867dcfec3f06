//! Packaging descriptor (`pipstrap.pack.yaml`).
//!
//! ```yaml
//! name: PackageManager
//! entry: src/main.py
//! windowed: true
//! icon: assets/app.ico
//! hidden_imports: [PyQt5.sip]
//! datas:
//!   - source: config
//!     dest: config
//! binary_search_dirs: [venv/lib]
//! dedup: basename
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dedupe::DedupPolicy;
use crate::error::PackError;

/// Paths included in the source backup when the descriptor does not list any.
pub const DEFAULT_BACKUP_PATHS: &[&str] = &[
    "src",
    "config",
    "requirements.txt",
    "README.md",
    "run.bat",
    "run.sh",
    ".gitignore",
];

/// Installed into the venv before building.
pub const DEFAULT_BUILD_REQUIREMENTS: &[&str] = &["pyinstaller"];

/// `(source dir, dest dir)` pair copied verbatim into the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataInclusion {
    pub source: PathBuf,
    pub dest: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackDescriptor {
    pub name: String,
    pub entry: PathBuf,
    /// Single-file executable instead of a directory bundle.
    pub onefile: bool,
    /// No console window (GUI app).
    pub windowed: bool,
    pub icon: Option<PathBuf>,
    pub version_file: Option<PathBuf>,
    pub hidden_imports: Vec<String>,
    pub datas: Vec<DataInclusion>,
    /// Where to look for shared libraries to bundle explicitly.
    pub binary_search_dirs: Vec<PathBuf>,
    pub dedup: DedupPolicy,
    pub build_requirements: Vec<String>,
    pub backup_paths: Vec<String>,
}

impl Default for PackDescriptor {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            entry: PathBuf::from("src/main.py"),
            onefile: true,
            windowed: true,
            icon: None,
            version_file: None,
            hidden_imports: Vec::new(),
            datas: Vec::new(),
            binary_search_dirs: Vec::new(),
            dedup: DedupPolicy::default(),
            build_requirements: DEFAULT_BUILD_REQUIREMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            backup_paths: DEFAULT_BACKUP_PATHS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PackDescriptor {
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self, PackError> {
        serde_yaml::from_str(text).map_err(|source| PackError::Descriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or fall back to defaults named after the project dir.
    pub fn load_or_default(path: &Path, project_root: &Path) -> Result<Self, PackError> {
        if !path.exists() {
            tracing::info!(
                "No packaging descriptor at {}, using defaults",
                path.display()
            );
            let mut d = Self::default();
            if let Some(dir_name) = project_root.file_name() {
                d.name = dir_name.to_string_lossy().into_owned();
            }
            return Ok(d);
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| PackError::io(format!("read {}", path.display()), e))?;
        Self::from_yaml(path, &text)
    }

    /// Check everything the descriptor points at, relative to `project_root`.
    pub fn validate(&self, project_root: &Path) -> Result<(), PackError> {
        if self.name.trim().is_empty() || self.name.contains(['/', '\\']) {
            return Err(PackError::InvalidDescriptor(format!(
                "name {:?} is not a valid file name",
                self.name
            )));
        }
        let must_exist = std::iter::once(("entry", &self.entry))
            .chain(self.icon.iter().map(|p| ("icon", p)))
            .chain(self.version_file.iter().map(|p| ("version_file", p)))
            .chain(self.datas.iter().map(|d| ("datas.source", &d.source)));
        for (field, rel) in must_exist {
            if !project_root.join(rel).exists() {
                return Err(PackError::InvalidDescriptor(format!(
                    "{} {} does not exist",
                    field,
                    rel.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: PackageManager
entry: src/main.py
onefile: true
windowed: true
icon: assets/app.ico
hidden_imports:
  - PyQt5.sip
  - requests
datas:
  - source: config
    dest: config
binary_search_dirs: [venv/lib]
dedup: path
"#;

    #[test]
    fn test_parse_full_descriptor() {
        let d = PackDescriptor::from_yaml(Path::new("pipstrap.pack.yaml"), SAMPLE).unwrap();
        assert_eq!(d.name, "PackageManager");
        assert_eq!(d.hidden_imports, vec!["PyQt5.sip", "requests"]);
        assert_eq!(
            d.datas,
            vec![DataInclusion {
                source: "config".into(),
                dest: "config".into()
            }]
        );
        assert_eq!(d.dedup, DedupPolicy::RawPath);
        assert_eq!(d.build_requirements, vec!["pyinstaller"]);
        assert!(d.version_file.is_none());
    }

    #[test]
    fn test_bad_yaml_names_file() {
        let err = PackDescriptor::from_yaml(Path::new("pack.yaml"), "name: [unclosed").unwrap_err();
        assert!(err.to_string().contains("pack.yaml"));
    }

    #[test]
    fn test_missing_file_defaults_to_project_name() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("MyTool");
        std::fs::create_dir_all(&root).unwrap();
        let d = PackDescriptor::load_or_default(&root.join("pipstrap.pack.yaml"), &root).unwrap();
        assert_eq!(d.name, "MyTool");
        assert_eq!(d.dedup, DedupPolicy::NormalizedBasename);
        assert!(d.backup_paths.contains(&"requirements.txt".to_string()));
    }

    #[test]
    fn test_validate_reports_missing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let d = PackDescriptor::from_yaml(Path::new("p.yaml"), SAMPLE).unwrap();
        let err = d.validate(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("entry src/main.py does not exist"));

        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("src/main.py"), "").unwrap();
        std::fs::create_dir_all(tmp.path().join("assets")).unwrap();
        std::fs::write(tmp.path().join("assets/app.ico"), "").unwrap();
        std::fs::create_dir_all(tmp.path().join("config")).unwrap();
        d.validate(tmp.path()).unwrap();
    }
}
