//! Subcommand implementations. Each one builds its config from env/.env plus
//! CLI overrides and drives the library crates with a real [`SystemRunner`].
//!
//! [`SystemRunner`]: pipstrap_env::SystemRunner

pub mod backup;
pub mod doctor;
pub mod package;
pub mod run;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// `--project-root` / `PIPSTRAP_PROJECT_ROOT`, else the current directory.
pub fn project_root(arg: Option<PathBuf>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(match arg {
        Some(p) if p.is_absolute() => p,
        Some(p) => cwd.join(p),
        None => cwd,
    })
}

/// CLI path arguments are relative to the project root.
pub(crate) fn under_root(root: &Path, p: &Path) -> PathBuf {
    root.join(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_root_resolution() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(project_root(None).unwrap(), cwd);
        assert_eq!(project_root(Some("app".into())).unwrap(), cwd.join("app"));
        let abs = std::env::temp_dir();
        assert_eq!(project_root(Some(abs.clone())).unwrap(), abs);
    }
}
