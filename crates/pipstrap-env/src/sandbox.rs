//! Isolated environment manager: a project-local venv.
//!
//! Activation does not touch this process's environment. It yields an
//! [`ActivatedSandbox`] that is applied to each child `Command` explicitly.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use pipstrap_core::config::env_keys::launch as keys;

use crate::error::BootstrapError;
use crate::exec::CommandRunner;
use crate::probe::RuntimeProbe;

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

#[cfg(windows)]
const PYTHON_EXE: &str = "python.exe";
#[cfg(not(windows))]
const PYTHON_EXE: &str = "python";

/// Paths inside a venv rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxLayout {
    root: PathBuf,
}

impl SandboxLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `bin/` on Unix, `Scripts/` on Windows.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR)
    }

    pub fn python(&self) -> PathBuf {
        self.bin_dir().join(PYTHON_EXE)
    }

    /// A sandbox counts as present once its interpreter exists; a bare
    /// directory left by an interrupted run is re-populated.
    pub fn exists(&self) -> bool {
        self.python().is_file()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Created,
    AlreadyPresent,
}

/// Create the venv unless it is already there. Idempotent.
pub fn ensure_created(
    runner: &mut dyn CommandRunner,
    runtime: &RuntimeProbe,
    layout: &SandboxLayout,
) -> Result<SandboxState, BootstrapError> {
    if layout.exists() {
        tracing::debug!(root = %layout.root().display(), "venv already present");
        return Ok(SandboxState::AlreadyPresent);
    }

    let fail = |detail: String| BootstrapError::SandboxCreateFailed {
        root: layout.root().to_path_buf(),
        detail,
    };

    if let Some(parent) = layout.root().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
    }

    let mut cmd = Command::new(&runtime.executable);
    cmd.arg("-m").arg("venv").arg(layout.root());
    let out = runner.capture(&mut cmd).map_err(|e| fail(e.to_string()))?;
    if !out.success() {
        return Err(fail(format!(
            "`python -m venv` exited with {:?}: {}",
            out.code,
            out.combined()
        )));
    }
    if !layout.exists() {
        return Err(fail(format!(
            "interpreter missing after creation: {}",
            layout.python().display()
        )));
    }
    Ok(SandboxState::Created)
}

/// Resolved activation: what a shell `activate` script would have exported.
#[derive(Debug, Clone)]
pub struct ActivatedSandbox {
    root: PathBuf,
    bin_dir: PathBuf,
    python: PathBuf,
    path: OsString,
}

/// Resolve the interpreter and build a `PATH` with the venv's bin dir first.
pub fn activate(
    layout: &SandboxLayout,
    inherited_path: Option<&OsStr>,
) -> Result<ActivatedSandbox, BootstrapError> {
    let fail = |detail: String| BootstrapError::SandboxActivateFailed {
        root: layout.root().to_path_buf(),
        detail,
    };

    // Children may run with a different cwd, so every path handed out is absolute.
    let root = std::path::absolute(layout.root()).map_err(|e| fail(e.to_string()))?;
    let layout = SandboxLayout::new(root);
    let python = layout.python();
    if !python.is_file() {
        return Err(fail(format!("interpreter not found: {}", python.display())));
    }

    let bin_dir = layout.bin_dir();
    let inherited = inherited_path
        .map(|p| std::env::split_paths(p).collect::<Vec<_>>())
        .unwrap_or_default();
    let path = std::env::join_paths(
        std::iter::once(bin_dir.clone()).chain(inherited.into_iter().filter(|p| *p != bin_dir)),
    )
    .map_err(|e| fail(e.to_string()))?;

    Ok(ActivatedSandbox {
        root: layout.root().to_path_buf(),
        bin_dir,
        python,
        path,
    })
}

impl ActivatedSandbox {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// `PATH` value handed to children.
    pub fn path_var(&self) -> &OsStr {
        &self.path
    }

    /// Export the activation into `cmd`.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.env(keys::VIRTUAL_ENV, &self.root)
            .env(keys::PATH, &self.path)
            .env_remove(keys::PYTHONHOME);
    }

    /// `Command` for the venv interpreter with activation applied.
    pub fn python_command(&self) -> Command {
        let mut cmd = Command::new(&self.python);
        self.apply(&mut cmd);
        cmd
    }

    /// End of the activation scope. Nothing was exported globally, so there is
    /// nothing to undo and nothing that can fail.
    pub fn deactivate(self) {
        tracing::debug!(root = %self.root.display(), "venv deactivated");
    }
}
