//! Launcher: run the entry point with the venv interpreter, stdio inherited.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use pipstrap_core::config::env_keys::launch as keys;
use pipstrap_core::config::LaunchEnvConfig;

use crate::error::BootstrapError;
use crate::exec::CommandRunner;
use crate::sandbox::ActivatedSandbox;

#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub entry_point: PathBuf,
    /// Child's cwd and first `PYTHONPATH` entry.
    pub working_dir: PathBuf,
    pub env: LaunchEnvConfig,
}

/// `PYTHONPATH` for the child: the working dir alone, or the working dir in
/// front of the inherited value when `extend` is set.
pub fn search_path(
    working_dir: &Path,
    inherited: Option<&OsStr>,
    extend: bool,
) -> Result<OsString, std::env::JoinPathsError> {
    let mut parts = vec![working_dir.to_path_buf()];
    if extend {
        if let Some(prev) = inherited {
            parts.extend(std::env::split_paths(prev).filter(|p| {
                !p.as_os_str().is_empty() && p.as_path() != working_dir
            }));
        }
    }
    std::env::join_paths(parts)
}

pub fn build_command(
    sandbox: &ActivatedSandbox,
    spec: &LaunchSpec,
) -> Result<Command, BootstrapError> {
    let fail = |detail: String| BootstrapError::AppLaunchFailed {
        entry: spec.entry_point.clone(),
        code: None,
        detail,
    };

    if !spec.entry_point.is_file() {
        return Err(fail(format!(
            "entry point not found: {}",
            spec.entry_point.display()
        )));
    }

    let entry = std::path::absolute(&spec.entry_point).map_err(|e| fail(e.to_string()))?;
    let working_dir = std::path::absolute(&spec.working_dir).map_err(|e| fail(e.to_string()))?;
    let pythonpath = search_path(
        &working_dir,
        spec.env.inherited_pythonpath.as_deref(),
        spec.env.extend_pythonpath,
    )
    .map_err(|e| fail(e.to_string()))?;

    let mut cmd = sandbox.python_command();
    cmd.arg(&entry)
        .current_dir(&working_dir)
        .env(keys::PYTHONPATH, pythonpath);
    if let Some(ref plugins) = spec.env.qt_plugin_path {
        cmd.env(keys::QT_PLUGIN_PATH, plugins);
    }
    if let Some(ref debug) = spec.env.qt_debug_plugins {
        cmd.env(keys::QT_DEBUG_PLUGINS, debug);
    }
    Ok(cmd)
}

/// Blocks until the application exits. Non-zero exit is `AppLaunchFailed`.
pub fn launch(
    runner: &mut dyn CommandRunner,
    sandbox: &ActivatedSandbox,
    spec: &LaunchSpec,
) -> Result<(), BootstrapError> {
    let mut cmd = build_command(sandbox, spec)?;
    let out = runner
        .run_inherited(&mut cmd)
        .map_err(|e| BootstrapError::AppLaunchFailed {
            entry: spec.entry_point.clone(),
            code: None,
            detail: e.to_string(),
        })?;
    if !out.success() {
        return Err(BootstrapError::AppLaunchFailed {
            entry: spec.entry_point.clone(),
            code: out.code,
            detail: String::new(),
        });
    }
    Ok(())
}
