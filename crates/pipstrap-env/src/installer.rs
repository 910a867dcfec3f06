//! Dependency installer: one `pip install -r <manifest>` inside the venv.
//!
//! All-or-nothing. Any package failing fails the step; nothing is retried.

use std::path::{Path, PathBuf};

use crate::error::BootstrapError;
use crate::exec::CommandRunner;
use crate::info_log;
use crate::manifest::Manifest;
use crate::sandbox::ActivatedSandbox;

/// Marker written into the venv after a successful install.
pub const INSTALL_STAMP_FILE: &str = ".pipstrap_installed";

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Package index mirror (`pip -i`).
    pub index_url: Option<String>,
    /// Skip when the manifest fingerprint matches the last successful install.
    pub skip_unchanged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { requirements: usize },
    SkippedEmpty,
    SkippedUnchanged,
}

pub fn stamp_path(sandbox: &ActivatedSandbox) -> PathBuf {
    sandbox.root().join(INSTALL_STAMP_FILE)
}

pub fn install(
    runner: &mut dyn CommandRunner,
    sandbox: &ActivatedSandbox,
    manifest_path: &Path,
    opts: &InstallOptions,
) -> Result<InstallOutcome, BootstrapError> {
    let fail = |output: String| BootstrapError::DependencyInstallFailed {
        manifest: manifest_path.to_path_buf(),
        output,
    };

    let manifest = Manifest::load(manifest_path)
        .map_err(|e| fail(format!("cannot read manifest: {}", e)))?;
    if manifest.is_empty() {
        info_log!("Manifest {} lists no packages, skipping install", manifest_path.display());
        return Ok(InstallOutcome::SkippedEmpty);
    }

    let fingerprint = manifest.fingerprint(opts.index_url.as_deref());
    let stamp = stamp_path(sandbox);
    if opts.skip_unchanged {
        let previous = std::fs::read_to_string(&stamp).unwrap_or_default();
        if previous.trim() == fingerprint {
            info_log!("Dependencies unchanged since last install, skipping");
            return Ok(InstallOutcome::SkippedUnchanged);
        }
    }

    let names: Vec<&str> = manifest.requirements().map(|r| r.name.as_str()).collect();
    info_log!("Installing {} requirement(s): {}", names.len(), names.join(", "));

    let manifest_abs = std::path::absolute(manifest_path)
        .map_err(|e| fail(format!("cannot resolve manifest path: {}", e)))?;
    let mut cmd = sandbox.python_command();
    cmd.args(["-m", "pip", "install", "--disable-pip-version-check", "-r"])
        .arg(&manifest_abs);
    if let Some(ref url) = opts.index_url {
        cmd.arg("-i").arg(url);
    }
    if let Some(dir) = manifest_abs.parent() {
        // relative `-r`/`-e` lines inside the manifest resolve from here
        cmd.current_dir(dir);
    }

    let out = runner.capture(&mut cmd).map_err(|e| fail(e.to_string()))?;
    if !out.success() {
        return Err(fail(out.combined()));
    }
    tracing::debug!(output = %out.stdout, "pip install finished");

    if let Err(e) = std::fs::write(&stamp, &fingerprint) {
        tracing::warn!("Could not write install stamp {}: {}", stamp.display(), e);
    }
    Ok(InstallOutcome::Installed {
        requirements: names.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;
    use crate::exec::CommandOutput;
    use crate::sandbox::tests::fake_venv;
    use crate::sandbox::{activate, SandboxLayout};

    fn setup(manifest: &str) -> (tempfile::TempDir, ActivatedSandbox, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = SandboxLayout::new(tmp.path().join("venv"));
        fake_venv(&layout);
        let active = activate(&layout, None).unwrap();
        let manifest_path = tmp.path().join("requirements.txt");
        std::fs::write(&manifest_path, manifest).unwrap();
        (tmp, active, manifest_path)
    }

    #[test]
    fn test_install_invokes_pip_once_with_whole_manifest() {
        let (_tmp, active, manifest) = setup("requests==2.0\nnumpy\n");
        let mut runner = ScriptedRunner::new();

        let outcome = install(&mut runner, &active, &manifest, &InstallOptions::default()).unwrap();

        assert_eq!(outcome, InstallOutcome::Installed { requirements: 2 });
        assert_eq!(runner.calls.len(), 1);
        let call = &runner.calls[0];
        assert_eq!(call.program, active.python().to_string_lossy());
        assert!(call.has_arg("-r"));
        assert!(call.has_arg(&manifest.to_string_lossy()));
        assert!(stamp_path(&active).exists());
    }

    #[test]
    fn test_install_failure_carries_tool_output() {
        let (_tmp, active, manifest) = setup("nosuchpkg==9.9\n");
        let mut runner = ScriptedRunner::new().on(
            |inv| inv.has_arg("pip"),
            CommandOutput::failed(1, "ERROR: No matching distribution found for nosuchpkg==9.9"),
        );

        let err = install(&mut runner, &active, &manifest, &InstallOptions::default()).unwrap_err();
        match err {
            BootstrapError::DependencyInstallFailed { manifest: m, output } => {
                assert_eq!(m, manifest);
                assert!(output.contains("No matching distribution"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!stamp_path(&active).exists());
    }

    #[test]
    fn test_missing_manifest_fails_install() {
        let (tmp, active, _) = setup("");
        let mut runner = ScriptedRunner::new();
        let err = install(
            &mut runner,
            &active,
            &tmp.path().join("absent.txt"),
            &InstallOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "DependencyInstallFailed");
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_empty_manifest_skips_pip() {
        let (_tmp, active, manifest) = setup("# nothing yet\n");
        let mut runner = ScriptedRunner::new();
        let outcome = install(&mut runner, &active, &manifest, &InstallOptions::default()).unwrap();
        assert_eq!(outcome, InstallOutcome::SkippedEmpty);
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_skip_unchanged_uses_stamp() {
        let (_tmp, active, manifest) = setup("numpy\n");
        let opts = InstallOptions {
            index_url: Some("https://pypi.tuna.tsinghua.edu.cn/simple".into()),
            skip_unchanged: true,
        };
        let mut runner = ScriptedRunner::new();

        let first = install(&mut runner, &active, &manifest, &opts).unwrap();
        let second = install(&mut runner, &active, &manifest, &opts).unwrap();

        assert_eq!(first, InstallOutcome::Installed { requirements: 1 });
        assert_eq!(second, InstallOutcome::SkippedUnchanged);
        assert_eq!(runner.calls.len(), 1);
        assert!(runner.calls[0].has_arg("-i"));
    }

    #[test]
    fn test_relative_layout_resolves_from_child_cwd() {
        let tmp = tempfile::tempdir_in(".").unwrap();
        let rel = tmp.path().to_path_buf();
        assert!(rel.is_relative());
        let layout = SandboxLayout::new(rel.join("venv"));
        fake_venv(&layout);
        let active = activate(&layout, None).unwrap();
        let manifest = rel.join("requirements.txt");
        std::fs::write(&manifest, "requests==2.0\n").unwrap();
        let mut runner = ScriptedRunner::new();

        install(&mut runner, &active, &manifest, &InstallOptions::default()).unwrap();

        let call = &runner.calls[0];
        assert!(Path::new(&call.program).is_absolute());
        let cwd = call.cwd.clone().unwrap();
        let r = call.args.iter().position(|a| a == "-r").unwrap();
        assert!(cwd.join(&call.args[r + 1]).is_file());
    }
}
