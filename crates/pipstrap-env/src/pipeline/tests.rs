//! Sequencing tests for the bootstrap pipeline.

use super::*;
use crate::exec::testing::{Invocation, ScriptedRunner};
use crate::exec::CommandOutput;
use crate::sandbox::tests::fake_venv;
use std::path::Path;

struct Project {
    _tmp: tempfile::TempDir,
    config: BootstrapConfig,
}

fn project(manifest: &str) -> Project {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("src").join("main.py"), "import sys\n").unwrap();
    std::fs::write(root.join("requirements.txt"), manifest).unwrap();
    let config = BootstrapConfig::with_defaults(root);
    Project { _tmp: tmp, config }
}

fn python_on_path(name: &str) -> Option<PathBuf> {
    (name == "python3").then(|| PathBuf::from("/usr/bin/python3"))
}

fn nothing_on_path(_: &str) -> Option<PathBuf> {
    None
}

fn is_venv(inv: &Invocation) -> bool {
    inv.has_arg("venv")
}

fn is_pip(inv: &Invocation) -> bool {
    inv.has_arg("pip") && inv.has_arg("install")
}

fn is_launch(inv: &Invocation) -> bool {
    inv.inherited
}

/// Runner that answers `--version` and materialises the venv on `-m venv`.
fn healthy_runner(venv_root: &Path) -> ScriptedRunner {
    let layout = SandboxLayout::new(venv_root);
    ScriptedRunner::new()
        .on(|inv| inv.has_arg("--version"), CommandOutput::ok("Python 3.11.4"))
        .on_run(is_venv, move |_| {
            fake_venv(&layout);
            Ok(CommandOutput::ok(""))
        })
}

#[test]
fn test_happy_path_runs_all_steps_in_order() {
    let p = project("requests==2.0\nnumpy\n");
    let mut runner = healthy_runner(&p.config.venv_dir);
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);

    let report = boot.run(&mut runner).unwrap();

    assert_eq!(report.steps, Step::ALL.to_vec());
    assert_eq!(report.sandbox, SandboxState::Created);
    assert_eq!(report.install, InstallOutcome::Installed { requirements: 2 });
    let order: Vec<&str> = runner
        .calls
        .iter()
        .map(|c| {
            if is_venv(c) {
                "venv"
            } else if is_pip(c) {
                "pip"
            } else if is_launch(c) {
                "launch"
            } else {
                "probe"
            }
        })
        .collect();
    assert_eq!(order, vec!["probe", "venv", "pip", "launch"]);
}

#[test]
fn test_probe_failure_stops_everything() {
    let p = project("numpy\n");
    let mut runner = healthy_runner(&p.config.venv_dir);
    let boot = Bootstrap::new(p.config.clone()).with_resolver(nothing_on_path);

    let err = boot.run(&mut runner).unwrap_err();

    assert_eq!(err.kind(), "RuntimeMissing");
    assert!(runner.calls.is_empty());
    assert!(!p.config.venv_dir.exists());
}

#[test]
fn test_sandbox_create_failure_skips_install_and_launch() {
    let p = project("numpy\n");
    let mut runner = ScriptedRunner::new()
        .on(|inv| inv.has_arg("--version"), CommandOutput::ok("Python 3.11.4"))
        .on(is_venv, CommandOutput::failed(1, "No space left on device"));
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);

    let err = boot.run(&mut runner).unwrap_err();

    assert_eq!(err.step(), Step::EnsureSandbox);
    assert!(!runner.called(is_pip));
    assert!(!runner.called(is_launch));
}

#[test]
fn test_install_failure_never_launches() {
    let p = project("nosuchpkg==9.9\n");
    let mut runner = healthy_runner(&p.config.venv_dir)
        .on(is_pip, CommandOutput::failed(1, "ERROR: No matching distribution"));
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);

    let err = boot.run(&mut runner).unwrap_err();

    assert_eq!(err.kind(), "DependencyInstallFailed");
    assert!(runner.called(is_pip));
    assert!(!runner.called(is_launch));
}

#[test]
fn test_successful_install_proceeds_to_launch() {
    let p = project("requests==2.0\nnumpy\n");
    let mut runner = healthy_runner(&p.config.venv_dir)
        .on(is_pip, CommandOutput::ok("Successfully installed numpy requests"));
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);

    let report = boot.run(&mut runner).unwrap();

    assert!(matches!(report.install, InstallOutcome::Installed { .. }));
    assert!(runner.called(is_launch));
}

#[test]
fn test_second_run_reuses_sandbox() {
    let p = project("numpy\n");
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);

    let mut first = healthy_runner(&p.config.venv_dir);
    boot.run(&mut first).unwrap();
    let mut second = healthy_runner(&p.config.venv_dir);
    let report = boot.run(&mut second).unwrap();

    assert_eq!(report.sandbox, SandboxState::AlreadyPresent);
    assert!(!second.called(is_venv));
}

#[test]
fn test_launch_failure_reports_exit_code_and_diagnostics() {
    let p = project("numpy\n");
    let mut runner =
        healthy_runner(&p.config.venv_dir).on(is_launch, CommandOutput::failed(2, ""));
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);
    let mut out = Vec::new();

    let err = boot.run_with_diagnostics(&mut runner, &mut out).unwrap_err();

    assert!(matches!(err, BootstrapError::AppLaunchFailed { code: Some(2), .. }));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("step:  launch"));
    assert!(text.contains("requirements.txt"));
}

#[test]
fn test_launch_uses_venv_python_and_project_pythonpath() {
    let p = project("numpy\n");
    let mut runner = healthy_runner(&p.config.venv_dir);
    let boot = Bootstrap::new(p.config.clone()).with_resolver(python_on_path);

    boot.run(&mut runner).unwrap();

    let launch = runner.calls.iter().find(|c| is_launch(c)).unwrap();
    let venv_python = SandboxLayout::new(&p.config.venv_dir).python();
    assert_eq!(launch.program, venv_python.to_string_lossy());
    assert_eq!(
        launch.env("PYTHONPATH"),
        Some(&*p.config.project_root.to_string_lossy())
    );
}

#[test]
fn test_doctor_reports_without_failing() {
    let p = project("numpy\nrequests\n");
    let mut runner = ScriptedRunner::new();
    let boot = Bootstrap::new(p.config.clone()).with_resolver(nothing_on_path);
    let mut out = Vec::new();

    boot.doctor(&mut runner, &mut out);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("runtime      : MISSING"));
    assert!(text.contains("(2 requirement(s))"));
    assert!(text.contains("absent"));
}
