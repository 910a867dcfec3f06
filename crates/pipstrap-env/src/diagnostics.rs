//! Diagnostic reporter. Stateless and best-effort: gathering context must
//! never replace the original failure with a new one.

use std::fmt::Display;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use pipstrap_core::config::env_keys::launch as keys;
use pipstrap_core::config::{env_os, BootstrapConfig};

use crate::error::BootstrapError;
use crate::exec::CommandRunner;
use crate::sandbox::SandboxLayout;

/// Cap on entries printed per directory listing.
const MAX_LISTING: usize = 50;

const DUMPED_VARS: &[&str] = &[
    keys::PATH,
    keys::PYTHONPATH,
    keys::VIRTUAL_ENV,
    keys::PYTHONHOME,
    "PIP_INDEX_URL",
    keys::QT_PLUGIN_PATH,
    keys::QT_DEBUG_PLUGINS,
];

/// What the reporter may look at.
#[derive(Debug, Clone)]
pub struct DiagnosticContext {
    pub project_root: PathBuf,
    pub sandbox: SandboxLayout,
    pub python_candidates: Vec<String>,
    /// Full dumps when true; error line and hint only otherwise.
    pub rich: bool,
    /// Snapshot of relevant variables, taken when the context is built.
    pub env: Vec<(String, Option<String>)>,
}

impl DiagnosticContext {
    pub fn from_config(cfg: &BootstrapConfig) -> Self {
        Self {
            project_root: cfg.project_root.clone(),
            sandbox: SandboxLayout::new(&cfg.venv_dir),
            python_candidates: cfg.python_candidates.clone(),
            rich: cfg.diagnostics,
            env: DUMPED_VARS
                .iter()
                .map(|k| {
                    (
                        k.to_string(),
                        env_os(k).map(|v| v.to_string_lossy().into_owned()),
                    )
                })
                .collect(),
        }
    }
}

#[derive(Default)]
struct Report {
    buf: String,
}

impl Report {
    fn line(&mut self, s: impl Display) {
        self.buf.push_str(&s.to_string());
        self.buf.push('\n');
    }

    fn section(&mut self, title: impl Display) {
        self.line(format_args!("--- {} ---", title));
    }

    fn listing(&mut self, title: &str, dir: &Path) {
        self.section(format_args!("{}: {}", title, dir.display()));
        match list_dir(dir) {
            Ok(names) if names.is_empty() => self.line("  (empty)"),
            Ok(names) => {
                let total = names.len();
                for name in names.into_iter().take(MAX_LISTING) {
                    self.line(format_args!("  {}", name));
                }
                if total > MAX_LISTING {
                    self.line(format_args!("  ... {} more", total - MAX_LISTING));
                }
            }
            Err(e) => self.line(format_args!("  (unreadable: {})", e)),
        }
    }
}

/// Sorted entry names; directories get a trailing `/`.
pub fn list_dir(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.flatten().collect();
    entries.sort_by_key(|e| e.file_name());
    Ok(entries
        .into_iter()
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if e.path().is_dir() {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect())
}

fn tool_version(runner: &mut dyn CommandRunner, cmd: &mut Command) -> String {
    match runner.capture(cmd) {
        Ok(out) if out.success() => out.combined(),
        Ok(out) => format!("(exit {:?}) {}", out.code, out.combined()),
        Err(e) => format!("(unavailable: {})", e),
    }
}

fn tool_versions(report: &mut Report, runner: &mut dyn CommandRunner, ctx: &DiagnosticContext, venv: bool) {
    report.section("tool versions");
    for name in &ctx.python_candidates {
        let v = tool_version(runner, Command::new(name).arg("--version"));
        report.line(format_args!("  {}: {}", name, v));
    }
    if venv && ctx.sandbox.exists() {
        let python = ctx.sandbox.python();
        let v = tool_version(runner, Command::new(&python).arg("--version"));
        report.line(format_args!("  venv python: {}", v));
        let pip = tool_version(runner, Command::new(&python).args(["-m", "pip", "--version"]));
        report.line(format_args!("  venv pip: {}", pip));
    }
}

fn environment(report: &mut Report, ctx: &DiagnosticContext) {
    report.section("environment");
    for (key, value) in &ctx.env {
        match value {
            Some(v) => report.line(format_args!("  {}={}", key, v)),
            None => report.line(format_args!("  {} (unset)", key)),
        }
    }
}

/// Render the report for `err` as text.
pub fn render(err: &BootstrapError, ctx: &DiagnosticContext, runner: &mut dyn CommandRunner) -> String {
    let mut r = Report::default();
    r.line("========== pipstrap diagnostics ==========");
    r.line(format_args!("error: {}", err));
    r.line(format_args!("step:  {}", err.step()));
    r.line(format_args!("hint:  {}", err.hint()));

    if ctx.rich {
        match err {
            BootstrapError::RuntimeMissing { .. } => {
                tool_versions(&mut r, runner, ctx, false);
            }
            BootstrapError::SandboxCreateFailed { .. } => {
                r.listing("project directory", &ctx.project_root);
                tool_versions(&mut r, runner, ctx, false);
            }
            BootstrapError::SandboxActivateFailed { .. } => {
                r.listing("project directory", &ctx.project_root);
                r.listing("venv", ctx.sandbox.root());
                r.listing("venv executables", &ctx.sandbox.bin_dir());
            }
            BootstrapError::DependencyInstallFailed { output, .. } => {
                r.section("installer output");
                for l in output.lines() {
                    r.line(format_args!("  {}", l));
                }
                r.listing("venv executables", &ctx.sandbox.bin_dir());
                tool_versions(&mut r, runner, ctx, true);
            }
            BootstrapError::AppLaunchFailed { .. } => {
                r.listing("project directory", &ctx.project_root);
                r.listing("venv executables", &ctx.sandbox.bin_dir());
                tool_versions(&mut r, runner, ctx, true);
            }
        }
        environment(&mut r, ctx);
    }
    r.line("==========================================");
    r.buf
}

/// Write the report to `out`. Write errors are swallowed.
pub fn report(
    err: &BootstrapError,
    ctx: &DiagnosticContext,
    runner: &mut dyn CommandRunner,
    out: &mut dyn Write,
) {
    let text = render(err, ctx, runner);
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedRunner;
    use crate::exec::CommandOutput;
    use std::io;

    fn ctx(root: &Path, rich: bool) -> DiagnosticContext {
        DiagnosticContext {
            project_root: root.to_path_buf(),
            sandbox: SandboxLayout::new(root.join("venv")),
            python_candidates: vec!["python3".into()],
            rich,
            env: vec![
                ("PATH".into(), Some("/usr/bin".into())),
                ("PYTHONPATH".into(), None),
            ],
        }
    }

    #[test]
    fn test_list_dir_sorted_with_dir_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::write(tmp.path().join("requirements.txt"), "").unwrap();
        std::fs::write(tmp.path().join("README.md"), "").unwrap();
        assert_eq!(
            list_dir(tmp.path()).unwrap(),
            vec!["README.md", "requirements.txt", "src/"]
        );
    }

    #[test]
    fn test_install_report_contains_output_and_env() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BootstrapError::DependencyInstallFailed {
            manifest: tmp.path().join("requirements.txt"),
            output: "ERROR: Could not find a version that satisfies numpy==0.0".into(),
        };
        let mut runner = ScriptedRunner::new().on(|_| true, CommandOutput::ok("Python 3.12.1"));
        let text = render(&err, &ctx(tmp.path(), true), &mut runner);

        assert!(text.contains("step:  install"));
        assert!(text.contains("Could not find a version"));
        assert!(text.contains("python3: Python 3.12.1"));
        assert!(text.contains("PATH=/usr/bin"));
        assert!(text.contains("PYTHONPATH (unset)"));
        assert!(text.contains("(unreadable:"));
    }

    #[test]
    fn test_plain_report_skips_dumps() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BootstrapError::RuntimeMissing {
            tried: "python3".into(),
            detail: "not found".into(),
        };
        let mut runner = ScriptedRunner::new();
        let text = render(&err, &ctx(tmp.path(), false), &mut runner);
        assert!(text.contains("hint:"));
        assert!(!text.contains("--- environment ---"));
        assert!(runner.calls.is_empty());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_report_survives_failing_tools_and_sink() {
        let tmp = tempfile::tempdir().unwrap();
        let err = BootstrapError::AppLaunchFailed {
            entry: tmp.path().join("src/main.py"),
            code: Some(1),
            detail: String::new(),
        };
        let mut runner = ScriptedRunner::new().on_run(
            |_| true,
            |_| Err(io::Error::new(io::ErrorKind::NotFound, "gone")),
        );
        report(&err, &ctx(tmp.path(), true), &mut runner, &mut BrokenPipe);
        let text = render(&err, &ctx(tmp.path(), true), &mut runner);
        assert!(text.contains("(unavailable: gone)"));
    }
}
