//! The bootstrap sequence: probe -> ensure sandbox -> activate -> install -> launch.
//!
//! Each gate returns `Result`; `?` stops the sequence at the first failure.

use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use pipstrap_core::config::BootstrapConfig;
use pipstrap_core::observability;

use crate::diagnostics::{self, DiagnosticContext};
use crate::error::{BootstrapError, Step};
use crate::exec::CommandRunner;
use crate::info_log;
use crate::installer::{self, InstallOptions, InstallOutcome};
use crate::launcher::{self, LaunchSpec};
use crate::manifest::Manifest;
use crate::probe::{self, RuntimeDescriptor, RuntimeProbe, RuntimeVersion};
use crate::sandbox::{self, ActivatedSandbox, SandboxLayout, SandboxState};

#[cfg(test)]
mod tests;

type Resolver = Box<dyn Fn(&str) -> Option<PathBuf>>;

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    pub runtime: RuntimeProbe,
    pub sandbox: SandboxState,
    pub install: InstallOutcome,
    pub steps: Vec<Step>,
}

/// Provisioned, activated venv with dependencies installed.
#[derive(Debug)]
pub struct Provisioned {
    pub runtime: RuntimeProbe,
    pub sandbox: SandboxState,
    pub install: InstallOutcome,
    pub active: ActivatedSandbox,
    pub steps: Vec<Step>,
}

pub struct Bootstrap {
    config: BootstrapConfig,
    resolver: Resolver,
}

impl Bootstrap {
    pub fn new(config: BootstrapConfig) -> Self {
        Self {
            config,
            resolver: Box::new(|name| which::which(name).ok()),
        }
    }

    /// Replace `PATH` lookup for the runtime probe.
    pub fn with_resolver(mut self, resolver: impl Fn(&str) -> Option<PathBuf> + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    fn runtime_descriptor(&self) -> RuntimeDescriptor {
        let min = self.config.min_python.as_deref().and_then(|raw| {
            let parsed = RuntimeVersion::parse(raw);
            if parsed.is_none() {
                tracing::warn!("Ignoring unparseable PIPSTRAP_MIN_PYTHON={:?}", raw);
            }
            parsed
        });
        RuntimeDescriptor::new(self.config.python_candidates.clone()).with_min_version(min)
    }

    /// Gates one to four: everything except the launch. Packaging reuses this.
    pub fn provision(&self, runner: &mut dyn CommandRunner) -> Result<Provisioned, BootstrapError> {
        let cfg = &self.config;
        let mut steps = Vec::with_capacity(Step::ALL.len());

        let runtime = gate(Step::Probe, &cfg.python_candidates.join(","), &mut steps, || {
            probe::probe_with(runner, &self.runtime_descriptor(), &self.resolver)
        })?;
        info_log!(
            "Found Python {} at {}",
            runtime.version,
            runtime.executable.display()
        );

        let layout = SandboxLayout::new(&cfg.venv_dir);
        let state = gate(
            Step::EnsureSandbox,
            &layout.root().display().to_string(),
            &mut steps,
            || sandbox::ensure_created(runner, &runtime, &layout),
        )?;
        match state {
            SandboxState::Created => {
                info_log!("Created virtual environment at {}", layout.root().display())
            }
            SandboxState::AlreadyPresent => {
                info_log!("Using virtual environment at {}", layout.root().display())
            }
        }

        let active = gate(
            Step::Activate,
            &layout.bin_dir().display().to_string(),
            &mut steps,
            || sandbox::activate(&layout, cfg.launch.inherited_path.as_deref()),
        )?;

        let opts = InstallOptions {
            index_url: cfg.index_url.clone(),
            skip_unchanged: cfg.skip_unchanged,
        };
        let install = gate(
            Step::Install,
            &cfg.manifest.display().to_string(),
            &mut steps,
            || installer::install(runner, &active, &cfg.manifest, &opts),
        )?;

        Ok(Provisioned {
            runtime,
            sandbox: state,
            install,
            active,
            steps,
        })
    }

    /// Run all five steps. No diagnostics are printed here.
    pub fn run(&self, runner: &mut dyn CommandRunner) -> Result<BootstrapReport, BootstrapError> {
        let Provisioned {
            runtime,
            sandbox,
            install,
            active,
            mut steps,
        } = self.provision(runner)?;

        let spec = LaunchSpec {
            entry_point: self.config.entry_point.clone(),
            working_dir: self.config.project_root.clone(),
            env: self.config.launch.clone(),
        };
        info_log!("Launching {}", spec.entry_point.display());
        gate(
            Step::Launch,
            &spec.entry_point.display().to_string(),
            &mut steps,
            || launcher::launch(runner, &active, &spec),
        )?;

        active.deactivate();
        Ok(BootstrapReport {
            runtime,
            sandbox,
            install,
            steps,
        })
    }

    /// Write the step-specific diagnostics for `err` to `out`. The report
    /// carries the error line itself, so nothing else needs to print it.
    pub fn report_failure(
        &self,
        err: &BootstrapError,
        runner: &mut dyn CommandRunner,
        out: &mut dyn Write,
    ) {
        let ctx = DiagnosticContext::from_config(&self.config);
        diagnostics::report(err, &ctx, runner, out);
    }

    /// [`run`](Self::run), then on failure write diagnostics to `out`.
    pub fn run_with_diagnostics(
        &self,
        runner: &mut dyn CommandRunner,
        out: &mut dyn Write,
    ) -> Result<BootstrapReport, BootstrapError> {
        let start = Instant::now();
        let result = self.run(runner);
        if let Err(ref err) = result {
            self.report_failure(err, runner, out);
        }
        observability::audit_bootstrap_finished(result.is_ok(), start.elapsed().as_millis() as u64);
        result
    }

    /// Status overview without changing anything. Never fails.
    pub fn doctor(&self, runner: &mut dyn CommandRunner, out: &mut dyn Write) {
        let cfg = &self.config;
        let mut lines = Vec::new();
        lines.push(format!("project root : {}", cfg.project_root.display()));
        match probe::probe_with(runner, &self.runtime_descriptor(), &self.resolver) {
            Ok(rt) => lines.push(format!(
                "runtime      : Python {} ({})",
                rt.version,
                rt.executable.display()
            )),
            Err(e) => lines.push(format!("runtime      : MISSING ({})", e)),
        }
        let layout = SandboxLayout::new(&cfg.venv_dir);
        lines.push(format!(
            "venv         : {} ({})",
            layout.root().display(),
            if layout.exists() { "present" } else { "absent" }
        ));
        match Manifest::load(&cfg.manifest) {
            Ok(m) => lines.push(format!(
                "manifest     : {} ({} requirement(s))",
                cfg.manifest.display(),
                m.requirements().count()
            )),
            Err(e) => lines.push(format!("manifest     : {} ({})", cfg.manifest.display(), e)),
        }
        lines.push(format!(
            "entry point  : {} ({})",
            cfg.entry_point.display(),
            if cfg.entry_point.is_file() { "found" } else { "missing" }
        ));
        let _ = writeln!(out, "{}", lines.join("\n"));
    }
}

/// Run one gate with timing and audit records.
fn gate<T>(
    step: Step,
    detail: &str,
    done: &mut Vec<Step>,
    f: impl FnOnce() -> Result<T, BootstrapError>,
) -> Result<T, BootstrapError> {
    observability::audit_step_started(step.as_str(), detail);
    let start = Instant::now();
    match f() {
        Ok(v) => {
            observability::audit_step_completed(step.as_str(), start.elapsed().as_millis() as u64);
            done.push(step);
            Ok(v)
        }
        Err(e) => {
            observability::audit_step_failed(step.as_str(), e.kind(), &e.to_string());
            Err(e)
        }
    }
}
