//! Failure taxonomy for the bootstrap sequence. Every variant is terminal.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The five gated steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Probe,
    EnsureSandbox,
    Activate,
    Install,
    Launch,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Probe,
        Step::EnsureSandbox,
        Step::Activate,
        Step::Install,
        Step::Launch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Probe => "probe",
            Step::EnsureSandbox => "ensure_sandbox",
            Step::Activate => "activate",
            Step::Install => "install",
            Step::Launch => "launch",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by the bootstrap steps.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Python runtime not found or unusable (tried: {tried}): {detail}")]
    RuntimeMissing { tried: String, detail: String },

    #[error("Failed to create virtual environment at {}: {detail}", .root.display())]
    SandboxCreateFailed { root: PathBuf, detail: String },

    #[error("Failed to activate virtual environment at {}: {detail}", .root.display())]
    SandboxActivateFailed { root: PathBuf, detail: String },

    #[error("Failed to install dependencies from {}", .manifest.display())]
    DependencyInstallFailed { manifest: PathBuf, output: String },

    #[error("Application {} exited abnormally ({})", .entry.display(), describe_exit(.code, .detail))]
    AppLaunchFailed {
        entry: PathBuf,
        code: Option<i32>,
        detail: String,
    },
}

fn describe_exit(code: &Option<i32>, detail: &str) -> String {
    match *code {
        Some(c) => format!("exit code {}", c),
        None if detail.is_empty() => "terminated by signal".to_string(),
        None => detail.to_string(),
    }
}

impl BootstrapError {
    /// Which gate produced this failure.
    pub fn step(&self) -> Step {
        match self {
            Self::RuntimeMissing { .. } => Step::Probe,
            Self::SandboxCreateFailed { .. } => Step::EnsureSandbox,
            Self::SandboxActivateFailed { .. } => Step::Activate,
            Self::DependencyInstallFailed { .. } => Step::Install,
            Self::AppLaunchFailed { .. } => Step::Launch,
        }
    }

    /// Taxonomy name, used in the audit log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RuntimeMissing { .. } => "RuntimeMissing",
            Self::SandboxCreateFailed { .. } => "SandboxCreateFailed",
            Self::SandboxActivateFailed { .. } => "SandboxActivateFailed",
            Self::DependencyInstallFailed { .. } => "DependencyInstallFailed",
            Self::AppLaunchFailed { .. } => "AppLaunchFailed",
        }
    }

    /// One-line hint printed under the error for the invoking user.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::RuntimeMissing { .. } => {
                "Install Python 3 and make sure it is on PATH, or set PIPSTRAP_PYTHON."
            }
            Self::SandboxCreateFailed { .. } => {
                "Check write permission and free disk space in the project directory."
            }
            Self::SandboxActivateFailed { .. } => {
                "The virtual environment looks incomplete; delete it and run again."
            }
            Self::DependencyInstallFailed { .. } => {
                "Check network access or set PIPSTRAP_INDEX_URL to a reachable mirror."
            }
            Self::AppLaunchFailed { .. } => {
                "The application itself failed; see its output above."
            }
        }
    }
}
