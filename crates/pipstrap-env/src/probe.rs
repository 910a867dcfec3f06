//! Environment prober: find a usable Python interpreter on the host.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::BootstrapError;
use crate::exec::CommandRunner;

/// Which runtime the bootstrap needs. Checked once per run.
#[derive(Debug, Clone)]
pub struct RuntimeDescriptor {
    /// Executable names (or paths), tried in order.
    pub candidates: Vec<String>,
    /// `None` accepts any parseable version.
    pub min_version: Option<RuntimeVersion>,
}

impl RuntimeDescriptor {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            min_version: None,
        }
    }

    pub fn with_min_version(mut self, min: Option<RuntimeVersion>) -> Self {
        self.min_version = min;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

static VERSION_RE: OnceLock<Option<Regex>> = OnceLock::new();

impl RuntimeVersion {
    /// Pull the first `major.minor[.patch]` out of free text like `Python 3.11.4`.
    pub fn parse(text: &str) -> Option<Self> {
        let re = VERSION_RE
            .get_or_init(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").ok())
            .as_ref()?;
        let caps = re.captures(text)?;
        Some(Self {
            major: caps.get(1)?.as_str().parse().ok()?,
            minor: caps.get(2)?.as_str().parse().ok()?,
            patch: caps
                .get(3)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0),
        })
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Successful probe result.
#[derive(Debug, Clone)]
pub struct RuntimeProbe {
    pub executable: PathBuf,
    /// Raw `--version` text.
    pub version_text: String,
    pub version: RuntimeVersion,
}

/// Probe using `PATH` lookup via `which`.
pub fn probe(
    runner: &mut dyn CommandRunner,
    desc: &RuntimeDescriptor,
) -> Result<RuntimeProbe, BootstrapError> {
    probe_with(runner, desc, |name| which::which(name).ok())
}

/// Probe with a caller-supplied executable resolver.
pub fn probe_with(
    runner: &mut dyn CommandRunner,
    desc: &RuntimeDescriptor,
    resolve: impl Fn(&str) -> Option<PathBuf>,
) -> Result<RuntimeProbe, BootstrapError> {
    let mut failures = Vec::new();

    for name in &desc.candidates {
        let Some(exe) = resolve(name) else {
            failures.push(format!("{}: not found on PATH", name));
            continue;
        };
        match query_version(runner, &exe) {
            Ok((text, version)) => {
                if let Some(min) = desc.min_version {
                    if version < min {
                        failures.push(format!("{}: version {} is older than {}", name, version, min));
                        continue;
                    }
                }
                tracing::debug!(executable = %exe.display(), %version, "runtime probe ok");
                return Ok(RuntimeProbe {
                    executable: exe,
                    version_text: text,
                    version,
                });
            }
            Err(reason) => failures.push(format!("{}: {}", name, reason)),
        }
    }

    Err(BootstrapError::RuntimeMissing {
        tried: desc.candidates.join(", "),
        detail: if failures.is_empty() {
            "no candidates configured".to_string()
        } else {
            failures.join("; ")
        },
    })
}

fn query_version(
    runner: &mut dyn CommandRunner,
    exe: &Path,
) -> Result<(String, RuntimeVersion), String> {
    let out = runner
        .capture(Command::new(exe).arg("--version"))
        .map_err(|e| e.to_string())?;
    if !out.success() {
        return Err(format!("--version exited with {:?}", out.code));
    }
    // Python 2 prints its version on stderr.
    let text = out.combined();
    let version =
        RuntimeVersion::parse(&text).ok_or_else(|| format!("unparseable version {:?}", text))?;
    Ok((text, version))
}
