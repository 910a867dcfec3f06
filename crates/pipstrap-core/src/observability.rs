//! Observability: tracing init and the JSONL audit trail for bootstrap steps.
//!
//! Uses config::ObservabilityConfig for PIPSTRAP_QUIET, LOG_LEVEL, LOG_JSON, AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

/// Initialize tracing. Call at process startup.
/// When PIPSTRAP_QUIET=1, only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "pipstrap=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // stdout is reserved for command output (doctor, backup path).
    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn audit_path() -> Option<&'static str> {
    let path = ObservabilityConfig::from_env().audit_log.as_deref()?;
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    Some(path)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Append one JSON record as a line. Best-effort: I/O errors are dropped.
pub fn append_jsonl(path: &Path, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn emit(record: serde_json::Value) {
    if let Some(path) = audit_path() {
        append_jsonl(Path::new(path), &record);
    }
}

/// Audit: a bootstrap or packaging step is about to run
pub fn audit_step_started(step: &str, detail: &str) {
    emit(json!({
        "ts": now(),
        "event": "step_started",
        "step": step,
        "detail": detail,
    }));
}

/// Audit: step finished successfully
pub fn audit_step_completed(step: &str, duration_ms: u64) {
    emit(json!({
        "ts": now(),
        "event": "step_completed",
        "step": step,
        "duration_ms": duration_ms,
    }));
}

/// Audit: step failed; `kind` is the error taxonomy name (e.g. RuntimeMissing)
pub fn audit_step_failed(step: &str, kind: &str, message: &str) {
    tracing::debug!(step = %step, kind = %kind, "audit: step failed");
    emit(json!({
        "ts": now(),
        "event": "step_failed",
        "step": step,
        "kind": kind,
        "message": message,
    }));
}

/// Audit: whole bootstrap sequence ended
pub fn audit_bootstrap_finished(success: bool, duration_ms: u64) {
    emit(json!({
        "ts": now(),
        "event": "bootstrap_finished",
        "success": success,
        "exit_code": if success { 0 } else { 1 },
        "duration_ms": duration_ms,
    }));
}

/// Audit: packaging produced an executable
pub fn audit_package_built(name: &str, output: &str, binaries_kept: usize, binaries_dropped: usize) {
    emit(json!({
        "ts": now(),
        "event": "package_built",
        "name": name,
        "output": output,
        "binaries_kept": binaries_kept,
        "binaries_dropped": binaries_dropped,
    }));
}
