use anyhow::Result;
use std::io;
use std::path::Path;

use pipstrap_core::config::BootstrapConfig;
use pipstrap_env::{Bootstrap, SystemRunner};

use super::under_root;
use crate::cli::RunArgs;

/// Layer `pipstrap run` flags over the env-derived config.
pub fn apply_overrides(cfg: &mut BootstrapConfig, args: &RunArgs) {
    let root = cfg.project_root.clone();
    if let Some(ref p) = args.venv_dir {
        cfg.venv_dir = under_root(&root, p);
    }
    if let Some(ref p) = args.manifest {
        cfg.manifest = under_root(&root, p);
    }
    if let Some(ref p) = args.entry {
        cfg.entry_point = under_root(&root, p);
    }
    if let Some(ref python) = args.python {
        cfg.python_candidates.retain(|c| c != python);
        cfg.python_candidates.insert(0, python.clone());
    }
    if args.index_url.is_some() {
        cfg.index_url = args.index_url.clone();
    }
    if args.skip_unchanged {
        cfg.skip_unchanged = true;
    }
    if args.no_diagnostics {
        cfg.diagnostics = false;
    }
}

/// `pipstrap run` (also the default with no subcommand)
pub fn cmd_run(root: &Path, args: &RunArgs) -> Result<()> {
    let mut cfg = BootstrapConfig::from_env_in(root);
    apply_overrides(&mut cfg, args);

    let boot = Bootstrap::new(cfg);
    let mut runner = SystemRunner;
    let stderr = io::stderr();
    let report = boot.run_with_diagnostics(&mut runner, &mut stderr.lock())?;
    tracing::debug!(steps = ?report.steps, sandbox = ?report.sandbox, "bootstrap finished");
    Ok(())
}
