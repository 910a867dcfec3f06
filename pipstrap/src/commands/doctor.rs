use anyhow::Result;
use std::io;
use std::path::Path;

use pipstrap_core::config::BootstrapConfig;
use pipstrap_env::{Bootstrap, SystemRunner};

/// `pipstrap doctor`: report only, never fails.
pub fn cmd_doctor(root: &Path) -> Result<()> {
    let boot = Bootstrap::new(BootstrapConfig::from_env_in(root));
    let stdout = io::stdout();
    boot.doctor(&mut SystemRunner, &mut stdout.lock());
    Ok(())
}
