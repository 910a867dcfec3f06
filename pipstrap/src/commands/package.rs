use anyhow::Result;
use std::io;
use std::path::Path;

use pipstrap_core::config::BootstrapConfig;
use pipstrap_pack::backup::create_source_backup;
use pipstrap_pack::pyinstaller;
use pipstrap_env::{Bootstrap, SystemRunner};

use super::backup::load_descriptor;

const TROUBLESHOOTING: &[&str] = &[
    "Make sure the latest Visual C++ Redistributable is installed",
    "Check whether antivirus software is blocking the executable",
    "Try running the program as administrator",
];

/// `pipstrap package`
///
/// Provisions the venv like `run` (without launching), builds with
/// PyInstaller, then writes the source backup into the fresh dist dir.
pub fn cmd_package(root: &Path, descriptor: Option<&Path>, backup: bool) -> Result<()> {
    let (desc, dist_dir) = load_descriptor(root, descriptor)?;
    let boot = Bootstrap::new(BootstrapConfig::from_env_in(root));
    let mut runner = SystemRunner;

    let provisioned = match boot.provision(&mut runner) {
        Ok(p) => p,
        Err(e) => {
            let stderr = io::stderr();
            boot.report_failure(&e, &mut runner, &mut stderr.lock());
            return Err(e.into());
        }
    };

    eprintln!("Packaging {}...", desc.name);
    let output = pyinstaller::package(&mut runner, &provisioned.active, &desc, root, &dist_dir)?;
    provisioned.active.deactivate();

    eprintln!("Executable created: {}", output.executable.display());
    eprintln!("If the program does not start:");
    for (i, tip) in TROUBLESHOOTING.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, tip);
    }

    if backup {
        let archive = create_source_backup(
            root,
            &dist_dir,
            &desc.name,
            &desc.backup_paths,
            chrono::Local::now(),
        )?;
        eprintln!("Source backup created: {}", archive.display());
    }
    Ok(())
}
