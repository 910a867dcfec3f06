use anyhow::Result;
use std::path::{Path, PathBuf};

use pipstrap_core::config::PackConfig;
use pipstrap_pack::backup::create_source_backup;
use pipstrap_pack::PackDescriptor;

use super::under_root;

/// Descriptor path from `--descriptor` or config, and the dist dir.
pub(crate) fn load_descriptor(
    root: &Path,
    descriptor: Option<&Path>,
) -> Result<(PackDescriptor, PathBuf)> {
    let pack = PackConfig::from_env_in(root);
    let path = descriptor
        .map(|p| under_root(root, p))
        .unwrap_or(pack.descriptor);
    let desc = PackDescriptor::load_or_default(&path, root)?;
    Ok((desc, pack.dist_dir))
}

/// `pipstrap backup`
pub fn cmd_backup(root: &Path, descriptor: Option<&Path>) -> Result<()> {
    let (desc, dist_dir) = load_descriptor(root, descriptor)?;
    let archive = create_source_backup(
        root,
        &dist_dir,
        &desc.name,
        &desc.backup_paths,
        chrono::Local::now(),
    )?;
    println!("{}", archive.display());
    Ok(())
}
