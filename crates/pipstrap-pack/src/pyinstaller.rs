//! Build the platform executable with PyInstaller inside the venv.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pipstrap_core::observability;
use pipstrap_env::exec::CommandRunner;
use pipstrap_env::sandbox::ActivatedSandbox;

use crate::artifact::{collect_binaries, ArtifactRecord};
use crate::dedupe::partition_duplicates;
use crate::descriptor::PackDescriptor;
use crate::error::PackError;

/// Separator PyInstaller expects inside `--add-data`/`--add-binary`.
#[cfg(windows)]
const ADD_SEP: &str = ";";
#[cfg(not(windows))]
const ADD_SEP: &str = ":";

/// Collected binaries after dedup.
#[derive(Debug, Clone)]
pub struct BinaryPlan {
    pub binaries: Vec<ArtifactRecord>,
    pub dropped: usize,
}

pub fn plan_binaries(descriptor: &PackDescriptor, project_root: &Path) -> BinaryPlan {
    let dirs: Vec<PathBuf> = descriptor
        .binary_search_dirs
        .iter()
        .map(|d| project_root.join(d))
        .collect();
    let collected = collect_binaries(&dirs);
    let outcome = partition_duplicates(collected, descriptor.dedup);
    for dup in &outcome.dropped {
        tracing::debug!("dropping duplicate binary {}", dup.source.display());
    }
    BinaryPlan {
        binaries: outcome.kept,
        dropped: outcome.dropped.len(),
    }
}

fn pair(source: &Path, dest: &Path) -> OsString {
    let mut s = OsString::from(source);
    s.push(ADD_SEP);
    s.push(dest);
    s
}

/// Arguments after `python -m PyInstaller`.
pub fn pyinstaller_args(
    descriptor: &PackDescriptor,
    plan: &BinaryPlan,
    project_root: &Path,
    dist_dir: &Path,
) -> Vec<OsString> {
    let build_dir = project_root.join("build");
    let mut args: Vec<OsString> = vec![
        project_root.join(&descriptor.entry).into(),
        format!("--name={}", descriptor.name).into(),
        "--noconfirm".into(),
        "--distpath".into(),
        dist_dir.into(),
        "--workpath".into(),
        build_dir.clone().into(),
        "--specpath".into(),
        build_dir.into(),
    ];
    if descriptor.onefile {
        args.push("--onefile".into());
    }
    if descriptor.windowed {
        args.push("--windowed".into());
    }
    if let Some(ref icon) = descriptor.icon {
        args.push("--icon".into());
        args.push(project_root.join(icon).into());
    }
    if let Some(ref version) = descriptor.version_file {
        args.push("--version-file".into());
        args.push(project_root.join(version).into());
    }
    for module in &descriptor.hidden_imports {
        args.push("--hidden-import".into());
        args.push(module.into());
    }
    for data in &descriptor.datas {
        args.push("--add-data".into());
        args.push(pair(&project_root.join(&data.source), &data.dest));
    }
    for bin in &plan.binaries {
        args.push("--add-binary".into());
        args.push(pair(&bin.source, &bin.dest));
    }
    args
}

/// Where PyInstaller leaves the result.
pub fn output_path(descriptor: &PackDescriptor, dist_dir: &Path) -> PathBuf {
    if descriptor.onefile {
        let file = if cfg!(windows) {
            format!("{}.exe", descriptor.name)
        } else {
            descriptor.name.clone()
        };
        dist_dir.join(file)
    } else {
        dist_dir.join(&descriptor.name)
    }
}

fn install_build_requirements(runner: &mut dyn CommandRunner, sandbox: &ActivatedSandbox, reqs: &[String]) {
    for req in reqs {
        tracing::info!("Installing build requirement {}", req);
        let mut cmd = sandbox.python_command();
        cmd.args(["-m", "pip", "install", "--upgrade", "--disable-pip-version-check"])
            .arg(req);
        match runner.capture(&mut cmd) {
            Ok(out) if out.success() => {}
            Ok(out) => tracing::warn!("Installing {} failed: {}", req, out.combined()),
            Err(e) => tracing::warn!("Installing {} failed: {}", req, e),
        }
    }
}

fn clean(dir: &Path) -> Result<(), PackError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .map_err(|e| PackError::io(format!("remove {}", dir.display()), e))?;
    }
    Ok(())
}

/// `dist_dir` is wiped before each build; refuse one that holds the project.
fn check_dist_dir(project_root: &Path, dist_dir: &Path) -> Result<(), PackError> {
    let resolve = |p: &Path| {
        p.canonicalize()
            .or_else(|_| std::path::absolute(p))
            .unwrap_or_else(|_| p.to_path_buf())
    };
    let root = resolve(project_root);
    let dist = resolve(dist_dir);
    if root.starts_with(&dist) {
        return Err(PackError::InvalidDescriptor(format!(
            "dist directory {} contains the project root {}, refusing to clean it",
            dist_dir.display(),
            project_root.display()
        )));
    }
    Ok(())
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct PackageOutput {
    pub executable: PathBuf,
    pub binaries: usize,
    pub duplicates_dropped: usize,
}

/// Install build tools, clean old output, dedupe binaries, run PyInstaller.
pub fn package(
    runner: &mut dyn CommandRunner,
    sandbox: &ActivatedSandbox,
    descriptor: &PackDescriptor,
    project_root: &Path,
    dist_dir: &Path,
) -> Result<PackageOutput, PackError> {
    descriptor.validate(project_root)?;
    check_dist_dir(project_root, dist_dir)?;

    install_build_requirements(runner, sandbox, &descriptor.build_requirements);

    clean(&project_root.join("build"))?;
    clean(dist_dir)?;

    let plan = plan_binaries(descriptor, project_root);
    tracing::info!(
        "Bundling {} binaries ({} duplicates dropped)",
        plan.binaries.len(),
        plan.dropped
    );

    let mut cmd = sandbox.python_command();
    cmd.args(["-m", "PyInstaller"])
        .args(pyinstaller_args(descriptor, &plan, project_root, dist_dir))
        .current_dir(project_root);
    let out = runner
        .run_inherited(&mut cmd)
        .map_err(|e| PackError::BuildFailed {
            code: None,
            detail: e.to_string(),
        })?;
    if !out.success() {
        return Err(PackError::BuildFailed {
            code: out.code,
            detail: format!("exit code {:?}", out.code),
        });
    }

    let executable = output_path(descriptor, dist_dir);
    if !executable.exists() {
        return Err(PackError::OutputMissing(executable));
    }
    observability::audit_package_built(
        &descriptor.name,
        &executable.display().to_string(),
        plan.binaries.len(),
        plan.dropped,
    );
    Ok(PackageOutput {
        executable,
        binaries: plan.binaries.len(),
        duplicates_dropped: plan.dropped,
    })
}
