use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// pipstrap - venv bootstrap, launcher and packager for Python desktop apps
#[derive(Parser, Debug)]
#[command(name = "pipstrap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project directory (default: current directory)
    #[arg(long, global = true, env = "PIPSTRAP_PROJECT_ROOT", value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    /// Without a subcommand, behaves like `run`.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe Python, ensure the venv, install requirements and launch the app
    Run(RunArgs),

    /// Build the executable with PyInstaller, then zip a source backup
    Package {
        /// Packaging descriptor (default: pipstrap.pack.yaml)
        #[arg(long, value_name = "FILE")]
        descriptor: Option<PathBuf>,

        /// Skip the source backup zip
        #[arg(long, default_value = "false")]
        no_backup: bool,
    },

    /// Zip the project sources into the dist directory
    Backup {
        /// Packaging descriptor (default: pipstrap.pack.yaml)
        #[arg(long, value_name = "FILE")]
        descriptor: Option<PathBuf>,
    },

    /// Print runtime, venv, manifest and entry point status
    Doctor,
}

/// Per-invocation overrides for the env/.env configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Virtual environment directory
    #[arg(long, value_name = "DIR")]
    pub venv_dir: Option<PathBuf>,

    /// Requirements manifest
    #[arg(long, value_name = "FILE")]
    pub manifest: Option<PathBuf>,

    /// Application entry script
    #[arg(long, value_name = "FILE")]
    pub entry: Option<PathBuf>,

    /// Python interpreter to try first
    #[arg(long, value_name = "EXE")]
    pub python: Option<String>,

    /// Package index URL passed to pip
    #[arg(long, value_name = "URL")]
    pub index_url: Option<String>,

    /// Skip pip when the manifest has not changed since the last install
    #[arg(long, default_value = "false")]
    pub skip_unchanged: bool,

    /// Do not print diagnostics on failure
    #[arg(long, default_value = "false")]
    pub no_diagnostics: bool,
}
