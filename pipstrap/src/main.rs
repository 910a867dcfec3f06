mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use pipstrap_core::config::load_dotenv;
use pipstrap_core::observability;
use pipstrap_env::BootstrapError;

fn main() -> ExitCode {
    // .env may set PIPSTRAP_PROJECT_ROOT, which clap reads during parsing.
    load_dotenv();
    observability::init_tracing();
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !already_reported(&e) {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// Bootstrap failures were already printed by the diagnostic report.
fn already_reported(e: &anyhow::Error) -> bool {
    e.downcast_ref::<BootstrapError>().is_some()
}

fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let root = commands::project_root(cli.project_root)?;
    match cli.command {
        None => commands::run::cmd_run(&root, &RunArgs::default()),
        Some(Commands::Run(args)) => commands::run::cmd_run(&root, &args),
        Some(Commands::Package {
            descriptor,
            no_backup,
        }) => commands::package::cmd_package(&root, descriptor.as_deref(), !no_backup),
        Some(Commands::Backup { descriptor }) => {
            commands::backup::cmd_backup(&root, descriptor.as_deref())
        }
        Some(Commands::Doctor) => commands::doctor::cmd_doctor(&root),
    }
}
