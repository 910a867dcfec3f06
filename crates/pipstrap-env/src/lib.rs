//! Bootstrap for a Python GUI application: probe the runtime, provision a
//! project-local venv, install the manifest, launch the entry point.
//!
//! Every step returns `Result<_, BootstrapError>`; [`pipeline::Bootstrap`]
//! chains them and stops at the first failure.

pub mod diagnostics;
pub mod error;
pub mod exec;
pub mod installer;
pub mod launcher;
pub mod log;
pub mod manifest;
pub mod pipeline;
pub mod probe;
pub mod sandbox;

pub use error::{BootstrapError, Step};
pub use exec::{CommandOutput, CommandRunner, SystemRunner};
pub use pipeline::{Bootstrap, BootstrapReport, Provisioned};
