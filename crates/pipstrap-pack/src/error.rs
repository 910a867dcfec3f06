use std::path::PathBuf;

use pipstrap_env::BootstrapError;
use thiserror::Error;

/// Errors returned by packaging.
#[derive(Debug, Error)]
pub enum PackError {
    #[error("Invalid packaging descriptor {}: {source}", .path.display())]
    Descriptor {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid packaging descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("PyInstaller failed ({detail})")]
    BuildFailed { code: Option<i32>, detail: String },

    #[error("Build finished but {} was not produced", .0.display())]
    OutputMissing(PathBuf),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

impl PackError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
