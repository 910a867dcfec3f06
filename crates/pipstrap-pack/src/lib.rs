//! Packaging-time tooling: collect shared libraries, drop duplicates, drive
//! PyInstaller, and zip a source backup.

pub mod artifact;
pub mod backup;
pub mod dedupe;
pub mod descriptor;
pub mod error;
pub mod pyinstaller;

pub use artifact::{ArtifactKind, ArtifactRecord};
pub use dedupe::{dedupe, DedupKey, DedupPolicy};
pub use descriptor::PackDescriptor;
pub use error::PackError;
