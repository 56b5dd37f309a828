//! Content loaders for reading simulation data from files.

pub mod config;
pub mod job;
pub mod party;

pub use config::ConfigLoader;
pub use job::JobLoader;
pub use party::PartyBuffLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
