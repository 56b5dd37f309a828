//! Repository contract for saving and loading action records.

use super::{ActionRecord, Result};

/// Named storage of [`ActionRecord`]s.
pub trait RecordRepository: Send + Sync {
    fn save(&self, name: &str, record: &ActionRecord) -> Result<()>;

    /// Returns `None` when no record of that name exists.
    fn load(&self, name: &str) -> Result<Option<ActionRecord>>;

    fn exists(&self, name: &str) -> bool;

    fn delete(&self, name: &str) -> Result<()>;

    /// Sorted record names.
    fn list(&self) -> Result<Vec<String>>;
}

/// Names become file stems, so path separators and dots are refused.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
