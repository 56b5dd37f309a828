//! File-based RecordRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};

use super::traits::is_valid_name;
use super::{ActionRecord, RecordRepository, RepositoryError, Result};

/// Stores each record as `record_<name>.json` under a base directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written record behind.
pub struct FileRecordRepository {
    base_dir: PathBuf,
}

impl FileRecordRepository {
    /// Create a new file-based record repository.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, name: &str) -> Result<PathBuf> {
        if !is_valid_name(name) {
            return Err(RepositoryError::InvalidName(name.to_owned()));
        }
        Ok(self.base_dir.join(format!("record_{}.json", name)))
    }

    /// Reads a record from an arbitrary JSON file.
    pub fn read_path(path: &Path) -> Result<ActionRecord> {
        let json = fs::read_to_string(path).map_err(RepositoryError::Io)?;
        let record: ActionRecord =
            serde_json::from_str(&json).map_err(|e| RepositoryError::Json(e.to_string()))?;
        if !record.is_ordered() {
            return Err(RepositoryError::CorruptedRecord {
                name: path.display().to_string(),
                reason: "entries are not in time order".into(),
            });
        }
        Ok(record)
    }

    /// Writes a record to an arbitrary JSON file.
    pub fn write_path(path: &Path, record: &ActionRecord) -> Result<()> {
        let temp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| RepositoryError::Json(e.to_string()))?;
        fs::write(&temp_path, json).map_err(RepositoryError::Io)?;
        fs::rename(&temp_path, path).map_err(RepositoryError::Io)?;
        Ok(())
    }
}

impl RecordRepository for FileRecordRepository {
    fn save(&self, name: &str, record: &ActionRecord) -> Result<()> {
        let path = self.record_path(name)?;
        Self::write_path(&path, record)?;
        tracing::debug!("Saved record: {}", path.display());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<ActionRecord>> {
        let path = self.record_path(name)?;
        if !path.exists() {
            return Ok(None);
        }

        let record = Self::read_path(&path)?;
        tracing::info!(
            "Loaded record '{}' for job {} with {} entries",
            name,
            record.job,
            record.entries.len()
        );
        Ok(Some(record))
    }

    fn exists(&self, name: &str) -> bool {
        self.record_path(name).is_ok_and(|path| path.exists())
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.record_path(name)?;
        if path.exists() {
            fs::remove_file(&path).map_err(RepositoryError::Io)?;
            tracing::info!("Deleted record: {}", path.display());
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let entries = fs::read_dir(&self.base_dir).map_err(RepositoryError::Io)?;
        for entry in entries {
            let entry = entry.map_err(RepositoryError::Io)?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(name) = filename
                    .strip_prefix("record_")
                    .and_then(|s| s.strip_suffix(".json"))
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}
