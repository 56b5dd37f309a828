use std::collections::BTreeMap;
use std::sync::RwLock;

use super::traits::is_valid_name;
use super::{ActionRecord, RecordRepository, RepositoryError, Result};

/// In-memory implementation of RecordRepository.
#[derive(Default)]
pub struct InMemoryRecordRepository {
    records: RwLock<BTreeMap<String, ActionRecord>>,
}

impl InMemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordRepository for InMemoryRecordRepository {
    fn save(&self, name: &str, record: &ActionRecord) -> Result<()> {
        if !is_valid_name(name) {
            return Err(RepositoryError::InvalidName(name.to_owned()));
        }
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.insert(name.to_owned(), record.clone());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<ActionRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.get(name).cloned())
    }

    fn exists(&self, name: &str) -> bool {
        self.records
            .read()
            .is_ok_and(|records| records.contains_key(name))
    }

    fn delete(&self, name: &str) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        records.remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let records = self
            .records
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(records.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use combat_core::SimConfig;

    use super::*;
    use crate::repository::RecordEntry;

    #[test]
    fn save_load_delete() {
        let repo = InMemoryRecordRepository::new();
        let record = ActionRecord::new("sample_caster", SimConfig::new())
            .with_entry(RecordEntry::new("fire", 0.0));

        repo.save("opener", &record).unwrap();
        assert!(repo.exists("opener"));
        assert_eq!(repo.load("opener").unwrap(), Some(record));
        assert_eq!(repo.list().unwrap(), vec!["opener".to_string()]);

        repo.delete("opener").unwrap();
        assert!(!repo.exists("opener"));
        assert_eq!(repo.load("opener").unwrap(), None);
    }

    #[test]
    fn rejects_path_like_names() {
        let repo = InMemoryRecordRepository::new();
        let record = ActionRecord::new("sample_caster", SimConfig::new());
        assert!(matches!(
            repo.save("../escape", &record),
            Err(RepositoryError::InvalidName(_))
        ));
    }
}
