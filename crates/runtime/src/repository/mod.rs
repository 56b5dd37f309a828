//! Persistence of action records.
//!
//! An [`ActionRecord`] is the minimal input needed to replay a run: the job,
//! its configuration (seed included) and every accepted request with its
//! timestamp. Job data itself is static content loaded by `combat-content`.

mod error;
mod file;
mod memory;
mod traits;
mod types;

pub use error::{RepositoryError, Result};
pub use file::FileRecordRepository;
pub use memory::InMemoryRecordRepository;
pub use traits::RecordRepository;
pub use types::{ActionRecord, RecordEntry};
