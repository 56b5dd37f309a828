//! Asynchronous abstraction for sourcing skill requests.
//!
//! The driver plays whatever a [`RequestSource`] hands it, so a run can be
//! paced by human input, a scripted record or a rotation policy.

use std::collections::VecDeque;

use async_trait::async_trait;
use combat_core::{SimConfig, SkillRequest};

use super::errors::Result;
use crate::repository::{ActionRecord, RecordEntry};

#[async_trait]
pub trait RequestSource: Send {
    /// Request due at or before simulated time `now`, if any.
    async fn poll(&mut self, now: f64) -> Result<Option<SkillRequest>>;

    /// Simulated time of the next request this source will produce.
    fn next_due(&self) -> Option<f64>;

    fn is_exhausted(&self) -> bool {
        self.next_due().is_none()
    }
}

/// Plays back the entries of an [`ActionRecord`] at their recorded times.
pub struct ScriptedSource {
    pending: VecDeque<RecordEntry>,
}

impl ScriptedSource {
    pub fn new(record: &ActionRecord) -> Self {
        Self {
            pending: record.entries.iter().cloned().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl RequestSource for ScriptedSource {
    async fn poll(&mut self, now: f64) -> Result<Option<SkillRequest>> {
        let due = self
            .pending
            .front()
            .is_some_and(|entry| entry.request_time <= now + SimConfig::EPSILON);
        if !due {
            return Ok(None);
        }
        Ok(self.pending.pop_front().map(|entry| entry.to_request()))
    }

    fn next_due(&self) -> Option<f64> {
        self.pending.front().map(|entry| entry.request_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_source_waits_for_request_time() {
        let record = ActionRecord::new("sample_caster", SimConfig::new())
            .with_entry(RecordEntry::new("fire_iii", 0.0))
            .with_entry(RecordEntry::new("flare", 3.5).with_targets(3));
        let mut source = ScriptedSource::new(&record);

        assert_eq!(source.poll(0.0).await.unwrap(), Some(SkillRequest::new("fire_iii")));
        assert_eq!(source.poll(3.0).await.unwrap(), None);
        assert_eq!(source.next_due(), Some(3.5));

        let flare = source.poll(3.5).await.unwrap().unwrap();
        assert_eq!(flare.target_count, 3);
        assert!(source.is_exhausted());
    }
}
