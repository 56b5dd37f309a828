use serde::{Deserialize, Serialize};

use combat_core::{SimConfig, SkillRequest};

/// One accepted skill request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub skill_name: String,
    #[serde(default = "single_target")]
    pub target_count: u32,
    pub request_time: f64,
}

fn single_target() -> u32 {
    1
}

impl RecordEntry {
    pub fn new(skill_name: impl Into<String>, request_time: f64) -> Self {
        Self {
            skill_name: skill_name.into(),
            target_count: 1,
            request_time,
        }
    }

    pub fn with_targets(mut self, target_count: u32) -> Self {
        self.target_count = target_count;
        self
    }

    pub fn to_request(&self) -> SkillRequest {
        SkillRequest::new(self.skill_name.clone()).with_targets(self.target_count)
    }
}

/// Replayable log of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub job: String,
    pub config: SimConfig,
    pub entries: Vec<RecordEntry>,
}

impl ActionRecord {
    pub fn new(job: impl Into<String>, config: SimConfig) -> Self {
        Self {
            job: job.into(),
            config,
            entries: Vec::new(),
        }
    }

    pub fn with_entry(mut self, entry: RecordEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn push(&mut self, entry: RecordEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries must be in non-decreasing time order.
    pub fn is_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|pair| pair[0].request_time <= pair[1].request_time)
    }
}
