// Eligible Job - one object waiting for a step, as reported by the tracking service

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::priority::{classify, PriorityClass};

/// Opaque identifier of a unit of work (e.g. `druid:bb123cd4567`)
pub type ObjectId = String;

/// Priority signal from the tracking service (higher number = more urgent)
pub type RawPriority = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleJob {
    pub object_id: ObjectId,
    pub raw_priority: RawPriority,
}

impl EligibleJob {
    pub fn new(object_id: impl Into<String>, raw_priority: RawPriority) -> Self {
        Self {
            object_id: object_id.into(),
            raw_priority,
        }
    }

    pub fn priority_class(&self) -> PriorityClass {
        classify(self.raw_priority)
    }
}

/// Collapse repeated object ids into one job each
///
/// A repeated id keeps the position of its first occurrence and the priority
/// of its last.
pub fn dedup_by_object(jobs: Vec<EligibleJob>) -> Vec<EligibleJob> {
    let mut index: HashMap<ObjectId, usize> = HashMap::with_capacity(jobs.len());
    let mut unique: Vec<EligibleJob> = Vec::with_capacity(jobs.len());

    for job in jobs {
        match index.get(&job.object_id) {
            Some(&at) => unique[at].raw_priority = job.raw_priority,
            None => {
                index.insert(job.object_id.clone(), unique.len());
                unique.push(job);
            }
        }
    }
    unique
}
