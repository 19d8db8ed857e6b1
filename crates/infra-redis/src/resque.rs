//! Resque conventions
//!
//! Workers consume the queues with Resque, so keys and payloads follow its
//! layout: a list per queue at `{namespace}:queue:{name}`, a registry set at
//! `{namespace}:queues`, and JSON payloads `{"class": ..., "args": [...]}`.

use robot_master_core::domain::{QualifiedStep, QueueKey};
use serde::{Deserialize, Serialize};

/// Job payload as Resque stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResquePayload {
    pub class: String,
    pub args: Vec<String>,
}

impl ResquePayload {
    pub fn new(step: &QualifiedStep, object_id: &str) -> Self {
        Self {
            class: robot_class(step),
            args: vec![object_id.to_string()],
        }
    }
}

/// Redis list holding the queue
pub fn queue_list_key(namespace: &str, key: &QueueKey) -> String {
    format!("{}:queue:{}", namespace, key.queue_name())
}

/// Redis set listing every known queue
pub fn queues_set_key(namespace: &str) -> String {
    format!("{}:queues", namespace)
}

/// Worker class for a step
///
/// `dor:assemblyWF:jp2-create` becomes `Robots::DorRepo::Assembly::Jp2Create`.
pub fn robot_class(step: &QualifiedStep) -> String {
    let pipeline = step.pipeline();
    let pipeline = pipeline.strip_suffix("WF").unwrap_or(pipeline);

    format!(
        "Robots::{}Repo::{}::{}",
        camelize(step.namespace()),
        camelize(pipeline),
        camelize(step.step())
    )
}

/// Upper-case the first letter of every `-`/`_` separated word and drop the separators
fn camelize(s: &str) -> String {
    s.split(['-', '_'])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
