// Queue Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::priority::PriorityClass;
use crate::domain::step::QualifiedStep;

/// Identifies one physical FIFO queue: (qualified step, priority class)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    pub step: QualifiedStep,
    pub class: PriorityClass,
}

impl QueueKey {
    pub fn new(step: QualifiedStep, class: PriorityClass) -> Self {
        Self { step, class }
    }

    /// Canonical queue name, e.g. `dor_assemblyWF_jp2-create_high`
    ///
    /// Workers subscribe by this exact name, so the format is fixed. It is not
    /// injective: `_` is legal inside every segment, and `a_b:c:d` and
    /// `a:b_c:d` share a queue. Keep `_` out of namespace and pipeline names.
    pub fn queue_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.step.namespace(),
            self.step.pipeline(),
            self.step.step(),
            self.class
        )
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.queue_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_name() {
        let key = QueueKey::new(
            "dor:assemblyWF:jp2-create".parse().unwrap(),
            PriorityClass::High,
        );
        assert_eq!(key.queue_name(), "dor_assemblyWF_jp2-create_high");
        assert_eq!(key.to_string(), key.queue_name());
    }

    #[test]
    fn test_underscore_segments_share_a_queue_name() {
        let left = QueueKey::new("a_b:c:d".parse().unwrap(), PriorityClass::Default);
        let right = QueueKey::new("a:b_c:d".parse().unwrap(), PriorityClass::Default);

        assert_ne!(left, right);
        assert_eq!(left.queue_name(), "a_b_c_d_default");
        assert_eq!(left.queue_name(), right.queue_name());
    }
}
