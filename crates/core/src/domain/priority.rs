// Priority Classes
//
// Raw priorities from the tracking service are bucketed into a small set of
// classes; each (step, class) pair is one physical queue.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::job::{EligibleJob, RawPriority};

/// Raw priorities at or above this value are `High`
pub const HIGH_PRIORITY_THRESHOLD: RawPriority = 40;

/// Raw priorities at or above this value are `Critical`
pub const CRITICAL_PRIORITY_THRESHOLD: RawPriority = 100;

/// Priority class, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityClass {
    Low,
    Default,
    High,
    Critical,
}

impl PriorityClass {
    pub const ALL: [PriorityClass; 4] = [
        PriorityClass::Low,
        PriorityClass::Default,
        PriorityClass::High,
        PriorityClass::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityClass::Low => "low",
            PriorityClass::Default => "default",
            PriorityClass::High => "high",
            PriorityClass::Critical => "critical",
        }
    }

    /// Work in these classes is dispatched even into non-empty queues
    pub fn is_priority(&self) -> bool {
        *self > PriorityClass::Default
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a raw priority onto its class (total over all integers)
pub fn classify(raw_priority: RawPriority) -> PriorityClass {
    if raw_priority >= CRITICAL_PRIORITY_THRESHOLD {
        PriorityClass::Critical
    } else if raw_priority >= HIGH_PRIORITY_THRESHOLD {
        PriorityClass::High
    } else if raw_priority >= 0 {
        PriorityClass::Default
    } else {
        PriorityClass::Low
    }
}

/// Distinct classes observed across a batch
pub fn classes_present(jobs: &[EligibleJob]) -> BTreeSet<PriorityClass> {
    jobs.iter().map(|job| classify(job.raw_priority)).collect()
}

/// True if any job in the batch is above the default tier
pub fn has_priority_items(jobs: &[EligibleJob]) -> bool {
    jobs.iter().any(|job| classify(job.raw_priority).is_priority())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn batch(priorities: &[RawPriority]) -> Vec<EligibleJob> {
        priorities
            .iter()
            .enumerate()
            .map(|(i, p)| EligibleJob::new(format!("druid:obj{}", i), *p))
            .collect()
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(i64::MIN), PriorityClass::Low);
        assert_eq!(classify(-1), PriorityClass::Low);
        assert_eq!(classify(0), PriorityClass::Default);
        assert_eq!(classify(5), PriorityClass::Default);
        assert_eq!(classify(39), PriorityClass::Default);
        assert_eq!(classify(40), PriorityClass::High);
        assert_eq!(classify(99), PriorityClass::High);
        assert_eq!(classify(100), PriorityClass::Critical);
        assert_eq!(classify(i64::MAX), PriorityClass::Critical);
    }

    #[test]
    fn test_classes_present() {
        let classes = classes_present(&batch(&[5, 50, 7, -3]));
        let expected: BTreeSet<_> = [
            PriorityClass::Low,
            PriorityClass::Default,
            PriorityClass::High,
        ]
        .into_iter()
        .collect();
        assert_eq!(classes, expected);
        assert!(classes_present(&[]).is_empty());
    }

    #[test]
    fn test_has_priority_items() {
        assert!(!has_priority_items(&batch(&[0, 5, -10])));
        assert!(has_priority_items(&batch(&[0, 40])));
        assert!(has_priority_items(&batch(&[500])));
        assert!(!has_priority_items(&[]));
    }

    #[test]
    fn test_class_names() {
        assert_eq!(PriorityClass::Default.to_string(), "default");
        assert_eq!(
            serde_json::to_string(&PriorityClass::Critical).unwrap(),
            "\"critical\""
        );
    }

    proptest! {
        /// Property: classes_present is exactly the image of classify over the batch
        #[test]
        fn classes_present_matches_classify(priorities in prop::collection::vec(any::<i64>(), 0..32)) {
            let jobs = batch(&priorities);
            let expected: BTreeSet<_> = priorities.iter().map(|p| classify(*p)).collect();
            prop_assert_eq!(classes_present(&jobs), expected);
        }

        /// Property: priority items exist iff a class above default is present
        #[test]
        fn priority_items_match_classes(priorities in prop::collection::vec(-200i64..200, 0..32)) {
            let jobs = batch(&priorities);
            let above_default = classes_present(&jobs).iter().any(|c| *c > PriorityClass::Default);
            prop_assert_eq!(has_priority_items(&jobs), above_default);
        }

        #[test]
        fn classify_is_deterministic(p in any::<i64>()) {
            prop_assert_eq!(classify(p), classify(p));
        }
    }
}
