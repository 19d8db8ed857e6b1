// Domain Layer - Pure dispatch rules and entities

pub mod error;
pub mod graph;
pub mod job;
pub mod priority;
pub mod queue;
pub mod status;
pub mod step;

// Re-exports
pub use error::DomainError;
pub use graph::{GraphNode, StepDefinition, WorkflowGraph};
pub use job::{dedup_by_object, EligibleJob, ObjectId, RawPriority};
pub use priority::{classes_present, classify, has_priority_items, PriorityClass};
pub use queue::QueueKey;
pub use status::StepStatus;
pub use step::{assert_qualified, is_qualified, parse_qualified, qualify, QualifiedStep};
