// Port Layer - Interfaces for external dependencies

pub mod graph_source;
pub mod id_provider; // For deterministic testing
pub mod queue_store;
pub mod time_provider;
pub mod tracking_service;

// Re-exports
pub use graph_source::GraphSource;
pub use id_provider::IdProvider;
pub use queue_store::QueueStore;
pub use time_provider::TimeProvider;
pub use tracking_service::{PendingQuery, TrackingService};
