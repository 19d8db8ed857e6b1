// Application Layer - Use Cases and Dispatch Policy

pub mod constants;
pub mod dispatch;
pub mod queue_gateway;
pub mod scheduler;
mod shutdown;

// Re-exports
pub use dispatch::{DispatchConfig, DispatchEngine, DispatchReport, SkipReason, StepOutcome};
pub use queue_gateway::QueueGateway;
pub use scheduler::{DispatchScheduler, Pipeline};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
