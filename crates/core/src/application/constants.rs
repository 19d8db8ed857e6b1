// Dispatch constants (ADR: No magic values)
use std::time::Duration;

/// Default page size for the pending-objects query
pub const DEFAULT_PENDING_LIMIT: usize = 1000;

/// Default pause between dispatch passes in watch mode (60s)
pub const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest pause the scheduler accepts; a zero interval is raised to this
pub const MIN_DISPATCH_INTERVAL: Duration = Duration::from_secs(1);
