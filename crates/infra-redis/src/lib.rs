// Robot Master Infrastructure - Redis Adapter
// Implements: QueueStore (Resque-compatible queues for existing robot workers)

mod queue_store;
pub mod resque;

pub use queue_store::RedisQueueStore;
