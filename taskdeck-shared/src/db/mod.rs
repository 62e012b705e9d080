/// Database access
///
/// The relational store is the only shared mutable resource in the system.
/// Schema evolution is managed by external migration tooling; the schema the
/// code expects (`profiles`, `authes`, `tasks`, `watch_tasks`) is documented
/// on each model in [`crate::models`].

pub mod pool;

pub use pool::{create_pool, DatabaseConfig};
