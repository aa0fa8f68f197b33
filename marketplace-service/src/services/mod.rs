pub mod memory_store;
pub mod metrics;
pub mod mongo_store;
pub mod notifier;
pub mod password;
pub mod pdf;
pub mod revocation;
pub mod session;
pub mod store;
