//! Session lifecycle: durable store boundary, live-engine cache, and the
//! session manager that ties them together.

pub mod cache;
pub mod manager;
pub mod store;

pub use cache::EngineCache;
pub use manager::{SessionListing, SessionManager};
pub use store::{MemorySessionRepository, SessionRepository};
