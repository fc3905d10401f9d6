//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod pool;
pub mod session;

pub use pool::{DatabasePool, default_database_url};
pub use session::SqliteSessionRepository;
