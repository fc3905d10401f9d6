//! File-backed knowledge base: role registry, dialogue chunk corpus, and
//! background knowledge.

pub mod retrieval;
pub mod roles;

pub use retrieval::{BackgroundRetriever, ChunkRetriever};
pub use roles::FileRoleRegistry;
