//! Session & mode orchestration for Colloquy.
//!
//! This crate contains the core of the system: the session manager and its
//! lifecycle state machine, the engine/factory capability interfaces and
//! mode registry, the command router, the admin gate, and the news
//! aggregation pipeline. Collaborators (LLM inference, retrieval,
//! persistence, feed fetching, message pushing) are consumed through narrow
//! traits defined here and implemented in `colloquy-infra` / `colloquy-api`
//! -- core never depends on infrastructure.

pub mod admin;
pub mod engine;
pub mod llm;
pub mod news;
pub mod push;
pub mod retrieval;
pub mod roles;
pub mod router;
pub mod session;
