//! Infrastructure implementations for Colloquy.
//!
//! Everything behind the collaborator traits of `colloquy-core` lives
//! here: the SQLite session repository, the OpenAI-compatible LLM
//! clients, the file-backed knowledge base (roles, chunks, background),
//! the RSS feed fetcher, and the TOML configuration loader.

pub mod config;
pub mod knowledge;
pub mod llm;
pub mod news;
pub mod sqlite;
