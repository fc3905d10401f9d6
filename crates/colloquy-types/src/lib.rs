//! Shared domain types for Colloquy.
//!
//! This crate contains the core domain types used across the Colloquy
//! session orchestrator: session identity and metadata, mode configuration,
//! conversation turns, news items, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod identity;
pub mod news;
pub mod role;
pub mod session;
pub mod turn;
