//! HTTP/REST layer for Colloquy.
//!
//! Axum-based API at `/api/v1/` with CORS support. The single message
//! endpoint carries the whole command grammar: slash commands and chat
//! text alike go through the command router.

pub mod handlers;
pub mod router;
