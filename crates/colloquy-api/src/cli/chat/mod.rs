//! Interactive CLI chat for Colloquy.
//!
//! Reads lines with async readline, routes every line through the
//! command router, and prints the reply. Slash commands and plain chat
//! take the same path a REST client would. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod input;
pub mod loop_runner;
