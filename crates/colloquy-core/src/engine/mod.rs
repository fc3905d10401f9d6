//! Chat engine capability interfaces.
//!
//! A `ChatEngine` is the stateful, in-memory object executing one turn of
//! conversation for exactly one session. A `ChatEngineFactory` builds
//! engines for one mode from a session's persisted `ModeConfig` -- the
//! factory registry is the single extension point for new modes.
//!
//! Engines must not hold hidden transient state that changes observable
//! behavior: anything needed to resume after cache eviction lives in the
//! session's `ModeConfig`.

pub mod boxed;
pub mod plain;
pub mod registry;
pub mod roleplay;

use std::future::Future;

use colloquy_types::error::{EngineError, SessionError};
use colloquy_types::role::RoleDescriptor;
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};

use crate::llm::BoxLlmClient;

pub use boxed::{BoxChatEngine, BoxEngineFactory};
pub use registry::ModeRegistry;

/// One conversation engine bound to one session.
///
/// `turn` must never be called concurrently for the same instance; the
/// session manager guarantees per-session serialization. A failed or
/// cancelled turn leaves the conversation history untouched.
pub trait ChatEngine: Send {
    /// Advance the conversation by exactly one exchange.
    fn turn(
        &mut self,
        input: &str,
    ) -> impl Future<Output = Result<String, EngineError>> + Send;

    /// Whether this engine supports `/sbr` / `/sur` role switching.
    fn supports_role_switch(&self) -> bool {
        false
    }

    /// Replace the bot persona. History is preserved; the next turn's
    /// retrieval reflects the new role.
    fn set_bot_role(&mut self, _role: RoleDescriptor) {}

    /// Rename the user-side role. History is preserved.
    fn set_user_role(&mut self, _name: &str) {}

    /// Swap the model-backed component in place, preserving history.
    fn set_model(&mut self, client: BoxLlmClient);
}

/// Constructs engines for one mode.
///
/// `validate_args` runs eagerly on `/new`, before anything is persisted;
/// `create` is pure construction and must not produce a half-initialized
/// engine -- invalid config fails with `InvalidModeArgs`.
pub trait ChatEngineFactory: Send + Sync {
    /// The mode tag this factory serves.
    fn mode(&self) -> ModeTag;

    /// Whether sessions of this mode accept role switching.
    fn supports_role_switch(&self) -> bool {
        false
    }

    /// Validate `/new` arguments and convert them into the session's
    /// initial `ModeConfig`.
    fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError>;

    /// Build a ready-to-use engine from persisted session metadata.
    fn create(
        &self,
        meta: &SessionMetadata,
    ) -> impl Future<Output = Result<BoxChatEngine, SessionError>> + Send;
}
