//! Error taxonomy for the session orchestration layer.
//!
//! Every error here is recoverable at the command-router boundary, where it
//! is rendered as a user-facing reply. The single exception is an
//! `UnknownMode` discovered in persisted data at startup, which the binary
//! treats as a fatal configuration error.

use thiserror::Error;

/// Errors from session store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from LLM client calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("provider error: {0}")]
    Provider(String),
}

/// Errors surfaced by a chat engine during a turn.
///
/// Collaborator failures never corrupt engine state: a failed turn is not
/// appended to history.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("collaborator timed out")]
    CollaboratorTimeout,

    #[error("collaborator failure: {0}")]
    CollaboratorFailure(String),
}

impl From<LlmError> for EngineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => EngineError::CollaboratorTimeout,
            other => EngineError::CollaboratorFailure(other.to_string()),
        }
    }
}

/// Errors from session lifecycle and in-session reconfiguration.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown mode '{mode}' (available: {available})")]
    UnknownMode { mode: String, available: String },

    #[error("invalid mode arguments: {0}")]
    InvalidModeArgs(String),

    #[error("no session matching '{0}'")]
    SessionNotFound(String),

    #[error("ambiguous session id '{prefix}' (candidates: {})", candidates.join(", "))]
    AmbiguousSessionId {
        prefix: String,
        candidates: Vec<String>,
    },

    #[error("no active session")]
    NoActiveSession,

    #[error("operation not supported in '{0}' mode")]
    UnsupportedOperation(String),

    #[error("unknown role '{role}' (available: {available})")]
    UnknownRole { role: String, available: String },

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors from command parsing.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '/{0}'")]
    UnknownCommand(String),

    #[error("missing argument for /{command} (usage: {usage})")]
    MissingArgument { command: String, usage: String },
}

/// Errors from admin authorization.
#[derive(Debug, Error)]
pub enum AdminError {
    /// A flat denial: reveals nothing about which admin commands exist.
    #[error("permission denied")]
    NotAuthorized,
}

/// Errors from message push delivery.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push transport error: {0}")]
    Transport(String),
}

/// Errors from news fetching, rendering, and scheduling.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("feed fetch failed: {0}")]
    Fetch(String),

    #[error("scheduler error: {0}")]
    Schedule(String),

    #[error(transparent)]
    Push(#[from] PushError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_session_display_lists_candidates() {
        let err = SessionError::AmbiguousSessionId {
            prefix: "abc".to_string(),
            candidates: vec!["abc123".to_string(), "abc789".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("abc789"));
    }

    #[test]
    fn test_llm_timeout_maps_to_collaborator_timeout() {
        let err: EngineError = LlmError::Timeout.into();
        assert!(matches!(err, EngineError::CollaboratorTimeout));

        let err: EngineError = LlmError::Provider("boom".to_string()).into();
        assert!(matches!(err, EngineError::CollaboratorFailure(_)));
    }

    #[test]
    fn test_admin_denial_is_flat() {
        assert_eq!(AdminError::NotAuthorized.to_string(), "permission denied");
    }
}
