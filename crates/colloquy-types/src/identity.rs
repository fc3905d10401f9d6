//! User and session identity newtypes.
//!
//! `UserId` is an opaque, transport-assigned identifier -- Colloquy never
//! interprets it beyond using it as a key. `SessionId` is generated at
//! session creation and is never reused, even after the session is deleted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, stable identifier for a human user, assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Globally unique session identifier (UUID v7, time-sortable).
///
/// The canonical string form is the 32-character lowercase simple hex
/// encoding (no dashes). Prefix matching in session commands operates on
/// this form, case-sensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session id. Ids are never reused.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Canonical string form: 32 lowercase hex chars, no dashes.
    pub fn canonical(&self) -> String {
        self.0.simple().to_string()
    }

    /// Short display form used in user-facing replies.
    pub fn short(&self) -> String {
        self.canonical()[..8].to_string()
    }

    /// Whether `prefix` is a (case-sensitive) prefix of the canonical form.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.canonical().starts_with(prefix)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}
