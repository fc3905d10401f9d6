//! Session metadata, mode tags, and mode configuration.
//!
//! `SessionMetadata` is the durable record for one conversation session.
//! It is owned by the session store and mutated only through the session
//! manager. `ModeConfig` is the open, mode-specific configuration snapshot:
//! everything an engine needs to resume after eviction must live here.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{SessionId, UserId};

/// Names which engine factory produces engines for a session.
///
/// An open set: new modes register a factory under a fresh tag without
/// any change to the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeTag(String);

impl ModeTag {
    /// Retrieval-augmented role-play mode.
    pub const PWVN: &'static str = "pwvn";
    /// Plain question-answering mode.
    pub const PLAIN: &'static str = "plain";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn pwvn() -> Self {
        Self::new(Self::PWVN)
    }

    pub fn plain() -> Self {
        Self::new(Self::PLAIN)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModeTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Open, mode-specific key-value configuration for a session.
///
/// Well-known keys (`user_role`, `bot_role`, `model`, `system_prompt`) have
/// typed accessors; modes may stash arbitrary JSON values under other keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeConfig(BTreeMap<String, serde_json::Value>);

impl ModeConfig {
    pub const USER_ROLE: &'static str = "user_role";
    pub const BOT_ROLE: &'static str = "bot_role";
    pub const MODEL: &'static str = "model";
    pub const SYSTEM_PROMPT: &'static str = "system_prompt";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0
            .insert(key.into(), serde_json::Value::String(value.into()));
    }

    pub fn user_role(&self) -> Option<&str> {
        self.get_str(Self::USER_ROLE)
    }

    pub fn bot_role(&self) -> Option<&str> {
        self.get_str(Self::BOT_ROLE)
    }

    pub fn model(&self) -> Option<&str> {
        self.get_str(Self::MODEL)
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.get_str(Self::SYSTEM_PROMPT)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Durable metadata for one conversation session.
///
/// The live engine instance is not part of this record: it is rebuilt from
/// `config` whenever the session is (re)activated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: SessionId,
    pub owner: UserId,
    pub mode: ModeTag,
    pub created_at: DateTime<Utc>,
    pub config: ModeConfig,
}

impl SessionMetadata {
    pub fn new(owner: UserId, mode: ModeTag, config: ModeConfig) -> Self {
        Self {
            id: SessionId::generate(),
            owner,
            mode,
            created_at: Utc::now(),
            config,
        }
    }

    /// One-line human description used in `/ls` and `/ds` replies.
    pub fn describe(&self) -> String {
        match (self.config.bot_role(), self.config.user_role()) {
            (Some(bot), Some(user)) => {
                format!("{} <-> {}, mode: {}", bot, user, self.mode)
            }
            _ => format!("mode: {}", self.mode),
        }
    }
}
