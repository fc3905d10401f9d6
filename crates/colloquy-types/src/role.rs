//! Role descriptors resolved from the knowledge-base role registry.

use serde::{Deserialize, Serialize};

/// A named role-play persona.
///
/// `persona` is the free-form character sheet injected into the role-play
/// system prompt. Its content is owned by the knowledge base, not by this
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDescriptor {
    pub name: String,
    pub persona: String,
}

impl RoleDescriptor {
    pub fn new(name: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persona: persona.into(),
        }
    }
}
