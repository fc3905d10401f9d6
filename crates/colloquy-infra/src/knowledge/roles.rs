//! Role registry loaded from `roles.json`.
//!
//! The file is a single JSON object mapping role names to persona
//! descriptions. A persona may be a plain string or a structured object;
//! structured personas are carried verbatim (as compact JSON) into the
//! system prompt.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use colloquy_core::roles::RoleRegistry;
use colloquy_types::role::RoleDescriptor;

pub struct FileRoleRegistry {
    roles: BTreeMap<String, String>,
}

impl FileRoleRegistry {
    /// Load the registry from `path`. A missing or malformed file yields
    /// an empty registry with a warning, mirroring the config loader.
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) => {
                warn!("failed to read roles file {}: {err}", path.display());
                return Self {
                    roles: BTreeMap::new(),
                };
            }
        };
        Self::from_json(&content, path)
    }

    fn from_json(content: &str, path: &Path) -> Self {
        let parsed: BTreeMap<String, serde_json::Value> = match serde_json::from_str(content) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("failed to parse roles file {}: {err}", path.display());
                BTreeMap::new()
            }
        };
        let roles = parsed
            .into_iter()
            .map(|(name, value)| {
                let persona = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, persona)
            })
            .collect();
        Self { roles }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl RoleRegistry for FileRoleRegistry {
    fn resolve(&self, name: &str) -> Option<RoleDescriptor> {
        self.roles
            .get(name)
            .map(|persona| RoleDescriptor::new(name, persona.clone()))
    }

    fn names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }
}
