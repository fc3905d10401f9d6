//! Role registry collaborator boundary.
//!
//! The knowledge base owns the set of role-play personas; the orchestration
//! core only asks it to resolve names. Lookup is synchronous -- registries
//! are loaded into memory at startup.

use colloquy_types::role::RoleDescriptor;

/// Resolves role names against the knowledge base's role registry.
pub trait RoleRegistry: Send + Sync {
    /// Look up a role by exact name.
    fn resolve(&self, name: &str) -> Option<RoleDescriptor>;

    /// All registered role names, for user-facing error messages.
    fn names(&self) -> Vec<String>;
}

/// In-memory registry, used by tests and as a default.
#[derive(Debug, Default)]
pub struct StaticRoleRegistry {
    roles: std::collections::BTreeMap<String, String>,
}

impl StaticRoleRegistry {
    pub fn new(roles: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
        }
    }
}

impl RoleRegistry for StaticRoleRegistry {
    fn resolve(&self, name: &str) -> Option<RoleDescriptor> {
        self.roles
            .get(name)
            .map(|persona| RoleDescriptor::new(name, persona.clone()))
    }

    fn names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_registry_resolves_known_roles() {
        let registry = StaticRoleRegistry::new([("Dean".to_string(), "warm, loud".to_string())]);
        let role = registry.resolve("Dean").unwrap();
        assert_eq!(role.name, "Dean");
        assert_eq!(role.persona, "warm, loud");
        assert!(registry.resolve("dean").is_none());
        assert_eq!(registry.names(), vec!["Dean"]);
    }
}
