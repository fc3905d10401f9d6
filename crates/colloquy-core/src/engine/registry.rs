//! Mode registry: the single `ModeTag -> factory` extension point.
//!
//! Populated once at startup. Adding a conversation mode means registering
//! a factory here -- the session manager never changes.

use std::collections::BTreeMap;

use colloquy_types::error::SessionError;
use colloquy_types::session::ModeTag;

use super::boxed::BoxEngineFactory;
use super::ChatEngineFactory;

/// Registry of engine factories, indexed by mode tag.
#[derive(Default)]
pub struct ModeRegistry {
    factories: BTreeMap<ModeTag, BoxEngineFactory>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under its mode tag, replacing any previous one.
    pub fn register<F: ChatEngineFactory + 'static>(&mut self, factory: F) {
        let boxed = BoxEngineFactory::new(factory);
        self.factories.insert(boxed.mode(), boxed);
    }

    /// Look up the factory for a mode.
    pub fn get(&self, mode: &ModeTag) -> Result<&BoxEngineFactory, SessionError> {
        self.factories
            .get(mode)
            .ok_or_else(|| SessionError::UnknownMode {
                mode: mode.to_string(),
                available: self.available(),
            })
    }

    pub fn contains(&self, mode: &ModeTag) -> bool {
        self.factories.contains_key(mode)
    }

    /// Comma-separated list of registered mode tags, for replies.
    pub fn available(&self) -> String {
        self.factories
            .keys()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_types::session::{ModeConfig, SessionMetadata};

    use crate::engine::{BoxChatEngine, ChatEngine};
    use crate::llm::BoxLlmClient;

    struct NullEngine;

    impl ChatEngine for NullEngine {
        async fn turn(
            &mut self,
            _input: &str,
        ) -> Result<String, colloquy_types::error::EngineError> {
            Ok(String::new())
        }

        fn set_model(&mut self, _client: BoxLlmClient) {}
    }

    struct NullFactory(ModeTag);

    impl ChatEngineFactory for NullFactory {
        fn mode(&self) -> ModeTag {
            self.0.clone()
        }

        fn validate_args(&self, _args: &[String]) -> Result<ModeConfig, SessionError> {
            Ok(ModeConfig::new())
        }

        async fn create(&self, _meta: &SessionMetadata) -> Result<BoxChatEngine, SessionError> {
            Ok(BoxChatEngine::new(NullEngine))
        }
    }

    #[test]
    fn test_unknown_mode_lists_available() {
        let mut registry = ModeRegistry::new();
        registry.register(NullFactory(ModeTag::plain()));
        registry.register(NullFactory(ModeTag::pwvn()));

        assert!(registry.contains(&ModeTag::plain()));
        let err = registry.get(&ModeTag::new("badmode")).unwrap_err();
        match err {
            SessionError::UnknownMode { mode, available } => {
                assert_eq!(mode, "badmode");
                assert_eq!(available, "plain, pwvn");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
