//! Plain question-answering engine.
//!
//! No retrieval, no roles: a system prompt, the running history, and an
//! LLM client. The optional `/new plain <prompt...>` arguments become the
//! session's system prompt.

use std::sync::Arc;

use colloquy_types::error::{EngineError, SessionError};
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};
use colloquy_types::turn::ChatTurn;

use super::{BoxChatEngine, ChatEngine, ChatEngineFactory};
use crate::llm::{BoxLlmClient, ModelResolver};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Stateful plain-QA engine for one session.
pub struct PlainEngine {
    system_prompt: String,
    llm: BoxLlmClient,
    history: Vec<ChatTurn>,
}

impl PlainEngine {
    pub fn new(system_prompt: Option<&str>, llm: BoxLlmClient) -> Self {
        Self {
            system_prompt: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT).to_string(),
            llm,
            history: Vec::new(),
        }
    }

    fn build_messages(&self, input: &str) -> Vec<ChatTurn> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatTurn::system(&self.system_prompt));
        messages.extend(self.history.iter().cloned());
        messages.push(ChatTurn::user(input));
        messages
    }
}

impl ChatEngine for PlainEngine {
    async fn turn(&mut self, input: &str) -> Result<String, EngineError> {
        let messages = self.build_messages(input);
        let reply = self.llm.chat(&messages).await?;

        // History is extended only after a successful exchange; a failed or
        // cancelled turn leaves it untouched.
        self.history.push(ChatTurn::user(input));
        self.history.push(ChatTurn::assistant(&reply));
        Ok(reply)
    }

    fn set_model(&mut self, client: BoxLlmClient) {
        self.llm = client;
    }
}

/// Factory for `plain` mode sessions.
pub struct PlainEngineFactory {
    resolver: Arc<dyn ModelResolver>,
    default_model: String,
}

impl PlainEngineFactory {
    pub fn new(resolver: Arc<dyn ModelResolver>, default_model: impl Into<String>) -> Self {
        Self {
            resolver,
            default_model: default_model.into(),
        }
    }
}

impl ChatEngineFactory for PlainEngineFactory {
    fn mode(&self) -> ModeTag {
        ModeTag::plain()
    }

    fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError> {
        let mut config = ModeConfig::new();
        if !args.is_empty() {
            config.set_str(ModeConfig::SYSTEM_PROMPT, args.join(" "));
        }
        Ok(config)
    }

    async fn create(&self, meta: &SessionMetadata) -> Result<BoxChatEngine, SessionError> {
        let model = meta.config.model().unwrap_or(&self.default_model);
        let llm = self.resolver.resolve(model)?;
        Ok(BoxChatEngine::new(PlainEngine::new(
            meta.config.system_prompt(),
            llm,
        )))
    }
}
