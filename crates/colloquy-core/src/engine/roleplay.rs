//! Retrieval-augmented role-play engine (`pwvn` mode).
//!
//! Each turn builds a retrieval query from the last exchange, pulls
//! matching dialogue scenes (filtered by the bot's role) and background
//! knowledge, assembles a persona-anchored system prompt, and sends it with
//! a bounded window of recent history. Role and model switches mutate the
//! live engine in place -- conversation history survives both.

use std::sync::Arc;

use tracing::debug;

use colloquy_types::error::{EngineError, SessionError};
use colloquy_types::role::RoleDescriptor;
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};
use colloquy_types::turn::{ChatTurn, TurnRole};

use super::{BoxChatEngine, ChatEngine, ChatEngineFactory};
use crate::llm::{BoxLlmClient, ModelResolver};
use crate::retrieval::SharedRetriever;
use crate::roles::RoleRegistry;

/// Dialogue scenes fetched per turn.
const DIALOG_TOP_K: usize = 15;
/// Background snippets fetched per turn.
const BACKGROUND_TOP_K: usize = 2;
/// Recent history messages included in the prompt.
const HISTORY_WINDOW: usize = 40;

/// Stateful role-play engine for one session.
pub struct RoleplayEngine {
    user_role: String,
    bot_role: RoleDescriptor,
    llm: BoxLlmClient,
    dialog_retriever: SharedRetriever,
    background_retriever: SharedRetriever,
    history: Vec<ChatTurn>,
}

impl RoleplayEngine {
    pub fn new(
        user_role: impl Into<String>,
        bot_role: RoleDescriptor,
        llm: BoxLlmClient,
        dialog_retriever: SharedRetriever,
        background_retriever: SharedRetriever,
    ) -> Self {
        Self {
            user_role: user_role.into(),
            bot_role,
            llm,
            dialog_retriever,
            background_retriever,
            history: Vec::new(),
        }
    }

    /// Retrieval query: the last assistant line plus the incoming user
    /// line, prefixed with role names so retrieval sees the speakers.
    fn build_rag_query(&self, input: &str) -> String {
        match self
            .history
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::Assistant)
        {
            Some(last) => format!(
                "{}:{}\n{}:{}",
                self.bot_role.name, last.content, self.user_role, input
            ),
            None => format!("{}:{}", self.user_role, input),
        }
    }

    fn build_system_prompt(&self, dialog_ctx: &str, background_ctx: &str) -> String {
        format!(
            "# Scenario\n\
             You play {bot}; the player plays {user}. Stay strictly in character:\n\
             {persona}\n\n\
             # Reference dialogue scenes\n\
             {dialog}\n\n\
             # Background knowledge\n\
             {background}\n\n\
             # Rules\n\
             1. Reply in the form: (action/expression) dialogue\n\
             2. Keep replies short\n",
            bot = self.bot_role.name,
            user = self.user_role,
            persona = self.bot_role.persona,
            dialog = dialog_ctx,
            background = background_ctx,
        )
    }

    fn recent_history(&self) -> &[ChatTurn] {
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        &self.history[start..]
    }
}

impl ChatEngine for RoleplayEngine {
    async fn turn(&mut self, input: &str) -> Result<String, EngineError> {
        let query = self.build_rag_query(input);

        let dialog = self
            .dialog_retriever
            .retrieve(&query, Some(&self.bot_role.name), DIALOG_TOP_K)
            .await?;
        let background = self
            .background_retriever
            .retrieve(&query, None, BACKGROUND_TOP_K)
            .await?;
        debug!(
            dialog_snippets = dialog.len(),
            background_snippets = background.len(),
            "retrieved context"
        );

        let system = self.build_system_prompt(&dialog.join("\n"), &background.join("\n"));
        let mut messages = Vec::with_capacity(self.recent_history().len() + 2);
        messages.push(ChatTurn::system(system));
        messages.extend(self.recent_history().iter().cloned());
        messages.push(ChatTurn::user(input));

        let reply = self.llm.chat(&messages).await?;

        // Append strictly after the reply arrives: failure or cancellation
        // must not leave a half-applied turn.
        self.history.push(ChatTurn::user(input));
        self.history.push(ChatTurn::assistant(&reply));
        Ok(reply)
    }

    fn supports_role_switch(&self) -> bool {
        true
    }

    fn set_bot_role(&mut self, role: RoleDescriptor) {
        self.bot_role = role;
    }

    fn set_user_role(&mut self, name: &str) {
        self.user_role = name.to_string();
    }

    fn set_model(&mut self, client: BoxLlmClient) {
        self.llm = client;
    }
}

/// Factory for `pwvn` role-play sessions.
pub struct RoleplayEngineFactory {
    roles: Arc<dyn RoleRegistry>,
    dialog_retriever: SharedRetriever,
    background_retriever: SharedRetriever,
    resolver: Arc<dyn ModelResolver>,
    default_model: String,
}

impl RoleplayEngineFactory {
    pub fn new(
        roles: Arc<dyn RoleRegistry>,
        dialog_retriever: SharedRetriever,
        background_retriever: SharedRetriever,
        resolver: Arc<dyn ModelResolver>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            roles,
            dialog_retriever,
            background_retriever,
            resolver,
            default_model: default_model.into(),
        }
    }

    fn resolve_role(&self, name: &str) -> Result<RoleDescriptor, SessionError> {
        self.roles
            .resolve(name)
            .ok_or_else(|| SessionError::UnknownRole {
                role: name.to_string(),
                available: self.roles.names().join(", "),
            })
    }
}

impl ChatEngineFactory for RoleplayEngineFactory {
    fn mode(&self) -> ModeTag {
        ModeTag::pwvn()
    }

    fn supports_role_switch(&self) -> bool {
        true
    }

    fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError> {
        let [user_role, bot_role, ..] = args else {
            return Err(SessionError::InvalidModeArgs(
                "usage: /new pwvn <your_role> <bot_role>".to_string(),
            ));
        };
        // Bot roles must exist in the knowledge base; user roles are free-form.
        if self.roles.resolve(bot_role).is_none() {
            return Err(SessionError::InvalidModeArgs(format!(
                "unknown role '{}' (available: {})",
                bot_role,
                self.roles.names().join(", ")
            )));
        }
        let mut config = ModeConfig::new();
        config.set_str(ModeConfig::USER_ROLE, user_role);
        config.set_str(ModeConfig::BOT_ROLE, bot_role);
        Ok(config)
    }

    async fn create(&self, meta: &SessionMetadata) -> Result<BoxChatEngine, SessionError> {
        let user_role = meta.config.user_role().ok_or_else(|| {
            SessionError::InvalidModeArgs("pwvn session is missing user_role".to_string())
        })?;
        let bot_role = meta.config.bot_role().ok_or_else(|| {
            SessionError::InvalidModeArgs("pwvn session is missing bot_role".to_string())
        })?;

        let role = self.resolve_role(bot_role)?;
        let model = meta.config.model().unwrap_or(&self.default_model);
        let llm = self.resolver.resolve(model)?;

        Ok(BoxChatEngine::new(RoleplayEngine::new(
            user_role,
            role,
            llm,
            self.dialog_retriever.clone(),
            self.background_retriever.clone(),
        )))
    }
}
