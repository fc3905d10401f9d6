//! Command parsing and dispatch.
//!
//! The router is the error boundary of the system: every taxonomy error
//! is rendered here as a user-facing reply line, never propagated to the
//! transport. Collaborator failures during a turn are reported as a
//! generic retry hint so provider internals never reach the user.

use std::sync::Arc;

use tracing::{info, warn};

use colloquy_types::error::{CommandError, SessionError};
use colloquy_types::identity::UserId;
use colloquy_types::session::ModeTag;

use crate::admin::{AdminGate, JobTrigger};
use crate::session::{SessionManager, SessionRepository};

const HELP_TEXT: &str = "\
Commands:
  /new <mode> [args...]   create a session (modes: see /new output)
  /ls                     list your sessions
  /ss <session_id>        switch to a session (id prefix accepted)
  /dels <session_id>      delete a session (id prefix accepted)
  /ds                     describe the active session
  /sbr <role_name>        switch the bot role (role-play sessions only)
  /sur <role_name>        switch your role (role-play sessions only)
  /sl <model_name>        switch the model
  /help                   this text
Anything else is sent to your active session as chat.";

/// A parsed inbound command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    New { mode: String, args: Vec<String> },
    List,
    Switch { prefix: String },
    Delete { prefix: String },
    Describe,
    SwitchBotRole { role: String },
    SwitchUserRole { role: String },
    SwitchModel { model: String },
    Help,
    Admin { subcommand: String },
    /// Not a command at all; the raw text goes to the active session.
    Chat,
}

impl Command {
    /// Parse one inbound line. Command words are case-sensitive; input
    /// without the leading sigil is always chat.
    pub fn parse(text: &str) -> Result<Command, CommandError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return Ok(Command::Chat);
        }
        let mut parts = trimmed[1..].split_whitespace();
        let word = parts.next().unwrap_or("");
        let args: Vec<String> = parts.map(str::to_string).collect();

        let require = |name: &str, usage: &str| -> Result<String, CommandError> {
            args.first()
                .cloned()
                .ok_or_else(|| CommandError::MissingArgument {
                    command: name.to_string(),
                    usage: usage.to_string(),
                })
        };

        match word {
            "new" => {
                let mode = require("new", "/new <mode> [args...]")?;
                Ok(Command::New {
                    mode,
                    args: args[1..].to_vec(),
                })
            }
            "ls" => Ok(Command::List),
            "ss" => Ok(Command::Switch {
                prefix: require("ss", "/ss <session_id>")?,
            }),
            "dels" => Ok(Command::Delete {
                prefix: require("dels", "/dels <session_id>")?,
            }),
            "ds" => Ok(Command::Describe),
            "sbr" => Ok(Command::SwitchBotRole {
                role: require("sbr", "/sbr <role_name>")?,
            }),
            "sur" => Ok(Command::SwitchUserRole {
                role: require("sur", "/sur <role_name>")?,
            }),
            "sl" => Ok(Command::SwitchModel {
                model: require("sl", "/sl <model_name>")?,
            }),
            "help" => Ok(Command::Help),
            "admin" => Ok(Command::Admin {
                subcommand: require("admin", "/admin <trigger_news|reload>")?,
            }),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

/// Routes inbound lines to the session manager or the admin surface.
pub struct CommandRouter<R: SessionRepository> {
    sessions: Arc<SessionManager<R>>,
    gate: AdminGate,
    news_job: Option<Arc<dyn JobTrigger>>,
}

impl<R: SessionRepository> CommandRouter<R> {
    pub fn new(
        sessions: Arc<SessionManager<R>>,
        gate: AdminGate,
        news_job: Option<Arc<dyn JobTrigger>>,
    ) -> Self {
        Self {
            sessions,
            gate,
            news_job,
        }
    }

    /// Handle one inbound line and produce the reply text. Never fails:
    /// every error becomes part of the reply.
    pub async fn handle_inbound(&self, owner: &UserId, text: &str) -> String {
        let command = match Command::parse(text) {
            Ok(command) => command,
            Err(err) => return err.to_string(),
        };
        match command {
            Command::Chat => self.chat(owner, text).await,
            Command::Help => HELP_TEXT.to_string(),
            Command::New { mode, args } => self
                .sessions
                .create_session(owner, &ModeTag::new(mode), &args)
                .await
                .map(|meta| format!("created session {} ({})", meta.id.short(), meta.describe()))
                .unwrap_or_else(render_error),
            Command::List => match self.sessions.list_sessions(owner).await {
                Ok(listings) if listings.is_empty() => {
                    "no sessions (use /new to create one)".to_string()
                }
                Ok(listings) => listings
                    .iter()
                    .map(|l| {
                        format!(
                            "{} {}  {}",
                            if l.active { "*" } else { " " },
                            l.meta.id.short(),
                            l.meta.describe()
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(err) => render_error(err),
            },
            Command::Switch { prefix } => self
                .sessions
                .switch_session(owner, &prefix)
                .await
                .map(|meta| format!("switched to {} ({})", meta.id.short(), meta.describe()))
                .unwrap_or_else(render_error),
            Command::Delete { prefix } => self
                .sessions
                .delete_session(owner, &prefix)
                .await
                .map(|meta| format!("deleted session {}", meta.id.short()))
                .unwrap_or_else(render_error),
            Command::Describe => self
                .sessions
                .describe_active(owner)
                .await
                .map(|meta| format!("{}  {}", meta.id.short(), meta.describe()))
                .unwrap_or_else(render_error),
            Command::SwitchBotRole { role } => self
                .sessions
                .switch_bot_role(owner, &role)
                .await
                .map(|()| format!("bot role switched to {role}"))
                .unwrap_or_else(render_error),
            Command::SwitchUserRole { role } => self
                .sessions
                .switch_user_role(owner, &role)
                .await
                .map(|()| format!("your role is now {role}"))
                .unwrap_or_else(render_error),
            Command::SwitchModel { model } => self
                .sessions
                .switch_model(owner, &model)
                .await
                .map(|()| format!("model switched to {model}"))
                .unwrap_or_else(render_error),
            Command::Admin { subcommand } => self.admin(owner, &subcommand).await,
        }
    }

    async fn chat(&self, owner: &UserId, text: &str) -> String {
        match self.sessions.handle_message(owner, text).await {
            Ok(reply) => reply,
            Err(SessionError::Engine(err)) => {
                warn!(user = %owner.as_str(), error = %err, "turn failed");
                "something went wrong talking to the model, please try again".to_string()
            }
            Err(err) => render_error(err),
        }
    }

    async fn admin(&self, owner: &UserId, subcommand: &str) -> String {
        if let Err(err) = self.gate.authorize(owner) {
            return err.to_string();
        }
        match subcommand {
            "trigger_news" => match &self.news_job {
                Some(job) => match job.trigger().await {
                    Ok(()) => {
                        info!(user = %owner.as_str(), "news job triggered manually");
                        "news push triggered".to_string()
                    }
                    Err(err) => {
                        warn!(error = %err, "manual news trigger failed");
                        format!("news push failed: {err}")
                    }
                },
                None => "news push is not configured".to_string(),
            },
            "reload" => "reload requested".to_string(),
            other => format!("unknown admin subcommand '{other}'"),
        }
    }
}

fn render_error(err: SessionError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grammar() {
        assert_eq!(Command::parse("hello there").unwrap(), Command::Chat);
        assert_eq!(Command::parse("/ls").unwrap(), Command::List);
        assert_eq!(
            Command::parse("/new pwvn Dave Dean").unwrap(),
            Command::New {
                mode: "pwvn".to_string(),
                args: vec!["Dave".to_string(), "Dean".to_string()],
            }
        );
        assert_eq!(
            Command::parse("/ss abc1").unwrap(),
            Command::Switch {
                prefix: "abc1".to_string()
            }
        );
    }

    #[test]
    fn test_command_words_are_case_sensitive() {
        assert!(matches!(
            Command::parse("/LS").unwrap_err(),
            CommandError::UnknownCommand(word) if word == "LS"
        ));
    }

    #[test]
    fn test_missing_argument_carries_usage() {
        match Command::parse("/ss").unwrap_err() {
            CommandError::MissingArgument { command, usage } => {
                assert_eq!(command, "ss");
                assert!(usage.contains("/ss"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mistyped_command_is_not_chat() {
        assert!(matches!(
            Command::parse("/sx abc").unwrap_err(),
            CommandError::UnknownCommand(word) if word == "sx"
        ));
    }

    mod dispatch {
        use super::*;
        use std::future::Future;
        use std::pin::Pin;
        use std::sync::atomic::{AtomicUsize, Ordering};

        use colloquy_types::error::{EngineError, NewsError};
        use colloquy_types::session::{ModeConfig, SessionMetadata};

        use crate::admin::JobTrigger;
        use crate::engine::{
            BoxChatEngine, ChatEngine, ChatEngineFactory, ModeRegistry,
        };
        use crate::llm::{BoxLlmClient, ModelResolver};
        use crate::roles::StaticRoleRegistry;
        use crate::session::MemorySessionRepository;

        struct EchoEngine;

        impl ChatEngine for EchoEngine {
            async fn turn(&mut self, input: &str) -> Result<String, EngineError> {
                if input == "boom" {
                    return Err(EngineError::CollaboratorTimeout);
                }
                Ok(format!("echo: {input}"))
            }

            fn set_model(&mut self, _client: BoxLlmClient) {}
        }

        struct EchoFactory;

        impl ChatEngineFactory for EchoFactory {
            fn mode(&self) -> ModeTag {
                ModeTag::plain()
            }

            fn validate_args(&self, _args: &[String]) -> Result<ModeConfig, SessionError> {
                Ok(ModeConfig::new())
            }

            async fn create(
                &self,
                _meta: &SessionMetadata,
            ) -> Result<BoxChatEngine, SessionError> {
                Ok(BoxChatEngine::new(EchoEngine))
            }
        }

        struct NoResolver;

        impl ModelResolver for NoResolver {
            fn resolve(&self, name: &str) -> Result<BoxLlmClient, SessionError> {
                Err(SessionError::UnknownModel(name.to_string()))
            }
        }

        struct CountingJob(AtomicUsize);

        impl JobTrigger for CountingJob {
            fn trigger(
                &self,
            ) -> Pin<Box<dyn Future<Output = Result<(), NewsError>> + Send + '_>> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(()) })
            }
        }

        fn router(
            job: Arc<CountingJob>,
        ) -> CommandRouter<MemorySessionRepository> {
            let mut registry = ModeRegistry::new();
            registry.register(EchoFactory);
            let sessions = Arc::new(SessionManager::new(
                MemorySessionRepository::new(),
                Arc::new(registry),
                Arc::new(StaticRoleRegistry::default()),
                Arc::new(NoResolver),
                4,
            ));
            CommandRouter::new(
                sessions,
                AdminGate::new([UserId::new("root")]),
                Some(job),
            )
        }

        #[tokio::test]
        async fn test_create_then_chat_round_trip() {
            let router = router(Arc::new(CountingJob(AtomicUsize::new(0))));
            let owner = UserId::new("u1");

            let reply = router.handle_inbound(&owner, "/new plain").await;
            assert!(reply.starts_with("created session "));
            let reply = router.handle_inbound(&owner, "hello").await;
            assert_eq!(reply, "echo: hello");
        }

        #[tokio::test]
        async fn test_unknown_mode_leaves_store_unchanged() {
            let router = router(Arc::new(CountingJob(AtomicUsize::new(0))));
            let owner = UserId::new("u1");

            let reply = router.handle_inbound(&owner, "/new badmode").await;
            assert!(reply.contains("unknown mode 'badmode'"));
            let reply = router.handle_inbound(&owner, "/ls").await;
            assert_eq!(reply, "no sessions (use /new to create one)");
        }

        #[tokio::test]
        async fn test_role_switch_gated_by_mode() {
            let router = router(Arc::new(CountingJob(AtomicUsize::new(0))));
            let owner = UserId::new("u1");
            router.handle_inbound(&owner, "/new plain").await;

            let reply = router.handle_inbound(&owner, "/sbr Dean").await;
            assert!(reply.contains("not supported in 'plain' mode"));
        }

        #[tokio::test]
        async fn test_collaborator_failure_renders_retry_hint() {
            let router = router(Arc::new(CountingJob(AtomicUsize::new(0))));
            let owner = UserId::new("u1");
            router.handle_inbound(&owner, "/new plain").await;

            let reply = router.handle_inbound(&owner, "boom").await;
            assert!(reply.contains("try again"));
            // The failed turn did not break the session.
            let reply = router.handle_inbound(&owner, "hello").await;
            assert_eq!(reply, "echo: hello");
        }

        #[tokio::test]
        async fn test_admin_gating_and_exactly_once_trigger() {
            let job = Arc::new(CountingJob(AtomicUsize::new(0)));
            let router = router(job.clone());

            let reply = router
                .handle_inbound(&UserId::new("guest"), "/admin trigger_news")
                .await;
            assert_eq!(reply, "permission denied");
            assert_eq!(job.0.load(Ordering::SeqCst), 0);

            let reply = router
                .handle_inbound(&UserId::new("root"), "/admin trigger_news")
                .await;
            assert_eq!(reply, "news push triggered");
            assert_eq!(job.0.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn test_admin_reload_is_accepted() {
            let router = router(Arc::new(CountingJob(AtomicUsize::new(0))));
            let reply = router
                .handle_inbound(&UserId::new("root"), "/admin reload")
                .await;
            assert_eq!(reply, "reload requested");
        }
    }
}
