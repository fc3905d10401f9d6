//! Session lifecycle scenarios driven through the public manager API
//! with stub engines and an in-memory store.

use std::sync::Arc;

use chrono::Utc;

use colloquy_core::engine::{BoxChatEngine, ChatEngine, ChatEngineFactory, ModeRegistry};
use colloquy_core::llm::{BoxLlmClient, ModelResolver};
use colloquy_core::roles::StaticRoleRegistry;
use colloquy_core::session::{MemorySessionRepository, SessionManager, SessionRepository};
use colloquy_types::error::{EngineError, SessionError};
use colloquy_types::identity::UserId;
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};

struct ScriptedEngine;

impl ChatEngine for ScriptedEngine {
    async fn turn(&mut self, input: &str) -> Result<String, EngineError> {
        Ok(format!("echo: {input}"))
    }

    fn set_model(&mut self, _client: BoxLlmClient) {}
}

struct ScriptedFactory;

impl ChatEngineFactory for ScriptedFactory {
    fn mode(&self) -> ModeTag {
        ModeTag::pwvn()
    }

    fn supports_role_switch(&self) -> bool {
        true
    }

    fn validate_args(&self, args: &[String]) -> Result<ModeConfig, SessionError> {
        let mut config = ModeConfig::new();
        if let [user, bot, ..] = args {
            config.set_str(ModeConfig::USER_ROLE, user);
            config.set_str(ModeConfig::BOT_ROLE, bot);
        }
        Ok(config)
    }

    async fn create(&self, _meta: &SessionMetadata) -> Result<BoxChatEngine, SessionError> {
        Ok(BoxChatEngine::new(ScriptedEngine))
    }
}

struct NoResolver;

impl ModelResolver for NoResolver {
    fn resolve(&self, name: &str) -> Result<BoxLlmClient, SessionError> {
        Err(SessionError::UnknownModel(name.to_string()))
    }
}

fn manager_over(repo: MemorySessionRepository) -> SessionManager<MemorySessionRepository> {
    let mut registry = ModeRegistry::new();
    registry.register(ScriptedFactory);
    SessionManager::new(
        repo,
        Arc::new(registry),
        Arc::new(StaticRoleRegistry::default()),
        Arc::new(NoResolver),
        4,
    )
}

fn session_with_id(owner: &UserId, id: &str) -> SessionMetadata {
    SessionMetadata {
        id: id.parse().unwrap(),
        owner: owner.clone(),
        mode: ModeTag::pwvn(),
        created_at: Utc::now(),
        config: ModeConfig::new(),
    }
}

#[tokio::test]
async fn test_ambiguous_prefix_lists_candidates_and_unique_prefix_switches() {
    let owner = UserId::new("u1");
    let repo = MemorySessionRepository::new();
    let first = session_with_id(&owner, "aaaa1000000000000000000000000001");
    let second = session_with_id(&owner, "aaaa2000000000000000000000000002");
    repo.create(&first).await.unwrap();
    repo.create(&second).await.unwrap();
    let mgr = manager_over(repo);

    match mgr.switch_session(&owner, "aaaa").await.unwrap_err() {
        SessionError::AmbiguousSessionId { prefix, candidates } => {
            assert_eq!(prefix, "aaaa");
            assert!(candidates.contains(&first.id.canonical()));
            assert!(candidates.contains(&second.id.canonical()));
        }
        other => panic!("unexpected error: {other}"),
    }

    // One more character makes the prefix unique.
    let switched = mgr
        .switch_session(&owner, &first.id.canonical()[..5])
        .await
        .unwrap();
    assert_eq!(switched.id, first.id);
    assert_eq!(mgr.describe_active(&owner).await.unwrap().id, first.id);
}

#[tokio::test]
async fn test_create_then_describe_reflects_mode_and_owner() {
    let owner = UserId::new("u1");
    let mgr = manager_over(MemorySessionRepository::new());

    mgr.create_session(
        &owner,
        &ModeTag::pwvn(),
        &["Dave".to_string(), "Dean".to_string()],
    )
    .await
    .unwrap();

    let active = mgr.describe_active(&owner).await.unwrap();
    assert_eq!(active.mode, ModeTag::pwvn());
    assert_eq!(active.owner, owner);
}

#[tokio::test]
async fn test_delete_then_switch_fails_not_found() {
    let owner = UserId::new("u1");
    let mgr = manager_over(MemorySessionRepository::new());

    let meta = mgr
        .create_session(
            &owner,
            &ModeTag::pwvn(),
            &["Dave".to_string(), "Dean".to_string()],
        )
        .await
        .unwrap();
    let prefix = meta.id.canonical()[..8].to_string();

    mgr.delete_session(&owner, &prefix).await.unwrap();
    assert!(matches!(
        mgr.switch_session(&owner, &prefix).await.unwrap_err(),
        SessionError::SessionNotFound(_)
    ));
}
