//! Session lifecycle orchestration.
//!
//! `SessionManager` owns the mapping from users to sessions and from
//! sessions to live engines. It is the only writer of session metadata
//! and active-session pointers.
//!
//! Locking discipline: a short per-user mutex guards the active pointer,
//! and a per-session mutex (inside [`EngineCache`]) serializes turns.
//! The user lock is never acquired while a session lock is held.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, instrument};

use colloquy_types::error::SessionError;
use colloquy_types::identity::{SessionId, UserId};
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};

use crate::engine::{BoxChatEngine, ModeRegistry};
use crate::llm::ModelResolver;
use crate::roles::RoleRegistry;

use super::cache::EngineCache;
use super::store::SessionRepository;

/// A session as listed to its owner, with its active flag.
#[derive(Debug, Clone)]
pub struct SessionListing {
    pub meta: SessionMetadata,
    pub active: bool,
}

pub struct SessionManager<R: SessionRepository> {
    repo: R,
    registry: Arc<ModeRegistry>,
    roles: Arc<dyn RoleRegistry>,
    resolver: Arc<dyn ModelResolver>,
    cache: EngineCache,
    // One entry per user ever seen, never pruned; bounded by user
    // cardinality, which this deployment keeps small.
    user_locks: DashMap<UserId, Arc<tokio::sync::Mutex<()>>>,
}

impl<R: SessionRepository> SessionManager<R> {
    pub fn new(
        repo: R,
        registry: Arc<ModeRegistry>,
        roles: Arc<dyn RoleRegistry>,
        resolver: Arc<dyn ModelResolver>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            repo,
            registry,
            roles,
            resolver,
            cache: EngineCache::new(cache_capacity),
            user_locks: DashMap::new(),
        }
    }

    /// Fail fast if the store holds sessions whose mode no longer has a
    /// registered factory. Called once at startup; such sessions would
    /// otherwise surface as per-message errors much later.
    pub async fn verify_persisted_modes(&self) -> Result<(), SessionError> {
        for mode in self.repo.list_modes().await? {
            self.registry.get(&mode)?;
        }
        Ok(())
    }

    /// Create a session, make it the owner's active session, and cache
    /// its engine.
    ///
    /// Arguments are validated and the engine is built before anything is
    /// persisted, so a failed `/new` leaves the store untouched.
    #[instrument(skip(self, args), fields(user = %owner.as_str(), mode = %mode))]
    pub async fn create_session(
        &self,
        owner: &UserId,
        mode: &ModeTag,
        args: &[String],
    ) -> Result<SessionMetadata, SessionError> {
        let factory = self.registry.get(mode)?;
        let config = factory.validate_args(args)?;
        let meta = SessionMetadata::new(owner.clone(), mode.clone(), config);
        let engine = factory.create(&meta).await?;

        self.repo.create(&meta).await?;
        {
            let user_lock = self.user_lock(owner);
            let _guard = user_lock.lock().await;
            self.repo.set_active_session(owner, Some(&meta.id)).await?;
        }
        let slot = self.cache.slot(&meta.id);
        slot.lock().await.engine = Some(engine);

        info!(session = %meta.id.short(), "session created");
        Ok(meta)
    }

    /// All of the owner's sessions in creation order, flagged active.
    pub async fn list_sessions(&self, owner: &UserId) -> Result<Vec<SessionListing>, SessionError> {
        let active = self.repo.active_session(owner).await?;
        let sessions = self.repo.list_by_owner(owner).await?;
        Ok(sessions
            .into_iter()
            .map(|meta| SessionListing {
                active: active.is_some_and(|a| a == meta.id),
                meta,
            })
            .collect())
    }

    /// Switch the owner's active session to the one matching `prefix`.
    ///
    /// The target engine is materialized eagerly so a successful switch
    /// means the session is ready for the next message.
    #[instrument(skip(self), fields(user = %owner.as_str()))]
    pub async fn switch_session(
        &self,
        owner: &UserId,
        prefix: &str,
    ) -> Result<SessionMetadata, SessionError> {
        let meta = self.find_by_prefix(owner, prefix).await?;
        self.materialize(&meta.id).await?;

        let user_lock = self.user_lock(owner);
        let _guard = user_lock.lock().await;
        self.repo.set_active_session(owner, Some(&meta.id)).await?;
        debug!(session = %meta.id.short(), "session switched");
        Ok(meta)
    }

    /// Delete the session matching `prefix`. If it was the active
    /// session, the owner is left with no active session.
    #[instrument(skip(self), fields(user = %owner.as_str()))]
    pub async fn delete_session(
        &self,
        owner: &UserId,
        prefix: &str,
    ) -> Result<SessionMetadata, SessionError> {
        let meta = self.find_by_prefix(owner, prefix).await?;

        let user_lock = self.user_lock(owner);
        let _guard = user_lock.lock().await;
        // Waits out any in-flight turn before the record disappears.
        self.cache.remove(&meta.id).await;
        self.repo.delete(&meta.id).await?;
        if self.repo.active_session(owner).await? == Some(meta.id) {
            self.repo.set_active_session(owner, None).await?;
        }
        info!(session = %meta.id.short(), "session deleted");
        Ok(meta)
    }

    /// Metadata of the owner's active session.
    pub async fn describe_active(&self, owner: &UserId) -> Result<SessionMetadata, SessionError> {
        let id = self.active_id(owner).await?;
        self.repo
            .get(&id)
            .await?
            .ok_or_else(|| SessionError::SessionNotFound(id.short()))
    }

    /// Swap the bot persona of the active session (`/sbr`).
    pub async fn switch_bot_role(&self, owner: &UserId, role: &str) -> Result<(), SessionError> {
        let meta = self.describe_active(owner).await?;
        self.require_role_switch(&meta.mode)?;
        let descriptor = self
            .roles
            .resolve(role)
            .ok_or_else(|| SessionError::UnknownRole {
                role: role.to_string(),
                available: self.roles.names().join(", "),
            })?;

        let mut config = meta.config.clone();
        config.set_str(ModeConfig::BOT_ROLE, role);
        self.repo.update_config(&meta.id, &config).await?;

        let slot = self.cache.slot(&meta.id);
        let mut guard = slot.lock().await;
        if let Some(engine) = guard.engine.as_mut() {
            engine.set_bot_role(descriptor);
        }
        Ok(())
    }

    /// Rename the user-side role of the active session (`/sur`).
    pub async fn switch_user_role(&self, owner: &UserId, name: &str) -> Result<(), SessionError> {
        if name.trim().is_empty() {
            return Err(SessionError::InvalidArgument(
                "user role name must not be empty".into(),
            ));
        }
        let meta = self.describe_active(owner).await?;
        self.require_role_switch(&meta.mode)?;

        let mut config = meta.config.clone();
        config.set_str(ModeConfig::USER_ROLE, name);
        self.repo.update_config(&meta.id, &config).await?;

        let slot = self.cache.slot(&meta.id);
        let mut guard = slot.lock().await;
        if let Some(engine) = guard.engine.as_mut() {
            engine.set_user_role(name);
        }
        Ok(())
    }

    /// Swap the model backing the active session (`/sl`). The
    /// conversation history is preserved.
    pub async fn switch_model(&self, owner: &UserId, model: &str) -> Result<(), SessionError> {
        let meta = self.describe_active(owner).await?;
        // Resolve before persisting so an unknown model changes nothing.
        let client = self.resolver.resolve(model)?;

        let mut config = meta.config.clone();
        config.set_str(ModeConfig::MODEL, model);
        self.repo.update_config(&meta.id, &config).await?;

        let slot = self.cache.slot(&meta.id);
        let mut guard = slot.lock().await;
        if let Some(engine) = guard.engine.as_mut() {
            engine.set_model(client);
        }
        Ok(())
    }

    /// Route a plain message to the owner's active session and return the
    /// engine's reply.
    ///
    /// Turns on the same session are serialized by the session lock;
    /// turns on different sessions proceed concurrently.
    #[instrument(skip(self, text), fields(user = %owner.as_str()))]
    pub async fn handle_message(&self, owner: &UserId, text: &str) -> Result<String, SessionError> {
        let id = self.active_id(owner).await?;
        let slot = self.cache.slot(&id);
        let mut guard = slot.lock().await;

        if guard.engine.is_none() {
            // Rebuilt from the store, not from any cached metadata: a
            // concurrent config change must be reflected here.
            let meta = self
                .repo
                .get(&id)
                .await?
                .ok_or_else(|| SessionError::SessionNotFound(id.short()))?;
            let factory = self.registry.get(&meta.mode)?;
            debug!(session = %id.short(), "rebuilding evicted engine");
            guard.engine = Some(factory.create(&meta).await?);
        }
        let engine = guard
            .engine
            .as_mut()
            .ok_or_else(|| SessionError::SessionNotFound(id.short()))?;
        Ok(engine.turn(text).await?)
    }

    /// Resolve a session-id prefix against the owner's sessions.
    pub async fn find_by_prefix(
        &self,
        owner: &UserId,
        prefix: &str,
    ) -> Result<SessionMetadata, SessionError> {
        if prefix.is_empty() {
            return Err(SessionError::InvalidArgument(
                "session id must not be empty".into(),
            ));
        }
        let mut matches: Vec<SessionMetadata> = self
            .repo
            .list_by_owner(owner)
            .await?
            .into_iter()
            .filter(|meta| meta.id.matches_prefix(prefix))
            .collect();
        match matches.len() {
            0 => Err(SessionError::SessionNotFound(prefix.to_string())),
            1 => Ok(matches.remove(0)),
            _ => Err(SessionError::AmbiguousSessionId {
                prefix: prefix.to_string(),
                candidates: matches.iter().map(|m| m.id.canonical()).collect(),
            }),
        }
    }

    async fn active_id(&self, owner: &UserId) -> Result<SessionId, SessionError> {
        self.repo
            .active_session(owner)
            .await?
            .ok_or(SessionError::NoActiveSession)
    }

    /// Build the engine for `id` if its cache slot is empty.
    async fn materialize(&self, id: &SessionId) -> Result<(), SessionError> {
        let slot = self.cache.slot(id);
        let mut guard = slot.lock().await;
        if guard.engine.is_none() {
            let meta = self
                .repo
                .get(id)
                .await?
                .ok_or_else(|| SessionError::SessionNotFound(id.short()))?;
            let factory = self.registry.get(&meta.mode)?;
            guard.engine = Some(factory.create(&meta).await?);
        }
        Ok(())
    }

    fn require_role_switch(&self, mode: &ModeTag) -> Result<(), SessionError> {
        let factory = self.registry.get(mode)?;
        if !factory.supports_role_switch() {
            return Err(SessionError::UnsupportedOperation(mode.to_string()));
        }
        Ok(())
    }

    fn user_lock(&self, owner: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.user_locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
