//! SessionRepository trait definition and the in-memory implementation.
//!
//! The durable implementation lives in colloquy-infra
//! (`SqliteSessionRepository`). Uses native async fn in traits (RPITIT).
//! `SessionMetadata` is owned by the store: the manager mutates it only
//! through these methods.

use std::future::Future;

use dashmap::DashMap;

use colloquy_types::error::RepositoryError;
use colloquy_types::identity::{SessionId, UserId};
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};

/// Repository trait for durable session metadata.
///
/// Layout contract: one record per session keyed by its id, plus one
/// active-session pointer per owner. `list_by_owner` returns sessions in
/// creation order.
pub trait SessionRepository: Send + Sync {
    /// Persist a new session record.
    fn create(
        &self,
        meta: &SessionMetadata,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a session by id.
    fn get(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Option<SessionMetadata>, RepositoryError>> + Send;

    /// Replace a session's configuration snapshot.
    fn update_config(
        &self,
        id: &SessionId,
        config: &ModeConfig,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session record. Deleting a missing session is an error.
    fn delete(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// All sessions owned by `owner`, ordered by creation time ascending.
    fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> impl Future<Output = Result<Vec<SessionMetadata>, RepositoryError>> + Send;

    /// The owner's active session pointer, if any.
    fn active_session(
        &self,
        owner: &UserId,
    ) -> impl Future<Output = Result<Option<SessionId>, RepositoryError>> + Send;

    /// Set or clear the owner's active session pointer.
    fn set_active_session(
        &self,
        owner: &UserId,
        session: Option<&SessionId>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Distinct mode tags present in the store, for the startup check.
    fn list_modes(&self) -> impl Future<Output = Result<Vec<ModeTag>, RepositoryError>> + Send;
}

/// In-memory repository used by tests and ephemeral setups.
#[derive(Default)]
pub struct MemorySessionRepository {
    sessions: DashMap<SessionId, SessionMetadata>,
    active: DashMap<UserId, SessionId>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl SessionRepository for MemorySessionRepository {
    async fn create(&self, meta: &SessionMetadata) -> Result<(), RepositoryError> {
        if self.sessions.contains_key(&meta.id) {
            return Err(RepositoryError::Conflict(format!(
                "session {} already exists",
                meta.id
            )));
        }
        self.sessions.insert(meta.id, meta.clone());
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionMetadata>, RepositoryError> {
        Ok(self.sessions.get(id).map(|m| m.clone()))
    }

    async fn update_config(
        &self,
        id: &SessionId,
        config: &ModeConfig,
    ) -> Result<(), RepositoryError> {
        match self.sessions.get_mut(id) {
            Some(mut meta) => {
                meta.config = config.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        if self.sessions.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.active.retain(|_, active| active != id);
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<SessionMetadata>, RepositoryError> {
        let mut sessions: Vec<SessionMetadata> = self
            .sessions
            .iter()
            .filter(|entry| &entry.owner == owner)
            .map(|entry| entry.clone())
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.canonical().cmp(&b.id.canonical())));
        Ok(sessions)
    }

    async fn active_session(&self, owner: &UserId) -> Result<Option<SessionId>, RepositoryError> {
        Ok(self.active.get(owner).map(|id| *id))
    }

    async fn set_active_session(
        &self,
        owner: &UserId,
        session: Option<&SessionId>,
    ) -> Result<(), RepositoryError> {
        match session {
            Some(id) => {
                self.active.insert(owner.clone(), *id);
            }
            None => {
                self.active.remove(owner);
            }
        }
        Ok(())
    }

    async fn list_modes(&self) -> Result<Vec<ModeTag>, RepositoryError> {
        let mut modes: Vec<ModeTag> = self
            .sessions
            .iter()
            .map(|entry| entry.mode.clone())
            .collect();
        modes.sort();
        modes.dedup();
        Ok(modes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(owner: &str, mode: ModeTag) -> SessionMetadata {
        SessionMetadata::new(UserId::new(owner), mode, ModeConfig::new())
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let repo = MemorySessionRepository::new();
        let m = meta("u1", ModeTag::plain());
        repo.create(&m).await.unwrap();
        assert!(repo.get(&m.id).await.unwrap().is_some());

        repo.delete(&m.id).await.unwrap();
        assert!(repo.get(&m.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&m.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_list_by_owner_creation_order() {
        let repo = MemorySessionRepository::new();
        let a = meta("u1", ModeTag::plain());
        let b = meta("u1", ModeTag::pwvn());
        let other = meta("u2", ModeTag::plain());
        repo.create(&b).await.unwrap();
        repo.create(&a).await.unwrap();
        repo.create(&other).await.unwrap();

        let sessions = repo.list_by_owner(&UserId::new("u1")).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].created_at <= sessions[1].created_at);
    }

    #[tokio::test]
    async fn test_delete_clears_active_pointer() {
        let repo = MemorySessionRepository::new();
        let owner = UserId::new("u1");
        let m = meta("u1", ModeTag::plain());
        repo.create(&m).await.unwrap();
        repo.set_active_session(&owner, Some(&m.id)).await.unwrap();

        repo.delete(&m.id).await.unwrap();
        assert!(repo.active_session(&owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_modes_dedupes() {
        let repo = MemorySessionRepository::new();
        repo.create(&meta("u1", ModeTag::plain())).await.unwrap();
        repo.create(&meta("u2", ModeTag::plain())).await.unwrap();
        repo.create(&meta("u1", ModeTag::pwvn())).await.unwrap();

        let modes = repo.list_modes().await.unwrap();
        assert_eq!(modes.len(), 2);
    }
}
