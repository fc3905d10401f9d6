//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from `colloquy-core` using sqlx with
//! split read/write pools. The `config` column stores the session's
//! `ModeConfig` as a JSON object; `created_at` is RFC 3339 text so the
//! creation-order index sorts lexicographically.

use chrono::{DateTime, Utc};
use sqlx::Row;

use colloquy_core::session::SessionRepository;
use colloquy_types::error::RepositoryError;
use colloquy_types::identity::{SessionId, UserId};
use colloquy_types::session::{ModeConfig, ModeTag, SessionMetadata};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain metadata.
struct SessionRow {
    id: String,
    owner: String,
    mode: String,
    config: String,
    created_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            mode: row.try_get("mode")?,
            config: row.try_get("config")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_metadata(self) -> Result<SessionMetadata, RepositoryError> {
        let id = self
            .id
            .parse::<SessionId>()
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;

        let config: ModeConfig = serde_json::from_str(&self.config)
            .map_err(|e| RepositoryError::Query(format!("invalid config JSON: {e}")))?;

        Ok(SessionMetadata {
            id,
            owner: UserId::new(self.owner),
            mode: ModeTag::new(self.mode),
            created_at: parse_datetime(&self.created_at)?,
            config,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, meta: &SessionMetadata) -> Result<(), RepositoryError> {
        let config_json = serde_json::to_string(&meta.config)
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO sessions (id, owner, mode, config, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(meta.id.canonical())
        .bind(meta.owner.as_str())
        .bind(meta.mode.as_str())
        .bind(&config_json)
        .bind(format_datetime(&meta.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => Err(
                RepositoryError::Conflict(format!("session {} already exists", meta.id)),
            ),
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get(&self, id: &SessionId) -> Result<Option<SessionMetadata>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = ?")
            .bind(id.canonical())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_metadata()?))
            }
            None => Ok(None),
        }
    }

    async fn update_config(
        &self,
        id: &SessionId,
        config: &ModeConfig,
    ) -> Result<(), RepositoryError> {
        let config_json =
            serde_json::to_string(config).map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query("UPDATE sessions SET config = ? WHERE id = ?")
            .bind(&config_json)
            .bind(id.canonical())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        // Active pointers referencing this session go with it (cascade).
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.canonical())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> Result<Vec<SessionMetadata>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM sessions WHERE owner = ? ORDER BY created_at ASC, id ASC")
            .bind(owner.as_str())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                SessionRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_metadata()
            })
            .collect()
    }

    async fn active_session(&self, owner: &UserId) -> Result<Option<SessionId>, RepositoryError> {
        let row = sqlx::query("SELECT session_id FROM active_sessions WHERE owner = ?")
            .bind(owner.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let raw: String = row
                    .try_get("session_id")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let id = raw
                    .parse::<SessionId>()
                    .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    async fn set_active_session(
        &self,
        owner: &UserId,
        session: Option<&SessionId>,
    ) -> Result<(), RepositoryError> {
        match session {
            Some(id) => {
                sqlx::query(
                    "INSERT INTO active_sessions (owner, session_id) VALUES (?, ?)
                     ON CONFLICT(owner) DO UPDATE SET session_id = excluded.session_id",
                )
                .bind(owner.as_str())
                .bind(id.canonical())
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            }
            None => {
                sqlx::query("DELETE FROM active_sessions WHERE owner = ?")
                    .bind(owner.as_str())
                    .execute(&self.pool.writer)
                    .await
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn list_modes(&self) -> Result<Vec<ModeTag>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT mode FROM sessions ORDER BY mode")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let mode: String = row
                    .try_get("mode")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(ModeTag::new(mode))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> (tempfile::TempDir, SqliteSessionRepository) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, SqliteSessionRepository::new(pool))
    }

    fn meta(owner: &str, mode: ModeTag) -> SessionMetadata {
        let mut config = ModeConfig::new();
        config.set_str(ModeConfig::MODEL, "deepseek-chat");
        SessionMetadata::new(UserId::new(owner), mode, config)
    }

    #[tokio::test]
    async fn test_create_get_round_trip() {
        let (_dir, repo) = repo().await;
        let m = meta("u1", ModeTag::pwvn());
        repo.create(&m).await.unwrap();

        let loaded = repo.get(&m.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, m.id);
        assert_eq!(loaded.owner, m.owner);
        assert_eq!(loaded.mode, m.mode);
        assert_eq!(loaded.config.model(), Some("deepseek-chat"));
    }

    #[tokio::test]
    async fn test_duplicate_create_conflicts() {
        let (_dir, repo) = repo().await;
        let m = meta("u1", ModeTag::plain());
        repo.create(&m).await.unwrap();
        assert!(matches!(
            repo.create(&m).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_update_config_persists() {
        let (_dir, repo) = repo().await;
        let m = meta("u1", ModeTag::pwvn());
        repo.create(&m).await.unwrap();

        let mut config = m.config.clone();
        config.set_str(ModeConfig::BOT_ROLE, "Dean");
        repo.update_config(&m.id, &config).await.unwrap();

        let loaded = repo.get(&m.id).await.unwrap().unwrap();
        assert_eq!(loaded.config.bot_role(), Some("Dean"));
    }

    #[tokio::test]
    async fn test_list_by_owner_ordered() {
        let (_dir, repo) = repo().await;
        let first = meta("u1", ModeTag::plain());
        let second = meta("u1", ModeTag::pwvn());
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();
        repo.create(&meta("u2", ModeTag::plain())).await.unwrap();

        let sessions = repo.list_by_owner(&UserId::new("u1")).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].created_at <= sessions[1].created_at);
    }

    #[tokio::test]
    async fn test_delete_cascades_active_pointer() {
        let (_dir, repo) = repo().await;
        let owner = UserId::new("u1");
        let m = meta("u1", ModeTag::plain());
        repo.create(&m).await.unwrap();
        repo.set_active_session(&owner, Some(&m.id)).await.unwrap();
        assert_eq!(repo.active_session(&owner).await.unwrap(), Some(m.id));

        repo.delete(&m.id).await.unwrap();
        assert!(repo.active_session(&owner).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&m.id).await.unwrap_err(),
            RepositoryError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_set_active_replaces_pointer() {
        let (_dir, repo) = repo().await;
        let owner = UserId::new("u1");
        let a = meta("u1", ModeTag::plain());
        let b = meta("u1", ModeTag::plain());
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        repo.set_active_session(&owner, Some(&a.id)).await.unwrap();
        repo.set_active_session(&owner, Some(&b.id)).await.unwrap();
        assert_eq!(repo.active_session(&owner).await.unwrap(), Some(b.id));

        repo.set_active_session(&owner, None).await.unwrap();
        assert!(repo.active_session(&owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_modes_distinct() {
        let (_dir, repo) = repo().await;
        repo.create(&meta("u1", ModeTag::plain())).await.unwrap();
        repo.create(&meta("u2", ModeTag::plain())).await.unwrap();
        repo.create(&meta("u1", ModeTag::pwvn())).await.unwrap();

        let modes = repo.list_modes().await.unwrap();
        assert_eq!(modes.len(), 2);
    }
}
