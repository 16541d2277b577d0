//! Session repository
//!
//! Database operations for token-backing sessions.

use crate::models::{ActorType, Session};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID
    async fn get_by_id(&self, id: &str) -> Result<Option<Session>>;

    /// Revoke a single session
    async fn revoke(&self, id: &str) -> Result<()>;

    /// Revoke every live session of an actor, returning how many were revoked
    async fn revoke_for_actor(&self, actor_type: ActorType, actor_id: i64) -> Result<u64>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: SqlitePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, actor_type, actor_id, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(session.actor_type.to_string())
        .bind(session.actor_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, actor_type, actor_id, created_at, expires_at, revoked_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get session by ID")?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn revoke(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE sessions SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to revoke session")?;
        Ok(())
    }

    async fn revoke_for_actor(&self, actor_type: ActorType, actor_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ? WHERE actor_type = ? AND actor_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(actor_type.to_string())
        .bind(actor_id)
        .execute(&self.pool)
        .await
        .context("Failed to revoke actor sessions")?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;
        Ok(result.rows_affected())
    }
}

fn row_to_session(row: &SqliteRow) -> Result<Session> {
    let actor_type: String = row.get("actor_type");
    Ok(Session {
        id: row.get("id"),
        actor_type: ActorType::from_str(&actor_type)
            .with_context(|| format!("Invalid actor type in database: {}", actor_type))?,
        actor_id: row.get("actor_id"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        revoked_at: row.get("revoked_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::migrated_pool;
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup_test_repo() -> SqlxSessionRepository {
        SqlxSessionRepository::new(migrated_pool().await)
    }

    fn create_test_session(actor_type: ActorType, actor_id: i64, expires_in_hours: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            actor_type,
            actor_id,
            created_at: now,
            expires_at: now + Duration::hours(expires_in_hours),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let repo = setup_test_repo().await;
        let session = create_test_session(ActorType::Moderator, 4, 1);
        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_id(&session.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.actor_type, ActorType::Moderator);
        assert_eq!(found.actor_id, 4);
        assert!(found.is_valid());
    }

    #[tokio::test]
    async fn test_get_session_not_found() {
        let repo = setup_test_repo().await;
        assert!(repo.get_by_id("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_session() {
        let repo = setup_test_repo().await;
        let session = create_test_session(ActorType::Member, 1, 1);
        repo.create(&session).await.unwrap();

        repo.revoke(&session.id).await.unwrap();

        let found = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert!(found.revoked_at.is_some());
        assert!(!found.is_valid());
    }

    #[tokio::test]
    async fn test_revoke_for_actor_only_touches_that_actor() {
        let repo = setup_test_repo().await;
        let a1 = create_test_session(ActorType::Member, 1, 1);
        let a2 = create_test_session(ActorType::Member, 1, 1);
        let other_type = create_test_session(ActorType::Moderator, 1, 1);
        let other_id = create_test_session(ActorType::Member, 2, 1);
        for s in [&a1, &a2, &other_type, &other_id] {
            repo.create(s).await.unwrap();
        }

        let revoked = repo.revoke_for_actor(ActorType::Member, 1).await.unwrap();
        assert_eq!(revoked, 2);

        assert!(!repo.get_by_id(&a1.id).await.unwrap().unwrap().is_valid());
        assert!(!repo.get_by_id(&a2.id).await.unwrap().unwrap().is_valid());
        assert!(repo.get_by_id(&other_type.id).await.unwrap().unwrap().is_valid());
        assert!(repo.get_by_id(&other_id.id).await.unwrap().unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let repo = setup_test_repo().await;
        let expired = create_test_session(ActorType::Guest, 1, -1);
        let valid = create_test_session(ActorType::Guest, 2, 1);
        repo.create(&expired).await.unwrap();
        repo.create(&valid).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_id(&expired.id).await.unwrap().is_none());
        assert!(repo.get_by_id(&valid.id).await.unwrap().is_some());
    }
}
