//! Moderator repository

use crate::models::Moderator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Moderator repository trait
#[async_trait]
pub trait ModeratorRepository: Send + Sync {
    /// Grant moderation rights to a user
    async fn create(&self, user_id: i64, appointed_by: Option<i64>) -> Result<Moderator>;

    /// Get a grant by ID, revoked or not
    async fn get_by_id(&self, id: i64) -> Result<Option<Moderator>>;

    /// Get the un-revoked grant of a user
    async fn get_active_by_user_id(&self, user_id: i64) -> Result<Option<Moderator>>;

    /// List un-revoked grants
    async fn list_active(&self) -> Result<Vec<Moderator>>;

    /// Revoke a grant. Returns false if it was already revoked.
    async fn revoke(&self, id: i64) -> Result<bool>;
}

pub struct SqlxModeratorRepository {
    pool: SqlitePool,
}

impl SqlxModeratorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn ModeratorRepository> {
        Arc::new(Self::new(pool))
    }
}

const MODERATOR_SELECT: &str = r#"
    SELECT g.id, g.user_id, u.username, g.appointed_by, g.created_at, g.revoked_at,
           u.deleted_at AS user_deleted_at
    FROM moderators g
    JOIN users u ON u.id = g.user_id
"#;

#[async_trait]
impl ModeratorRepository for SqlxModeratorRepository {
    async fn create(&self, user_id: i64, appointed_by: Option<i64>) -> Result<Moderator> {
        let result = sqlx::query("INSERT INTO moderators (user_id, appointed_by, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(appointed_by)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to create moderator")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .context("Moderator not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Moderator>> {
        let row = sqlx::query(&format!("{} WHERE g.id = ?", MODERATOR_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get moderator by ID")?;

        Ok(row.as_ref().map(row_to_moderator))
    }

    async fn get_active_by_user_id(&self, user_id: i64) -> Result<Option<Moderator>> {
        let row = sqlx::query(&format!(
            "{} WHERE g.user_id = ? AND g.revoked_at IS NULL ORDER BY g.id DESC LIMIT 1",
            MODERATOR_SELECT
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get moderator by user ID")?;

        Ok(row.as_ref().map(row_to_moderator))
    }

    async fn list_active(&self) -> Result<Vec<Moderator>> {
        let rows = sqlx::query(&format!(
            "{} WHERE g.revoked_at IS NULL ORDER BY g.id",
            MODERATOR_SELECT
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list moderators")?;

        Ok(rows.iter().map(row_to_moderator).collect())
    }

    async fn revoke(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE moderators SET revoked_at = ? WHERE id = ? AND revoked_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to revoke moderator")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_moderator(row: &SqliteRow) -> Moderator {
    Moderator {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        appointed_by: row.get("appointed_by"),
        created_at: row.get("created_at"),
        revoked_at: row.get("revoked_at"),
        user_deleted_at: row.get("user_deleted_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{migrated_pool, seed_member};

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let pool = migrated_pool().await;
        let (user_id, _) = seed_member(&pool, "mod").await;
        let repo = SqlxModeratorRepository::new(pool);

        let grant = repo.create(user_id, None).await.unwrap();
        assert!(grant.is_active());
        assert_eq!(grant.username, "mod");

        let active = repo.get_active_by_user_id(user_id).await.unwrap();
        assert_eq!(active.map(|m| m.id), Some(grant.id));
        assert_eq!(repo.list_active().await.unwrap().len(), 1);

        assert!(repo.revoke(grant.id).await.unwrap());
        assert!(!repo.revoke(grant.id).await.unwrap());

        assert!(repo.get_active_by_user_id(user_id).await.unwrap().is_none());
        assert!(repo.list_active().await.unwrap().is_empty());
        let revoked = repo.get_by_id(grant.id).await.unwrap().unwrap();
        assert!(!revoked.is_active());
    }
}
