//! Administrator repository

use crate::models::Administrator;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Administrator repository trait
#[async_trait]
pub trait AdministratorRepository: Send + Sync {
    /// Grant administrator rights to a user
    async fn create(&self, user_id: i64) -> Result<Administrator>;

    /// Get a grant by ID, revoked or not
    async fn get_by_id(&self, id: i64) -> Result<Option<Administrator>>;

    /// Get the un-revoked grant of a user
    async fn get_active_by_user_id(&self, user_id: i64) -> Result<Option<Administrator>>;
}

pub struct SqlxAdministratorRepository {
    pool: SqlitePool,
}

impl SqlxAdministratorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn AdministratorRepository> {
        Arc::new(Self::new(pool))
    }
}

const ADMINISTRATOR_SELECT: &str = r#"
    SELECT a.id, a.user_id, u.username, a.created_at, a.revoked_at,
           u.deleted_at AS user_deleted_at
    FROM administrators a
    JOIN users u ON u.id = a.user_id
"#;

#[async_trait]
impl AdministratorRepository for SqlxAdministratorRepository {
    async fn create(&self, user_id: i64) -> Result<Administrator> {
        let result = sqlx::query("INSERT INTO administrators (user_id, created_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to create administrator")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .context("Administrator not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Administrator>> {
        let row = sqlx::query(&format!("{} WHERE a.id = ?", ADMINISTRATOR_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get administrator by ID")?;

        Ok(row.as_ref().map(row_to_administrator))
    }

    async fn get_active_by_user_id(&self, user_id: i64) -> Result<Option<Administrator>> {
        let row = sqlx::query(&format!(
            "{} WHERE a.user_id = ? AND a.revoked_at IS NULL ORDER BY a.id DESC LIMIT 1",
            ADMINISTRATOR_SELECT
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get administrator by user ID")?;

        Ok(row.as_ref().map(row_to_administrator))
    }
}

fn row_to_administrator(row: &SqliteRow) -> Administrator {
    Administrator {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
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
    async fn test_create_and_lookup() {
        let pool = migrated_pool().await;
        let (user_id, _) = seed_member(&pool, "root").await;
        let repo = SqlxAdministratorRepository::new(pool);

        let admin = repo.create(user_id).await.unwrap();
        assert!(admin.is_active());

        let found = repo.get_active_by_user_id(user_id).await.unwrap().unwrap();
        assert_eq!(found.id, admin.id);
        assert!(repo.get_active_by_user_id(user_id + 1).await.unwrap().is_none());
    }
}
