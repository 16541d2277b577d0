//! Ban repository
//!
//! A ban is active while `lifted_at` is unset and `expires_at` is either unset
//! or still in the future.

use crate::models::{Ban, ListParams};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Ban repository trait
#[async_trait]
pub trait BanRepository: Send + Sync {
    async fn create(&self, ban: &Ban) -> Result<Ban>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Ban>>;

    /// The currently active ban of a member, if any
    async fn find_active(&self, member_id: i64) -> Result<Option<Ban>>;

    /// List bans, newest first
    async fn list(&self, active_only: bool, params: &ListParams) -> Result<(Vec<Ban>, i64)>;

    /// Lift a ban. Returns false if it was already lifted.
    async fn lift(&self, id: i64) -> Result<bool>;
}

pub struct SqlxBanRepository {
    pool: SqlitePool,
}

impl SqlxBanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn BanRepository> {
        Arc::new(Self::new(pool))
    }
}

const BAN_COLUMNS: &str = "id, member_id, banned_by, reason, created_at, expires_at, lifted_at";
const ACTIVE_CLAUSE: &str = "lifted_at IS NULL AND (expires_at IS NULL OR expires_at > ?)";

#[async_trait]
impl BanRepository for SqlxBanRepository {
    async fn create(&self, ban: &Ban) -> Result<Ban> {
        let result = sqlx::query(
            r#"
            INSERT INTO bans (member_id, banned_by, reason, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(ban.member_id)
        .bind(ban.banned_by)
        .bind(&ban.reason)
        .bind(ban.created_at)
        .bind(ban.expires_at)
        .execute(&self.pool)
        .await
        .context("Failed to create ban")?;

        let mut created = ban.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ban>> {
        let row = sqlx::query(&format!("SELECT {} FROM bans WHERE id = ?", BAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get ban by ID")?;

        Ok(row.as_ref().map(row_to_ban))
    }

    async fn find_active(&self, member_id: i64) -> Result<Option<Ban>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM bans WHERE member_id = ? AND {} ORDER BY id DESC LIMIT 1",
            BAN_COLUMNS, ACTIVE_CLAUSE
        ))
        .bind(member_id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to find active ban")?;

        Ok(row.as_ref().map(row_to_ban))
    }

    async fn list(&self, active_only: bool, params: &ListParams) -> Result<(Vec<Ban>, i64)> {
        let now = Utc::now();
        let filter = if active_only { ACTIVE_CLAUSE } else { "1 = 1" };

        let list_sql = format!(
            "SELECT {} FROM bans WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            BAN_COLUMNS, filter
        );
        let mut query = sqlx::query(&list_sql);
        if active_only {
            query = query.bind(now);
        }
        let rows = query
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list bans")?;

        let count_sql = format!("SELECT COUNT(*) as count FROM bans WHERE {}", filter);
        let mut count_query = sqlx::query(&count_sql);
        if active_only {
            count_query = count_query.bind(now);
        }
        let count_row = count_query
            .fetch_one(&self.pool)
            .await
            .context("Failed to count bans")?;

        Ok((rows.iter().map(row_to_ban).collect(), count_row.get("count")))
    }

    async fn lift(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE bans SET lifted_at = ? WHERE id = ? AND lifted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to lift ban")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_ban(row: &SqliteRow) -> Ban {
    Ban {
        id: row.get("id"),
        member_id: row.get("member_id"),
        banned_by: row.get("banned_by"),
        reason: row.get("reason"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        lifted_at: row.get("lifted_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::{migrated_pool, seed_member};
    use chrono::Duration;

    async fn setup() -> (SqlxBanRepository, i64, i64) {
        let pool = migrated_pool().await;
        let (_, member) = seed_member(&pool, "troll").await;
        let (mod_user, _) = seed_member(&pool, "mod").await;
        let moderator = sqlx::query("INSERT INTO moderators (user_id, created_at) VALUES (?, ?)")
            .bind(mod_user)
            .bind(Utc::now())
            .execute(&pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (SqlxBanRepository::new(pool), member, moderator)
    }

    #[tokio::test]
    async fn test_active_ban_lookup_and_lift() {
        let (repo, member, moderator) = setup().await;
        assert!(repo.find_active(member).await.unwrap().is_none());

        let ban = repo
            .create(&Ban::new(member, moderator, "spam".into(), None))
            .await
            .unwrap();
        assert_eq!(repo.find_active(member).await.unwrap().map(|b| b.id), Some(ban.id));

        assert!(repo.lift(ban.id).await.unwrap());
        assert!(!repo.lift(ban.id).await.unwrap());
        assert!(repo.find_active(member).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_ban_is_not_active() {
        let (repo, member, moderator) = setup().await;
        repo.create(&Ban::new(
            member,
            moderator,
            "old".into(),
            Some(Utc::now() - Duration::hours(1)),
        ))
        .await
        .unwrap();

        assert!(repo.find_active(member).await.unwrap().is_none());

        let (active, total_active) = repo.list(true, &ListParams::default()).await.unwrap();
        assert!(active.is_empty());
        assert_eq!(total_active, 0);

        let (all, total) = repo.list(false, &ListParams::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(total, 1);
    }
}
