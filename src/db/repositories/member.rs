//! Member repository
//!
//! Member rows are always read joined with their user so callers get the
//! username, display name and the user's own soft-delete marker.

use crate::models::{ListParams, Member, MemberStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Member repository trait
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Create the member row for a user
    async fn create(&self, user_id: i64) -> Result<Member>;

    /// Get member by ID, including soft-deleted members
    async fn get_by_id(&self, id: i64) -> Result<Option<Member>>;

    /// Get member by owning user ID
    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Member>>;

    /// List members that are not soft-deleted, oldest first
    async fn list(&self, params: &ListParams) -> Result<(Vec<Member>, i64)>;

    /// Set the member status
    async fn set_status(&self, id: i64, status: MemberStatus) -> Result<()>;

    /// Soft-delete a member
    async fn soft_delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based member repository implementation
pub struct SqlxMemberRepository {
    pool: SqlitePool,
}

impl SqlxMemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn MemberRepository> {
        Arc::new(Self::new(pool))
    }
}

const MEMBER_SELECT: &str = r#"
    SELECT m.id, m.user_id, u.username, u.display_name, m.status, m.created_at,
           m.deleted_at, u.deleted_at AS user_deleted_at
    FROM members m
    JOIN users u ON u.id = m.user_id
"#;

#[async_trait]
impl MemberRepository for SqlxMemberRepository {
    async fn create(&self, user_id: i64) -> Result<Member> {
        let result = sqlx::query("INSERT INTO members (user_id, status, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(MemberStatus::Active.to_string())
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("Failed to create member")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .context("Member not found after insert")
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Member>> {
        let row = sqlx::query(&format!("{} WHERE m.id = ?", MEMBER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get member by ID")?;

        row.as_ref().map(row_to_member).transpose()
    }

    async fn get_by_user_id(&self, user_id: i64) -> Result<Option<Member>> {
        let row = sqlx::query(&format!("{} WHERE m.user_id = ?", MEMBER_SELECT))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get member by user ID")?;

        row.as_ref().map(row_to_member).transpose()
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<Member>, i64)> {
        let rows = sqlx::query(&format!(
            "{} WHERE m.deleted_at IS NULL AND u.deleted_at IS NULL ORDER BY m.id LIMIT ? OFFSET ?",
            MEMBER_SELECT
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list members")?;

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) as count FROM members m JOIN users u ON u.id = m.user_id
            WHERE m.deleted_at IS NULL AND u.deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count members")?;

        let members = rows.iter().map(row_to_member).collect::<Result<Vec<_>>>()?;
        Ok((members, count_row.get("count")))
    }

    async fn set_status(&self, id: i64, status: MemberStatus) -> Result<()> {
        sqlx::query("UPDATE members SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update member status")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE members SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete member")?;
        Ok(())
    }
}

fn row_to_member(row: &SqliteRow) -> Result<Member> {
    let status_str: String = row.get("status");
    let status = MemberStatus::from_str(&status_str)
        .with_context(|| format!("Invalid member status in database: {}", status_str))?;

    Ok(Member {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        status,
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
        user_deleted_at: row.get("user_deleted_at"),
    })
}
