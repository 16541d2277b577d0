//! Notification repository

use crate::models::{ListParams, Notification, NotificationKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Notification repository trait
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: &Notification) -> Result<Notification>;

    /// Live notifications of a recipient, newest first
    async fn list_for_recipient(
        &self,
        recipient_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<Notification>, i64)>;

    async fn count_unread(&self, recipient_id: i64) -> Result<i64>;

    /// Mark one notification read. Returns false unless it exists, is live and
    /// belongs to the recipient.
    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool>;

    /// Mark every unread notification of a recipient read
    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64>;

    /// Soft-delete one notification. Same ownership rule as `mark_read`.
    async fn soft_delete(&self, id: i64, recipient_id: i64) -> Result<bool>;
}

pub struct SqlxNotificationRepository {
    pool: SqlitePool,
}

impl SqlxNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn NotificationRepository> {
        Arc::new(Self::new(pool))
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, kind, message, post_id, comment_id, created_at, read_at, deleted_at";

#[async_trait]
impl NotificationRepository for SqlxNotificationRepository {
    async fn create(&self, notification: &Notification) -> Result<Notification> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (recipient_id, kind, message, post_id, comment_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(notification.recipient_id)
        .bind(notification.kind.to_string())
        .bind(&notification.message)
        .bind(notification.post_id)
        .bind(notification.comment_id)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create notification")?;

        let mut created = notification.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: i64,
        unread_only: bool,
        params: &ListParams,
    ) -> Result<(Vec<Notification>, i64)> {
        let filter = if unread_only {
            "recipient_id = ? AND deleted_at IS NULL AND read_at IS NULL"
        } else {
            "recipient_id = ? AND deleted_at IS NULL"
        };

        let rows = sqlx::query(&format!(
            "SELECT {} FROM notifications WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            NOTIFICATION_COLUMNS, filter
        ))
        .bind(recipient_id)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list notifications")?;

        let count_row = sqlx::query(&format!("SELECT COUNT(*) as count FROM notifications WHERE {}", filter))
            .bind(recipient_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count notifications")?;

        let items = rows.iter().map(row_to_notification).collect::<Result<Vec<_>>>()?;
        Ok((items, count_row.get("count")))
    }

    async fn count_unread(&self, recipient_id: i64) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM notifications WHERE recipient_id = ? AND deleted_at IS NULL AND read_at IS NULL",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count unread notifications")?;
        Ok(row.get("count"))
    }

    async fn mark_read(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, ?)
            WHERE id = ? AND recipient_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark notification read")?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, recipient_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = ? WHERE recipient_id = ? AND read_at IS NULL AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .context("Failed to mark notifications read")?;
        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: i64, recipient_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET deleted_at = ? WHERE id = ? AND recipient_id = ? AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(id)
        .bind(recipient_id)
        .execute(&self.pool)
        .await
        .context("Failed to delete notification")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_notification(row: &SqliteRow) -> Result<Notification> {
    let kind_str: String = row.get("kind");
    let kind = NotificationKind::from_str(&kind_str)
        .with_context(|| format!("Invalid notification kind in database: {}", kind_str))?;

    Ok(Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        kind,
        message: row.get("message"),
        post_id: row.get("post_id"),
        comment_id: row.get("comment_id"),
        created_at: row.get("created_at"),
        read_at: row.get("read_at"),
        deleted_at: row.get("deleted_at"),
    })
}
