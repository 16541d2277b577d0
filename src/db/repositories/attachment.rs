//! Attachment repository

use crate::models::Attachment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn create(&self, attachment: &Attachment) -> Result<Attachment>;

    /// Get an attachment by ID, including soft-deleted ones
    async fn get_by_id(&self, id: i64) -> Result<Option<Attachment>>;

    /// Get a live attachment by the name of its stored file
    async fn get_live_by_storage_name(&self, storage_name: &str) -> Result<Option<Attachment>>;

    /// Live attachments of a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Attachment>>;

    async fn soft_delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxAttachmentRepository {
    pool: SqlitePool,
}

impl SqlxAttachmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn AttachmentRepository> {
        Arc::new(Self::new(pool))
    }
}

const ATTACHMENT_COLUMNS: &str = "id, uploader_id, post_id, file_name, content_type, size_bytes, \
     storage_name, created_at, deleted_at";

#[async_trait]
impl AttachmentRepository for SqlxAttachmentRepository {
    async fn create(&self, attachment: &Attachment) -> Result<Attachment> {
        let result = sqlx::query(
            r#"
            INSERT INTO attachments (uploader_id, post_id, file_name, content_type, size_bytes, storage_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attachment.uploader_id)
        .bind(attachment.post_id)
        .bind(&attachment.file_name)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(&attachment.storage_name)
        .bind(attachment.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create attachment")?;

        let mut created = attachment.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Attachment>> {
        let row = sqlx::query(&format!("SELECT {} FROM attachments WHERE id = ?", ATTACHMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get attachment by ID")?;

        Ok(row.as_ref().map(row_to_attachment))
    }

    async fn get_live_by_storage_name(&self, storage_name: &str) -> Result<Option<Attachment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM attachments WHERE storage_name = ? AND deleted_at IS NULL",
            ATTACHMENT_COLUMNS
        ))
        .bind(storage_name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get attachment by storage name")?;

        Ok(row.as_ref().map(row_to_attachment))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM attachments WHERE post_id = ? AND deleted_at IS NULL ORDER BY id",
            ATTACHMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list attachments")?;

        Ok(rows.iter().map(row_to_attachment).collect())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE attachments SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete attachment")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_attachment(row: &SqliteRow) -> Attachment {
    Attachment {
        id: row.get("id"),
        uploader_id: row.get("uploader_id"),
        post_id: row.get("post_id"),
        file_name: row.get("file_name"),
        content_type: row.get("content_type"),
        size_bytes: row.get("size_bytes"),
        storage_name: row.get("storage_name"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}
