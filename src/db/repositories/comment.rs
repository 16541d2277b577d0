//! Comment repository
//!
//! Besides plain CRUD this owns the edit write: recording the previous text in
//! `comment_edits` and replacing the comment content happen in one
//! transaction.

use crate::models::{Comment, CommentEdit};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get a comment by ID, including soft-deleted comments
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Live comments of a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>>;

    /// Record the current content as history and replace it, atomically
    async fn update_with_history(
        &self,
        id: i64,
        editor_id: i64,
        new_content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Comment>;

    /// Edit history of a comment, newest first
    async fn list_history(&self, comment_id: i64) -> Result<Vec<CommentEdit>>;

    /// Lock or unlock a comment
    async fn set_locked(&self, id: i64, locked: bool) -> Result<()>;

    /// Soft-delete a comment. Returns false if it was already deleted.
    async fn soft_delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxCommentRepository {
    pool: SqlitePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, author_id, parent_id, content, is_locked, \
     created_at, updated_at, edited_at, deleted_at";

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        let result = sqlx::query(
            r#"
            INSERT INTO comments (post_id, author_id, parent_id, content, is_locked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.is_locked)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create comment")?;

        let mut created = comment.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get comment by ID")?;

        Ok(row.as_ref().map(row_to_comment))
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comments WHERE post_id = ? AND deleted_at IS NULL ORDER BY created_at ASC, id ASC",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list comments")?;

        Ok(rows.iter().map(row_to_comment).collect())
    }

    async fn update_with_history(
        &self,
        id: i64,
        editor_id: i64,
        new_content: &str,
        edited_at: DateTime<Utc>,
    ) -> Result<Comment> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row = sqlx::query("SELECT content FROM comments WHERE id = ? AND deleted_at IS NULL")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to read comment for edit")?
            .context("Comment disappeared during edit")?;
        let previous: String = row.get("content");

        sqlx::query(
            "INSERT INTO comment_edits (comment_id, editor_id, previous_content, edited_at) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(editor_id)
        .bind(&previous)
        .bind(edited_at)
        .execute(&mut *tx)
        .await
        .context("Failed to record comment edit")?;

        sqlx::query("UPDATE comments SET content = ?, edited_at = ?, updated_at = ? WHERE id = ?")
            .bind(new_content)
            .bind(edited_at)
            .bind(edited_at)
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to update comment")?;

        let row = sqlx::query(&format!("SELECT {} FROM comments WHERE id = ?", COMMENT_COLUMNS))
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to reload comment")?;
        let updated = row_to_comment(&row);

        tx.commit().await.context("Failed to commit comment edit")?;
        Ok(updated)
    }

    async fn list_history(&self, comment_id: i64) -> Result<Vec<CommentEdit>> {
        let rows = sqlx::query(
            r#"
            SELECT id, comment_id, editor_id, previous_content, edited_at
            FROM comment_edits
            WHERE comment_id = ?
            ORDER BY edited_at DESC, id DESC
            "#,
        )
        .bind(comment_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list comment history")?;

        Ok(rows
            .iter()
            .map(|row| CommentEdit {
                id: row.get("id"),
                comment_id: row.get("comment_id"),
                editor_id: row.get("editor_id"),
                previous_content: row.get("previous_content"),
                edited_at: row.get("edited_at"),
            })
            .collect())
    }

    async fn set_locked(&self, id: i64, locked: bool) -> Result<()> {
        sqlx::query("UPDATE comments SET is_locked = ?, updated_at = ? WHERE id = ?")
            .bind(locked)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to lock comment")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE comments SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete comment")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_comment(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        parent_id: row.get("parent_id"),
        content: row.get("content"),
        is_locked: row.get("is_locked"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        edited_at: row.get("edited_at"),
        deleted_at: row.get("deleted_at"),
    }
}
