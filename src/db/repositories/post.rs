//! Post repository

use crate::models::{ListParams, Post};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get a post by ID, including soft-deleted posts
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// List live posts, newest first
    async fn list(&self, params: &ListParams) -> Result<(Vec<Post>, i64)>;

    /// Replace title and body
    async fn update_content(&self, id: i64, title: &str, body: &str) -> Result<()>;

    /// Lock or unlock a post
    async fn set_locked(&self, id: i64, locked: bool) -> Result<()>;

    /// Soft-delete a post. Returns false if it was already deleted.
    async fn soft_delete(&self, id: i64) -> Result<bool>;
}

pub struct SqlxPostRepository {
    pool: SqlitePool,
}

impl SqlxPostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str =
    "id, author_id, title, body, is_locked, created_at, updated_at, deleted_at";

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        let result = sqlx::query(
            r#"
            INSERT INTO posts (author_id, title, body, is_locked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.is_locked)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create post")?;

        let mut created = post.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get post by ID")?;

        Ok(row.as_ref().map(row_to_post))
    }

    async fn list(&self, params: &ListParams) -> Result<(Vec<Post>, i64)> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts WHERE deleted_at IS NULL ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            POST_COLUMNS
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list posts")?;

        let count_row = sqlx::query("SELECT COUNT(*) as count FROM posts WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count posts")?;

        Ok((rows.iter().map(row_to_post).collect(), count_row.get("count")))
    }

    async fn update_content(&self, id: i64, title: &str, body: &str) -> Result<()> {
        sqlx::query("UPDATE posts SET title = ?, body = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(body)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update post")?;
        Ok(())
    }

    async fn set_locked(&self, id: i64, locked: bool) -> Result<()> {
        sqlx::query("UPDATE posts SET is_locked = ?, updated_at = ? WHERE id = ?")
            .bind(locked)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to lock post")?;
        Ok(())
    }

    async fn soft_delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE posts SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete post")?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_post(row: &SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        body: row.get("body"),
        is_locked: row.get("is_locked"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}
