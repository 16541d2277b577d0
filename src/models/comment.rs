//! Comment model
//!
//! Comments belong to a post and may reply to another comment on the same
//! post. Every edit by the author keeps the replaced text in a
//! [`CommentEdit`] row.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    /// Member ID of the author
    pub author_id: i64,
    /// Parent comment for replies
    pub parent_id: Option<i64>,
    pub content: String,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set on the first successful edit and refreshed on each one after
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(post_id: i64, author_id: i64, parent_id: Option<i64>, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            post_id,
            author_id,
            parent_id,
            content,
            is_locked: false,
            created_at: now,
            updated_at: now,
            edited_at: None,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether `now` still falls inside the edit window that opens at creation.
    ///
    /// The window is inclusive: an edit exactly `window` after creation is allowed.
    pub fn within_edit_window(&self, now: DateTime<Utc>, window: Duration) -> bool {
        let elapsed = now.signed_duration_since(self.created_at);
        elapsed <= window
    }
}

/// Previous text of a comment, recorded when the author edits it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEdit {
    pub id: i64,
    pub comment_id: i64,
    /// Member ID of the editor
    pub editor_id: i64,
    pub previous_content: String,
    pub edited_at: DateTime<Utc>,
}
