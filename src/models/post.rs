//! Post model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion thread started by a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Member ID of the author
    pub author_id: i64,
    pub title: String,
    pub body: String,
    /// Locked posts reject edits and new comments
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn new(author_id: i64, title: String, body: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            author_id,
            title,
            body,
            is_locked: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
