//! Moderator and administrator grants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderator grant. Active while `revoked_at` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moderator {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    /// Administrator who appointed this moderator
    pub appointed_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub user_deleted_at: Option<DateTime<Utc>>,
}

impl Moderator {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.user_deleted_at.is_none()
    }
}

/// Administrator grant. Active while `revoked_at` is unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Administrator {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub user_deleted_at: Option<DateTime<Utc>>,
}

impl Administrator {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.user_deleted_at.is_none()
    }
}
