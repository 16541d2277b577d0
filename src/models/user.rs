//! User model
//!
//! A user holds login credentials. What a user may do is decided by the role
//! rows that point at it (member, moderator, administrator).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered account with credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Email address (unique)
    pub email: String,
    /// Username (unique)
    pub username: String,
    /// Password hash (argon2id PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a new user. The password must already be hashed.
    pub fn new(email: String, username: String, password_hash: String, display_name: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            email,
            username,
            password_hash,
            display_name,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
