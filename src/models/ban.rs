//! Ban model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A moderator-imposed ban on a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ban {
    pub id: i64,
    pub member_id: i64,
    /// Moderator ID that issued the ban
    pub banned_by: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    /// `None` means the ban never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub lifted_at: Option<DateTime<Utc>>,
}

impl Ban {
    pub fn new(
        member_id: i64,
        banned_by: i64,
        reason: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: 0,
            member_id,
            banned_by,
            reason,
            created_at: Utc::now(),
            expires_at,
            lifted_at: None,
        }
    }

    /// Active when not lifted and not yet expired at `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.lifted_at.is_none() && self.expires_at.map_or(true, |exp| exp > now)
    }
}
