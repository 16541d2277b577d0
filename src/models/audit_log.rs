//! Audit log model
//!
//! Audit rows are append-only: they are inserted by services and never
//! updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ActorType;

/// Persisted audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub actor_type: ActorType,
    pub actor_id: i64,
    /// Dotted action name such as `comment.update` or `ban.create`
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Audit entry about to be written
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor_type: ActorType,
    pub actor_id: i64,
    pub action: &'static str,
    pub target_type: &'static str,
    pub target_id: i64,
    pub details: Option<serde_json::Value>,
}

impl NewAuditLog {
    pub fn new(
        actor_type: ActorType,
        actor_id: i64,
        action: &'static str,
        target_type: &'static str,
        target_id: i64,
    ) -> Self {
        Self {
            actor_type,
            actor_id,
            action,
            target_type,
            target_id,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
