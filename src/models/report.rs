//! Content report model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A member's flag against a post or a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    /// Member ID of the reporter
    pub reporter_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub reason: String,
    pub status: ReportStatus,
    /// Moderator ID that resolved or dismissed the report
    pub resolved_by: Option<i64>,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    pub fn new(reporter_id: i64, target: ReportTarget, reason: String) -> Self {
        let (post_id, comment_id) = match target {
            ReportTarget::Post(id) => (Some(id), None),
            ReportTarget::Comment(id) => (None, Some(id)),
        };
        Self {
            id: 0,
            reporter_id,
            post_id,
            comment_id,
            reason,
            status: ReportStatus::Pending,
            resolved_by: None,
            resolution_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn target(&self) -> Option<ReportTarget> {
        match (self.post_id, self.comment_id) {
            (Some(id), None) => Some(ReportTarget::Post(id)),
            (None, Some(id)) => Some(ReportTarget::Comment(id)),
            _ => None,
        }
    }
}

/// What a report points at. Exactly one target per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Post(i64),
    Comment(i64),
}

impl ReportTarget {
    /// Build a target from optional ids, requiring exactly one to be set
    pub fn from_ids(post_id: Option<i64>, comment_id: Option<i64>) -> Option<Self> {
        match (post_id, comment_id) {
            (Some(id), None) => Some(ReportTarget::Post(id)),
            (None, Some(id)) => Some(ReportTarget::Comment(id)),
            _ => None,
        }
    }
}

/// Report lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Pending,
    Resolved,
    Dismissed,
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStatus::Pending => write!(f, "pending"),
            ReportStatus::Resolved => write!(f, "resolved"),
            ReportStatus::Dismissed => write!(f, "dismissed"),
        }
    }
}

impl FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReportStatus::Pending),
            "resolved" => Ok(ReportStatus::Resolved),
            "dismissed" => Ok(ReportStatus::Dismissed),
            _ => Err(anyhow::anyhow!("Invalid report status: {}", s)),
        }
    }
}
