//! Notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A message delivered to a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Member ID of the recipient
    pub recipient_id: i64,
    pub kind: NotificationKind,
    pub message: String,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(recipient_id: i64, kind: NotificationKind, message: String) -> Self {
        Self {
            id: 0,
            recipient_id,
            kind,
            message,
            post_id: None,
            comment_id: None,
            created_at: Utc::now(),
            read_at: None,
            deleted_at: None,
        }
    }

    pub fn with_post(mut self, post_id: i64) -> Self {
        self.post_id = Some(post_id);
        self
    }

    pub fn with_comment(mut self, comment_id: i64) -> Self {
        self.comment_id = Some(comment_id);
        self
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// What triggered a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Someone commented on the recipient's post
    PostComment,
    /// Someone replied to the recipient's comment
    CommentReply,
    PostLocked,
    PostRemoved,
    CommentLocked,
    CommentRemoved,
    /// A report filed by the recipient was resolved or dismissed
    ReportResolved,
    Banned,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationKind::PostComment => "post_comment",
            NotificationKind::CommentReply => "comment_reply",
            NotificationKind::PostLocked => "post_locked",
            NotificationKind::PostRemoved => "post_removed",
            NotificationKind::CommentLocked => "comment_locked",
            NotificationKind::CommentRemoved => "comment_removed",
            NotificationKind::ReportResolved => "report_resolved",
            NotificationKind::Banned => "banned",
        };
        f.write_str(s)
    }
}

impl FromStr for NotificationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post_comment" => Ok(NotificationKind::PostComment),
            "comment_reply" => Ok(NotificationKind::CommentReply),
            "post_locked" => Ok(NotificationKind::PostLocked),
            "post_removed" => Ok(NotificationKind::PostRemoved),
            "comment_locked" => Ok(NotificationKind::CommentLocked),
            "comment_removed" => Ok(NotificationKind::CommentRemoved),
            "report_resolved" => Ok(NotificationKind::ReportResolved),
            "banned" => Ok(NotificationKind::Banned),
            _ => Err(anyhow::anyhow!("Invalid notification kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_serde() {
        let kinds = [
            NotificationKind::PostComment,
            NotificationKind::CommentReply,
            NotificationKind::PostLocked,
            NotificationKind::PostRemoved,
            NotificationKind::CommentLocked,
            NotificationKind::CommentRemoved,
            NotificationKind::ReportResolved,
            NotificationKind::Banned,
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
            assert_eq!(kind.to_string().parse::<NotificationKind>().unwrap(), kind);
        }
    }
}
