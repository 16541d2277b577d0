//! Attachment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File uploaded by a member, optionally attached to one of their posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    /// Member ID of the uploader
    pub uploader_id: i64,
    pub post_id: Option<i64>,
    /// Original file name as sent by the client
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Name of the stored file under the upload directory
    pub storage_name: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Public URL the file is served from
    pub fn url(&self) -> String {
        format!("/uploads/{}", self.storage_name)
    }
}
