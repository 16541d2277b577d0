//! Guest model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anonymous visitor holding a guest token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    pub id: i64,
    pub display_name: Option<String>,
    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Guest {
    pub fn new(display_name: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            id: 0,
            display_name,
            ip_address,
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}
