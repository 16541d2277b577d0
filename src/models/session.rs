//! Session model
//!
//! Every issued token is backed by a session row so it can be revoked before
//! it expires (logout, bans, moderator revocation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of actor a token authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    Member,
    Moderator,
    #[serde(alias = "admin")]
    Administrator,
    Guest,
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorType::Member => write!(f, "member"),
            ActorType::Moderator => write!(f, "moderator"),
            ActorType::Administrator => write!(f, "administrator"),
            ActorType::Guest => write!(f, "guest"),
        }
    }
}

impl FromStr for ActorType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(ActorType::Member),
            "moderator" => Ok(ActorType::Moderator),
            "administrator" | "admin" => Ok(ActorType::Administrator),
            "guest" => Ok(ActorType::Guest),
            _ => Err(anyhow::anyhow!("Invalid actor type: {}", s)),
        }
    }
}

/// Session entity backing an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID, carried as the `sid` token claim
    pub id: String,
    pub actor_type: ActorType,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Not revoked and not expired
    pub fn is_valid(&self) -> bool {
        self.revoked_at.is_none() && !self.is_expired()
    }
}
