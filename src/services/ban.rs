//! Ban service

use crate::db::repositories::{BanRepository, MemberRepository, SessionRepository};
use crate::models::{
    ActorType, Ban, ListParams, Moderator, NewAuditLog, Notification, NotificationKind,
    PagedResult,
};
use crate::services::audit::AuditService;
use crate::services::content_rules::{bounded_text, REPORT_REASON_MAX};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;

/// Longest timed ban, in hours (one hundred years)
pub const MAX_BAN_HOURS: i64 = 24 * 365 * 100;

/// Expiry of a ban lasting `hours` from `now`
fn ban_expiry(now: DateTime<Utc>, hours: i64) -> ServiceResult<DateTime<Utc>> {
    Some(hours)
        .filter(|h| (1..=MAX_BAN_HOURS).contains(h))
        .and_then(Duration::try_hours)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| {
            ServiceError::validation(format!("duration_hours must be between 1 and {}", MAX_BAN_HOURS))
        })
}

pub struct BanService {
    repo: Arc<dyn BanRepository>,
    members: Arc<dyn MemberRepository>,
    sessions: Arc<dyn SessionRepository>,
    audit: Arc<AuditService>,
    notifications: Arc<NotificationService>,
}

impl BanService {
    pub fn new(
        repo: Arc<dyn BanRepository>,
        members: Arc<dyn MemberRepository>,
        sessions: Arc<dyn SessionRepository>,
        audit: Arc<AuditService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            members,
            sessions,
            audit,
            notifications,
        }
    }

    /// Ban a member, permanently when `duration_hours` is `None`.
    ///
    /// The member's sessions are revoked so the ban takes effect at once.
    pub async fn create(
        &self,
        moderator: &Moderator,
        member_id: i64,
        reason: &str,
        duration_hours: Option<i64>,
    ) -> ServiceResult<Ban> {
        let reason = bounded_text("Reason", reason, REPORT_REASON_MAX)?;
        let now = Utc::now();
        let expires_at = match duration_hours {
            Some(hours) => Some(ban_expiry(now, hours)?),
            None => None,
        };

        self.members
            .get_by_id(member_id)
            .await?
            .filter(|m| !m.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Member"))?;

        if self.repo.find_active(member_id).await?.is_some() {
            return Err(ServiceError::conflict("Member already has an active ban"));
        }

        let ban = self
            .repo
            .create(&Ban::new(member_id, moderator.id, reason, expires_at))
            .await?;

        self.audit
            .record(
                NewAuditLog::new(ActorType::Moderator, moderator.id, "ban.create", "member", member_id)
                    .with_details(json!({
                        "ban_id": ban.id,
                        "reason": ban.reason,
                        "expires_at": ban.expires_at.map(|t| t.to_rfc3339()),
                    })),
            )
            .await?;

        let message = match ban.expires_at {
            Some(until) => format!("You have been banned until {}: {}", until.to_rfc3339(), ban.reason),
            None => format!("You have been banned: {}", ban.reason),
        };
        self.notifications
            .notify(Notification::new(member_id, NotificationKind::Banned, message))
            .await?;

        let revoked = self.sessions.revoke_for_actor(ActorType::Member, member_id).await?;
        tracing::info!(ban_id = ban.id, member_id, sessions_revoked = revoked, "Member banned");
        Ok(ban)
    }

    pub async fn list(&self, active_only: bool, params: ListParams) -> ServiceResult<PagedResult<Ban>> {
        let (items, total) = self.repo.list(active_only, &params).await?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Lift a ban that has not been lifted yet
    pub async fn lift(&self, moderator: &Moderator, id: i64) -> ServiceResult<Ban> {
        let ban = self
            .repo
            .get_by_id(id)
            .await?
            .filter(|b| b.lifted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("Ban"))?;

        if !self.repo.lift(id).await? {
            return Err(ServiceError::not_found("Ban"));
        }

        self.audit
            .record(NewAuditLog::new(ActorType::Moderator, moderator.id, "ban.lift", "member", ban.member_id)
                .with_details(json!({ "ban_id": id })))
            .await?;

        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Ban"))
    }
}
