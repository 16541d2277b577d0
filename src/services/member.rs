//! Member profile and administration service

use crate::db::repositories::{MemberRepository, SessionRepository, UserRepository};
use crate::models::{
    ActorType, Administrator, ListParams, Member, MemberStatus, NewAuditLog, PagedResult,
};
use crate::services::audit::AuditService;
use crate::services::content_rules::{bounded_text, DISPLAY_NAME_MAX};
use crate::services::error::{ServiceError, ServiceResult};
use serde_json::json;
use std::sync::Arc;

pub struct MemberService {
    repo: Arc<dyn MemberRepository>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    audit: Arc<AuditService>,
}

impl MemberService {
    pub fn new(
        repo: Arc<dyn MemberRepository>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            repo,
            users,
            sessions,
            audit,
        }
    }

    /// Public profile of a member that has not been deleted
    pub async fn get_profile(&self, id: i64) -> ServiceResult<Member> {
        self.repo
            .get_by_id(id)
            .await?
            .filter(|m| !m.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Member"))
    }

    pub async fn update_me(&self, member: &Member, display_name: &str) -> ServiceResult<Member> {
        let display_name = bounded_text("Display name", display_name, DISPLAY_NAME_MAX)?;
        self.users.update_display_name(member.user_id, &display_name).await?;
        self.get_profile(member.id).await
    }

    /// Leave the board: soft-delete the membership and end every session
    pub async fn delete_me(&self, member: &Member) -> ServiceResult<()> {
        self.repo.soft_delete(member.id).await?;
        let revoked = self.sessions.revoke_for_actor(ActorType::Member, member.id).await?;
        tracing::info!(member_id = member.id, sessions_revoked = revoked, "Member left");
        Ok(())
    }

    pub async fn list(&self, params: ListParams) -> ServiceResult<PagedResult<Member>> {
        let (items, total) = self.repo.list(&params).await?;
        Ok(PagedResult::new(items, total, &params))
    }

    pub async fn set_status(
        &self,
        admin: &Administrator,
        id: i64,
        status: MemberStatus,
    ) -> ServiceResult<Member> {
        let member = self.get_profile(id).await?;
        self.repo.set_status(id, status).await?;

        self.audit
            .record(
                NewAuditLog::new(ActorType::Administrator, admin.id, "member.status", "member", id)
                    .with_details(json!({ "from": member.status.to_string(), "to": status.to_string() })),
            )
            .await?;

        self.get_profile(id).await
    }
}
