//! Moderator management, performed by administrators

use crate::db::repositories::{ModeratorRepository, SessionRepository, UserRepository};
use crate::models::{ActorType, Administrator, Moderator, NewAuditLog};
use crate::services::audit::AuditService;
use crate::services::error::{ServiceError, ServiceResult};
use std::sync::Arc;

pub struct StaffService {
    moderators: Arc<dyn ModeratorRepository>,
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    audit: Arc<AuditService>,
}

impl StaffService {
    pub fn new(
        moderators: Arc<dyn ModeratorRepository>,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            moderators,
            users,
            sessions,
            audit,
        }
    }

    pub async fn list_moderators(&self) -> ServiceResult<Vec<Moderator>> {
        Ok(self.moderators.list_active().await?)
    }

    /// Grant the moderator role to a user
    pub async fn appoint(&self, admin: &Administrator, user_id: i64) -> ServiceResult<Moderator> {
        self.users
            .get_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ServiceError::not_found("User"))?;

        if self.moderators.get_active_by_user_id(user_id).await?.is_some() {
            return Err(ServiceError::conflict("User is already a moderator"));
        }

        let moderator = self.moderators.create(user_id, Some(admin.id)).await?;
        self.audit
            .record(NewAuditLog::new(
                ActorType::Administrator,
                admin.id,
                "moderator.appoint",
                "moderator",
                moderator.id,
            ))
            .await?;
        Ok(moderator)
    }

    /// Revoke a moderator grant and end its sessions
    pub async fn revoke(&self, admin: &Administrator, id: i64) -> ServiceResult<()> {
        self.moderators
            .get_by_id(id)
            .await?
            .filter(|m| m.revoked_at.is_none())
            .ok_or_else(|| ServiceError::not_found("Moderator"))?;

        if !self.moderators.revoke(id).await? {
            return Err(ServiceError::not_found("Moderator"));
        }
        let revoked = self.sessions.revoke_for_actor(ActorType::Moderator, id).await?;

        self.audit
            .record(NewAuditLog::new(ActorType::Administrator, admin.id, "moderator.revoke", "moderator", id))
            .await?;
        tracing::info!(moderator_id = id, sessions_revoked = revoked, "Moderator revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;
    use crate::services::testing::TestServices;

    #[tokio::test]
    async fn test_appoint_and_revoke() {
        let t = TestServices::new().await;
        let admin = t.administrator("root").await;
        let bob = t.member("bob").await;

        let moderator = t.staff.appoint(&admin, bob.user_id).await.unwrap();
        assert_eq!(moderator.appointed_by, Some(admin.id));
        assert!(matches!(t.staff.appoint(&admin, bob.user_id).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(t.staff.appoint(&admin, 999).await, Err(ServiceError::NotFound(_))));
        assert_eq!(t.staff.list_moderators().await.unwrap().len(), 1);

        t.staff.revoke(&admin, moderator.id).await.unwrap();
        assert!(matches!(t.staff.revoke(&admin, moderator.id).await, Err(ServiceError::NotFound(_))));
        assert!(t.staff.list_moderators().await.unwrap().is_empty());

        // Re-appointing after revocation creates a fresh grant
        assert!(t.staff.appoint(&admin, bob.user_id).await.is_ok());

        let audit = t.audit.list(None, ListParams::default()).await.unwrap();
        assert_eq!(audit.total, 3);
    }
}
