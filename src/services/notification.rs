//! Notification service

use crate::db::repositories::NotificationRepository;
use crate::models::{ListParams, Member, Notification, PagedResult};
use crate::services::error::{ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

/// A page of notifications plus the recipient's unread count
#[derive(Debug)]
pub struct NotificationPage {
    pub page: PagedResult<Notification>,
    pub unread_count: i64,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Deliver a notification
    pub async fn notify(&self, notification: Notification) -> ServiceResult<()> {
        let created = self
            .repo
            .create(&notification)
            .await
            .context("Failed to create notification")?;
        tracing::debug!(
            recipient_id = created.recipient_id,
            kind = %created.kind,
            "notification delivered"
        );
        Ok(())
    }

    pub async fn list(
        &self,
        member: &Member,
        unread_only: bool,
        params: ListParams,
    ) -> ServiceResult<NotificationPage> {
        let (items, total) = self.repo.list_for_recipient(member.id, unread_only, &params).await?;
        let unread_count = self.repo.count_unread(member.id).await?;
        Ok(NotificationPage {
            page: PagedResult::new(items, total, &params),
            unread_count,
        })
    }

    pub async fn mark_read(&self, member: &Member, id: i64) -> ServiceResult<()> {
        if !self.repo.mark_read(id, member.id).await? {
            return Err(ServiceError::not_found("Notification"));
        }
        Ok(())
    }

    /// Returns the number of notifications that changed state
    pub async fn mark_all_read(&self, member: &Member) -> ServiceResult<u64> {
        Ok(self.repo.mark_all_read(member.id).await?)
    }

    pub async fn delete(&self, member: &Member, id: i64) -> ServiceResult<()> {
        if !self.repo.soft_delete(id, member.id).await? {
            return Err(ServiceError::not_found("Notification"));
        }
        Ok(())
    }
}
