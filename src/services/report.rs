//! Content report service
//!
//! Members flag posts or comments; moderators resolve or dismiss the flags.

use crate::db::repositories::{CommentRepository, PostRepository, ReportRepository};
use crate::models::{
    ActorType, ListParams, Member, Moderator, NewAuditLog, Notification, NotificationKind,
    PagedResult, Report, ReportStatus, ReportTarget,
};
use crate::services::audit::AuditService;
use crate::services::content_rules::{bounded_text, REPORT_REASON_MAX};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use serde_json::json;
use std::sync::Arc;

pub struct ReportService {
    repo: Arc<dyn ReportRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    audit: Arc<AuditService>,
    notifications: Arc<NotificationService>,
}

impl ReportService {
    pub fn new(
        repo: Arc<dyn ReportRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        audit: Arc<AuditService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            posts,
            comments,
            audit,
            notifications,
        }
    }

    /// File a report against exactly one post or comment
    pub async fn create(
        &self,
        reporter: &Member,
        post_id: Option<i64>,
        comment_id: Option<i64>,
        reason: &str,
    ) -> ServiceResult<Report> {
        let target = ReportTarget::from_ids(post_id, comment_id).ok_or_else(|| {
            ServiceError::validation("Exactly one of post_id or comment_id must be given")
        })?;
        let reason = bounded_text("Reason", reason, REPORT_REASON_MAX)?;

        self.ensure_target_exists(target).await?;

        if self.repo.has_pending(reporter.id, target).await? {
            return Err(ServiceError::conflict("You already have a pending report on this content"));
        }

        let report = self.repo.create(&Report::new(reporter.id, target, reason)).await?;
        tracing::info!(report_id = report.id, reporter_id = reporter.id, "Report filed");
        Ok(report)
    }

    pub async fn list(&self, status: Option<ReportStatus>, params: ListParams) -> ServiceResult<PagedResult<Report>> {
        let (items, total) = self.repo.list(status, &params).await?;
        Ok(PagedResult::new(items, total, &params))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Report> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Report"))
    }

    /// Close a pending report as resolved or dismissed
    pub async fn resolve(
        &self,
        moderator: &Moderator,
        id: i64,
        status: ReportStatus,
        note: Option<&str>,
    ) -> ServiceResult<Report> {
        if status == ReportStatus::Pending {
            return Err(ServiceError::validation("Status must be 'resolved' or 'dismissed'"));
        }
        let note = note.map(str::trim).filter(|n| !n.is_empty());

        let report = self.get(id).await?;
        if report.status != ReportStatus::Pending {
            return Err(ServiceError::conflict("Report is no longer pending"));
        }
        if !self.repo.resolve(id, status, moderator.id, note).await? {
            return Err(ServiceError::conflict("Report is no longer pending"));
        }

        self.audit
            .record(
                NewAuditLog::new(ActorType::Moderator, moderator.id, "report.resolve", "report", id)
                    .with_details(json!({ "status": status.to_string(), "note": note })),
            )
            .await?;

        let mut notification = Notification::new(
            report.reporter_id,
            NotificationKind::ReportResolved,
            format!("Your report was {}", status),
        );
        if let Some(post_id) = report.post_id {
            notification = notification.with_post(post_id);
        }
        if let Some(comment_id) = report.comment_id {
            notification = notification.with_comment(comment_id);
        }
        self.notifications.notify(notification).await?;

        self.get(id).await
    }

    async fn ensure_target_exists(&self, target: ReportTarget) -> ServiceResult<()> {
        match target {
            ReportTarget::Post(id) => {
                self.posts
                    .get_by_id(id)
                    .await?
                    .filter(|p| !p.is_deleted())
                    .ok_or_else(|| ServiceError::not_found("Post"))?;
            }
            ReportTarget::Comment(id) => {
                self.comments
                    .get_by_id(id)
                    .await?
                    .filter(|c| !c.is_deleted())
                    .ok_or_else(|| ServiceError::not_found("Comment"))?;
            }
        }
        Ok(())
    }
}
