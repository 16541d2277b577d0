//! Comment service
//!
//! Comments, replies, the author edit flow with its history trail, and the
//! moderator lock and removal actions.
//!
//! An edit passes, in order: existence, authorship, lock state, the edit
//! window, length and the forbidden-word scan. Only then is the audit row
//! written and the history row plus new content committed together.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{
    ActorType, Comment, CommentEdit, Member, Moderator, NewAuditLog, Notification,
    NotificationKind, Post,
};
use crate::services::audit::AuditService;
use crate::services::auth::Actor;
use crate::services::content_rules::ContentRules;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    rules: ContentRules,
    audit: Arc<AuditService>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        rules: ContentRules,
        audit: Arc<AuditService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            posts,
            rules,
            audit,
            notifications,
        }
    }

    /// Live comments of a live post, oldest first
    pub async fn list_by_post(&self, post_id: i64) -> ServiceResult<Vec<Comment>> {
        self.live_post(post_id).await?;
        Ok(self.repo.list_by_post(post_id).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Comment> {
        self.repo
            .get_by_id(id)
            .await?
            .filter(|c| !c.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Comment"))
    }

    /// Comment on a post, optionally replying to another comment on it
    pub async fn create(
        &self,
        author: &Member,
        post_id: i64,
        content: &str,
        parent_id: Option<i64>,
    ) -> ServiceResult<Comment> {
        let post = self.live_post(post_id).await?;
        if post.is_locked {
            return Err(ServiceError::forbidden("Post is locked"));
        }

        let parent = match parent_id {
            Some(parent_id) => {
                let parent = self
                    .get(parent_id)
                    .await
                    .map_err(|_| ServiceError::not_found("Parent comment"))?;
                if parent.post_id != post.id {
                    return Err(ServiceError::not_found("Parent comment"));
                }
                Some(parent)
            }
            None => None,
        };

        let content = self.rules.comment_content(content)?;
        let comment = self
            .repo
            .create(&Comment::new(post.id, author.id, parent_id, content))
            .await?;
        tracing::info!(comment_id = comment.id, post_id = post.id, "Comment created");

        self.notify_new_comment(author, &post, parent.as_ref(), &comment).await?;
        Ok(comment)
    }

    /// Author edit within the edit window; the replaced text goes to history
    pub async fn update(&self, author: &Member, id: i64, content: &str) -> ServiceResult<Comment> {
        let comment = self.get(id).await?;
        if comment.author_id != author.id {
            return Err(ServiceError::forbidden("Only the author can edit this comment"));
        }
        if comment.is_locked {
            return Err(ServiceError::forbidden("Comment is locked"));
        }

        let now = Utc::now();
        if !comment.within_edit_window(now, self.rules.edit_window()) {
            return Err(ServiceError::forbidden("Edit window has expired"));
        }

        let content = self.rules.comment_content(content)?;

        self.audit
            .record(
                NewAuditLog::new(ActorType::Member, author.id, "comment.update", "comment", id)
                    .with_details(json!({ "before": comment.content, "after": content })),
            )
            .await?;

        let updated = self.repo.update_with_history(id, author.id, &content, now).await?;
        Ok(updated)
    }

    /// Edit history, newest first. Visible to the author and to moderators.
    pub async fn history(&self, viewer: &Actor, id: i64) -> ServiceResult<Vec<CommentEdit>> {
        let comment = self.get(id).await?;
        let allowed = match viewer {
            Actor::Member(member) => member.id == comment.author_id,
            Actor::Moderator(_) => true,
            _ => false,
        };
        if !allowed {
            return Err(ServiceError::forbidden("Comment history is not visible to you"));
        }
        Ok(self.repo.list_history(id).await?)
    }

    pub async fn delete(&self, author: &Member, id: i64) -> ServiceResult<()> {
        let comment = self.get(id).await?;
        if comment.author_id != author.id {
            return Err(ServiceError::forbidden("Only the author can delete this comment"));
        }
        if !self.repo.soft_delete(id).await? {
            return Err(ServiceError::not_found("Comment"));
        }
        Ok(())
    }

    /// Lock or unlock a comment. Locking notifies the author.
    pub async fn lock(&self, moderator: &Moderator, id: i64, locked: bool) -> ServiceResult<Comment> {
        let comment = self.get(id).await?;
        self.repo.set_locked(id, locked).await?;

        let action = if locked { "comment.lock" } else { "comment.unlock" };
        self.audit
            .record(NewAuditLog::new(ActorType::Moderator, moderator.id, action, "comment", id))
            .await?;

        if locked && !comment.is_locked {
            self.notifications
                .notify(
                    Notification::new(
                        comment.author_id,
                        NotificationKind::CommentLocked,
                        "Your comment was locked by a moderator".to_string(),
                    )
                    .with_post(comment.post_id)
                    .with_comment(id),
                )
                .await?;
        }

        self.get(id).await
    }

    pub async fn remove(&self, moderator: &Moderator, id: i64, reason: Option<&str>) -> ServiceResult<()> {
        let comment = self.get(id).await?;
        if !self.repo.soft_delete(id).await? {
            return Err(ServiceError::not_found("Comment"));
        }

        let mut entry = NewAuditLog::new(ActorType::Moderator, moderator.id, "comment.remove", "comment", id);
        if let Some(reason) = reason {
            entry = entry.with_details(json!({ "reason": reason }));
        }
        self.audit.record(entry).await?;

        let message = match reason {
            Some(reason) => format!("Your comment was removed: {}", reason),
            None => "Your comment was removed by a moderator".to_string(),
        };
        self.notifications
            .notify(
                Notification::new(comment.author_id, NotificationKind::CommentRemoved, message)
                    .with_post(comment.post_id)
                    .with_comment(id),
            )
            .await?;
        Ok(())
    }

    async fn live_post(&self, post_id: i64) -> ServiceResult<Post> {
        self.posts
            .get_by_id(post_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Post"))
    }

    /// Tell the post author and the parent author, never the commenter,
    /// and nobody twice.
    async fn notify_new_comment(
        &self,
        author: &Member,
        post: &Post,
        parent: Option<&Comment>,
        comment: &Comment,
    ) -> ServiceResult<()> {
        let reply_to = parent
            .map(|p| p.author_id)
            .filter(|&id| id != author.id);

        if let Some(recipient) = reply_to {
            self.notifications
                .notify(
                    Notification::new(
                        recipient,
                        NotificationKind::CommentReply,
                        format!("{} replied to your comment", author.display_name),
                    )
                    .with_post(post.id)
                    .with_comment(comment.id),
                )
                .await?;
        }

        if post.author_id != author.id && Some(post.author_id) != reply_to {
            self.notifications
                .notify(
                    Notification::new(
                        post.author_id,
                        NotificationKind::PostComment,
                        format!("{} commented on \"{}\"", author.display_name, post.title),
                    )
                    .with_post(post.id)
                    .with_comment(comment.id),
                )
                .await?;
        }

        Ok(())
    }
}
