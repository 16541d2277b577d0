//! Post service
//!
//! Member-facing post CRUD plus the moderator lock and removal actions.

use crate::db::repositories::PostRepository;
use crate::models::{
    ActorType, ListParams, Member, Moderator, NewAuditLog, Notification, NotificationKind,
    PagedResult, Post,
};
use crate::services::audit::AuditService;
use crate::services::content_rules::ContentRules;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::notification::NotificationService;
use serde_json::json;
use std::sync::Arc;

pub struct PostService {
    repo: Arc<dyn PostRepository>,
    rules: ContentRules,
    audit: Arc<AuditService>,
    notifications: Arc<NotificationService>,
}

impl PostService {
    pub fn new(
        repo: Arc<dyn PostRepository>,
        rules: ContentRules,
        audit: Arc<AuditService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            repo,
            rules,
            audit,
            notifications,
        }
    }

    /// Live posts, newest first
    pub async fn list(&self, params: ListParams) -> ServiceResult<PagedResult<Post>> {
        let (items, total) = self.repo.list(&params).await?;
        Ok(PagedResult::new(items, total, &params))
    }

    /// Fetch a live post
    pub async fn get(&self, id: i64) -> ServiceResult<Post> {
        self.repo
            .get_by_id(id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| ServiceError::not_found("Post"))
    }

    pub async fn create(&self, author: &Member, title: &str, body: &str) -> ServiceResult<Post> {
        let (title, body) = self.rules.post_content(title, body)?;
        let post = self.repo.create(&Post::new(author.id, title, body)).await?;
        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Replace title and body. Author only; locked posts are frozen.
    pub async fn update(&self, author: &Member, id: i64, title: &str, body: &str) -> ServiceResult<Post> {
        let post = self.get(id).await?;
        if post.author_id != author.id {
            return Err(ServiceError::forbidden("Only the author can edit this post"));
        }
        if post.is_locked {
            return Err(ServiceError::forbidden("Post is locked"));
        }

        let (title, body) = self.rules.post_content(title, body)?;
        self.repo.update_content(id, &title, &body).await?;
        self.get(id).await
    }

    pub async fn delete(&self, author: &Member, id: i64) -> ServiceResult<()> {
        let post = self.get(id).await?;
        if post.author_id != author.id {
            return Err(ServiceError::forbidden("Only the author can delete this post"));
        }
        if !self.repo.soft_delete(id).await? {
            return Err(ServiceError::not_found("Post"));
        }
        tracing::info!(post_id = id, "Post deleted by author");
        Ok(())
    }

    /// Lock or unlock a post. Locking notifies the author.
    pub async fn lock(&self, moderator: &Moderator, id: i64, locked: bool) -> ServiceResult<Post> {
        let post = self.get(id).await?;
        self.repo.set_locked(id, locked).await?;

        let action = if locked { "post.lock" } else { "post.unlock" };
        self.audit
            .record(NewAuditLog::new(ActorType::Moderator, moderator.id, action, "post", id))
            .await?;

        if locked && !post.is_locked {
            self.notifications
                .notify(
                    Notification::new(
                        post.author_id,
                        NotificationKind::PostLocked,
                        format!("Your post \"{}\" was locked by a moderator", post.title),
                    )
                    .with_post(id),
                )
                .await?;
        }

        self.get(id).await
    }

    /// Soft-delete a post on behalf of moderation
    pub async fn remove(&self, moderator: &Moderator, id: i64, reason: Option<&str>) -> ServiceResult<()> {
        let post = self.get(id).await?;
        if !self.repo.soft_delete(id).await? {
            return Err(ServiceError::not_found("Post"));
        }

        let mut entry = NewAuditLog::new(ActorType::Moderator, moderator.id, "post.remove", "post", id);
        if let Some(reason) = reason {
            entry = entry.with_details(json!({ "reason": reason }));
        }
        self.audit.record(entry).await?;

        let message = match reason {
            Some(reason) => format!("Your post \"{}\" was removed: {}", post.title, reason),
            None => format!("Your post \"{}\" was removed by a moderator", post.title),
        };
        self.notifications
            .notify(Notification::new(post.author_id, NotificationKind::PostRemoved, message).with_post(id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::TestServices;

    #[tokio::test]
    async fn test_create_validates_content() {
        let t = TestServices::new().await;
        let alice = t.member("alice").await;

        let post = t.posts.create(&alice, "  Hello  ", "World").await.unwrap();
        assert_eq!(post.title, "Hello");

        assert!(matches!(t.posts.create(&alice, "", "body").await, Err(ServiceError::Validation(_))));
        let long_title = "x".repeat(201);
        assert!(matches!(t.posts.create(&alice, &long_title, "body").await, Err(ServiceError::Validation(_))));
        assert!(matches!(
            t.posts.create(&alice, "Buy now", "total SCAM inside").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_author_only() {
        let t = TestServices::new().await;
        let alice = t.member("alice").await;
        let bob = t.member("bob").await;
        let post = t.posts.create(&alice, "Title", "Body").await.unwrap();

        assert!(matches!(t.posts.update(&bob, post.id, "T", "B").await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(t.posts.delete(&bob, post.id).await, Err(ServiceError::Forbidden(_))));

        let updated = t.posts.update(&alice, post.id, "New", "Text").await.unwrap();
        assert_eq!(updated.title, "New");

        t.posts.delete(&alice, post.id).await.unwrap();
        assert!(matches!(t.posts.get(post.id).await, Err(ServiceError::NotFound(_))));
        assert_eq!(t.posts.list(ListParams::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_lock_blocks_author_edits_and_notifies() {
        let t = TestServices::new().await;
        let alice = t.member("alice").await;
        let moderator = t.moderator("mod").await;
        let post = t.posts.create(&alice, "Title", "Body").await.unwrap();

        let locked = t.posts.lock(&moderator, post.id, true).await.unwrap();
        assert!(locked.is_locked);
        assert!(matches!(t.posts.update(&alice, post.id, "T", "B").await, Err(ServiceError::Forbidden(_))));

        let inbox = t.notifications.list(&alice, false, ListParams::default()).await.unwrap();
        assert_eq!(inbox.unread_count, 1);
        assert_eq!(inbox.page.items[0].kind, NotificationKind::PostLocked);

        let audit = t.audit.list(Some("post.lock"), ListParams::default()).await.unwrap();
        assert_eq!(audit.total, 1);
    }

    #[tokio::test]
    async fn test_remove_audits_and_notifies() {
        let t = TestServices::new().await;
        let alice = t.member("alice").await;
        let moderator = t.moderator("mod").await;
        let post = t.posts.create(&alice, "Title", "Body").await.unwrap();

        t.posts.remove(&moderator, post.id, Some("off topic")).await.unwrap();
        assert!(matches!(t.posts.get(post.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(t.posts.remove(&moderator, post.id, None).await, Err(ServiceError::NotFound(_))));

        let audit = t.audit.list(Some("post.remove"), ListParams::default()).await.unwrap();
        assert_eq!(audit.items[0].details.as_ref().unwrap()["reason"], "off topic");
    }
}
