//! Shared API response types
//!
//! Response DTOs keep the wire format independent of the models: timestamps
//! are RFC 3339 strings and internal columns are left out.

use serde::{Deserialize, Serialize};

use crate::models::{
    Administrator, Attachment, AuditLog, Ban, Comment, CommentEdit, Guest, Member, Moderator,
    Notification, PagedResult, Post, Report,
};
use crate::services::{Actor, IssuedToken};

/// Paginated list body
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    pub fn from_page<M>(page: PagedResult<M>) -> Self
    where
        T: From<M>,
    {
        let total_pages = page.total_pages();
        Self {
            total: page.total,
            page: page.page,
            page_size: page.per_page,
            total_pages,
            items: page.items.into_iter().map(T::from).collect(),
        }
    }
}

fn ts(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339()
}

fn ts_opt(t: Option<chrono::DateTime<chrono::Utc>>) -> Option<String> {
    t.map(ts)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub actor_type: String,
    pub actor_id: i64,
    pub expires_at: String,
}

impl From<IssuedToken> for TokenResponse {
    fn from(t: IssuedToken) -> Self {
        Self {
            token: t.token,
            token_type: "Bearer".to_string(),
            actor_type: t.actor_type.to_string(),
            actor_id: t.actor_id,
            expires_at: ts(t.expires_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub display_name: String,
    pub status: String,
    pub created_at: String,
}

impl From<Member> for MemberResponse {
    fn from(m: Member) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            username: m.username,
            display_name: m.display_name,
            status: m.status.to_string(),
            created_at: ts(m.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeratorResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub appointed_by: Option<i64>,
    pub created_at: String,
}

impl From<Moderator> for ModeratorResponse {
    fn from(m: Moderator) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            username: m.username,
            appointed_by: m.appointed_by,
            created_at: ts(m.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdministratorResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub created_at: String,
}

impl From<Administrator> for AdministratorResponse {
    fn from(a: Administrator) -> Self {
        Self {
            id: a.id,
            user_id: a.user_id,
            username: a.username,
            created_at: ts(a.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestResponse {
    pub id: i64,
    pub display_name: Option<String>,
    pub created_at: String,
}

impl From<Guest> for GuestResponse {
    fn from(g: Guest) -> Self {
        Self {
            id: g.id,
            display_name: g.display_name,
            created_at: ts(g.created_at),
        }
    }
}

/// The authenticated actor, tagged by role
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "actor_type", rename_all = "lowercase")]
pub enum ActorResponse {
    Member(MemberResponse),
    Moderator(ModeratorResponse),
    Administrator(AdministratorResponse),
    Guest(GuestResponse),
}

impl From<Actor> for ActorResponse {
    fn from(actor: Actor) -> Self {
        match actor {
            Actor::Member(m) => ActorResponse::Member(m.into()),
            Actor::Moderator(m) => ActorResponse::Moderator(m.into()),
            Actor::Administrator(a) => ActorResponse::Administrator(a.into()),
            Actor::Guest(g) => ActorResponse::Guest(g.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub is_locked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(p: Post) -> Self {
        Self {
            id: p.id,
            author_id: p.author_id,
            title: p.title,
            body: p.body,
            is_locked: p.is_locked,
            created_at: ts(p.created_at),
            updated_at: ts(p.updated_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub is_locked: bool,
    pub created_at: String,
    pub updated_at: String,
    pub edited_at: Option<String>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            author_id: c.author_id,
            parent_id: c.parent_id,
            content: c.content,
            is_locked: c.is_locked,
            created_at: ts(c.created_at),
            updated_at: ts(c.updated_at),
            edited_at: ts_opt(c.edited_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentEditResponse {
    pub id: i64,
    pub comment_id: i64,
    pub editor_id: i64,
    pub previous_content: String,
    pub edited_at: String,
}

impl From<CommentEdit> for CommentEditResponse {
    fn from(e: CommentEdit) -> Self {
        Self {
            id: e.id,
            comment_id: e.comment_id,
            editor_id: e.editor_id,
            previous_content: e.previous_content,
            edited_at: ts(e.edited_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub id: i64,
    pub reporter_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub reason: String,
    pub status: String,
    pub resolved_by: Option<i64>,
    pub resolution_note: Option<String>,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            reporter_id: r.reporter_id,
            post_id: r.post_id,
            comment_id: r.comment_id,
            reason: r.reason,
            status: r.status.to_string(),
            resolved_by: r.resolved_by,
            resolution_note: r.resolution_note,
            created_at: ts(r.created_at),
            resolved_at: ts_opt(r.resolved_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BanResponse {
    pub id: i64,
    pub member_id: i64,
    pub banned_by: i64,
    pub reason: String,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub lifted_at: Option<String>,
}

impl From<Ban> for BanResponse {
    fn from(b: Ban) -> Self {
        Self {
            id: b.id,
            member_id: b.member_id,
            banned_by: b.banned_by,
            reason: b.reason,
            created_at: ts(b.created_at),
            expires_at: ts_opt(b.expires_at),
            lifted_at: ts_opt(b.lifted_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub kind: String,
    pub message: String,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub is_read: bool,
    pub created_at: String,
    pub read_at: Option<String>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            kind: n.kind.to_string(),
            is_read: n.is_read(),
            message: n.message,
            post_id: n.post_id,
            comment_id: n.comment_id,
            created_at: ts(n.created_at),
            read_at: ts_opt(n.read_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttachmentResponse {
    pub id: i64,
    pub uploader_id: i64,
    pub post_id: Option<i64>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub url: String,
    pub created_at: String,
}

impl From<Attachment> for AttachmentResponse {
    fn from(a: Attachment) -> Self {
        Self {
            id: a.id,
            url: a.url(),
            uploader_id: a.uploader_id,
            post_id: a.post_id,
            file_name: a.file_name,
            content_type: a.content_type,
            size_bytes: a.size_bytes,
            created_at: ts(a.created_at),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLogResponse {
    pub id: i64,
    pub actor_type: String,
    pub actor_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<AuditLog> for AuditLogResponse {
    fn from(l: AuditLog) -> Self {
        Self {
            id: l.id,
            actor_type: l.actor_type.to_string(),
            actor_id: l.actor_id,
            action: l.action,
            target_type: l.target_type,
            target_id: l.target_id,
            details: l.details,
            created_at: ts(l.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListParams;

    #[test]
    fn test_paginated_shape() {
        let page = PagedResult::new(vec![1, 2, 3], 23, &ListParams::new(2, 10));
        #[derive(Debug, Serialize, Deserialize)]
        struct N(i64);
        impl From<i32> for N {
            fn from(v: i32) -> Self {
                N(v as i64)
            }
        }

        let body = serde_json::to_value(Paginated::<N>::from_page(page)).unwrap();
        assert_eq!(body["total"], 23);
        assert_eq!(body["page"], 2);
        assert_eq!(body["page_size"], 10);
        assert_eq!(body["total_pages"], 3);
        assert_eq!(body["items"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_actor_response_is_tagged() {
        let guest = Guest::new(Some("visitor".into()), Some("127.0.0.1".into()));
        let body = serde_json::to_value(ActorResponse::from(Actor::Guest(guest))).unwrap();
        assert_eq!(body["actor_type"], "guest");
        assert_eq!(body["display_name"], "visitor");
        assert!(body.get("ip_address").is_none());
    }
}
