//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the queries for one table behind an async trait,
//! so services can be tested against the same in-memory SQLite schema the
//! server runs on.

pub mod administrator;
pub mod attachment;
pub mod audit_log;
pub mod ban;
pub mod comment;
pub mod guest;
pub mod member;
pub mod moderator;
pub mod notification;
pub mod post;
pub mod report;
pub mod session;
pub mod user;

pub use administrator::{AdministratorRepository, SqlxAdministratorRepository};
pub use attachment::{AttachmentRepository, SqlxAttachmentRepository};
pub use audit_log::{AuditLogRepository, SqlxAuditLogRepository};
pub use ban::{BanRepository, SqlxBanRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use guest::{GuestRepository, SqlxGuestRepository};
pub use member::{MemberRepository, SqlxMemberRepository};
pub use moderator::{ModeratorRepository, SqlxModeratorRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use report::{ReportRepository, SqlxReportRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{NewAccount, SqlxUserRepository, UserRepository};

/// Whether a repository error was caused by a `UNIQUE` constraint
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
