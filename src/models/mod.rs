//! Data models
//!
//! Database entities for the discussion board, the role discriminator carried
//! in access tokens, and the pagination types shared by list operations.

mod attachment;
mod audit_log;
mod ban;
mod comment;
mod guest;
mod member;
mod notification;
mod pagination;
mod post;
mod report;
mod session;
mod staff;
mod user;

pub use attachment::Attachment;
pub use audit_log::{AuditLog, NewAuditLog};
pub use ban::Ban;
pub use comment::{Comment, CommentEdit};
pub use guest::Guest;
pub use member::{Member, MemberStatus};
pub use notification::{Notification, NotificationKind};
pub use pagination::{ListParams, PagedResult};
pub use post::Post;
pub use report::{Report, ReportStatus, ReportTarget};
pub use session::{ActorType, Session};
pub use staff::{Administrator, Moderator};
pub use user::User;
