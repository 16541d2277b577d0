//! Services layer - Business logic
//!
//! Services validate input, enforce the board's rules and trigger the audit
//! and notification side effects. Repositories below them only move rows.

pub mod attachment;
pub mod audit;
pub mod auth;
pub mod ban;
pub mod comment;
pub mod content_rules;
pub mod error;
pub mod member;
pub mod notification;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod report;
pub mod staff;
pub mod token;

pub use attachment::{AttachmentService, UploadInput};
pub use audit::AuditService;
pub use auth::{Actor, AuthService, IssuedToken, LoginInput, RegisterInput};
pub use ban::BanService;
pub use comment::CommentService;
pub use content_rules::ContentRules;
pub use error::{ServiceError, ServiceResult};
pub use member::MemberService;
pub use notification::{NotificationPage, NotificationService};
pub use password::{hash_password, verify_password};
pub use post::PostService;
pub use rate_limiter::LoginRateLimiter;
pub use report::ReportService;
pub use staff::StaffService;
pub use token::{Claims, TokenCodec, TokenError};

use crate::config::Config;
use crate::db::repositories::{
    SqlxAdministratorRepository, SqlxAttachmentRepository, SqlxAuditLogRepository,
    SqlxBanRepository, SqlxCommentRepository, SqlxGuestRepository, SqlxMemberRepository,
    SqlxModeratorRepository, SqlxNotificationRepository, SqlxPostRepository,
    SqlxReportRepository, SqlxSessionRepository, SqlxUserRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Every service, wired to one database pool
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub members: Arc<MemberService>,
    pub staff: Arc<StaffService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub reports: Arc<ReportService>,
    pub bans: Arc<BanService>,
    pub notifications: Arc<NotificationService>,
    pub audit: Arc<AuditService>,
    pub attachments: Arc<AttachmentService>,
}

impl Services {
    pub fn new(pool: SqlitePool, config: &Config) -> anyhow::Result<Self> {
        let users = SqlxUserRepository::boxed(pool.clone());
        let members = SqlxMemberRepository::boxed(pool.clone());
        let moderators = SqlxModeratorRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool.clone());
        let bans = SqlxBanRepository::boxed(pool.clone());

        let tokens = TokenCodec::new(&config.auth.jwt_secret, config.auth.token_ttl_hours)?;
        let rules = ContentRules::new(&config.moderation)?;

        let audit = Arc::new(AuditService::new(SqlxAuditLogRepository::boxed(pool.clone())));
        let notifications = Arc::new(NotificationService::new(SqlxNotificationRepository::boxed(
            pool.clone(),
        )));

        let auth = Arc::new(AuthService::new(
            users.clone(),
            members.clone(),
            moderators.clone(),
            SqlxAdministratorRepository::boxed(pool.clone()),
            SqlxGuestRepository::boxed(pool.clone()),
            sessions.clone(),
            bans.clone(),
            tokens,
        ));

        Ok(Self {
            auth,
            members: Arc::new(MemberService::new(
                members.clone(),
                users.clone(),
                sessions.clone(),
                audit.clone(),
            )),
            staff: Arc::new(StaffService::new(
                moderators,
                users,
                sessions.clone(),
                audit.clone(),
            )),
            posts: Arc::new(PostService::new(
                posts.clone(),
                rules.clone(),
                audit.clone(),
                notifications.clone(),
            )),
            comments: Arc::new(CommentService::new(
                comments.clone(),
                posts.clone(),
                rules,
                audit.clone(),
                notifications.clone(),
            )),
            reports: Arc::new(ReportService::new(
                SqlxReportRepository::boxed(pool.clone()),
                posts.clone(),
                comments,
                audit.clone(),
                notifications.clone(),
            )),
            bans: Arc::new(BanService::new(
                bans,
                members,
                sessions,
                audit.clone(),
                notifications.clone(),
            )),
            attachments: Arc::new(AttachmentService::new(
                SqlxAttachmentRepository::boxed(pool),
                posts,
                config.upload.clone(),
            )),
            notifications,
            audit,
        })
    }
}

/// Services over a migrated in-memory database, plus seed helpers
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::repositories::fixtures::migrated_pool;
    use crate::db::repositories::{
        AdministratorRepository, BanRepository, CommentRepository, MemberRepository,
        ModeratorRepository, UserRepository,
    };
    use crate::models::{Administrator, Member, Moderator, User};
    use std::ops::Deref;
    use tempfile::TempDir;

    pub struct TestServices {
        pub services: Services,
        pub config: Config,
        pub pool: SqlitePool,
        pub user_repo: Arc<dyn UserRepository>,
        pub member_repo: Arc<dyn MemberRepository>,
        pub moderator_repo: Arc<dyn ModeratorRepository>,
        pub administrator_repo: Arc<dyn AdministratorRepository>,
        pub ban_repo: Arc<dyn BanRepository>,
        pub comment_repo: Arc<dyn CommentRepository>,
        _upload_dir: TempDir,
    }

    impl Deref for TestServices {
        type Target = Services;

        fn deref(&self) -> &Services {
            &self.services
        }
    }

    impl TestServices {
        pub async fn new() -> Self {
            let pool = migrated_pool().await;
            let upload_dir = TempDir::new().expect("Failed to create upload dir");

            let mut config = Config::default();
            config.upload.path = upload_dir.path().to_path_buf();
            config.upload.max_file_size = 1024;

            let services = Services::new(pool.clone(), &config).expect("Failed to build services");
            Self {
                services,
                config,
                pool: pool.clone(),
                user_repo: SqlxUserRepository::boxed(pool.clone()),
                member_repo: SqlxMemberRepository::boxed(pool.clone()),
                moderator_repo: SqlxModeratorRepository::boxed(pool.clone()),
                administrator_repo: SqlxAdministratorRepository::boxed(pool.clone()),
                ban_repo: SqlxBanRepository::boxed(pool.clone()),
                comment_repo: SqlxCommentRepository::boxed(pool),
                _upload_dir: upload_dir,
            }
        }

        async fn user(&self, name: &str) -> User {
            self.user_repo
                .create(&User::new(
                    format!("{}@example.com", name),
                    name.to_string(),
                    "hash".to_string(),
                    name.to_string(),
                ))
                .await
                .expect("Failed to seed user")
        }

        pub async fn member(&self, name: &str) -> Member {
            let user = self.user(name).await;
            self.member_repo.create(user.id).await.expect("Failed to seed member")
        }

        pub async fn moderator(&self, name: &str) -> Moderator {
            let user = self.user(name).await;
            self.moderator_repo
                .create(user.id, None)
                .await
                .expect("Failed to seed moderator")
        }

        pub async fn administrator(&self, name: &str) -> Administrator {
            let user = self.user(name).await;
            self.administrator_repo
                .create(user.id)
                .await
                .expect("Failed to seed administrator")
        }
    }
}
