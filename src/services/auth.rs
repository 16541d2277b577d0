//! Authentication and authorization
//!
//! Registration, login, guest sessions and logout, plus the authorization
//! providers that turn verified token claims into an active role record.
//!
//! Every provider answers with a generic `Forbidden` when the token's role
//! does not match or the role record is no longer active, so callers cannot
//! tell a suspended member from a missing one.

use crate::db::repositories::{
    is_unique_violation, AdministratorRepository, BanRepository, GuestRepository, MemberRepository,
    ModeratorRepository, SessionRepository, UserRepository,
};
use crate::models::{ActorType, Administrator, Guest, Member, Moderator, Session, User};
use crate::services::content_rules::{bounded_text, DISPLAY_NAME_MAX};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::password::{hash_password, verify_password};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::token::{Claims, TokenCodec};
use anyhow::Context;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,50}$").expect("valid username regex"));

const MIN_PASSWORD_LEN: usize = 8;
const ACCESS_DENIED: &str = "Access denied";

/// Input for registering a new member
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
}

impl RegisterInput {
    pub fn new(email: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            display_name: None,
        }
    }
}

/// Input for logging in as one of the user's roles
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub role: ActorType,
}

impl LoginInput {
    pub fn new(email: impl Into<String>, password: impl Into<String>, role: ActorType) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role,
        }
    }
}

/// A freshly issued access token
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub actor_type: ActorType,
    pub actor_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// The role record behind an authorized request
#[derive(Debug, Clone)]
pub enum Actor {
    Member(Member),
    Moderator(Moderator),
    Administrator(Administrator),
    Guest(Guest),
}

impl Actor {
    pub fn actor_type(&self) -> ActorType {
        match self {
            Actor::Member(_) => ActorType::Member,
            Actor::Moderator(_) => ActorType::Moderator,
            Actor::Administrator(_) => ActorType::Administrator,
            Actor::Guest(_) => ActorType::Guest,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Actor::Member(m) => m.id,
            Actor::Moderator(m) => m.id,
            Actor::Administrator(a) => a.id,
            Actor::Guest(g) => g.id,
        }
    }
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    members: Arc<dyn MemberRepository>,
    moderators: Arc<dyn ModeratorRepository>,
    administrators: Arc<dyn AdministratorRepository>,
    guests: Arc<dyn GuestRepository>,
    sessions: Arc<dyn SessionRepository>,
    bans: Arc<dyn BanRepository>,
    tokens: TokenCodec,
    rate_limiter: Arc<LoginRateLimiter>,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        members: Arc<dyn MemberRepository>,
        moderators: Arc<dyn ModeratorRepository>,
        administrators: Arc<dyn AdministratorRepository>,
        guests: Arc<dyn GuestRepository>,
        sessions: Arc<dyn SessionRepository>,
        bans: Arc<dyn BanRepository>,
        tokens: TokenCodec,
    ) -> Self {
        Self {
            users,
            members,
            moderators,
            administrators,
            guests,
            sessions,
            bans,
            tokens,
            rate_limiter: Arc::new(LoginRateLimiter::new()),
        }
    }

    pub fn rate_limiter(&self) -> Arc<LoginRateLimiter> {
        self.rate_limiter.clone()
    }

    /// Register a user and its membership.
    ///
    /// The first user ever registered also becomes an administrator.
    pub async fn register(&self, input: RegisterInput) -> ServiceResult<(Member, IssuedToken)> {
        let email = input.email.trim().to_string();
        let username = input.username.trim().to_string();
        validate_register_input(&email, &username, &input.password)?;
        let display_name = match input.display_name.as_deref() {
            Some(name) => bounded_text("Display name", name, DISPLAY_NAME_MAX)?,
            None => username.clone(),
        };

        if self.users.exists_by_email(&email).await? {
            return Err(ServiceError::conflict(format!("Email '{}' is already registered", email)));
        }
        if self.users.exists_by_username(&username).await? {
            return Err(ServiceError::conflict(format!("Username '{}' is already taken", username)));
        }

        let password_hash = hash_password(&input.password)?;
        let account = self
            .users
            .create_account(&User::new(email, username, password_hash, display_name))
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ServiceError::conflict("Email or username is already taken")
                } else {
                    ServiceError::Internal(e)
                }
            })?;
        let user = account.user;
        if let Some(administrator_id) = account.administrator_id {
            tracing::info!(user_id = user.id, administrator_id, "First user registered as administrator");
        }
        let member = self
            .members
            .get_by_id(account.member_id)
            .await?
            .context("Member not found after registration")?;

        tracing::info!(user_id = user.id, member_id = member.id, "Member registered");
        let token = self.issue(ActorType::Member, member.id).await?;
        Ok((member, token))
    }

    /// Verify credentials and issue a token for the requested role.
    pub async fn login(&self, input: LoginInput, ip: Option<IpAddr>) -> ServiceResult<IssuedToken> {
        if let Some(ip) = ip {
            if let Some(wait) = self.rate_limiter.ip_retry_after(ip).await {
                return Err(ServiceError::rate_limited("Too many login requests", wait));
            }
            self.rate_limiter.record_ip_request(ip).await;
        }

        let email = input.email.trim();
        if let Some(wait) = self.rate_limiter.email_retry_after(email).await {
            return Err(ServiceError::rate_limited(
                "Too many failed login attempts, try again later",
                wait,
            ));
        }

        let user = match self.users.get_by_email(email).await? {
            Some(user) if !user.is_deleted() => Some(user),
            _ => None,
        };
        let verified = match &user {
            Some(user) => verify_password(&input.password, &user.password_hash)?,
            None => false,
        };
        let user = match (user, verified) {
            (Some(user), true) => user,
            _ => {
                self.rate_limiter.record_failed_attempt(email).await;
                tracing::warn!(email = %email, "Failed login attempt");
                return Err(ServiceError::unauthorized("Invalid email or password"));
            }
        };
        self.rate_limiter.clear_email_attempts(email).await;

        let actor_id = match input.role {
            ActorType::Member => {
                let member = self
                    .members
                    .get_by_user_id(user.id)
                    .await?
                    .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))?;
                self.ensure_member_active(&member).await?;
                member.id
            }
            ActorType::Moderator => self
                .moderators
                .get_active_by_user_id(user.id)
                .await?
                .filter(Moderator::is_active)
                .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))?
                .id,
            ActorType::Administrator => self
                .administrators
                .get_active_by_user_id(user.id)
                .await?
                .filter(Administrator::is_active)
                .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))?
                .id,
            ActorType::Guest => {
                return Err(ServiceError::validation("Guests do not log in with credentials"))
            }
        };

        tracing::info!(user_id = user.id, role = %input.role, "User logged in");
        self.issue(input.role, actor_id).await
    }

    /// Create an anonymous guest and issue its token
    pub async fn create_guest(
        &self,
        display_name: Option<String>,
        ip: Option<IpAddr>,
    ) -> ServiceResult<(Guest, IssuedToken)> {
        let display_name = display_name
            .map(|name| bounded_text("Display name", &name, DISPLAY_NAME_MAX))
            .transpose()?;
        let guest = self
            .guests
            .create(&Guest::new(display_name, ip.map(|ip| ip.to_string())))
            .await?;
        let token = self.issue(ActorType::Guest, guest.id).await?;
        Ok((guest, token))
    }

    /// Revoke the session behind `claims`
    pub async fn logout(&self, claims: &Claims) -> ServiceResult<()> {
        self.sessions
            .revoke(&claims.sid)
            .await
            .context("Failed to revoke session")?;
        Ok(())
    }

    /// Verify a bearer token and its backing session
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Claims> {
        let claims = self
            .tokens
            .decode(token, Utc::now())
            .map_err(|e| ServiceError::unauthorized(e.to_string()))?;

        let session = self
            .sessions
            .get_by_id(&claims.sid)
            .await?
            .ok_or_else(|| ServiceError::unauthorized("Session not found"))?;

        if !session.is_valid() {
            return Err(ServiceError::unauthorized("Session expired or revoked"));
        }
        if session.actor_type != claims.actor_type || session.actor_id != claims.sub {
            return Err(ServiceError::unauthorized("Token does not match session"));
        }

        Ok(claims)
    }

    /// Member provider: active, undeleted member with no active ban
    pub async fn authorize_member(&self, claims: &Claims) -> ServiceResult<Member> {
        if claims.actor_type != ActorType::Member {
            return Err(ServiceError::forbidden(ACCESS_DENIED));
        }
        let member = self
            .members
            .get_by_id(claims.sub)
            .await?
            .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))?;
        self.ensure_member_active(&member).await?;
        Ok(member)
    }

    /// Moderator provider: un-revoked grant whose user is not deleted
    pub async fn authorize_moderator(&self, claims: &Claims) -> ServiceResult<Moderator> {
        if claims.actor_type != ActorType::Moderator {
            return Err(ServiceError::forbidden(ACCESS_DENIED));
        }
        self.moderators
            .get_by_id(claims.sub)
            .await?
            .filter(Moderator::is_active)
            .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))
    }

    /// Administrator provider: un-revoked grant whose user is not deleted
    pub async fn authorize_administrator(&self, claims: &Claims) -> ServiceResult<Administrator> {
        if claims.actor_type != ActorType::Administrator {
            return Err(ServiceError::forbidden(ACCESS_DENIED));
        }
        self.administrators
            .get_by_id(claims.sub)
            .await?
            .filter(Administrator::is_active)
            .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))
    }

    /// Alias of [`AuthService::authorize_administrator`]
    pub async fn authorize_admin(&self, claims: &Claims) -> ServiceResult<Administrator> {
        self.authorize_administrator(claims).await
    }

    /// Guest provider: guest row not deleted
    pub async fn authorize_guest(&self, claims: &Claims) -> ServiceResult<Guest> {
        if claims.actor_type != ActorType::Guest {
            return Err(ServiceError::forbidden(ACCESS_DENIED));
        }
        self.guests
            .get_by_id(claims.sub)
            .await?
            .filter(|g| g.deleted_at.is_none())
            .ok_or_else(|| ServiceError::forbidden(ACCESS_DENIED))
    }

    /// Any of the four providers, chosen by the token's role
    pub async fn authorize_viewer(&self, claims: &Claims) -> ServiceResult<Actor> {
        Ok(match claims.actor_type {
            ActorType::Member => Actor::Member(self.authorize_member(claims).await?),
            ActorType::Moderator => Actor::Moderator(self.authorize_moderator(claims).await?),
            ActorType::Administrator => Actor::Administrator(self.authorize_administrator(claims).await?),
            ActorType::Guest => Actor::Guest(self.authorize_guest(claims).await?),
        })
    }

    /// Revoke every live session of an actor
    pub async fn revoke_sessions(&self, actor_type: ActorType, actor_id: i64) -> ServiceResult<u64> {
        Ok(self.sessions.revoke_for_actor(actor_type, actor_id).await?)
    }

    /// Delete expired sessions
    pub async fn prune_sessions(&self) -> ServiceResult<u64> {
        Ok(self.sessions.delete_expired().await?)
    }

    async fn ensure_member_active(&self, member: &Member) -> ServiceResult<()> {
        if !member.is_active() {
            return Err(ServiceError::forbidden(ACCESS_DENIED));
        }
        if self.bans.find_active(member.id).await?.is_some() {
            return Err(ServiceError::forbidden(ACCESS_DENIED));
        }
        Ok(())
    }

    async fn issue(&self, actor_type: ActorType, actor_id: i64) -> ServiceResult<IssuedToken> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            actor_type,
            actor_id,
            created_at: now,
            expires_at: now + self.tokens.ttl(),
            revoked_at: None,
        };
        self.sessions.create(&session).await?;

        let claims = self.tokens.claims_for(actor_type, actor_id, &session.id, now);
        let token = self.tokens.encode(&claims)?;

        Ok(IssuedToken {
            token,
            actor_type,
            actor_id,
            expires_at: session.expires_at,
        })
    }
}

fn validate_register_input(email: &str, username: &str, password: &str) -> ServiceResult<()> {
    if email.is_empty() {
        return Err(ServiceError::validation("Email cannot be empty"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ServiceError::validation("Email is not a valid address"));
    }
    if username.is_empty() {
        return Err(ServiceError::validation("Username cannot be empty"));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ServiceError::validation(
            "Username may only contain letters, digits, '_' and '-' (at most 50)",
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
