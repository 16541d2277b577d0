//! User repository
//!
//! Database operations for user accounts.

use crate::models::User;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

/// Rows written by [`UserRepository::create_account`]
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user: User,
    pub member_id: i64,
    /// Administrator grant, present only for the first user
    pub administrator_id: Option<i64>,
}

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Create a user with its member row in one transaction.
    ///
    /// When the new user is the only one, an administrator grant is written
    /// in the same transaction.
    async fn create_account(&self, user: &User) -> Result<NewAccount>;

    /// Get user by ID, including soft-deleted users
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check whether an email is taken
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Check whether a username is taken
    async fn exists_by_username(&self, username: &str) -> Result<bool>;

    /// Update the display name
    async fn update_display_name(&self, id: i64, display_name: &str) -> Result<()>;

    /// Count users, deleted or not
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: SqlitePool,
}

impl SqlxUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, display_name, created_at, updated_at, deleted_at";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (email, username, password_hash, display_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        let mut created = user.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn create_account(&self, user: &User) -> Result<NewAccount> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let user_id = sqlx::query(
            r#"
            INSERT INTO users (email, username, password_hash, display_name, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create user")?
        .last_insert_rowid();

        let member_id = sqlx::query("INSERT INTO members (user_id, status, created_at) VALUES (?, 'active', ?)")
            .bind(user_id)
            .bind(user.created_at)
            .execute(&mut *tx)
            .await
            .context("Failed to create member")?
            .last_insert_rowid();

        // The insert above holds the write lock, so this count cannot race
        let users: i64 = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count users")?
            .get("count");

        let administrator_id = if users == 1 {
            let id = sqlx::query("INSERT INTO administrators (user_id, created_at) VALUES (?, ?)")
                .bind(user_id)
                .bind(user.created_at)
                .execute(&mut *tx)
                .await
                .context("Failed to create administrator")?
                .last_insert_rowid();
            Some(id)
        } else {
            None
        };

        tx.commit().await.context("Failed to commit registration")?;

        let mut created = user.clone();
        created.id = user_id;
        Ok(NewAccount {
            user: created,
            member_id,
            administrator_id,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE email = ? COLLATE NOCASE",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE email = ? COLLATE NOCASE")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check email")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE username = ? COLLATE NOCASE")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check username")?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn update_display_name(&self, id: i64, display_name: &str) -> Result<()> {
        sqlx::query("UPDATE users SET display_name = ?, updated_at = ? WHERE id = ?")
            .bind(display_name)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update display name")?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(row.get("count"))
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::fixtures::migrated_pool;
    use crate::db::repositories::is_unique_violation;

    async fn setup_test_repo() -> SqlxUserRepository {
        SqlxUserRepository::new(migrated_pool().await)
    }

    fn test_user(name: &str) -> User {
        User::new(
            format!("{}@example.com", name),
            name.to_string(),
            "hash".to_string(),
            name.to_string(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup_test_repo().await;

        let created = repo.create(&test_user("alice")).await.expect("Failed to create user");
        assert!(created.id > 0);

        let found = repo.get_by_id(created.id).await.unwrap().expect("User not found");
        assert_eq!(found.username, "alice");
        assert_eq!(found.email, "alice@example.com");
        assert!(found.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_get_by_email_is_case_insensitive() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("bob")).await.unwrap();

        let found = repo.get_by_email("BOB@example.com").await.unwrap();
        assert!(found.is_some());
        assert!(repo.exists_by_email("Bob@Example.com").await.unwrap());
        assert!(repo.exists_by_username("BOB").await.unwrap());
        assert!(!repo.exists_by_username("carol").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup_test_repo().await;
        repo.create(&test_user("dave")).await.unwrap();

        let mut duplicate = test_user("dave2");
        duplicate.email = "dave@example.com".to_string();
        assert!(repo.create(&duplicate).await.is_err());
    }

    #[tokio::test]
    async fn test_create_account_grants_admin_to_first_user_only() {
        let repo = setup_test_repo().await;

        let first = repo.create_account(&test_user("root")).await.unwrap();
        assert!(first.member_id > 0);
        assert!(first.administrator_id.is_some());

        let second = repo.create_account(&test_user("frank")).await.unwrap();
        assert!(second.administrator_id.is_none());
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_account_duplicate_leaves_no_rows() {
        let repo = setup_test_repo().await;
        repo.create_account(&test_user("gina")).await.unwrap();

        let mut duplicate = test_user("gina2");
        duplicate.email = "GINA@example.com".to_string();
        let err = repo.create_account(&duplicate).await.unwrap_err();
        assert!(is_unique_violation(&err));
        assert_eq!(repo.count().await.unwrap(), 1);

        let members: i64 = sqlx::query("SELECT COUNT(*) as count FROM members")
            .fetch_one(&repo.pool)
            .await
            .unwrap()
            .get("count");
        assert_eq!(members, 1);
    }

    #[tokio::test]
    async fn test_update_display_name_and_count() {
        let repo = setup_test_repo().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        let user = repo.create(&test_user("erin")).await.unwrap();
        repo.update_display_name(user.id, "Erin E.").await.unwrap();

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.display_name, "Erin E.");
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
