//! Database layer
//!
//! SQLite through sqlx. The schema is created by code-based migrations in
//! [`migrations`], and every table is reached through a repository trait in
//! [`repositories`] so services never build SQL themselves.
//!
//! # Usage
//!
//! ```ignore
//! use agora::config::DatabaseConfig;
//! use agora::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};
