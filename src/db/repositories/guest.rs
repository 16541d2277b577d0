//! Guest repository

use crate::models::Guest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;

#[async_trait]
pub trait GuestRepository: Send + Sync {
    async fn create(&self, guest: &Guest) -> Result<Guest>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Guest>>;
}

pub struct SqlxGuestRepository {
    pool: SqlitePool,
}

impl SqlxGuestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: SqlitePool) -> Arc<dyn GuestRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl GuestRepository for SqlxGuestRepository {
    async fn create(&self, guest: &Guest) -> Result<Guest> {
        let result = sqlx::query("INSERT INTO guests (display_name, ip_address, created_at) VALUES (?, ?, ?)")
            .bind(&guest.display_name)
            .bind(&guest.ip_address)
            .bind(guest.created_at)
            .execute(&self.pool)
            .await
            .context("Failed to create guest")?;

        let mut created = guest.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Guest>> {
        let row = sqlx::query(
            "SELECT id, display_name, ip_address, created_at, deleted_at FROM guests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get guest by ID")?;

        Ok(row.as_ref().map(row_to_guest))
    }
}

fn row_to_guest(row: &SqliteRow) -> Guest {
    Guest {
        id: row.get("id"),
        display_name: row.get("display_name"),
        ip_address: row.get("ip_address"),
        created_at: row.get("created_at"),
        deleted_at: row.get("deleted_at"),
    }
}
