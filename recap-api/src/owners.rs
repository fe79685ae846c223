//! Owner lookup
//!
//! Plan synchronization (billing webhooks) happens outside this service;
//! it lands in the owners.plan column. Unknown authenticated owners are
//! created on first use with the free default.

use recap_common::db::models::Owner;
use recap_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::info;

/// Fetch an owner row
pub async fn get_owner(db: &Pool<Sqlite>, owner_id: &str) -> Result<Owner> {
    sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE guid = ?")
        .bind(owner_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Owner {}", owner_id)))
}

/// Fetch an owner, creating a free-tier row on first sight
pub async fn get_or_create_owner(db: &Pool<Sqlite>, owner_id: &str) -> Result<Owner> {
    if let Some(owner) = sqlx::query_as::<_, Owner>("SELECT * FROM owners WHERE guid = ?")
        .bind(owner_id)
        .fetch_optional(db)
        .await?
    {
        return Ok(owner);
    }

    // Concurrent first requests may both insert; OR IGNORE keeps one row
    sqlx::query("INSERT OR IGNORE INTO owners (guid, plan) VALUES (?, 'free')")
        .bind(owner_id)
        .execute(db)
        .await?;

    info!(owner_id, "Created owner with free plan");

    get_owner(db, owner_id).await
}
