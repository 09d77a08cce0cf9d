//! `PostgreSQL` cart repository.
//!
//! A cart is one row per user with its line items in a JSONB column. Saves
//! replace the whole document, so concurrent writers to one cart are
//! last-write-wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use marketstall_core::{Cart, LineItem, UserId};

use super::{CartRepository, RepositoryError};

#[derive(sqlx::FromRow)]
struct CartRow {
    user_id: i32,
    items: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let items: Vec<LineItem> = serde_json::from_value(row.items).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "invalid cart items for user {}: {e}",
                row.user_id
            ))
        })?;

        Ok(Self {
            user: UserId::new(row.user_id),
            items,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

/// Cart repository over a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

impl PgCartRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    async fn find(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT user_id, items, created_at, updated_at
            FROM cart
            WHERE user_id = $1
            ",
        )
        .bind(user)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let items = serde_json::to_value(&cart.items).map_err(|e| {
            RepositoryError::DataCorruption(format!("cannot encode cart items: {e}"))
        })?;

        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO cart (user_id, items)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET items = EXCLUDED.items, updated_at = NOW()
            RETURNING user_id, items, created_at, updated_at
            ",
        )
        .bind(cart.user)
        .bind(&items)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }
}
