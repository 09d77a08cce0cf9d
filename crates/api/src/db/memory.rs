//! In-memory repositories for tests.
//!
//! They enforce the same constraints as the `PostgreSQL` schema: one slug per
//! kind (case-insensitive), one email per user, one cart per user.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use marketstall_core::{Cart, CatalogItemId, CatalogKind, Email, UserId};

use super::{CartRepository, CatalogRepository, RepositoryError, UserRepository};
use crate::models::{CatalogPage, CatalogQuery, CatalogRecord, NewCatalogRecord, NewUser, User};

const SLUG_CONFLICT: &str = "Slug already exists";

#[derive(Debug, Default)]
struct CatalogTable {
    last_id: i32,
    rows: Vec<CatalogRecord>,
}

impl CatalogTable {
    fn slug_holder(&self, kind: CatalogKind, slug: &str) -> Option<&CatalogRecord> {
        self.rows
            .iter()
            .find(|row| row.kind == kind && row.slug.matches(slug))
    }
}

/// Catalog records held in a vector, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryCatalogRepository {
    table: RwLock<CatalogTable>,
}

#[async_trait]
impl CatalogRepository for MemoryCatalogRepository {
    async fn insert(&self, record: NewCatalogRecord) -> Result<CatalogRecord, RepositoryError> {
        let mut table = self.table.write().await;
        if table.slug_holder(record.kind, record.slug.as_str()).is_some() {
            return Err(RepositoryError::Conflict(SLUG_CONFLICT.to_owned()));
        }

        table.last_id += 1;
        let now = Utc::now();
        let stored = CatalogRecord {
            id: CatalogItemId::new(table.last_id),
            kind: record.kind,
            slug: record.slug,
            title: record.title,
            fields: record.fields,
            image: record.image,
            created_at: now,
            updated_at: now,
        };
        table.rows.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogRecord>, RepositoryError> {
        Ok(self.table.read().await.slug_holder(kind, slug).cloned())
    }

    async fn find_by_id(
        &self,
        kind: CatalogKind,
        id: CatalogItemId,
    ) -> Result<Option<CatalogRecord>, RepositoryError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .find(|row| row.kind == kind && row.id == id)
            .cloned())
    }

    async fn slug_owner(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogItemId>, RepositoryError> {
        Ok(self
            .table
            .read()
            .await
            .slug_holder(kind, slug)
            .map(|row| row.id))
    }

    async fn title_taken(
        &self,
        kind: CatalogKind,
        title: &str,
        exclude: Option<CatalogItemId>,
    ) -> Result<bool, RepositoryError> {
        let wanted = title.to_lowercase();
        Ok(self.table.read().await.rows.iter().any(|row| {
            row.kind == kind && Some(row.id) != exclude && row.title.to_lowercase() == wanted
        }))
    }

    async fn list(
        &self,
        kind: CatalogKind,
        query: &CatalogQuery,
    ) -> Result<CatalogPage, RepositoryError> {
        let table = self.table.read().await;
        // Newest first; ids break ties between rows created in the same instant.
        let mut matching: Vec<&CatalogRecord> = table
            .rows
            .iter()
            .filter(|row| row.kind == kind && query.matches(&row.fields))
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(CatalogPage {
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
            total,
        })
    }

    async fn update(&self, record: &CatalogRecord) -> Result<CatalogRecord, RepositoryError> {
        let mut table = self.table.write().await;
        if table
            .slug_holder(record.kind, record.slug.as_str())
            .is_some_and(|holder| holder.id != record.id)
        {
            return Err(RepositoryError::Conflict(SLUG_CONFLICT.to_owned()));
        }

        let row = table
            .rows
            .iter_mut()
            .find(|row| row.kind == record.kind && row.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        row.slug = record.slug.clone();
        row.title.clone_from(&record.title);
        row.fields = record.fields.clone();
        row.image = record.image.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_slug(
        &self,
        kind: CatalogKind,
        slug: &str,
    ) -> Result<Option<CatalogRecord>, RepositoryError> {
        let mut table = self.table.write().await;
        let index = table
            .rows
            .iter()
            .position(|row| row.kind == kind && row.slug.matches(slug));
        Ok(index.map(|index| table.rows.remove(index)))
    }
}

/// Carts keyed by user.
#[derive(Debug, Default)]
pub struct MemoryCartRepository {
    carts: RwLock<HashMap<UserId, Cart>>,
}

#[async_trait]
impl CartRepository for MemoryCartRepository {
    async fn find(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(&user).cloned())
    }

    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let now = Utc::now();
        let mut carts = self.carts.write().await;
        let created_at = carts
            .get(&cart.user)
            .and_then(|existing| existing.created_at)
            .unwrap_or(now);

        let stored = Cart {
            user: cart.user,
            items: cart.items.clone(),
            created_at: Some(created_at),
            updated_at: Some(now),
        };
        carts.insert(cart.user, stored.clone());
        Ok(stored)
    }
}

#[derive(Debug, Default)]
struct UserTable {
    last_id: i32,
    rows: Vec<(User, String)>,
}

/// Users with their password hashes.
#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    table: RwLock<UserTable>,
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|(existing, _)| existing.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        table.last_id += 1;
        let created = User {
            id: UserId::new(table.last_id),
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        table.rows.push((created.clone(), user.password_hash));
        Ok(created)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .iter()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }
}
