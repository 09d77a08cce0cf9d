//! Domain models for the API.
//!
//! These sit between the repositories and the services: users, and catalog
//! records in their stored (untyped) form.

pub mod catalog;
pub mod user;

pub use catalog::{CatalogPage, CatalogQuery, CatalogRecord, NewCatalogRecord};
pub use user::{NewUser, User};
