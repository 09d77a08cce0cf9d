//! Marketstall Core - Shared domain types.
//!
//! This crate provides the types used across all Marketstall components:
//! - `api` - REST backend (catalog, cart, auth)
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP. Anything that needs a store (slug probing, product lookup)
//! lives in the `api` crate and calls into the types defined here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, slugs, prices, quantities, emails, roles
//! - [`catalog`] - Catalog record shape and per-kind schema descriptors
//! - [`cart`] - Cart aggregate, line items, and totals
//! - [`validation`] - Field validation errors shared by every boundary parser

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartError, CartTotals, LineItem, LineUpdate, ProductSnapshot, checked_totals, compute_totals};
pub use catalog::{
    BannerFields, CatalogItem, CatalogKind, CatalogSchema, Feature, FormFields, ImageRef,
    MerchFields, MostSales, Product, ProductFields, Trending,
};
pub use types::*;
pub use validation::ValidationError;
