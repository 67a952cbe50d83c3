//! Storefront Service
//!
//! REST backend for a small e-commerce storefront and its admin
//! back-office, over a PostgreSQL store.
//!
//! ## Features
//! - Product and category catalog management
//! - Session-scoped shopping carts with populated reads
//! - Order placement as immutable priced snapshots
//! - Customer contact-message inbox with a status workflow

pub mod api;
pub mod domain;
pub mod error;
pub mod models;
