//! Persisted row types.
//!
//! One struct per table, mapped with `sqlx::FromRow`. Status and
//! delivery-method columns stay `String` here; the vocabularies in
//! `domain::status` are enforced at the API boundary and by CHECK
//! constraints in the schema.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    /// Business-facing unique code, distinct from the row id.
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    /// Whole percentage in `0..=100`.
    pub discount: i32,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub stock: i32,
    pub is_featured: bool,
    pub is_archived: bool,
    /// Null once the referenced category has been deleted.
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Cart {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
    pub session_id: String,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub country: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub delivery_method: String,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    /// Null once the referenced product has been hard-deleted.
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    /// Unit price captured at order time, never recalculated.
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub full_name: String,
    pub email_address: String,
    pub phone_number: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
