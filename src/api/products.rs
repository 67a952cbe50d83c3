//! Product catalog endpoints.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{ApiError, ApiResult};
use crate::models::{Category, Product};

use super::AppState;

/// A product with its category reference resolved.
#[derive(Debug, Clone, Serialize)]
pub(super) struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct ProductPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "sku is required"))]
    pub sku: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "discount must be between 0 and 100"))]
    pub discount: i32,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_archived: bool,
    pub category_id: Option<Uuid>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price cannot be negative"));
    }
    Ok(())
}

impl ProductPayload {
    /// Field validation plus the requiredness rules `validator` cannot
    /// express for `Option` fields.
    fn checked(&self) -> ApiResult<(Decimal, Uuid)> {
        self.validate()?;
        let price = self
            .price
            .ok_or_else(|| ApiError::validation("price is required"))?;
        let category_id = self
            .category_id
            .ok_or_else(|| ApiError::validation("category is required"))?;
        Ok((price, category_id))
    }
}

/// Pair each product with its category, if it still has one.
pub(super) fn populate(products: Vec<Product>, categories: Vec<Category>) -> Vec<ProductResponse> {
    let by_id: HashMap<Uuid, Category> = categories.into_iter().map(|c| (c.id, c)).collect();
    products
        .into_iter()
        .map(|product| {
            let category = product.category_id.and_then(|id| by_id.get(&id).cloned());
            ProductResponse { product, category }
        })
        .collect()
}

/// Fetch the given products with categories resolved. Ids that match no
/// product are simply absent from the result.
pub(super) async fn load_populated_by_ids(
    db: &PgPool,
    ids: &[Uuid],
) -> ApiResult<Vec<ProductResponse>> {
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(db)
        .await?;
    let category_ids: Vec<Uuid> = products.iter().filter_map(|p| p.category_id).collect();
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ANY($1)")
        .bind(&category_ids)
        .fetch_all(db)
        .await?;
    Ok(populate(products, categories))
}

async fn category_for(db: &PgPool, category_id: Option<Uuid>) -> ApiResult<Option<Category>> {
    let Some(id) = category_id else { return Ok(None) };
    Ok(
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?,
    )
}

/// All products, archived included, newest first. Storefront clients apply
/// their own archived filter; the admin console wants everything.
pub(super) async fn list_products(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProductResponse>>> {
    let products =
        sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
            .fetch_all(&state.db)
            .await?;
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(populate(products, categories)))
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductPayload>,
) -> ApiResult<(StatusCode, Json<ProductResponse>)> {
    let (price, category_id) = payload.checked()?;
    let product = sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, sku, name, price, discount, description, images, stock, is_featured, is_archived, category_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.sku)
    .bind(&payload.name)
    .bind(price)
    .bind(payload.discount)
    .bind(&payload.description)
    .bind(&payload.images)
    .bind(payload.stock)
    .bind(payload.is_featured)
    .bind(payload.is_archived)
    .bind(category_id)
    .fetch_one(&state.db)
    .await?;
    let category = category_for(&state.db, product.category_id).await?;
    Ok((StatusCode::CREATED, Json(ProductResponse { product, category })))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProductResponse>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    let category = category_for(&state.db, product.category_id).await?;
    Ok(Json(ProductResponse { product, category }))
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductPayload>,
) -> ApiResult<Json<ProductResponse>> {
    let (price, category_id) = payload.checked()?;
    let product = sqlx::query_as::<_, Product>(
        "UPDATE products SET sku = $2, name = $3, price = $4, discount = $5, description = $6, \
         images = $7, stock = $8, is_featured = $9, is_archived = $10, category_id = $11, \
         updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.sku)
    .bind(&payload.name)
    .bind(price)
    .bind(payload.discount)
    .bind(&payload.description)
    .bind(&payload.images)
    .bind(payload.stock)
    .bind(payload.is_featured)
    .bind(payload.is_archived)
    .bind(category_id)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from(e).duplicate_as_validation("sku already in use"))?
    .ok_or_else(|| ApiError::not_found("product"))?;
    let category = category_for(&state.db, product.category_id).await?;
    Ok(Json(ProductResponse { product, category }))
}

pub(super) async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    let product = sqlx::query_as::<_, Product>("DELETE FROM products WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("product"))?;
    Ok(Json(product))
}

/// Featured products, category populated. Archived products are not
/// filtered here; storefront clients drop them after fetching.
pub(super) async fn list_featured(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ProductResponse>>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_featured ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    let category_ids: Vec<Uuid> = products.iter().filter_map(|p| p.category_id).collect();
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = ANY($1)")
        .bind(&category_ids)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(populate(products, categories)))
}

/// Products of one category, archived included. An empty category is an
/// empty list, not an error.
pub(super) async fn list_by_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE category_id = $1 ORDER BY created_at DESC",
    )
    .bind(category_id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(products))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: Uuid, category_id: Option<Uuid>) -> Product {
        Product {
            id,
            sku: format!("SKU-{id}"),
            name: "Sink A".to_string(),
            price: Decimal::new(5000, 2),
            discount: 0,
            description: None,
            images: vec![],
            stock: 5,
            is_featured: false,
            is_archived: false,
            category_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn category(id: Uuid, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn populate_attaches_matching_category() {
        let cat_id = Uuid::new_v4();
        let populated = populate(
            vec![product(Uuid::new_v4(), Some(cat_id))],
            vec![category(cat_id, "Sinks")],
        );
        assert_eq!(populated.len(), 1);
        assert_eq!(populated[0].category.as_ref().unwrap().name, "Sinks");
    }

    #[test]
    fn populate_leaves_dangling_reference_absent() {
        let populated = populate(
            vec![product(Uuid::new_v4(), Some(Uuid::new_v4()))],
            vec![],
        );
        assert!(populated[0].category.is_none());
    }

    #[test]
    fn populate_preserves_product_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let populated = populate(
            vec![product(first, None), product(second, None)],
            vec![],
        );
        assert_eq!(populated[0].product.id, first);
        assert_eq!(populated[1].product.id, second);
    }

    #[test]
    fn payload_requires_price_and_category() {
        let payload = ProductPayload {
            sku: "P1".to_string(),
            name: "Sink A".to_string(),
            price: None,
            discount: 0,
            description: None,
            images: vec![],
            stock: 0,
            is_featured: false,
            is_archived: false,
            category_id: None,
        };
        assert!(payload.checked().is_err());
    }

    #[test]
    fn payload_rejects_out_of_range_discount() {
        let payload = ProductPayload {
            sku: "P1".to_string(),
            name: "Sink A".to_string(),
            price: Some(Decimal::new(5000, 2)),
            discount: 120,
            description: None,
            images: vec![],
            stock: 0,
            is_featured: false,
            is_archived: false,
            category_id: Some(Uuid::new_v4()),
        };
        assert!(payload.checked().is_err());
    }

    #[test]
    fn payload_rejects_negative_price() {
        let payload = ProductPayload {
            sku: "P1".to_string(),
            name: "Sink A".to_string(),
            price: Some(Decimal::new(-100, 2)),
            discount: 0,
            description: None,
            images: vec![],
            stock: 0,
            is_featured: false,
            is_archived: false,
            category_id: Some(Uuid::new_v4()),
        };
        assert!(payload.checked().is_err());
    }

    #[test]
    fn complete_payload_passes() {
        let payload = ProductPayload {
            sku: "P1".to_string(),
            name: "Sink A".to_string(),
            price: Some(Decimal::new(5000, 2)),
            discount: 20,
            description: Some("ceramic".to_string()),
            images: vec!["https://cdn.example.com/p1.jpg".to_string()],
            stock: 5,
            is_featured: true,
            is_archived: false,
            category_id: Some(Uuid::new_v4()),
        };
        assert!(payload.checked().is_ok());
    }
}
