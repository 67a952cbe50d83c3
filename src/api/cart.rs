//! Session-scoped cart endpoints.
//!
//! A cart is one `carts` row keyed by a client-generated session id plus
//! one `cart_items` row per product. "Add the same product twice" is an
//! atomic upsert-increment on the `(session_id, product_id)` key, so two
//! concurrent adds for the same session cannot lose an update.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing;
use crate::error::{ApiError, ApiResult};
use crate::models::{Cart, CartItem};

use super::products::{self, ProductResponse};
use super::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct SessionRequest {
    #[serde(default)]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AddItemRequest {
    #[serde(default)]
    pub session_id: String,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct RemoveItemParams {
    pub session_id: String,
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub(super) struct CartResponse {
    pub session_id: String,
    pub items: Vec<CartLine>,
    /// Computed on read; never stored.
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct CartLine {
    pub product: Option<ProductResponse>,
    pub quantity: i32,
}

/// Join items to their populated products and price the cart. Lines whose
/// product no longer resolves keep their quantity but contribute nothing
/// to the total.
pub(super) fn assemble_cart(
    cart: Cart,
    items: Vec<CartItem>,
    populated: Vec<ProductResponse>,
) -> CartResponse {
    let mut by_id: HashMap<Uuid, ProductResponse> = populated
        .into_iter()
        .map(|p| (p.product.id, p))
        .collect();
    let lines: Vec<CartLine> = items
        .into_iter()
        .map(|item| CartLine {
            product: by_id.remove(&item.product_id),
            quantity: item.quantity,
        })
        .collect();
    let total_price = pricing::order_total(lines.iter().filter_map(|line| {
        line.product.as_ref().map(|p| {
            (
                pricing::effective_unit_price(p.product.price, p.product.discount),
                line.quantity,
            )
        })
    }));
    CartResponse {
        session_id: cart.session_id,
        items: lines,
        total_price,
        created_at: cart.created_at,
    }
}

async fn load_cart(state: &AppState, session_id: &str) -> ApiResult<Option<CartResponse>> {
    let Some(cart) = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE session_id = $1")
        .bind(session_id)
        .fetch_optional(&state.db)
        .await?
    else {
        return Ok(None);
    };
    let items = sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE session_id = $1 ORDER BY created_at",
    )
    .bind(session_id)
    .fetch_all(&state.db)
    .await?;
    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let populated = products::load_populated_by_ids(&state.db, &ids).await?;
    Ok(Some(assemble_cart(cart, items, populated)))
}

async fn require_cart(state: &AppState, session_id: &str) -> ApiResult<()> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM carts WHERE session_id = $1)")
            .bind(session_id)
            .fetch_one(&state.db)
            .await?;
    if !exists {
        return Err(ApiError::not_found("cart"));
    }
    Ok(())
}

/// Lazy create. Re-initializing an existing session returns that session's
/// cart untouched.
pub(super) async fn init_cart(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<Json<CartResponse>> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::validation("session_id is required"));
    }
    sqlx::query("INSERT INTO carts (session_id) VALUES ($1) ON CONFLICT (session_id) DO NOTHING")
        .bind(&req.session_id)
        .execute(&state.db)
        .await?;
    let cart = load_cart(&state, &req.session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;
    Ok(Json(cart))
}

pub(super) async fn add_item(
    State(state): State<AppState>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<Json<CartResponse>> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::validation("session_id is required"));
    }
    if req.quantity < 1 {
        return Err(ApiError::validation("quantity must be at least 1"));
    }
    require_cart(&state, &req.session_id).await?;
    sqlx::query(
        "INSERT INTO cart_items (session_id, product_id, quantity) VALUES ($1, $2, $3) \
         ON CONFLICT (session_id, product_id) \
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(&req.session_id)
    .bind(req.product_id)
    .bind(req.quantity)
    .execute(&state.db)
    .await?;
    let cart = load_cart(&state, &req.session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;
    Ok(Json(cart))
}

/// Populated cart, or the empty JSON object when the session has no cart;
/// callers treat the two as equivalent.
pub(super) async fn get_cart(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Response> {
    Ok(match load_cart(&state, &session_id).await? {
        Some(cart) => Json(cart).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    })
}

/// Empties the cart's items; the cart row itself survives.
pub(super) async fn clear_cart(
    State(state): State<AppState>,
    Json(req): Json<SessionRequest>,
) -> ApiResult<Json<CartResponse>> {
    require_cart(&state, &req.session_id).await?;
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1")
        .bind(&req.session_id)
        .execute(&state.db)
        .await?;
    let cart = load_cart(&state, &req.session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;
    Ok(Json(cart))
}

/// Removing a product that isn't in the cart is a no-op success.
pub(super) async fn remove_item(
    State(state): State<AppState>,
    Query(params): Query<RemoveItemParams>,
) -> ApiResult<Json<CartResponse>> {
    require_cart(&state, &params.session_id).await?;
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND product_id = $2")
        .bind(&params.session_id)
        .bind(params.product_id)
        .execute(&state.db)
        .await?;
    let cart = load_cart(&state, &params.session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("cart"))?;
    Ok(Json(cart))
}
