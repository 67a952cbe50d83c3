//! Order endpoints.
//!
//! Orders are immutable snapshots: line prices arrive pre-resolved from
//! the client's cart and are stored as-is, so later catalog changes never
//! rewrite order history. Stock is neither validated nor decremented.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::events::{self, DomainEvent};
use crate::domain::order_number;
use crate::domain::pricing;
use crate::domain::status::{DeliveryMethod, OrderStatus};
use crate::error::{ApiError, ApiResult};
use crate::models::{Order, OrderItem};

use super::products::{self, ProductResponse};
use super::AppState;

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CreateOrderRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "last_name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "phone is required"))]
    pub phone: String,
    #[serde(default)]
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "country is required"))]
    pub country: String,
    pub address: Option<String>,
    pub city: Option<String>,
    #[serde(default)]
    pub delivery_method: String,
    #[serde(default)]
    pub items: Vec<OrderItemPayload>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderItemPayload {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price the client resolved from its populated cart,
    /// post-discount.
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateOrderRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderLine {
    pub product: Option<ProductResponse>,
    pub quantity: i32,
    pub price: Decimal,
}

/// Shape validation beyond the field derives: delivery method vocabulary,
/// the pickup/delivery address rule, and line quantities.
pub(super) fn validate_order(req: &CreateOrderRequest) -> ApiResult<DeliveryMethod> {
    req.validate()?;
    let method = DeliveryMethod::parse(&req.delivery_method)
        .ok_or_else(|| ApiError::validation("delivery_method must be 'pickup' or 'delivery'"))?;
    if method == DeliveryMethod::Delivery {
        if req.address.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ApiError::validation("address is required for delivery"));
        }
        if req.city.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ApiError::validation("city is required for delivery"));
        }
    }
    if req.items.iter().any(|item| item.quantity < 1) {
        return Err(ApiError::validation("item quantity must be at least 1"));
    }
    Ok(method)
}

/// Group items under their orders and resolve each line's product.
pub(super) fn assemble_orders(
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    populated: Vec<ProductResponse>,
) -> Vec<OrderResponse> {
    let by_id: HashMap<Uuid, ProductResponse> = populated
        .into_iter()
        .map(|p| (p.product.id, p))
        .collect();
    let mut grouped: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id).or_default().push(OrderLine {
            product: item.product_id.and_then(|id| by_id.get(&id).cloned()),
            quantity: item.quantity,
            price: item.price,
        });
    }
    orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.id).unwrap_or_default();
            OrderResponse { order, items }
        })
        .collect()
}

async fn load_order(state: &AppState, id: Uuid) -> ApiResult<Option<OrderResponse>> {
    let Some(order) = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
    else {
        return Ok(None);
    };
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(id)
        .fetch_all(&state.db)
        .await?;
    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let populated = products::load_populated_by_ids(&state.db, &product_ids).await?;
    Ok(assemble_orders(vec![order], items, populated).into_iter().next())
}

pub(super) async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderResponse>)> {
    let method = validate_order(&req)?;
    let number = order_number::generate();
    let total_amount = pricing::order_total(req.items.iter().map(|i| (i.price, i.quantity)));

    // One logical document: the order row and its lines commit together.
    // An order_number collision aborts the whole insert; no retry.
    let mut tx = state.db.begin().await?;
    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_number, first_name, last_name, phone, email, country, \
         address, city, delivery_method, total_amount) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&number)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.country)
    .bind(&req.address)
    .bind(&req.city)
    .bind(method.as_str())
    .bind(total_amount)
    .fetch_one(&mut *tx)
    .await?;
    for item in &req.items {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(order_number = %order.order_number, "order placed");
    events::publish(
        state.nats.as_ref(),
        &DomainEvent::OrderCreated {
            order_id: order.id,
            order_number: order.order_number.clone(),
            total_amount: order.total_amount,
        },
    )
    .await;

    let response = load_order(&state, order.id)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub(super) async fn list_orders(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<OrderResponse>>> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders ORDER BY created_at DESC")
        .fetch_all(&state.db)
        .await?;
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1)")
            .bind(&order_ids)
            .fetch_all(&state.db)
            .await?;
    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let populated = products::load_populated_by_ids(&state.db, &product_ids).await?;
    Ok(Json(assemble_orders(orders, items, populated)))
}

pub(super) async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderResponse>> {
    load_order(&state, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("order"))
}

/// Partial update; in practice only `status` moves. Any status is
/// reachable from any other.
pub(super) async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> ApiResult<Json<OrderResponse>> {
    let status = match req.status.as_deref() {
        Some(value) => Some(
            OrderStatus::parse(value).ok_or_else(|| {
                ApiError::validation(
                    "status must be one of 'pending', 'processing', 'completed' or 'cancelled'",
                )
            })?,
        ),
        None => None,
    };
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = COALESCE($2, status), updated_at = now() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.map(OrderStatus::as_str))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("order"))?;

    if status.is_some() {
        events::publish(
            state.nats.as_ref(),
            &DomainEvent::OrderStatusChanged {
                order_id: order.id,
                status: order.status.clone(),
            },
        )
        .await;
    }

    load_order(&state, order.id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("order"))
}

/// Admin correction only; orders are never deleted in the normal flow.
pub(super) async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    let order = sqlx::query_as::<_, Order>("DELETE FROM orders WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("order"))?;
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Product;

    fn request(delivery_method: &str) -> CreateOrderRequest {
        CreateOrderRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "+2348000000000".to_string(),
            email: "ada@example.com".to_string(),
            country: "NG".to_string(),
            address: None,
            city: None,
            delivery_method: delivery_method.to_string(),
            items: vec![OrderItemPayload {
                product_id: Uuid::new_v4(),
                quantity: 3,
                price: Decimal::new(8000, 2),
            }],
        }
    }

    fn order(id: Uuid) -> Order {
        Order {
            id,
            order_number: "SI-000001-1234".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "+2348000000000".to_string(),
            email: "ada@example.com".to_string(),
            country: "NG".to_string(),
            address: None,
            city: None,
            delivery_method: "pickup".to_string(),
            total_amount: Decimal::new(24000, 2),
            status: "pending".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn populated(id: Uuid) -> ProductResponse {
        ProductResponse {
            product: Product {
                id,
                sku: "P1".to_string(),
                name: "Sink A".to_string(),
                price: Decimal::new(100, 0),
                discount: 20,
                description: None,
                images: vec![],
                stock: 5,
                is_featured: false,
                is_archived: false,
                category_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            category: None,
        }
    }

    #[test]
    fn pickup_needs_no_address() {
        assert!(validate_order(&request("pickup")).is_ok());
    }

    #[test]
    fn delivery_requires_address_and_city() {
        let mut req = request("delivery");
        assert!(validate_order(&req).is_err());
        req.address = Some("12 Broad St".to_string());
        assert!(validate_order(&req).is_err());
        req.city = Some("Lagos".to_string());
        assert!(validate_order(&req).is_ok());
    }

    #[test]
    fn unknown_delivery_method_fails() {
        assert!(validate_order(&request("courier")).is_err());
    }

    #[test]
    fn empty_email_fails() {
        let mut req = request("pickup");
        req.email = String::new();
        assert!(validate_order(&req).is_err());
    }

    #[test]
    fn zero_quantity_line_fails() {
        let mut req = request("pickup");
        req.items[0].quantity = 0;
        assert!(validate_order(&req).is_err());
    }

    #[test]
    fn total_of_three_discounted_units_is_two_forty() {
        let req = request("pickup");
        let total = pricing::order_total(req.items.iter().map(|i| (i.price, i.quantity)));
        assert_eq!(total, Decimal::new(24000, 2));
    }

    #[test]
    fn assembly_groups_items_under_their_orders() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let items = vec![
            OrderItem {
                id: Uuid::new_v4(),
                order_id: first,
                product_id: Some(product_id),
                quantity: 3,
                price: Decimal::new(8000, 2),
            },
            OrderItem {
                id: Uuid::new_v4(),
                order_id: first,
                product_id: None,
                quantity: 1,
                price: Decimal::new(1250, 2),
            },
            OrderItem {
                id: Uuid::new_v4(),
                order_id: second,
                product_id: Some(product_id),
                quantity: 2,
                price: Decimal::new(8000, 2),
            },
        ];
        let responses = assemble_orders(
            vec![order(first), order(second)],
            items,
            vec![populated(product_id)],
        );
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].items.len(), 2);
        assert_eq!(responses[1].items.len(), 1);
        // captured price survives population; it is not recomputed
        assert_eq!(responses[0].items[0].price, Decimal::new(8000, 2));
        assert_eq!(
            responses[0].items[0].product.as_ref().unwrap().product.name,
            "Sink A"
        );
        // the deleted-product line still lists, just without a product
        assert!(responses[0].items[1].product.is_none());
    }

    #[test]
    fn order_with_no_items_assembles_empty() {
        let responses = assemble_orders(vec![order(Uuid::new_v4())], vec![], vec![]);
        assert_eq!(responses.len(), 1);
        assert!(responses[0].items.is_empty());
    }
}
