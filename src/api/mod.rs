//! REST surface.
//!
//! Pure request/response mapping: each handler is one store read/write
//! plus response population. The only multi-step flow, checkout, is
//! composed client-side (read cart, create order, clear cart).

mod cart;
mod categories;
mod messages;
mod orders;
mod products;

use axum::{
    routing::{delete, get, patch, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/category",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/v1/category/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/api/v1/product",
            get(products::list_products).post(products::create_product),
        )
        .route("/api/v1/product/featured", get(products::list_featured))
        .route(
            "/api/v1/product/category/:category_id",
            get(products::list_by_category),
        )
        .route(
            "/api/v1/product/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/v1/cart/init", post(cart::init_cart))
        .route("/api/v1/cart/add", post(cart::add_item))
        .route("/api/v1/cart/clear", post(cart::clear_cart))
        .route("/api/v1/cart/remove", delete(cart::remove_item))
        .route("/api/v1/cart/:session_id", get(cart::get_cart))
        .route(
            "/api/v1/order",
            get(orders::list_orders).post(orders::create_order),
        )
        .route(
            "/api/v1/order/:id",
            get(orders::get_order)
                .put(orders::update_order)
                .delete(orders::delete_order),
        )
        .route(
            "/api/v1/message",
            get(messages::list_messages).post(messages::create_message),
        )
        .route("/api/v1/message/:id/status", patch(messages::update_status))
        .route("/api/v1/message/:id", delete(messages::delete_message))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "storefront-api" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_the_service_name() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "storefront-api");
    }
}
