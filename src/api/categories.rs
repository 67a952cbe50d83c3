//! Category endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::Category;

use super::AppState;

#[derive(Debug, Deserialize, Validate)]
pub(super) struct CategoryPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    pub image: Option<String>,
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Category>>> {
    let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(categories))
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    payload.validate()?;
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (id, name, image) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&payload.name)
    .bind(&payload.image)
    .fetch_one(&state.db)
    .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub(super) async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("category"))
}

pub(super) async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> ApiResult<Json<Category>> {
    payload.validate()?;
    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET name = $2, image = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.image)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| ApiError::from(e).duplicate_as_validation("category name already in use"))?
    .ok_or_else(|| ApiError::not_found("category"))?;
    Ok(Json(category))
}

/// Hard delete. Products referencing the category are left behind with an
/// absent category (no cascade check).
pub(super) async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    let category =
        sqlx::query_as::<_, Category>("DELETE FROM categories WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("category"))?;
    Ok(Json(category))
}
