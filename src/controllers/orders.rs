use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::models::{OrderInput, OrderResponse};
use crate::pagination::{Page, PageQuery, Pagination};
use crate::services::booking;
use crate::AppState;

// Все маршруты требуют аутентификации и видят только заказы вызывающего
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(get_order).put(update_order).delete(delete_order))
}

// GET /api/orders?page=1&page_size=10
async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<PageQuery>,
) -> ApiResult<Json<Page<OrderResponse>>> {
    let pagination = Pagination::from(params);
    let (count, orders) = OrderResponse::list_for_user(&state.db.pool, user.user_id, &pagination).await?;
    Ok(Json(Page::new(count, pagination, orders)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderResponse>> {
    OrderResponse::find_for_user(&state.db.pool, user.user_id, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order", id))
}

// POST /api/orders
async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(input): Json<OrderInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let order = booking::create_order(&state.db.pool, user.user_id, &input).await?;
    state.invalidate_sessions().await;
    Ok((StatusCode::CREATED, Json(order)))
}

// PUT /api/orders/{id} - заменяет билеты заказа
async fn update_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(input): Json<OrderInput>,
) -> ApiResult<Json<OrderResponse>> {
    input.validate()?;
    let order = booking::replace_tickets(&state.db.pool, user.user_id, id, &input).await?;
    state.invalidate_sessions().await;
    Ok(Json(order))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !OrderResponse::delete_for_user(&state.db.pool, user.user_id, id).await? {
        return Err(ApiError::not_found("Order", id));
    }
    tracing::info!("Order {} deleted by user {}", id, user.user_id);
    state.invalidate_sessions().await;
    Ok(StatusCode::NO_CONTENT)
}
