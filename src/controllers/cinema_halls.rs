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
use crate::extract::{Json, Path};
use crate::models::{CinemaHall, CinemaHallInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinema_halls", get(list_halls).post(create_hall))
        .route("/cinema_halls/{id}", get(get_hall).put(update_hall).delete(delete_hall))
}

async fn list_halls(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<CinemaHall>>> {
    Ok(Json(CinemaHall::list(&state.db.pool).await?))
}

async fn get_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CinemaHall>> {
    CinemaHall::find(&state.db.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("CinemaHall", id))
}

async fn create_hall(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CinemaHallInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let hall = CinemaHall::create(&state.db.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(hall)))
}

// Размер зала входит в capacity, поэтому списки сеансов надо сбросить
async fn update_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<CinemaHallInput>,
) -> ApiResult<Json<CinemaHall>> {
    input.validate()?;
    let hall = CinemaHall::update(&state.db.pool, id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("CinemaHall", id))?;
    state.invalidate_sessions().await;
    Ok(Json(hall))
}

async fn delete_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !CinemaHall::delete(&state.db.pool, id).await? {
        return Err(ApiError::not_found("CinemaHall", id));
    }
    state.invalidate_sessions().await;
    Ok(StatusCode::NO_CONTENT)
}
