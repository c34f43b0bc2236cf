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
use crate::models::{Genre, GenreInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/{id}", get(get_genre).put(update_genre).delete(delete_genre))
}

// GET /api/genres
async fn list_genres(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Genre>>> {
    Ok(Json(Genre::list(&state.db.pool).await?))
}

// GET /api/genres/{id}
async fn get_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Genre>> {
    Genre::find(&state.db.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Genre", id))
}

// POST /api/genres
async fn create_genre(
    State(state): State<Arc<AppState>>,
    Json(input): Json<GenreInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let genre = Genre::create(&state.db.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

// PUT /api/genres/{id}
async fn update_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<GenreInput>,
) -> ApiResult<Json<Genre>> {
    input.validate()?;
    Genre::update(&state.db.pool, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Genre", id))
}

// DELETE /api/genres/{id}
async fn delete_genre(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if Genre::delete(&state.db.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Genre", id))
    }
}
