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
use crate::filters::{MovieFilter, MovieQuery};
use crate::models::{MovieDetail, MovieInput, MovieListItem, MovieRecord};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/{id}", get(get_movie).put(update_movie).delete(delete_movie))
}

// GET /api/movies?genres=1,2&actors=3&title=ring
async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MovieQuery>,
) -> ApiResult<Json<Vec<MovieListItem>>> {
    let filter = MovieFilter::try_from(params)?;

    let movies = MovieListItem::list(&state.db.pool, &filter).await?;
    tracing::debug!("list_movies {:?} -> {} rows", filter, movies.len());
    Ok(Json(movies))
}

async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MovieDetail>> {
    MovieDetail::find(&state.db.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Movie", id))
}

async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MovieInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let movie = MovieRecord::create(&state.db.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<MovieInput>,
) -> ApiResult<Json<MovieRecord>> {
    input.validate()?;
    let movie = MovieRecord::update(&state.db.pool, id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("Movie", id))?;
    // название фильма показывается в списке сеансов
    state.invalidate_sessions().await;
    Ok(Json(movie))
}

async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !MovieRecord::delete(&state.db.pool, id).await? {
        return Err(ApiError::not_found("Movie", id));
    }
    state.invalidate_sessions().await;
    Ok(StatusCode::NO_CONTENT)
}
