use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path, Query};
use crate::filters::{SessionFilter, SessionQuery};
use crate::models::{MovieSession, MovieSessionDetail, MovieSessionInput, MovieSessionListItem};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movie_sessions", get(list_sessions).post(create_session))
        .route(
            "/movie_sessions/{id}",
            get(get_session).put(update_session).delete(delete_session),
        )
}

fn json_response(json: String, cache_status: &'static str) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json"), (header::HeaderName::from_static("x-cache"), cache_status)],
        Body::from(json),
    )
        .into_response()
}

// GET /api/movie_sessions?date=2024-10-05&movie=3
async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionQuery>,
) -> ApiResult<Response> {
    let filter = SessionFilter::try_from(params)?;

    // 1. Пытаемся отдать из кеша
    let cache_key = match &state.cache {
        Some(cache) => match cache.session_listing_key(&filter.cache_fingerprint()).await {
            Ok(key) => {
                match cache.get_session_listing(&key).await {
                    Ok(Some(cached_json)) => return Ok(json_response(cached_json, "HIT")),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Failed to read session listing from cache: {:?}", e),
                }
                Some(key)
            }
            Err(e) => {
                tracing::warn!("Failed to read cache generation: {:?}", e);
                None
            }
        },
        None => None,
    };

    // 2. Cache Miss: идём в базу
    let sessions = MovieSessionListItem::list(&state.db.pool, &filter).await?;
    let json = serde_json::to_string(&sessions).map_err(anyhow::Error::from)?;

    // 3. Сохраняем в кеш
    if let (Some(cache), Some(key)) = (&state.cache, cache_key) {
        if let Err(e) = cache.store_session_listing(&key, &json).await {
            tracing::warn!("Failed to cache session listing: {:?}", e);
        }
        return Ok(json_response(json, "MISS"));
    }

    Ok(json_response(json, "BYPASS"))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MovieSessionDetail>> {
    MovieSessionDetail::find(&state.db.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("MovieSession", id))
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(input): Json<MovieSessionInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let session = MovieSession::create(&state.db.pool, &input).await?;
    state.invalidate_sessions().await;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<MovieSessionInput>,
) -> ApiResult<Json<MovieSession>> {
    input.validate()?;
    let session = MovieSession::update(&state.db.pool, id, &input)
        .await?
        .ok_or_else(|| ApiError::not_found("MovieSession", id))?;
    state.invalidate_sessions().await;
    Ok(Json(session))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !MovieSession::delete(&state.db.pool, id).await? {
        return Err(ApiError::not_found("MovieSession", id));
    }
    state.invalidate_sessions().await;
    Ok(StatusCode::NO_CONTENT)
}
