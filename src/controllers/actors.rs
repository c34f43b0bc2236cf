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
use crate::models::{Actor, ActorInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actors", get(list_actors).post(create_actor))
        .route("/actors/{id}", get(get_actor).put(update_actor).delete(delete_actor))
}

async fn list_actors(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Actor>>> {
    Ok(Json(Actor::list(&state.db.pool).await?))
}

async fn get_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Actor>> {
    Actor::find(&state.db.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Actor", id))
}

async fn create_actor(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ActorInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let actor = Actor::create(&state.db.pool, &input).await?;
    Ok((StatusCode::CREATED, Json(actor)))
}

async fn update_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<ActorInput>,
) -> ApiResult<Json<Actor>> {
    input.validate()?;
    Actor::update(&state.db.pool, id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Actor", id))
}

async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    match Actor::delete(&state.db.pool, id).await? {
        true => Ok(StatusCode::NO_CONTENT),
        false => Err(ApiError::not_found("Actor", id)),
    }
}
