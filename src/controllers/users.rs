use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::middleware::{password_matches, AuthUser};
use crate::models::user::{Credentials, RegisterInput};
use crate::models::User;
use crate::services::auth::{self, TokenResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/token", post(obtain_token))
        .route("/user/me", get(me))
}

// POST /api/user/register
async fn register(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RegisterInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;
    let hash = auth::hash_password(input.password.clone()).await?;
    let user = User::create(&state.db.pool, &input, &hash).await?;
    tracing::info!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

// POST /api/user/token
async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    credentials.validate()?;

    let user = User::find_active_by_email(&state.db.pool, &credentials.email)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !password_matches(credentials.password, user.password_hash.clone()).await {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(auth::issue_token(&state.config.jwt, user.id, &user.email)?))
}

// GET /api/user/me
async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<User>> {
    User::find(&state.db.pool, user.user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::Unauthorized)
}
