//! Ошибки HTTP-слоя.
//!
//! Любой обработчик возвращает `Result<_, ApiError>`; клиент всегда получает
//! `{"success": false, "message": "..."}` и подходящий статус.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),

    #[error("database error")]
    Database(#[source] sqlx::Error),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(resource: &'static str, id: i64) -> Self {
        ApiError::NotFound { resource, id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Коды Postgres: 23505 unique, 23503 foreign key, 23514 check
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    let message = match db_err.constraint() {
                        Some("tickets_session_row_seat_key") => {
                            "One of the selected places is already taken".to_string()
                        }
                        Some(constraint) => format!("Object violates unique constraint {constraint}"),
                        None => "Object already exists".to_string(),
                    };
                    return ApiError::Conflict(message);
                }
                Some("23503") => {
                    return ApiError::bad_request("Referenced object does not exist");
                }
                Some("23514") => {
                    return ApiError::bad_request("Value is out of the allowed range");
                }
                _ => {}
            }
        }
        ApiError::Database(err)
    }
}

// Отказы стандартных экстракторов: всё это ошибки запроса клиента
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Database(e) => tracing::error!("database error: {:?}", e),
            ApiError::Internal(e) => tracing::error!("internal error: {:?}", e),
            _ => {}
        }

        let body = ErrorBody {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
