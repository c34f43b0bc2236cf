//! Экстракторы axum с ошибками в формате `ApiError`.
//!
//! Стандартные `Json`, `Path` и `Query` отвечают на плохой запрос простым
//! текстом (а на кривое тело ещё и 422). Обёртки ниже отдают те же ошибки как
//! `{"success": false, "message": "..."}` со статусом 400.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// JSON-тело запроса; в ответе ведёт себя как `axum::Json`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);
