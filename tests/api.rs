//! Роутер целиком через `oneshot`. Пул подключается лениво, поэтому здесь
//! проверяются только пути, которые отвечают до обращения к БД.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;

use cinema_service::{config::{Config, JwtConfig}, database::Database, services::auth};

use common::{get, post_json, send, state_with, test_config};

fn test_app() -> (Router, Config) {
    let config = test_config();
    let db = Database::connect_lazy(&config.database).unwrap();
    (cinema_service::app(state_with(db, None)), config)
}

#[tokio::test]
async fn root_and_health_respond() {
    let (app, _) = test_app();
    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "cache": "disabled" }));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/api/tickets")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orders_require_credentials() {
    let (app, _) = test_app();
    let (status, body) = send(app, get("/api/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn orders_reject_unknown_scheme_and_bad_tokens() {
    let (app, _) = test_app();

    let request = Request::builder()
        .uri("/api/orders")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/orders/1")
        .header(header::AUTHORIZATION, "Bearer not.a.jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_foreign_secret_is_rejected() {
    let (app, config) = test_app();
    let foreign = JwtConfig {
        secret: "someone-else".into(),
        ..config.jwt
    };
    let token = auth::issue_token(&foreign, 1, "neo@zion.io").unwrap();

    let request = Request::builder()
        .uri("/api/user/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", token.access_token))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn movie_filter_rejects_non_integer_ids() {
    let (app, _) = test_app();
    let (status, body) = send(app, get("/api/movies?genres=1,drama")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("genres"));
}

#[tokio::test]
async fn session_filter_rejects_bad_date_and_movie() {
    let (app, _) = test_app();

    let (status, body) = send(app.clone(), get("/api/movie_sessions?date=2024-13-40")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("date"));

    let (status, body) = send(app, get("/api/movie_sessions?movie=matrix")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("movie"));
}

#[tokio::test]
async fn invalid_bodies_are_rejected() {
    let (app, _) = test_app();

    let (status, _) = send(
        app.clone(),
        post_json("/api/cinema_halls", json!({ "name": "Blue", "rows": 0, "seats_in_row": 10 }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(app.clone(), post_json("/api/genres", json!({ "name": "" }), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        app,
        post_json("/api/user/register", json!({ "email": "nope", "password": "x" }), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let (app, _) = test_app();

    // не хватает обязательного поля
    let (status, body) = send(app.clone(), post_json("/api/genres", json!({}), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("name"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/actors")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let request = Request::builder()
        .method("POST")
        .uri("/api/cinema_halls")
        .body(Body::from(r#"{"name": "Blue", "rows": 5, "seats_in_row": 5}"#))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn non_numeric_ids_get_json_errors() {
    let (app, _) = test_app();

    for uri in ["/api/movies/abc", "/api/genres/1.5", "/api/movie_sessions/x"] {
        let (status, body) = send(app.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
        assert!(body["message"].is_string(), "{uri}");
    }
}
