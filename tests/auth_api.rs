mod common;

use axum::http::StatusCode;
use bcrypt::{DEFAULT_COST, hash};
use chrono::Utc;
use recipe_api::db::entities::user;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::json;
use tower::ServiceExt;

use common::{body_json, get, json_request, mint_token, test_router};

fn sample_user(email: &str, password: &str) -> user::Model {
    let now = Utc::now();
    user::Model {
        id: 1,
        email: email.to_string(),
        password_hash: hash(password, DEFAULT_COST).unwrap(),
        is_staff: false,
        is_superuser: false,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn health_check_is_public() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let response = common::test_router(db)
        .oneshot(get("/health", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn me_requires_a_token() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let response = test_router(db).oneshot(get("/auth/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_authenticated_user() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let token = mint_token(7, "user@example.com");
    let response = test_router(db)
        .oneshot(get("/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], 7);
    assert_eq!(body["email"], "user@example.com");
}

#[tokio::test]
async fn register_with_empty_email_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/auth/register",
            None,
            &json!({"email": "", "password": "Testpass123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_without_an_email_field_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/auth/register",
            None,
            &json!({"password": "Testpass123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_creates_an_account() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            Vec::<user::Model>::new(),
            vec![sample_user("new@example.com", "Testpass123")],
        ])
        .append_exec_results([MockExecResult {
            last_insert_id: 1,
            rows_affected: 1,
        }])
        .into_connection();

    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/auth/register",
            None,
            &json!({"email": "new@example.com", "password": "Testpass123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["email"], "new@example.com");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn login_returns_a_token_and_cookie() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_user("user@example.com", "Testpass123")]])
        .into_connection();

    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            &json!({"email": "user@example.com", "password": "Testpass123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(axum::http::header::SET_COOKIE)
        .cloned();
    assert!(cookie.is_some());
    let body = body_json(response).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user_id"], 1);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_user("user@example.com", "Testpass123")]])
        .into_connection();

    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            &json!({"email": "user@example.com", "password": "WrongPass123"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
