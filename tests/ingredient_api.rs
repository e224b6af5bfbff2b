mod common;

use axum::http::StatusCode;
use chrono::Utc;
use recipe_api::db::entities::ingredient;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::json;
use tower::ServiceExt;

use common::{body_json, get, json_request, mint_token, test_router};

fn sample_ingredient(id: i32, user_id: i32, name: &str) -> ingredient::Model {
    ingredient::Model {
        id,
        user_id,
        name: name.to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn listing_ingredients_requires_auth() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let response = test_router(db)
        .oneshot(get("/ingredients", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_ingredients_returns_the_callers_ingredients() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            sample_ingredient(2, 3, "vinegar"),
            sample_ingredient(1, 3, "salt"),
        ]])
        .into_connection();

    let token = mint_token(3, "user@example.com");
    let response = test_router(db)
        .oneshot(get("/ingredients", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["name"], "vinegar");
}

#[tokio::test]
async fn creating_an_ingredient_returns_201() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_ingredient(4, 3, "cocoa")]])
        .append_exec_results([MockExecResult {
            last_insert_id: 4,
            rows_affected: 1,
        }])
        .into_connection();

    let token = mint_token(3, "user@example.com");
    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/ingredients",
            Some(&token),
            &json!({"name": "cocoa"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "cocoa");
}

#[tokio::test]
async fn creating_an_ingredient_with_an_empty_name_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let token = mint_token(3, "user@example.com");
    let response = test_router(db)
        .oneshot(json_request(
            "POST",
            "/ingredients",
            Some(&token),
            &json!({"name": ""}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
