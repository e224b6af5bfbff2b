#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use recipe_api::server::config::ServerConfig;
use recipe_api::web::create_axum_router;
use recipe_api::web::models::Claims;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "test-secret";

pub fn test_config(media_dir: &str) -> Arc<ServerConfig> {
    Arc::new(ServerConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        media_dir: media_dir.to_string(),
        log_dir: "logs".to_string(),
    })
}

pub fn test_router(db: DatabaseConnection) -> Router {
    create_axum_router(db, test_config("media"))
}

pub fn test_router_with_media(db: DatabaseConnection, media_dir: &str) -> Router {
    create_axum_router(db, test_config(media_dir))
}

pub fn mint_token(user_id: i32, email: &str) -> String {
    let claims = Claims {
        sub: email.to_string(),
        user_id,
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_ref()),
    )
    .unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
