use axum::{
    Json, Router,
    extract::{Extension, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{entities::tag, services};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

// --- Request Structs ---

#[derive(Deserialize)]
pub struct CreateTagRequest {
    name: String,
}

#[derive(Deserialize, Default)]
pub struct TagListQuery {
    assigned_only: Option<u8>,
}

// --- Route Handlers ---

async fn list_tags_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<TagListQuery>,
) -> Result<Json<Vec<tag::Model>>, AppError> {
    let assigned_only = query.assigned_only.unwrap_or(0) != 0;
    let tags =
        services::list_tags(&app_state.db_pool, authenticated_user.id, assigned_only).await?;
    Ok(Json(tags))
}

async fn create_tag_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<tag::Model>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("name must not be empty".to_string()));
    }
    let tag = services::create_tag(&app_state.db_pool, authenticated_user.id, name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

// --- Router ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_tags_handler).post(create_tag_handler))
}
