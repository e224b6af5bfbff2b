use axum::{
    Json, Router,
    extract::{Extension, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{entities::ingredient, services};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

// --- Request Structs ---

#[derive(Deserialize)]
pub struct CreateIngredientRequest {
    name: String,
}

#[derive(Deserialize, Default)]
pub struct IngredientListQuery {
    assigned_only: Option<u8>,
}

// --- Route Handlers ---

async fn list_ingredients_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IngredientListQuery>,
) -> Result<Json<Vec<ingredient::Model>>, AppError> {
    let assigned_only = query.assigned_only.unwrap_or(0) != 0;
    let ingredients =
        services::list_ingredients(&app_state.db_pool, authenticated_user.id, assigned_only)
            .await?;
    Ok(Json(ingredients))
}

async fn create_ingredient_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateIngredientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ingredient::Model>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("name must not be empty".to_string()));
    }
    let ingredient =
        services::create_ingredient(&app_state.db_pool, authenticated_user.id, name).await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

// --- Router ---

pub fn create_ingredients_router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/",
        get(list_ingredients_handler).post(create_ingredient_handler),
    )
}
