use axum::{
    Json, Router,
    extract::{Extension, Multipart, Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    entities::{ingredient, recipe, tag},
    services,
};
use crate::web::models::AuthenticatedUser;
use crate::web::{AppError, AppState};

// --- Request/Response Structs ---

#[derive(Deserialize)]
pub struct CreateRecipeRequest {
    title: String,
    time_minutes: i32,
    price: Decimal,
    #[serde(default)]
    tags: Vec<i32>,
    #[serde(default)]
    ingredients: Vec<i32>,
}

/// Full-replacement payload. Omitted relation fields clear the relation.
#[derive(Deserialize)]
pub struct ReplaceRecipeRequest {
    title: String,
    time_minutes: i32,
    price: Decimal,
    #[serde(default)]
    tags: Vec<i32>,
    #[serde(default)]
    ingredients: Vec<i32>,
}

/// Partial-update payload. Only fields that are present are touched.
#[derive(Deserialize, Default)]
pub struct PatchRecipeRequest {
    title: Option<String>,
    time_minutes: Option<i32>,
    price: Option<Decimal>,
    tags: Option<Vec<i32>>,
    ingredients: Option<Vec<i32>>,
}

#[derive(Deserialize, Default)]
pub struct RecipeListQuery {
    tags: Option<String>,
    ingredients: Option<String>,
}

#[derive(Serialize)]
pub struct RecipeListItem {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub tags: Vec<i32>,
    pub ingredients: Vec<i32>,
}

#[derive(Serialize)]
pub struct RecipeDetail {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub image_path: Option<String>,
    pub tags: Vec<tag::Model>,
    pub ingredients: Vec<ingredient::Model>,
}

#[derive(Serialize)]
pub struct RecipeImageResponse {
    pub id: i32,
    pub image_path: String,
}

// --- Helpers ---

/// Parses a comma-separated id list query parameter ("1,2,3").
fn parse_id_list(raw: &str) -> Result<Vec<i32>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| AppError::InvalidInput(format!("invalid id in filter: {part}")))
        })
        .collect()
}

/// Checks an uploaded payload decodes as an image, returning its format.
fn validate_image(data: &[u8]) -> Result<image::ImageFormat, AppError> {
    let format = image::guess_format(data)
        .map_err(|_| AppError::InvalidInput("upload is not a valid image".to_string()))?;
    image::load_from_memory(data)
        .map_err(|_| AppError::InvalidInput("upload is not a valid image".to_string()))?;
    Ok(format)
}

/// De-duplicates the requested tag ids and checks every one belongs to the
/// caller; foreign or absent ids are reported as not found.
async fn resolve_owned_tag_ids(
    db: &DatabaseConnection,
    user_id: i32,
    ids: &[i32],
) -> Result<Vec<i32>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let unique: Vec<i32> = ids.iter().copied().collect::<BTreeSet<i32>>().into_iter().collect();
    let found = services::get_tags_by_ids(db, user_id, &unique).await?;
    if found.len() != unique.len() {
        return Err(AppError::NotFound("tag not found".to_string()));
    }
    Ok(unique)
}

async fn resolve_owned_ingredient_ids(
    db: &DatabaseConnection,
    user_id: i32,
    ids: &[i32],
) -> Result<Vec<i32>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let unique: Vec<i32> = ids.iter().copied().collect::<BTreeSet<i32>>().into_iter().collect();
    let found = services::get_ingredients_by_ids(db, user_id, &unique).await?;
    if found.len() != unique.len() {
        return Err(AppError::NotFound("ingredient not found".to_string()));
    }
    Ok(unique)
}

/// Assembles the detail view, embedding the related tag/ingredient objects.
async fn assemble_detail(
    db: &DatabaseConnection,
    recipe: recipe::Model,
) -> Result<RecipeDetail, AppError> {
    let tags = services::get_tags_for_recipe(db, &recipe).await?;
    let ingredients = services::get_ingredients_for_recipe(db, &recipe).await?;
    Ok(RecipeDetail {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        image_path: recipe.image_path,
        tags,
        ingredients,
    })
}

// --- Route Handlers ---

async fn list_recipes_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeListItem>>, AppError> {
    let tag_filter = match query.tags.as_deref() {
        Some(raw) => {
            let ids = parse_id_list(raw)?;
            if ids.is_empty() { None } else { Some(ids) }
        }
        None => None,
    };
    let ingredient_filter = match query.ingredients.as_deref() {
        Some(raw) => {
            let ids = parse_id_list(raw)?;
            if ids.is_empty() { None } else { Some(ids) }
        }
        None => None,
    };

    let recipes = services::list_recipes(
        &app_state.db_pool,
        authenticated_user.id,
        tag_filter.as_deref(),
        ingredient_filter.as_deref(),
    )
    .await?;

    let recipe_ids: Vec<i32> = recipes.iter().map(|r| r.id).collect();
    let tag_links = services::get_tag_links(&app_state.db_pool, &recipe_ids).await?;
    let ingredient_links = services::get_ingredient_links(&app_state.db_pool, &recipe_ids).await?;

    let mut tags_by_recipe: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in tag_links {
        tags_by_recipe
            .entry(link.recipe_id)
            .or_default()
            .push(link.tag_id);
    }
    let mut ingredients_by_recipe: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in ingredient_links {
        ingredients_by_recipe
            .entry(link.recipe_id)
            .or_default()
            .push(link.ingredient_id);
    }

    let items = recipes
        .into_iter()
        .map(|recipe| RecipeListItem {
            tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
        })
        .collect();
    Ok(Json(items))
}

async fn get_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeDetail>, AppError> {
    let recipe = services::get_recipe(&app_state.db_pool, authenticated_user.id, recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound("recipe not found".to_string()))?;
    let detail = assemble_detail(&app_state.db_pool, recipe).await?;
    Ok(Json(detail))
}

async fn create_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeDetail>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    let user_id = authenticated_user.id;
    let tag_ids = resolve_owned_tag_ids(&app_state.db_pool, user_id, &payload.tags).await?;
    let ingredient_ids =
        resolve_owned_ingredient_ids(&app_state.db_pool, user_id, &payload.ingredients).await?;

    let recipe = services::create_recipe(
        &app_state.db_pool,
        user_id,
        title,
        payload.time_minutes,
        payload.price,
    )
    .await?;
    if !tag_ids.is_empty() {
        services::set_recipe_tags(&app_state.db_pool, recipe.id, &tag_ids).await?;
    }
    if !ingredient_ids.is_empty() {
        services::set_recipe_ingredients(&app_state.db_pool, recipe.id, &ingredient_ids).await?;
    }

    let detail = assemble_detail(&app_state.db_pool, recipe).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

async fn replace_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    payload: Result<Json<ReplaceRecipeRequest>, JsonRejection>,
) -> Result<Json<RecipeDetail>, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    let user_id = authenticated_user.id;
    let recipe = services::get_recipe(&app_state.db_pool, user_id, recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound("recipe not found".to_string()))?;

    let tag_ids = resolve_owned_tag_ids(&app_state.db_pool, user_id, &payload.tags).await?;
    let ingredient_ids =
        resolve_owned_ingredient_ids(&app_state.db_pool, user_id, &payload.ingredients).await?;

    let recipe = services::update_recipe(
        &app_state.db_pool,
        recipe,
        Some(title.to_owned()),
        Some(payload.time_minutes),
        Some(payload.price),
    )
    .await?;

    // Full replace: the provided sets become the relation state, an omitted
    // field was defaulted to empty and clears it.
    services::set_recipe_tags(&app_state.db_pool, recipe.id, &tag_ids).await?;
    services::set_recipe_ingredients(&app_state.db_pool, recipe.id, &ingredient_ids).await?;

    let detail = assemble_detail(&app_state.db_pool, recipe).await?;
    Ok(Json(detail))
}

async fn patch_recipe_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    payload: Result<Json<PatchRecipeRequest>, JsonRejection>,
) -> Result<Json<RecipeDetail>, AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::InvalidInput(rejection.body_text()))?;
    let title = match payload.title {
        Some(ref title) => {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::InvalidInput("title must not be empty".to_string()));
            }
            Some(title.to_owned())
        }
        None => None,
    };

    let user_id = authenticated_user.id;
    let recipe = services::get_recipe(&app_state.db_pool, user_id, recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound("recipe not found".to_string()))?;

    // Only a relation field that is explicitly present is replaced.
    if let Some(ref ids) = payload.tags {
        let tag_ids = resolve_owned_tag_ids(&app_state.db_pool, user_id, ids).await?;
        services::set_recipe_tags(&app_state.db_pool, recipe.id, &tag_ids).await?;
    }
    if let Some(ref ids) = payload.ingredients {
        let ingredient_ids =
            resolve_owned_ingredient_ids(&app_state.db_pool, user_id, ids).await?;
        services::set_recipe_ingredients(&app_state.db_pool, recipe.id, &ingredient_ids).await?;
    }

    let recipe = services::update_recipe(
        &app_state.db_pool,
        recipe,
        title,
        payload.time_minutes,
        payload.price,
    )
    .await?;

    let detail = assemble_detail(&app_state.db_pool, recipe).await?;
    Ok(Json(detail))
}

async fn upload_recipe_image_handler(
    Extension(authenticated_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<RecipeImageResponse>, AppError> {
    let recipe = services::get_recipe(&app_state.db_pool, authenticated_user.id, recipe_id)
        .await?
        .ok_or_else(|| AppError::NotFound("recipe not found".to_string()))?;

    let mut image_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() == Some("image") {
            image_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?,
            );
            break;
        }
    }
    let image_bytes = image_bytes
        .ok_or_else(|| AppError::InvalidInput("multipart field 'image' is required".to_string()))?;

    // Reject before anything is written or mutated.
    let format = validate_image(&image_bytes)?;
    let extension = format.extensions_str().first().copied().unwrap_or("img");

    let file_name = format!("{}.{extension}", Uuid::new_v4());
    let relative_path = format!("recipes/{file_name}");
    let target_dir = PathBuf::from(&app_state.config.media_dir).join("recipes");
    tokio::fs::create_dir_all(&target_dir)
        .await
        .map_err(|e| AppError::InternalServerError(format!("creating media directory: {e}")))?;
    tokio::fs::write(target_dir.join(&file_name), &image_bytes)
        .await
        .map_err(|e| AppError::InternalServerError(format!("writing image file: {e}")))?;

    let recipe = services::set_image_path(&app_state.db_pool, recipe, &relative_path).await?;
    Ok(Json(RecipeImageResponse {
        id: recipe.id,
        image_path: relative_path,
    }))
}

// --- Router ---

pub fn create_recipes_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_recipes_handler).post(create_recipe_handler))
        .route(
            "/{recipe_id}",
            get(get_recipe_handler)
                .put(replace_recipe_handler)
                .patch(patch_recipe_handler),
        )
        .route("/{recipe_id}/upload-image", post(upload_recipe_image_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_list_accepts_csv_with_spaces() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 4 , 5 ").unwrap(), vec![4, 5]);
        assert_eq!(parse_id_list("7").unwrap(), vec![7]);
    }

    #[test]
    fn parse_id_list_skips_empty_segments() {
        assert_eq!(parse_id_list("1,,2,").unwrap(), vec![1, 2]);
        assert!(parse_id_list("").unwrap().is_empty());
    }

    #[test]
    fn parse_id_list_rejects_non_numeric_segments() {
        assert!(parse_id_list("1,abc").is_err());
        assert!(parse_id_list("1.5").is_err());
    }

    #[test]
    fn validate_image_accepts_png_bytes() {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image::RgbImage::new(2, 2)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        let format = validate_image(buffer.get_ref()).unwrap();
        assert_eq!(format, image::ImageFormat::Png);
    }

    #[test]
    fn validate_image_rejects_non_image_payload() {
        assert!(validate_image(b"definitely not an image").is_err());
        assert!(validate_image(&[]).is_err());
    }
}
