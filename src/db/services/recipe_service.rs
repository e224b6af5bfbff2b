use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};

use crate::db::entities::{prelude::Recipe, recipe, recipe_ingredient, recipe_tag};

// --- Recipe Service Functions ---

/// Builds the owner-scoped listing query, ordered by id descending. The
/// optional id sets restrict results to recipes linked to at least one of
/// the listed tags/ingredients, de-duplicated.
pub fn recipe_list_query(
    user_id: i32,
    tag_ids: Option<&[i32]>,
    ingredient_ids: Option<&[i32]>,
) -> Select<recipe::Entity> {
    let mut query = Recipe::find().filter(recipe::Column::UserId.eq(user_id));
    if let Some(ids) = tag_ids {
        query = query
            .join_rev(JoinType::InnerJoin, recipe_tag::Relation::Recipe.def())
            .filter(recipe_tag::Column::TagId.is_in(ids.to_vec()))
            .distinct();
    }
    if let Some(ids) = ingredient_ids {
        query = query
            .join_rev(
                JoinType::InnerJoin,
                recipe_ingredient::Relation::Recipe.def(),
            )
            .filter(recipe_ingredient::Column::IngredientId.is_in(ids.to_vec()))
            .distinct();
    }
    query.order_by_desc(recipe::Column::Id)
}

pub async fn list_recipes(
    db: &DatabaseConnection,
    user_id: i32,
    tag_ids: Option<&[i32]>,
    ingredient_ids: Option<&[i32]>,
) -> Result<Vec<recipe::Model>, DbErr> {
    recipe_list_query(user_id, tag_ids, ingredient_ids)
        .all(db)
        .await
}

/// Retrieves a single recipe, scoped to its owner. Rows owned by other
/// users come back as `None`, indistinguishable from absent ids.
pub async fn get_recipe(
    db: &DatabaseConnection,
    user_id: i32,
    recipe_id: i32,
) -> Result<Option<recipe::Model>, DbErr> {
    Recipe::find_by_id(recipe_id)
        .filter(recipe::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// Creates a new recipe for a user. Tag/ingredient links are attached
/// separately via `set_recipe_tags` / `set_recipe_ingredients`.
pub async fn create_recipe(
    db: &DatabaseConnection,
    user_id: i32,
    title: &str,
    time_minutes: i32,
    price: Decimal,
) -> Result<recipe::Model, DbErr> {
    let now = Utc::now();
    let new_recipe = recipe::ActiveModel {
        user_id: Set(user_id),
        title: Set(title.to_owned()),
        time_minutes: Set(time_minutes),
        price: Set(price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_recipe.insert(db).await
}

/// Overwrites the scalar fields that are `Some`, leaving the rest untouched.
/// Full replacement (PUT) passes every field; partial update (PATCH) passes
/// only what the caller supplied.
pub async fn update_recipe(
    db: &DatabaseConnection,
    recipe: recipe::Model,
    title: Option<String>,
    time_minutes: Option<i32>,
    price: Option<Decimal>,
) -> Result<recipe::Model, DbErr> {
    let mut active = recipe.into_active_model();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if let Some(time_minutes) = time_minutes {
        active.time_minutes = Set(time_minutes);
    }
    if let Some(price) = price {
        active.price = Set(price);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await
}

/// Records the stored image path on a recipe.
pub async fn set_image_path(
    db: &DatabaseConnection,
    recipe: recipe::Model,
    image_path: &str,
) -> Result<recipe::Model, DbErr> {
    let mut active = recipe.into_active_model();
    active.image_path = Set(Some(image_path.to_owned()));
    active.updated_at = Set(Utc::now());
    active.update(db).await
}
