use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};

use crate::db::entities::{ingredient, recipe, recipe_ingredient};

// --- Ingredient Service Functions ---

/// Builds the owner-scoped listing query, ordered by name descending.
/// `assigned_only` narrows the result to ingredients referenced by at least
/// one of the owner's recipes, de-duplicated.
pub fn ingredient_list_query(user_id: i32, assigned_only: bool) -> Select<ingredient::Entity> {
    let mut query = ingredient::Entity::find().filter(ingredient::Column::UserId.eq(user_id));
    if assigned_only {
        query = query
            .join_rev(
                JoinType::InnerJoin,
                recipe_ingredient::Relation::Ingredient.def(),
            )
            .distinct();
    }
    query.order_by_desc(ingredient::Column::Name)
}

pub async fn list_ingredients(
    db: &DatabaseConnection,
    user_id: i32,
    assigned_only: bool,
) -> Result<Vec<ingredient::Model>, DbErr> {
    ingredient_list_query(user_id, assigned_only).all(db).await
}

/// Creates a new ingredient for a user.
pub async fn create_ingredient(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
) -> Result<ingredient::Model, DbErr> {
    let new_ingredient = ingredient::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_owned()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    new_ingredient.insert(db).await
}

/// Fetches the caller's ingredients matching `ids`. Rows owned by other
/// users are absent from the result.
pub async fn get_ingredients_by_ids(
    db: &DatabaseConnection,
    user_id: i32,
    ids: &[i32],
) -> Result<Vec<ingredient::Model>, DbErr> {
    ingredient::Entity::find()
        .filter(ingredient::Column::UserId.eq(user_id))
        .filter(ingredient::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await
}

/// Retrieves all ingredients linked to a recipe.
pub async fn get_ingredients_for_recipe(
    db: &DatabaseConnection,
    recipe: &recipe::Model,
) -> Result<Vec<ingredient::Model>, DbErr> {
    recipe
        .find_related(ingredient::Entity)
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await
}

/// Retrieves the recipe-to-ingredient link rows for a set of recipes.
pub async fn get_ingredient_links(
    db: &DatabaseConnection,
    recipe_ids: &[i32],
) -> Result<Vec<recipe_ingredient::Model>, DbErr> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids.to_vec()))
        .all(db)
        .await
}

/// Replaces the ingredient set of a recipe with exactly `ingredient_ids`.
pub async fn set_recipe_ingredients(
    db: &DatabaseConnection,
    recipe_id: i32,
    ingredient_ids: &[i32],
) -> Result<(), DbErr> {
    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    if ingredient_ids.is_empty() {
        return Ok(());
    }
    let links = ingredient_ids
        .iter()
        .map(|ingredient_id| recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(*ingredient_id),
        });
    recipe_ingredient::Entity::insert_many(links).exec(db).await?;
    Ok(())
}
