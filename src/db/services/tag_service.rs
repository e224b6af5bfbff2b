use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};

use crate::db::entities::{recipe, recipe_tag, tag};

// --- Tag Service Functions ---

/// Builds the owner-scoped listing query, ordered by name descending.
/// `assigned_only` narrows the result to tags referenced by at least one of
/// the owner's recipes, de-duplicated.
pub fn tag_list_query(user_id: i32, assigned_only: bool) -> Select<tag::Entity> {
    let mut query = tag::Entity::find().filter(tag::Column::UserId.eq(user_id));
    if assigned_only {
        query = query
            .join_rev(JoinType::InnerJoin, recipe_tag::Relation::Tag.def())
            .distinct();
    }
    query.order_by_desc(tag::Column::Name)
}

pub async fn list_tags(
    db: &DatabaseConnection,
    user_id: i32,
    assigned_only: bool,
) -> Result<Vec<tag::Model>, DbErr> {
    tag_list_query(user_id, assigned_only).all(db).await
}

/// Creates a new tag for a user.
pub async fn create_tag(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
) -> Result<tag::Model, DbErr> {
    let new_tag = tag::ActiveModel {
        user_id: Set(user_id),
        name: Set(name.to_owned()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    new_tag.insert(db).await
}

/// Fetches the caller's tags matching `ids`. Rows owned by other users are
/// absent from the result, so the caller can detect foreign ids by length.
pub async fn get_tags_by_ids(
    db: &DatabaseConnection,
    user_id: i32,
    ids: &[i32],
) -> Result<Vec<tag::Model>, DbErr> {
    tag::Entity::find()
        .filter(tag::Column::UserId.eq(user_id))
        .filter(tag::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await
}

/// Retrieves all tags linked to a recipe.
pub async fn get_tags_for_recipe(
    db: &DatabaseConnection,
    recipe: &recipe::Model,
) -> Result<Vec<tag::Model>, DbErr> {
    recipe
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
}

/// Retrieves the recipe-to-tag link rows for a set of recipes in one query.
pub async fn get_tag_links(
    db: &DatabaseConnection,
    recipe_ids: &[i32],
) -> Result<Vec<recipe_tag::Model>, DbErr> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.is_in(recipe_ids.to_vec()))
        .all(db)
        .await
}

/// Replaces the tag set of a recipe with exactly `tag_ids`.
pub async fn set_recipe_tags(
    db: &DatabaseConnection,
    recipe_id: i32,
    tag_ids: &[i32],
) -> Result<(), DbErr> {
    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(db)
        .await?;
    if tag_ids.is_empty() {
        return Ok(());
    }
    let links = tag_ids.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    });
    recipe_tag::Entity::insert_many(links).exec(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DbBackend, MockDatabase, MockExecResult, QueryTrait};

    #[test]
    fn list_query_is_scoped_to_owner_and_ordered_by_name_desc() {
        let sql = tag_list_query(7, false).build(DbBackend::Postgres).to_string();
        assert!(sql.contains(r#""tags"."user_id" = 7"#));
        assert!(sql.contains(r#"ORDER BY "tags"."name" DESC"#));
        assert!(!sql.contains("DISTINCT"));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn list_query_assigned_only_joins_links_and_dedupes() {
        let sql = tag_list_query(7, true).build(DbBackend::Postgres).to_string();
        assert!(sql.contains("DISTINCT"));
        assert!(sql.contains(r#"INNER JOIN "recipe_tags""#));
        assert!(sql.contains(r#""tags"."user_id" = 7"#));
    }

    #[tokio::test]
    async fn set_recipe_tags_clears_then_inserts() {
        // The insert runs with a RETURNING clause, so the mock needs a row
        // queued for it in addition to the exec results.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![recipe_tag::Model {
                recipe_id: 5,
                tag_id: 2,
            }]])
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
            ])
            .into_connection();

        set_recipe_tags(&db, 5, &[1, 2]).await.unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(r#"DELETE FROM "recipe_tags""#));
        assert!(log.contains(r#"INSERT INTO "recipe_tags""#));
    }

    #[tokio::test]
    async fn set_recipe_tags_with_empty_set_only_clears() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        set_recipe_tags(&db, 5, &[]).await.unwrap();

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains(r#"DELETE FROM "recipe_tags""#));
        assert!(!log.contains(r#"INSERT INTO "recipe_tags""#));
    }
}
