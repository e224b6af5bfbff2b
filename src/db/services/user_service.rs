use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::db::entities::{prelude::User, user};

// --- User Service Functions ---

/// Lowercases the whole address. Lookups and the unique constraint both rely
/// on this happening before any row is written.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a new user. The caller is responsible for hashing the password.
pub async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    password_hash: &str,
    is_staff: bool,
    is_superuser: bool,
) -> Result<user::Model, DbErr> {
    let now = Utc::now();
    let new_user = user::ActiveModel {
        email: Set(normalize_email(email)),
        password_hash: Set(password_hash.to_owned()),
        is_staff: Set(is_staff),
        is_superuser: Set(is_superuser),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_user.insert(db).await
}

/// Retrieves a user by their ID.
pub async fn get_user_by_id(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Option<user::Model>, DbErr> {
    User::find_by_id(user_id).one(db).await
}

/// Retrieves a user by their email address.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, DbErr> {
    User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await
}
