use axum::Extension;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{DatabaseConnection, DbErr};

use crate::db::entities::user;
use crate::db::services;
use crate::web::error::AppError;
use crate::web::models::{
    AuthenticatedUser, Claims, LoginRequest, LoginResponse, RegisterRequest, UserResponse,
};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
) -> Result<UserResponse, AppError> {
    let user = create_account(db, &req.email, &req.password, false, false).await?;
    Ok(UserResponse {
        id: user.id,
        email: user.email,
    })
}

/// Creates an account with both staff and superuser flags set.
pub async fn create_superuser(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<user::Model, AppError> {
    create_account(db, email, password, true, true).await
}

async fn create_account(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    is_staff: bool,
    is_superuser: bool,
) -> Result<user::Model, AppError> {
    if email.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "email must not be empty".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let existing: Option<user::Model> = services::get_user_by_email(db, email)
        .await
        .map_err(|e: DbErr| AppError::DatabaseError(format!("checking for existing account: {e}")))?;
    if existing.is_some() {
        return Err(AppError::UserAlreadyExists(
            "an account with this email already exists".to_string(),
        ));
    }

    let password_hash =
        hash(password, DEFAULT_COST).map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    services::create_user(db, email, &password_hash, is_staff, is_superuser)
        .await
        .map_err(|e| AppError::DatabaseError(format!("creating user: {e}")))
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "email and password must not be empty".to_string(),
        ));
    }

    let user = match services::get_user_by_email(db, &req.email)
        .await
        .map_err(|e: DbErr| AppError::DatabaseError(format!("looking up user: {e}")))?
    {
        Some(u) => u,
        None => return Err(AppError::UserNotFound),
    };

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("verifying password: {e}")))?;
    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(
    user: &user::Model,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    // Token valid for 24 hours
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        email: user.email.clone(),
    })
}

pub async fn me(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<axum::Json<UserResponse>, AppError> {
    Ok(axum::Json(UserResponse {
        id: user.id,
        email: user.email,
    }))
}
