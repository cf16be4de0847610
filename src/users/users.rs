use error_stack::{Report, ResultExt};
use serde::Serialize;
use sqlx::PgExecutor;

use crate::{
    auth::{password, UserId},
    Error,
};

/// A registered user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub verified: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct UserCreatePayload {
    pub name: String,
    pub email: String,
    pub verified: bool,
}

pub async fn create_new_user(
    db: impl PgExecutor<'_>,
    user_id: UserId,
    payload: UserCreatePayload,
    password_plaintext: String,
) -> Result<User, Report<Error>> {
    let password_hash = password::new_hash(password_plaintext)
        .await
        .change_context(Error::AuthSubsystem)?;

    create_new_user_with_prehashed_password(db, user_id, payload, password_hash).await
}

pub async fn create_new_user_with_prehashed_password(
    db: impl PgExecutor<'_>,
    user_id: UserId,
    payload: UserCreatePayload,
    password_hash: String,
) -> Result<User, Report<Error>> {
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, name, password_hash, verified)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, email, verified, created_at, updated_at",
    )
    .bind(user_id)
    .bind(&payload.email)
    .bind(&payload.name)
    .bind(password_hash)
    .bind(payload.verified)
    .fetch_one(db)
    .await
    .change_context(Error::Db)?;

    Ok(user)
}
