use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use sqlx::PgPool;
use tower_cookies::Cookies;
use tracing::instrument;
use uuid::Uuid;

use super::{sessions::SessionManager, AuthError, UserId};

/// Hash a password using a randomly-generated salt value
pub async fn new_hash(password: String) -> Result<String, AuthError> {
    let salt = Uuid::new_v4();
    hash_password(password, salt).await
}

#[instrument(skip(password))]
async fn hash_password(password: String, salt: Uuid) -> Result<String, AuthError> {
    let hash = tokio::task::spawn_blocking(move || {
        let saltstring = SaltString::encode_b64(salt.as_bytes())
            .map_err(|e| AuthError::PasswordHasherError(e.to_string()))?;

        let hash = Argon2::default()
            .hash_password(password.as_bytes(), saltstring.as_salt())
            .map_err(|e| AuthError::PasswordHasherError(e.to_string()))?;

        Ok::<_, AuthError>(hash.to_string())
    })
    .await
    .map_err(|e| AuthError::PasswordHasherError(e.to_string()))??;

    Ok(hash)
}

/// Verify that the given password matches the stored hash
pub async fn verify_password(password: String, hash_str: String) -> Result<(), AuthError> {
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(&hash_str)
            .map_err(|e| AuthError::PasswordHasherError(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|_| AuthError::IncorrectPassword)
    })
    .await
    .map_err(|e| AuthError::PasswordHasherError(e.to_string()))??;

    Ok(())
}

/// An email and password to attempt login
#[derive(Debug, Deserialize)]
pub struct EmailAndPassword {
    pub email: String,
    pub password: String,
}

/// Look up a user, verify the password, and check that the user is verified.
pub async fn lookup_user_from_email_and_password(
    db: &PgPool,
    email_and_password: EmailAndPassword,
) -> Result<UserId, Report<AuthError>> {
    if email_and_password.password.is_empty() {
        // This should really be caught earlier, but make sure that nothing
        // weird happens if someone tries to log in with an empty password.
        return Err(Report::new(AuthError::Unauthenticated));
    }

    let (user_id, password_hash, verified) =
        sqlx::query_as::<_, (UserId, String, bool)>(
            "SELECT id, password_hash, verified FROM users WHERE email = $1",
        )
        .bind(&email_and_password.email)
        .fetch_optional(db)
        .await
        .map_err(AuthError::from)?
        .ok_or(AuthError::UserNotFound)?;

    verify_password(email_and_password.password, password_hash).await?;

    if !verified {
        return Err(Report::new(AuthError::NotVerified));
    }

    Ok(user_id)
}

/// Look up a user based on the email and password, and create a new session.
/// This returns an error if the email is not found, the password is incorrect,
/// or if the user is not verified.
pub async fn login_with_password(
    sessions: &SessionManager,
    db: &PgPool,
    cookies: &Cookies,
    email_and_password: EmailAndPassword,
) -> Result<(), Report<AuthError>> {
    let user_id = lookup_user_from_email_and_password(db, email_and_password).await?;

    sessions
        .create_session(cookies, &user_id)
        .await
        .change_context(AuthError::SessionBackend)?;

    Ok(())
}
