pub mod endpoints;
pub mod password;
pub mod sessions;

use std::{ops::Deref, str::FromStr, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::IntoResponse,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tower_cookies::Cookies;
use tracing::{event, Level};

use self::sessions::{SessionKey, SessionManager, SESSION_COOKIE_NAME};
use crate::{errors::HttpError, make_object_id};

make_object_id!(UserId, usr);

/// An error related to authentication
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user is not logged in
    #[error("Not authenticated")]
    Unauthenticated,
    /// The user is known, but requires verification before they can do most operations
    #[error("User is not verified")]
    NotVerified,
    /// No user exists with the given email
    #[error("No user found with that email")]
    UserNotFound,
    /// The password did not match
    #[error("Incorrect password")]
    IncorrectPassword,
    /// The password hasher failed
    #[error("Failed to hash password: {0}")]
    PasswordHasherError(String),
    /// The session store failed
    #[error("Session backend error")]
    SessionBackend,
    /// A database error unrelated to the user's own state
    #[error("Failed to access database")]
    Db(#[from] sqlx::Error),
}

impl HttpError for AuthError {
    fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::Unauthenticated | Self::UserNotFound | Self::IncorrectPassword => {
                axum::http::StatusCode::UNAUTHORIZED
            }
            Self::NotVerified => axum::http::StatusCode::FORBIDDEN,
            Self::PasswordHasherError(_) | Self::SessionBackend | Self::Db(_) => {
                axum::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotVerified => "not_verified",
            Self::UserNotFound => "user_not_found",
            Self::IncorrectPassword => "incorrect_password",
            Self::PasswordHasherError(_) => "password_hasher",
            Self::SessionBackend => "session_backend",
            Self::Db(_) => "db",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        self.to_response()
    }
}

/// Information about the current user
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuthInfo {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub verified: bool,
}

impl AuthInfo {
    /// Return Ok if the user is allowed to perform operations, or the
    /// [AuthError] describing why not.
    pub fn check_valid(&self) -> Result<(), AuthError> {
        if !self.verified {
            return Err(AuthError::NotVerified);
        }

        Ok(())
    }
}

/// Look up the user attached to an unexpired session.
pub(crate) async fn lookup_session_user(
    db: &PgPool,
    key: &SessionKey,
) -> Result<Option<AuthInfo>, AuthError> {
    let info = sqlx::query_as::<_, AuthInfo>(
        "SELECT users.id AS user_id, users.name, users.email, users.verified
        FROM user_sessions
        JOIN users ON users.id = user_sessions.user_id
        WHERE user_sessions.id = $1 AND user_sessions.user_id = $2
          AND user_sessions.expires_at > now()",
    )
    .bind(key.session_id)
    .bind(key.user_id)
    .fetch_optional(db)
    .await?;

    Ok(info)
}

/// Extract authentication info from the request, or return an error if the
/// user is not valid. Accepts the session key either as a Bearer token or from
/// the session cookie.
pub struct Authed(pub AuthInfo);

#[async_trait]
impl<S> FromRequestParts<S> for Authed
where
    S: Send + Sync,
    PgPool: FromRef<S>,
    Arc<SessionManager>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let bearer: Option<TypedHeader<Authorization<Bearer>>> =
            TypedHeader::from_request_parts(parts, state).await.ok();

        let (key, cookies) = if let Some(bearer) = bearer {
            let key = SessionKey::from_str(bearer.0.token())
                .map_err(|_| AuthError::Unauthenticated)?;
            (key, None)
        } else {
            let cookies = Cookies::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::Unauthenticated)?;
            let cookie = cookies
                .get(SESSION_COOKIE_NAME)
                .ok_or(AuthError::Unauthenticated)?;
            let key = SessionKey::from_str(cookie.value())
                .map_err(|_| AuthError::Unauthenticated)?;
            (key, Some(cookies))
        };

        let db = PgPool::from_ref(state);
        let info = lookup_session_user(&db, &key)
            .await?
            .ok_or(AuthError::Unauthenticated)?;
        info.check_valid()?;

        // Sliding expiration. A failure here should not fail the request.
        if let Some(cookies) = cookies {
            let sessions = <Arc<SessionManager>>::from_ref(state);
            match sessions.touch_session(&key).await {
                Ok(Some(cookie)) => cookies.add(cookie),
                Ok(None) => {}
                Err(err) => event!(Level::WARN, ?err, "Failed to refresh session"),
            }
        }

        Ok(Authed(info))
    }
}

impl Deref for Authed {
    type Target = AuthInfo;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
