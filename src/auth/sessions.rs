use std::{fmt::Display, str::FromStr, time::Duration};

use chrono::Utc;
use error_stack::{Report, ResultExt};
use sqlx::PgPool;
use thiserror::Error;
use tower_cookies::{Cookie, Cookies};

use super::UserId;
use crate::{errors::HttpError, make_object_id};

make_object_id!(SessionId, sid);

/// The name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "sid";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to access database")]
    Db,
    #[error("Session does not exist")]
    NotFound,
}

impl HttpError for SessionError {
    fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::Db => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => axum::http::StatusCode::UNAUTHORIZED,
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Self::Db => "db",
            Self::NotFound => "unauthenticated",
        }
    }
}

pub struct SessionCookieBuilder {
    secure: bool,
    same_site: tower_cookies::cookie::SameSite,
}

impl SessionCookieBuilder {
    /// Create a new `SessionCookieBuilder`
    pub fn new(secure: bool, same_site: tower_cookies::cookie::SameSite) -> Self {
        Self { secure, same_site }
    }

    /// Create a session cookie
    pub fn create_cookie(&self, key: &SessionKey, expiry: Duration) -> Cookie<'static> {
        let cookie_contents = key.to_string();
        let expiry = tower_cookies::cookie::time::Duration::try_from(expiry).unwrap();
        Cookie::build((SESSION_COOKIE_NAME, cookie_contents))
            .http_only(true)
            .same_site(self.same_site)
            .secure(self.secure)
            .max_age(expiry)
            .path("/")
            .into()
    }
}

/// How session expiration is calculated
#[derive(Clone, Copy, Debug)]
pub enum ExpiryStyle {
    /// Sessions expire a fixed duration after login
    FromCreation(Duration),
    /// Sessions expire after being unused for the given duration
    AfterIdle(Duration),
}

impl ExpiryStyle {
    pub fn expiry_time(&self) -> Duration {
        match self {
            ExpiryStyle::FromCreation(duration) => *duration,
            ExpiryStyle::AfterIdle(duration) => *duration,
        }
    }
}

/// A session identifier as stored in the cookie or passed as a Bearer token:
/// the session ID and the user ID, joined by a colon.
#[derive(Debug)]
pub struct SessionKey {
    pub session_id: SessionId,
    pub user_id: UserId,
}

impl SessionKey {
    pub fn new(user_id: UserId) -> Self {
        Self::new_from_id(SessionId::new(), user_id)
    }

    pub fn new_from_id(session_id: SessionId, user_id: UserId) -> Self {
        Self {
            session_id,
            user_id,
        }
    }
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.session_id, self.user_id)
    }
}

impl FromStr for SessionKey {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, user_id) = s.split_once(':').ok_or(SessionError::NotFound)?;
        let id = SessionId::from_str(id).map_err(|_| SessionError::NotFound)?;
        let user_id = UserId::from_str(user_id).map_err(|_| SessionError::NotFound)?;

        Ok(Self::new_from_id(id, user_id))
    }
}

/// Manages user sessions in the database
pub struct SessionManager {
    db: PgPool,
    cookies: SessionCookieBuilder,
    expiry_style: ExpiryStyle,
}

impl SessionManager {
    pub fn new(db: PgPool, cookies: SessionCookieBuilder, expiry_style: ExpiryStyle) -> Self {
        Self {
            db,
            cookies,
            expiry_style,
        }
    }

    fn next_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(self.expiry_style.expiry_time().as_secs() as i64)
    }

    /// Create a session row for the user and return its cookie.
    pub async fn add_session(&self, user_id: &UserId) -> Result<Cookie<'static>, Report<SessionError>> {
        let session_id = SessionId::new();

        sqlx::query("INSERT INTO user_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(*user_id)
            .bind(self.next_expiry())
            .execute(&self.db)
            .await
            .change_context(SessionError::Db)?;

        Ok(self.cookies.create_cookie(
            &SessionKey::new_from_id(session_id, *user_id),
            self.expiry_style.expiry_time(),
        ))
    }

    /// Create a session and attach its cookie to the response.
    pub async fn create_session(
        &self,
        cookies: &Cookies,
        user_id: &UserId,
    ) -> Result<(), Report<SessionError>> {
        let cookie = self.add_session(user_id).await?;
        cookies.add(cookie);
        Ok(())
    }

    /// Push back the expiration of an idle-expiry session, returning a
    /// replacement cookie when the expiration actually moved.
    pub async fn touch_session(
        &self,
        key: &SessionKey,
    ) -> Result<Option<Cookie<'static>>, SessionError> {
        let ExpiryStyle::AfterIdle(duration) = self.expiry_style else {
            return Ok(None);
        };

        let updated = sqlx::query(
            "UPDATE user_sessions
                SET expires_at = $1
                WHERE id = $2 AND user_id = $3
                -- Prevent unnecessary updates
                AND expires_at < $1 - interval '1 minute'",
        )
        .bind(self.next_expiry())
        .bind(key.session_id)
        .bind(key.user_id)
        .execute(&self.db)
        .await
        .map_err(|_| SessionError::Db)?;

        if updated.rows_affected() > 0 {
            Ok(Some(self.cookies.create_cookie(key, duration)))
        } else {
            Ok(None)
        }
    }

    /// Delete the session referenced by the request's cookie, if any, and
    /// clear the cookie itself.
    pub async fn delete_session(&self, cookies: &Cookies) -> Result<(), Report<SessionError>> {
        let Some(cookie) = cookies.get(SESSION_COOKIE_NAME) else {
            return Ok(());
        };

        if let Ok(key) = SessionKey::from_str(cookie.value()) {
            sqlx::query("DELETE FROM user_sessions WHERE id = $1 AND user_id = $2")
                .bind(key.session_id)
                .bind(key.user_id)
                .execute(&self.db)
                .await
                .change_context(SessionError::Db)?;
        }

        let mut removal = Cookie::new(SESSION_COOKIE_NAME, "");
        removal.set_path("/");
        cookies.remove(removal);

        Ok(())
    }

    pub async fn delete_expired_sessions(&self) -> Result<(), Report<SessionError>> {
        sqlx::query("DELETE FROM user_sessions WHERE expires_at < now()")
            .execute(&self.db)
            .await
            .change_context(SessionError::Db)?;
        Ok(())
    }
}
