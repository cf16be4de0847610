use axum::{extract::State, response::IntoResponse, routing, Json, Router};
use tower_cookies::Cookies;

use super::{
    password::{login_with_password, EmailAndPassword},
    sessions::SessionError,
    AuthError,
};
use crate::{errors::WrapReport, server::ServerState, Message};

/// Try to log in with an email and password, and create a session if successful.
async fn password_login(
    State(state): State<ServerState>,
    cookies: Cookies,
    Json(body): Json<EmailAndPassword>,
) -> Result<impl IntoResponse, WrapReport<AuthError>> {
    login_with_password(&state.sessions, &state.db, &cookies, body).await?;

    Ok(Json(Message::new("Logged in")))
}

/// Remove the current user's session
async fn logout(
    State(state): State<ServerState>,
    cookies: Cookies,
) -> Result<impl IntoResponse, WrapReport<SessionError>> {
    state.sessions.delete_session(&cookies).await?;

    Ok(Json(Message::new("Logged out")))
}

/// Create routes for logging in and logging out
pub fn create_routes() -> Router<ServerState> {
    Router::new()
        .route("/login", routing::post(password_login))
        .route("/logout", routing::post(logout))
}
