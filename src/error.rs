use axum::http::StatusCode;
use thiserror::Error;

use crate::{errors::HttpError, models::campsite::CampsiteId};

/// The top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to access database")]
    Db,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Campsite {0} is already in your list of favorites!")]
    AlreadyFavorite(CampsiteId),

    #[error("Campsite {0} is not in your list of favorites.")]
    NotAFavorite(CampsiteId),

    #[error("You have no favorites to delete!")]
    NoFavorites,

    #[error("{0} is not supported")]
    OperationNotSupported(&'static str),

    #[error("Authentication subsystem error")]
    AuthSubsystem,

    #[error("Failed to read input")]
    Input,

    #[error("Failed to start server")]
    ServerStart,

    #[error("Server encountered an error while running")]
    Server,

    #[error("Failed while shutting down")]
    Shutdown,
}

impl HttpError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            // The 404 here for duplicate membership mirrors the behavior of
            // the service this replaces; clients depend on it.
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyFavorite(_) => StatusCode::NOT_FOUND,
            Self::NotAFavorite(_) => StatusCode::NOT_FOUND,
            Self::NoFavorites => StatusCode::NOT_FOUND,
            Self::OperationNotSupported(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Self::Db => "db",
            Self::NotFound(_) => "not_found",
            Self::AlreadyFavorite(_) => "already_favorite",
            Self::NotAFavorite(_) => "not_a_favorite",
            Self::NoFavorites => "not_found",
            Self::OperationNotSupported(_) => "unsupported_operation",
            Self::AuthSubsystem => "auth_subsystem",
            Self::Input => "input",
            Self::ServerStart => "server_start",
            Self::Server => "server",
            Self::Shutdown => "shutdown",
        }
    }
}
