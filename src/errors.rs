use std::{borrow::Cow, fmt::Debug, ops::Deref};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use error_stack::Report;
use serde::Serialize;
use tracing::{event, Level};

/// An error that can be returned from an HTTP endpoint
pub trait HttpError: ToString + std::fmt::Debug {
    /// The status code that the error should return.
    fn status_code(&self) -> StatusCode;

    /// An error code that may provide additional information to clients on how
    /// to behave in response to the error.
    fn error_kind(&self) -> &'static str;

    /// Convert the error into a [Response]. Most implementors of this trait
    /// will not need to override the default implementation.
    fn to_response(&self) -> Response {
        let body = ErrorResponseData::new(self.error_kind(), self.to_string());
        (self.status_code(), Json(body)).into_response()
    }
}

impl<T> HttpError for Report<T>
where
    T: HttpError + Send + Sync + 'static,
{
    fn status_code(&self) -> StatusCode {
        self.current_context().status_code()
    }

    fn error_kind(&self) -> &'static str {
        self.current_context().error_kind()
    }
}

/// A body to be returned in an error response
#[derive(Debug, Serialize)]
pub struct ErrorResponseData {
    error: ErrorDetails,
}

/// An error code and a human-readable message
#[derive(Debug, Serialize)]
struct ErrorDetails {
    kind: Cow<'static, str>,
    message: Cow<'static, str>,
}

impl ErrorResponseData {
    /// Create a new [ErrorResponseData] with the given error code and message.
    pub fn new(
        kind: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> ErrorResponseData {
        let ret = ErrorResponseData {
            error: ErrorDetails {
                kind: kind.into(),
                message: message.into(),
            },
        };

        event!(Level::ERROR, kind=%ret.error.kind, message=%ret.error.message);

        ret
    }
}

/// Wraps an [error_stack::Report] and implements [IntoResponse], allowing easy
/// return of a `Report<T>` from an Axum endpoint.
pub struct WrapReport<T: HttpError + Sync + Send + 'static>(Report<T>);

impl<T: HttpError + Sync + Send + 'static> IntoResponse for WrapReport<T> {
    fn into_response(self) -> Response {
        self.0.to_response()
    }
}

impl<T: HttpError + Sync + Send + 'static> From<Report<T>> for WrapReport<T> {
    fn from(value: Report<T>) -> Self {
        WrapReport(value)
    }
}

impl<T: HttpError + std::error::Error + Sync + Send + 'static> From<T> for WrapReport<T> {
    fn from(value: T) -> Self {
        WrapReport(Report::from(value))
    }
}

impl<T: HttpError + Sync + Send + 'static> Deref for WrapReport<T> {
    type Target = Report<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
