use std::borrow::Cow;

use serde::Serialize;

pub mod auth;
pub mod db;
pub mod error;
pub mod errors;
pub mod models;
pub mod object_id;
pub mod server;
pub mod testing;
#[cfg(test)]
mod tests;
pub mod tracing_config;
pub mod users;
pub mod util_cmd;

pub use error::Error;

/// A simple message to return from an endpoint
#[derive(Debug, Serialize)]
pub struct Message {
    message: Cow<'static, str>,
}

impl Message {
    /// Create a new [Message]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
