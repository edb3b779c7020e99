//! Session error types.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can fail a session start.
///
/// Any of these leaves the session in its not-started state; no event
/// recorded against it will ever be exported.
#[derive(Debug, Error)]
pub enum SessionStartError {
    /// Registration request failed (transport error or non-2xx response).
    #[error("session registration failed: {0}")]
    Http(#[from] HttpError),

    /// Registration response carried no bearer credential.
    #[error("session registration response missing jwt")]
    MissingJwt,

    /// The session has already ended; states are never revisited.
    #[error("session has already ended")]
    AlreadyEnded,
}
