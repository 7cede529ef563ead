//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Authentication failed on server.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server asked for a plugin this client does not implement.
    #[error("unsupported authentication plugin '{0}'")]
    UnsupportedPlugin(String),

    /// The plugin would send the password in clear text over an
    /// unencrypted connection.
    #[error("authentication plugin '{0}' requires a secure connection")]
    SecureTransportRequired(String),
}
