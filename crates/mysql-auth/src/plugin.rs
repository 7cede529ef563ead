//! Authentication plugins.
//!
//! The server names the plugin in its handshake (or in an auth switch
//! request). [`AuthPlugin`] maps that name to the scramble the client sends
//! back.

use bytes::Bytes;

use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::scramble::{scramble_caching_sha2_password, scramble_native_password};

/// Authentication plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthPlugin {
    /// SHA1 challenge-response (`mysql_native_password`).
    NativePassword,
    /// SHA256 challenge-response with server-side cache
    /// (`caching_sha2_password`).
    CachingSha2Password,
    /// Clear-text password (`mysql_clear_password`).
    ClearPassword,
}

impl AuthPlugin {
    /// Plugin used when the server does not name one.
    pub const DEFAULT: Self = Self::NativePassword;

    /// Look up a plugin by its wire name.
    pub fn from_name(name: &str) -> Result<Self, AuthError> {
        match name {
            "mysql_native_password" | "" => Ok(Self::NativePassword),
            "caching_sha2_password" => Ok(Self::CachingSha2Password),
            "mysql_clear_password" => Ok(Self::ClearPassword),
            other => Err(AuthError::UnsupportedPlugin(other.to_string())),
        }
    }

    /// Wire name of the plugin.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NativePassword => "mysql_native_password",
            Self::CachingSha2Password => "caching_sha2_password",
            Self::ClearPassword => "mysql_clear_password",
        }
    }

    /// Whether the plugin sends the password itself and therefore needs an
    /// encrypted connection.
    #[must_use]
    pub const fn requires_secure_transport(self) -> bool {
        matches!(self, Self::ClearPassword)
    }

    /// Compute the authentication response for `nonce`.
    ///
    /// Fails for plugins that would expose the password, since this client
    /// never encrypts the transport.
    pub fn auth_response(self, credentials: &Credentials, nonce: &[u8]) -> Result<Bytes, AuthError> {
        let password = credentials.password().as_bytes();
        let response = match self {
            Self::NativePassword => scramble_native_password(password, nonce),
            Self::CachingSha2Password => scramble_caching_sha2_password(password, nonce),
            Self::ClearPassword => {
                return Err(AuthError::SecureTransportRequired(self.name().to_string()));
            }
        };

        tracing::debug!(
            plugin = self.name(),
            username = credentials.username(),
            "computed authentication response"
        );

        Ok(Bytes::from(response))
    }
}

impl std::fmt::Display for AuthPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(
            AuthPlugin::from_name("caching_sha2_password").unwrap(),
            AuthPlugin::CachingSha2Password
        );
        assert_eq!(AuthPlugin::from_name("").unwrap(), AuthPlugin::DEFAULT);
        assert_eq!(
            AuthPlugin::from_name("sha256_password"),
            Err(AuthError::UnsupportedPlugin("sha256_password".into()))
        );
    }

    #[test]
    fn test_name_roundtrip() {
        for plugin in [
            AuthPlugin::NativePassword,
            AuthPlugin::CachingSha2Password,
            AuthPlugin::ClearPassword,
        ] {
            assert_eq!(AuthPlugin::from_name(plugin.name()).unwrap(), plugin);
        }
    }

    #[test]
    fn test_clear_password_refused() {
        let creds = Credentials::new("app", "pw");
        let err = AuthPlugin::ClearPassword
            .auth_response(&creds, &[0; 20])
            .unwrap_err();
        assert!(matches!(err, AuthError::SecureTransportRequired(_)));
        assert!(AuthPlugin::ClearPassword.requires_secure_transport());
    }

    #[test]
    fn test_response_lengths() {
        let creds = Credentials::new("app", "pw");
        let nonce = [7u8; 20];
        assert_eq!(
            AuthPlugin::NativePassword
                .auth_response(&creds, &nonce)
                .unwrap()
                .len(),
            20
        );
        assert_eq!(
            AuthPlugin::CachingSha2Password
                .auth_response(&creds, &nonce)
                .unwrap()
                .len(),
            32
        );
    }
}
