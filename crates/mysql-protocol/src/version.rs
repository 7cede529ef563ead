//! Server version parsing.

use core::fmt;

/// Server version reported in the initial handshake.
///
/// The raw string may carry a vendor suffix (`8.0.36-log`,
/// `10.11.6-MariaDB-1:10.11.6+maria~ubu2204`); only the leading
/// `major.minor.patch` digits are compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerVersion {
    major: u32,
    minor: u32,
    patch: u32,
    raw: String,
}

impl ServerVersion {
    /// Oldest version that understands `COM_RESET_CONNECTION`.
    pub const RESET_CONNECTION_MIN: (u32, u32, u32) = (5, 7, 3);

    /// Parse a version string.
    ///
    /// Missing or non-numeric components are treated as 0, so parsing never
    /// fails; an unparseable string compares as `0.0.0`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut parts = [0u32; 3];
        let mut rest = raw;
        for part in &mut parts {
            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            *part = rest[..digits].parse().unwrap_or(0);
            rest = &rest[digits..];
            match rest.strip_prefix('.') {
                Some(next) if digits > 0 => rest = next,
                _ => break,
            }
        }

        Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            raw: raw.to_string(),
        }
    }

    /// Major version.
    #[must_use]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Minor version.
    #[must_use]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Patch version.
    #[must_use]
    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// The string exactly as the server sent it.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether this version is at least `major.minor.patch`.
    #[must_use]
    pub fn is_at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        (self.major, self.minor, self.patch) >= (major, minor, patch)
    }

    /// Whether the server supports `COM_RESET_CONNECTION`.
    #[must_use]
    pub fn supports_reset_connection(&self) -> bool {
        let (major, minor, patch) = Self::RESET_CONNECTION_MIN;
        self.is_at_least(major, minor, patch)
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_suffix() {
        let v = ServerVersion::parse("8.0.28-log");
        assert_eq!((v.major(), v.minor(), v.patch()), (8, 0, 28));
        assert_eq!(v.raw(), "8.0.28-log");
        assert_eq!(v.to_string(), "8.0.28-log");
    }

    #[test]
    fn test_parse_mariadb() {
        let v = ServerVersion::parse("10.11.6-MariaDB-1:10.11.6+maria~ubu2204");
        assert_eq!((v.major(), v.minor(), v.patch()), (10, 11, 6));
    }

    #[test]
    fn test_parse_partial() {
        let v = ServerVersion::parse("5.6");
        assert_eq!((v.major(), v.minor(), v.patch()), (5, 6, 0));

        let v = ServerVersion::parse("garbage");
        assert_eq!((v.major(), v.minor(), v.patch()), (0, 0, 0));
    }

    #[test]
    fn test_reset_connection_support() {
        assert!(!ServerVersion::parse("5.6.51").supports_reset_connection());
        assert!(!ServerVersion::parse("5.7.2").supports_reset_connection());
        assert!(ServerVersion::parse("5.7.3").supports_reset_connection());
        assert!(ServerVersion::parse("8.0.36").supports_reset_connection());
    }
}
