//! Caller identity as established by the upstream authenticator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity kind attached to a request.
///
/// Only `Permission` credentials are subject to referer checks; everything
/// else passes the origin gate untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credential {
    /// A full user account.
    User,
    /// A scoped permission, usually embedded in browser clients.
    Permission,
}

impl Credential {
    /// Convert credential to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Credential::User => "user",
            Credential::Permission => "permission",
        }
    }

    /// Whether requests carrying this credential must present an approved referer.
    #[must_use]
    pub fn requires_referer(&self) -> bool {
        matches!(self, Credential::Permission)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Credential {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Credential::User),
            "permission" => Ok(Credential::Permission),
            _ => Err(format!("invalid credential kind: {s}")),
        }
    }
}

/// Authorization policy resolved for a `Permission` credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Glob patterns (`*` matches any run of characters) the `Referer` must match.
    /// An empty list never validates.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl PermissionRecord {
    /// Create a record with the given origin whitelist.
    #[must_use]
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_permission_requires_referer() {
        assert!(Credential::Permission.requires_referer());
        assert!(!Credential::User.requires_referer());
    }

    #[test]
    fn test_credential_from_str() {
        assert_eq!("user".parse::<Credential>(), Ok(Credential::User));
        assert_eq!("permission".parse::<Credential>(), Ok(Credential::Permission));
        assert!("admin".parse::<Credential>().is_err());
    }

    #[test]
    fn test_permission_record_deserializes_without_origins() {
        let record: PermissionRecord = serde_json::from_str("{}").unwrap();
        assert!(record.allowed_origins.is_empty());
    }
}
