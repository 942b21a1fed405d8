//! Identity collaborator.
//!
//! Session and bookmark operations are undefined without an authenticated
//! identity; every `CaseStore` call is scoped by one.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// An authenticated user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supplies the current authenticated identity.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Result<UserId>;
}

/// Environment-backed identity: `EVICASE_USER`, falling back to the OS
/// login name.
pub struct EnvIdentity;

impl IdentityProvider for EnvIdentity {
    fn current_user(&self) -> Result<UserId> {
        if let Ok(user) = std::env::var("EVICASE_USER") {
            if !user.trim().is_empty() {
                return Ok(UserId::new(user.trim()));
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(|u| UserId::new(u.trim()))
            .context("No authenticated identity: set EVICASE_USER")
    }
}

/// Fixed identity, for tests and embedding.
pub struct StaticIdentity(pub UserId);

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Result<UserId> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        let provider = StaticIdentity(UserId::new("det-miller"));
        assert_eq!(provider.current_user().unwrap().as_str(), "det-miller");
    }

    #[test]
    fn test_user_id_display() {
        assert_eq!(UserId::new("abc").to_string(), "abc");
    }
}
