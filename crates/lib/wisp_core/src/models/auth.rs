//! Authentication domain models.
//!
//! These are the internal shapes shared by the token issuer, the stores and
//! the session service. HTTP request/response bodies live in `wisp_api`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Account role stored with every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Capabilities granted to this role.
    ///
    /// The sets are disjoint: a route gated on one role admits no other.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::User => &[Capability::Session],
            Role::Admin => &[Capability::ListUsers],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A permission a protected route group can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Exchange a refresh token from inside an authenticated session.
    Session,
    /// Read the full user list.
    ListUsers,
}

/// Domain user, as held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    /// The single live refresh token, if the user has an open session.
    pub refresh_token: Option<String>,
}

/// Which of the two secrets a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub email: String,
    pub token_type: TokenType,
    pub role: String,
    /// Numeric user id, carried as a string.
    pub user_id: String,
    pub is_active: bool,
    /// Unique token id, used as the revocation key.
    pub jti: String,
    pub iss: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Who a token pair is minted for.
#[derive(Debug, Clone, Copy)]
pub struct TokenSubject<'a> {
    pub email: &'a str,
    pub user_id: &'a str,
    pub role: &'a str,
    pub is_active: bool,
}

/// Signed access/refresh pair returned by login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub user_id: String,
    pub role: String,
    pub is_active: bool,
    pub capabilities: Vec<Capability>,
}

impl Identity {
    /// Build an identity from verified access-token claims.
    ///
    /// A role string this build does not know carries no capabilities.
    pub fn from_claims(claims: &TokenClaims) -> Self {
        let capabilities = claims
            .role
            .parse::<Role>()
            .map(|role| role.capabilities().to_vec())
            .unwrap_or_default();
        Self {
            email: claims.email.clone(),
            user_id: claims.user_id.clone(),
            role: claims.role.clone(),
            is_active: claims.is_active,
            capabilities,
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn has_all(&self, required: &[Capability]) -> bool {
        required.iter().all(|c| self.has(*c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_role(role: &str) -> TokenClaims {
        TokenClaims {
            email: "a@x.com".into(),
            token_type: TokenType::Access,
            role: role.into(),
            user_id: "7".into(),
            is_active: true,
            jti: "jti-1".into(),
            iss: "wisp".into(),
            iat: 0,
            exp: 1,
        }
    }

    #[test]
    fn role_parses_only_exact_lowercase_names() {
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("Admin".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn roles_do_not_nest() {
        let admin = Identity::from_claims(&claims_with_role("admin"));
        assert!(admin.has_all(Role::Admin.capabilities()));
        assert!(!admin.has(Capability::Session));
        assert!(!admin.has_all(Role::User.capabilities()));
    }

    #[test]
    fn user_lacks_admin_capabilities() {
        let user = Identity::from_claims(&claims_with_role("user"));
        assert!(user.has_all(Role::User.capabilities()));
        assert!(!user.has(Capability::ListUsers));
        assert!(!user.has_all(Role::Admin.capabilities()));
    }

    #[test]
    fn unknown_role_has_no_capabilities() {
        let odd = Identity::from_claims(&claims_with_role("superuser"));
        assert!(odd.capabilities.is_empty());
        assert!(!odd.has_all(Role::User.capabilities()));
        assert!(odd.has_all(&[]));
    }

    #[test]
    fn token_type_serializes_lowercase() {
        let json = serde_json::to_value(claims_with_role("user")).unwrap();
        assert_eq!(json["token_type"], "access");
    }
}
