//! JWT token generation and verification.
//!
//! Access and refresh tokens are HS256-signed with two distinct secrets so
//! that one kind can never be accepted in place of the other.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, TokenError};
use crate::models::auth::{TokenClaims, TokenPair, TokenSubject, TokenType};

/// Access token lifetime: 15 minutes.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime: 24 hours.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "wisp";

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Secrets and lifetimes for token issuance.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub issuer: String,
}

impl TokenConfig {
    /// Config with default lifetimes and issuer.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TTL,
            refresh_ttl: DEFAULT_REFRESH_TTL,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Creates and validates signed session tokens.
#[derive(Clone, Debug)]
pub struct TokenIssuer {
    config: TokenConfig,
}

impl TokenIssuer {
    /// Both secrets must be non-empty and must differ.
    pub fn new(config: TokenConfig) -> Result<Self, AuthError> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(AuthError::Validation("token secrets must not be empty".into()));
        }
        if config.access_secret == config.refresh_secret {
            return Err(AuthError::Validation(
                "access and refresh secrets must differ".into(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn access_secret(&self) -> &[u8] {
        self.config.access_secret.as_bytes()
    }

    pub fn refresh_secret(&self) -> &[u8] {
        self.config.refresh_secret.as_bytes()
    }

    /// Mint an access token and a refresh token, each with its own `jti`.
    pub fn generate_token_pair(&self, subject: TokenSubject<'_>) -> Result<TokenPair, AuthError> {
        let access_token = self.generate_access_token(subject)?;
        let refresh_token = self.sign(
            subject,
            TokenType::Refresh,
            self.config.refresh_ttl,
            self.refresh_secret(),
        )?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Mint a lone access token.
    pub fn generate_access_token(&self, subject: TokenSubject<'_>) -> Result<String, AuthError> {
        self.sign(
            subject,
            TokenType::Access,
            self.config.access_ttl,
            self.access_secret(),
        )
    }

    fn sign(
        &self,
        subject: TokenSubject<'_>,
        token_type: TokenType,
        ttl: Duration,
        secret: &[u8],
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs())
            .map_err(|_| AuthError::Internal("token lifetime out of range".into()))?;
        let claims = TokenClaims {
            email: subject.email.to_string(),
            token_type,
            role: subject.role.to_string(),
            user_id: subject.user_id.to_string(),
            is_active: subject.is_active,
            jti: Uuid::new_v4().to_string(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + ttl,
        };
        encode(
            &Header::new(ALGORITHM),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature, algorithm, issuer and expiry against `secret`.
    pub fn validate_token(&self, token: &str, secret: &[u8]) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss"]);
        validation.set_issuer(&[self.config.issuer.as_str()]);

        decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                classify(e.kind())
            })
    }

    /// Validate with the access secret and require `token_type == access`.
    pub fn validate_access(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.validate_token(token, self.access_secret())?;
        expect_type(claims, TokenType::Access)
    }

    /// Validate with the refresh secret and require `token_type == refresh`.
    pub fn validate_refresh(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.validate_token(token, self.refresh_secret())?;
        expect_type(claims, TokenType::Refresh)
    }
}

fn expect_type(claims: TokenClaims, expected: TokenType) -> Result<TokenClaims, TokenError> {
    if claims.token_type == expected {
        Ok(claims)
    } else {
        Err(TokenError::WrongType)
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::WrongSigningMethod
        }
        _ => TokenError::Malformed,
    }
}

/// Read claims without checking signature or expiry.
///
/// Only for bookkeeping on a token being revoked; never for authorization.
pub fn parse_claims_unverified(token: &str) -> Result<TokenClaims, TokenError> {
    if token.is_empty() || token.split('.').count() != 3 {
        return Err(TokenError::Malformed);
    }

    let mut validation = Validation::new(ALGORITHM);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| classify(e.kind()))?;

    if claims.jti.is_empty() || claims.email.is_empty() {
        return Err(TokenError::Malformed);
    }
    Ok(claims)
}
