//! Decode-and-validate extraction for JSON bodies.
//!
//! Request types derive `validator::Validate`; handlers take `ValidatedJson<T>`
//! instead of `Json<T>`, so a body that does not decode or does not pass its
//! rules is rejected with 400 before the handler runs.

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// bcrypt ignores everything past 72 bytes.
const MAX_PASSWORD_BYTES: usize = 72;

/// `Json<T>` that has also passed `T::validate`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value
            .validate()
            .map_err(|errors| AppError::Validation(errors.to_string()))?;
        Ok(Self(value))
    }
}

pub(crate) fn within_bcrypt_limit(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("too_long").with_message(
            format!("password must be at most {MAX_PASSWORD_BYTES} bytes").into(),
        ));
    }
    Ok(())
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoginRequest, RefreshRequest, RegisterRequest};

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(register("a@x.com", "secret1").validate().is_ok());
        assert!(register("first.last+tag@sub.example.org", "secret1").validate().is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "a", "@x.com", "a@", "a@@x.com", "a b@x.com"] {
            assert!(register(bad, "secret1").validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn password_length_bounds() {
        assert!(register("a@x.com", "12345").validate().is_err());
        assert!(register("a@x.com", "123456").validate().is_ok());
        assert!(register("a@x.com", &"x".repeat(72)).validate().is_ok());
        assert!(register("a@x.com", &"x".repeat(73)).validate().is_err());
        // 25 three-byte characters: short in chars, over the byte limit.
        assert!(register("a@x.com", &"€".repeat(25)).validate().is_err());
    }

    #[test]
    fn refresh_token_must_be_present() {
        let empty = RefreshRequest {
            refresh_token: "  ".into(),
        };
        let errors = empty.validate().unwrap_err();
        assert!(errors.to_string().contains("refresh_token is required"));
    }

    #[test]
    fn login_accepts_any_nonempty_password() {
        let req = LoginRequest {
            email: "a@x.com".into(),
            password: "wrong".into(),
        };
        assert!(req.validate().is_ok());
        let empty = LoginRequest {
            email: "a@x.com".into(),
            password: String::new(),
        };
        assert!(empty.validate().is_err());
    }
}
