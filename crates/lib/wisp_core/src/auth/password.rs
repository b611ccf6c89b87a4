//! Password hashing via bcrypt.

use super::AuthError;

/// bcrypt cost factor. Fixed; not exposed through configuration.
const BCRYPT_COST: u32 = 10;

/// Hash a password with bcrypt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
}

/// Check a login attempt against a stored hash.
///
/// A mismatch is `WrongCredentials`; a corrupt stored hash is `Internal`.
pub fn check_password(password: &str, hash: &str) -> Result<(), AuthError> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(AuthError::WrongCredentials),
        Err(e) => Err(AuthError::Internal(format!("bcrypt verify: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_check_accepts_the_same_password() {
        let hash = hash_password("Passw0rd!").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(check_password("Passw0rd!", &hash).is_ok());
    }

    #[test]
    fn wrong_password_is_a_credential_error() {
        let hash = hash_password("Passw0rd!").unwrap();
        let err = check_password("wrong", &hash).unwrap_err();
        assert!(matches!(err, AuthError::WrongCredentials));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_hash_is_internal() {
        let err = check_password("x", "not-a-bcrypt-hash").unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
