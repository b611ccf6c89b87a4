//! Postgres-backed `CredentialStore`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::AuthError;
use super::store::CredentialStore;
use crate::models::auth::{Role, User};

/// Row shape of `users` as read by `find_by_email`.
type UserRow = (i64, String, String, String, bool, Option<String>);

/// `CredentialStore` over the `users` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_user((id, email, password_hash, role, is_active, refresh_token): UserRow) -> Result<User, AuthError> {
    let role = role.parse::<Role>().map_err(AuthError::Internal)?;
    Ok(User {
        id,
        email,
        password_hash,
        role,
        is_active,
        refresh_token: refresh_token.filter(|t| !t.is_empty()),
    })
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn add_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        is_active: bool,
    ) -> Result<(), AuthError> {
        let result = sqlx::query(
            "INSERT INTO users (email, hashed_pass, user_role, is_active) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::DuplicateEmail);
        }
        debug!(email, role = %role, "user inserted");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, hashed_pass, user_role, is_active, refresh_token \
             FROM users WHERE email = $1 LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(into_user).transpose()
    }

    async fn check_exists(&self, email: &str) -> Result<bool, AuthError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn set_refresh_token(&self, email: &str, token: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET refresh_token = $1 WHERE email = $2")
            .bind(token)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_refresh_token(&self, email: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET refresh_token = NULL WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_emails(&self) -> Result<Vec<String>, AuthError> {
        let emails = sqlx::query_scalar::<_, String>("SELECT email FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(emails)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_maps_to_user() {
        let user = into_user((
            3,
            "a@x.com".into(),
            "$2b$10$hash".into(),
            "admin".into(),
            true,
            Some(String::new()),
        ))
        .unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.refresh_token, None);
    }

    #[test]
    fn unknown_role_in_row_is_internal() {
        let err = into_user((1, "a@x.com".into(), "h".into(), "root".into(), true, None)).unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
