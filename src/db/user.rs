use super::DBClient;
use crate::models::User;
use chrono::{DateTime, Utc};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password, confirmed, google_id, avatar_url, \
     reset_token, reset_token_expiry, created_at, last_login";

/// User database operations.
///
/// Callers lowercase emails before every lookup and insert; uniqueness
/// is the `users.email` unique index, which is also what resolves two
/// signups racing on the same address.
pub trait UserExt {
    /// Get a single user by id, email, google id, or reset token.
    /// Exactly one key is expected; the first `Some` wins.
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        google_id: Option<&str>,
        reset_token: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error>;

    /// Create a local-password account, unconfirmed.
    async fn save_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error>;

    /// Create an OAuth-originated account: no local password, confirmed
    /// from the start, last_login set.
    async fn save_oauth_user(
        &self,
        name: &str,
        email: &str,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, sqlx::Error>;

    /// Attach a Google identity to an existing account, marking it
    /// confirmed and touching last_login.
    async fn link_google_account(
        &self,
        user_id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, sqlx::Error>;

    /// Mark the account with this email confirmed. Already-confirmed
    /// accounts are a no-op.
    async fn confirm_email(&self, email: &str) -> Result<(), sqlx::Error>;

    async fn update_last_login(&self, user_id: Uuid) -> Result<(), sqlx::Error>;

    /// Store a reset token and its absolute expiry on the user row.
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;

    /// Set a new password hash and clear the reset token pair, making
    /// the token single-use.
    async fn reset_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error>;
}

impl UserExt for DBClient {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
        google_id: Option<&str>,
        reset_token: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let mut user: Option<User> = None;

        if let Some(user_id) = user_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
            ))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(email) = email {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(google_id) = google_id {
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE google_id = $1"
            ))
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?;
        } else if let Some(reset_token) = reset_token {
            // Reset tokens are globally unique random strings, so the
            // row lookup itself is the authority here.
            user = sqlx::query_as::<_, User>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1"
            ))
            .bind(reset_token)
            .fetch_optional(&self.pool)
            .await?;
        }

        Ok(user)
    }

    async fn save_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn save_oauth_user(
        &self,
        name: &str,
        email: &str,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, confirmed, google_id, avatar_url, last_login) \
             VALUES ($1, $2, TRUE, $3, $4, NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(google_id)
        .bind(avatar_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn link_google_account(
        &self,
        user_id: Uuid,
        google_id: &str,
        avatar_url: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET google_id = $1, avatar_url = COALESCE($2, avatar_url), \
                 confirmed = TRUE, last_login = NOW() \
             WHERE id = $3 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(google_id)
        .bind(avatar_url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn confirm_email(&self, email: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET confirmed = TRUE WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_last_login(&self, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expiry: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_token = $1, reset_token_expiry = $2 WHERE id = $3",
        )
        .bind(token)
        .bind(expiry)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn reset_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users \
             SET password = $1, reset_token = NULL, reset_token_expiry = NULL \
             WHERE id = $2",
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
