use chrono::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User account row.
///
/// `password` is a PHC-format Argon2id hash, absent for accounts that
/// only ever signed in through Google. `reset_token` and
/// `reset_token_expiry` always move together: both set at issuance,
/// both cleared once the token is spent. Emails are lowercased by
/// callers before every lookup and insert.
///
/// Posts and comments are read exclusively through their author-joined
/// DTOs (`PostDto`, `CommentDto` in `dtos.rs`), so this is the only
/// bare row model.
#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub confirmed: bool,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}
