use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the browser session cookie. Holds only the random session
/// id; everything else lives server-side in Redis.
pub const SESSION_COOKIE: &str = "session_id";

/// Durable sessions ("remember me") live for 30 days.
pub const REMEMBER_TTL_SECS: u64 = 30 * 24 * 3600;
/// Plain sessions expire after 24 hours of store retention; the cookie
/// itself is dropped when the browser closes.
pub const DEFAULT_TTL_SECS: u64 = 24 * 3600;

/// Identity snapshot stored per session: who is logged in and whether
/// the session outlives the browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub remember: bool,
}

impl SessionUser {
    pub fn ttl_secs(&self) -> u64 {
        if self.remember {
            REMEMBER_TTL_SECS
        } else {
            DEFAULT_TTL_SECS
        }
    }
}

/// Per-request session context. Middleware loads the snapshot once at
/// request start; handlers read it immutably. Any state change goes
/// through an explicit [`SessionStore`] call plus a cookie update, not
/// through mutation of this context.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: Option<String>,
    pub user: Option<SessionUser>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        SessionContext {
            session_id: None,
            user: None,
        }
    }

    pub fn authenticated(session_id: String, user: SessionUser) -> Self {
        SessionContext {
            session_id: Some(session_id),
            user: Some(user),
        }
    }
}

/// Server-side session store over Redis. Keys are `session:{uuid}`,
/// values are JSON-serialized [`SessionUser`] records with a TTL.
#[derive(Clone)]
pub struct SessionStore {
    pub conn: ConnectionManager,
}

impl SessionStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn session_key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }

    /// Persist a fresh session and return its id (the cookie value).
    pub async fn create(&self, user: &SessionUser) -> redis::RedisResult<String> {
        let session_id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(user).map_err(|e| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "session encode", e.to_string()))
        })?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::session_key(&session_id), payload, user.ttl_secs())
            .await?;
        Ok(session_id)
    }

    pub async fn get(&self, session_id: &str) -> redis::RedisResult<Option<SessionUser>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(Self::session_key(session_id)).await?;

        // A record that no longer parses is treated as absent rather
        // than a request-fatal error.
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    /// Full session clear: logout.
    pub async fn delete(&self, session_id: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(Self::session_key(session_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_follows_remember_flag() {
        let mut user = SessionUser {
            user_id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            remember: false,
        };
        assert_eq!(user.ttl_secs(), DEFAULT_TTL_SECS);
        user.remember = true;
        assert_eq!(user.ttl_secs(), REMEMBER_TTL_SECS);
    }

    #[test]
    fn session_payload_roundtrips() {
        let user = SessionUser {
            user_id: Uuid::new_v4(),
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            remember: true,
        };
        let payload = serde_json::to_string(&user).unwrap();
        let back: SessionUser = serde_json::from_str(&payload).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn anonymous_context_has_no_identity() {
        let ctx = SessionContext::anonymous();
        assert!(ctx.session_id.is_none());
        assert!(ctx.user.is_none());
    }
}
