use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::User,
    session::{SESSION_COOKIE, SessionContext},
    utils::token,
};

/// Authenticated API identity, inserted into request extensions by
/// [`auth`]. Handlers extract it with `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
}

/// Bearer-token middleware for the JSON API.
///
/// Rejects with 401 when the Authorization header is missing, the token
/// does not verify, or the subject no longer resolves to a user.
pub async fn auth(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(|t| t.to_owned()))
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let subject = token::decode_token(token, app_state.env.jwt_secret.as_bytes())?;

    let user_id = uuid::Uuid::parse_str(&subject)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::TokenInvalid.to_string()))?;

    // The token may outlive its user; resolve the claim on every call.
    let user = app_state
        .db_client
        .get_user(Some(user_id), None, None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, resolving token subject: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    req.extensions_mut().insert(AuthUser { user });

    Ok(next.run(req).await)
}

/// Possibly-anonymous API identity, inserted by [`maybe_auth`]. Always
/// present on routes behind that middleware.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<User>);

impl MaybeAuthUser {
    pub fn user_id(&self) -> Option<uuid::Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}

/// Soft bearer-token middleware for API reads where identity only
/// widens what is visible (an owner sees their own private posts).
///
/// A valid token resolves to an identity; a missing or bad one passes
/// the request through anonymously instead of rejecting it.
pub async fn maybe_auth(
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(|t| t.to_owned()));

    let mut identity = None;

    if let Some(token) = token
        && let Ok(subject) = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        && let Ok(user_id) = uuid::Uuid::parse_str(&subject)
    {
        match app_state
            .db_client
            .get_user(Some(user_id), None, None, None)
            .await
        {
            Ok(user) => identity = user,
            Err(e) => {
                tracing::error!("DB error, resolving token subject: {}", e);
                return Err(HttpError::server_error(ErrorMessage::ServerError.to_string()));
            }
        }
    }

    req.extensions_mut().insert(MaybeAuthUser(identity));

    Ok(next.run(req).await)
}

/// Session-loading middleware for the browser routes.
///
/// Loads the identity snapshot behind the session cookie (if any) into
/// a [`SessionContext`] extension and always lets the request through;
/// handlers decide per-route whether anonymous access is acceptable.
pub async fn load_session(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let context = match cookie_jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            let session_id = cookie.value().to_string();
            let user = app_state
                .session_store
                .get(&session_id)
                .await
                .unwrap_or_else(|e| {
                    // A session-store hiccup downgrades to anonymous
                    // rather than failing the request.
                    tracing::warn!("Session store error, treating as anonymous: {}", e);
                    None
                });

            match user {
                Some(user) => SessionContext::authenticated(session_id, user),
                None => SessionContext::anonymous(),
            }
        }
        None => SessionContext::anonymous(),
    };

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
