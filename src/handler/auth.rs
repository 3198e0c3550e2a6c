use crate::{
    AppState,
    db::UserExt,
    dtos::{
        ForgotPasswordDto, LoginUserDto, MessageResponseDto, OAuthCallbackQuery, RegisterUserDto,
        ResetPasswordDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::{send_confirmation_email, send_reset_email, send_welcome_email},
    policy::{self, Access},
    session::{SESSION_COOKIE, SessionContext, SessionUser},
    utils::{confirm, password},
};
use axum::{
    Extension, Json, Router,
    extract::{Form, Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
use tracing::instrument;
use validator::Validate;

/// Short-lived cookie carrying the OAuth state nonce between the
/// redirect to Google and the callback.
const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Browser authentication routes. Form-driven; successes redirect, and
/// link-flow failures (confirm/reset tokens) redirect with a message
/// rather than erroring, since the frontend renders the pages.
pub fn auth_handler() -> Router<AppState> {
    Router::new()
        .route("/signup", get(signup_page).post(signup))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/confirm/{token}", get(confirm_email))
        .route("/google", get(google_login))
        .route("/google/callback", get(google_callback))
        .route(
            "/forgot-password",
            get(forgot_password_page).post(forgot_password),
        )
        .route(
            "/reset-password/{token}",
            get(reset_password_page).post(reset_password),
        )
}

/// Build a redirect target carrying a flash message as a query
/// parameter, e.g. `/auth/login?notice=Email+confirmed`.
pub(crate) fn flash(path: &str, kind: &str, message: &str) -> String {
    match serde_urlencoded::to_string([(kind, message)]) {
        Ok(query) => format!("{}?{}", path, query),
        Err(_) => path.to_string(),
    }
}

fn session_cookie(session_id: String, remember: bool) -> Cookie<'static> {
    let mut builder = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(true);

    // Without max_age the cookie dies with the browser; "remember"
    // makes it persistent for as long as the server-side session lives.
    if remember {
        builder = builder.max_age(time::Duration::days(30));
    }

    builder.build()
}

async fn signup_page() -> impl IntoResponse {
    Json(MessageResponseDto {
        message: "Sign up with name, email, password and confirm_password.".to_string(),
    })
}

/// Create a local-password account and send the confirmation email.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn signup(
    State(app_state): State<AppState>,
    Form(body): Form<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid signup input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let email = body.email.to_lowercase();

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let result = app_state
        .db_client
        .save_user(&body.name, &email, &hash_password)
        .await;

    match result {
        Ok(user) => {
            // Best-effort notify; the account already exists either way.
            let token =
                confirm::create_confirmation_token(&email, app_state.env.app_secret.as_bytes())
                    .map_err(|e| {
                        tracing::error!("Confirmation token creation error: {}", e);
                        HttpError::server_error(ErrorMessage::ServerError.to_string())
                    })?;

            if let Err(e) =
                send_confirmation_email(&app_state.env, &email, &user.name, &token).await
            {
                tracing::warn!("Failed to send confirmation email: {}", e);
            }

            tracing::info!(user_id = %user.id, "Signup successful");
            Ok(Redirect::to(&flash(
                "/auth/login",
                "notice",
                "Signup successful! Please check your email to confirm your account.",
            )))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            // Two signups racing on one email resolve here: the loser
            // gets a validation error, not a crash.
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            Err(HttpError::bad_request(
                ErrorMessage::EmailAlreadyRegistered.to_string(),
            ))
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ))
        }
    }
}

async fn login_page() -> impl IntoResponse {
    Json(MessageResponseDto {
        message: "Log in with email and password.".to_string(),
    })
}

/// Password login for browser clients. Requires a confirmed account;
/// establishes the server-side session and sets the session cookie.
#[instrument(skip(app_state, cookie_jar, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    cookie_jar: CookieJar,
    Form(body): Form<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let email = body.email.to_lowercase();

    let user = app_state
        .db_client
        .get_user(None, Some(&email), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()))?;

    // OAuth-only accounts have no password to check against.
    let stored_hash = user
        .password
        .as_deref()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()))?;

    let password_matched = password::compare(&body.password, stored_hash).map_err(|e| {
        tracing::error!("Password error: {}", e);
        HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string())
    })?;

    if !password_matched {
        tracing::error!("Password mismatch");
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    // The confirmation gate applies regardless of password correctness.
    if let Access::Denied(_) = policy::can_login(user.confirmed) {
        return Err(HttpError::unauthorized(
            ErrorMessage::AccountNotConfirmed.to_string(),
        ));
    }

    if let Err(e) = app_state.db_client.update_last_login(user.id).await {
        tracing::warn!("Failed to update last_login: {}", e);
    }

    // Explicit session commit: store write plus cookie.
    let session_user = SessionUser {
        user_id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        remember: body.remember,
    };
    let session_id = app_state
        .session_store
        .create(&session_user)
        .await
        .map_err(|e| {
            tracing::error!("Session store error, creating session: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = %user.id, "Login successful");
    Ok((
        cookie_jar.add(session_cookie(session_id, body.remember)),
        Redirect::to("/"),
    ))
}

/// Full session clear.
#[instrument(skip(app_state, cookie_jar, context))]
pub async fn logout(
    State(app_state): State<AppState>,
    cookie_jar: CookieJar,
    Extension(context): Extension<SessionContext>,
) -> Result<impl IntoResponse, HttpError> {
    if let Some(session_id) = &context.session_id {
        if let Err(e) = app_state.session_store.delete(session_id).await {
            tracing::warn!("Session store error, deleting session: {}", e);
        }
    }

    let removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .build();

    Ok((
        cookie_jar.add(removal),
        Redirect::to(&flash("/auth/login", "notice", "Logged out successfully!")),
    ))
}

/// Redeem an emailed confirmation link. Token failures redirect with a
/// message; they are an expected outcome, not a server fault.
#[instrument(skip(app_state, token))]
pub async fn confirm_email(
    Path(token): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let email = match confirm::verify_confirmation_token(&token, app_state.env.app_secret.as_bytes())
    {
        Ok(email) => email,
        Err(ErrorMessage::TokenExpired) => {
            return Ok(Redirect::to(&flash(
                "/auth/login",
                "error",
                "The confirmation link has expired. Please sign up again.",
            )));
        }
        Err(_) => {
            return Ok(Redirect::to(&flash(
                "/auth/login",
                "error",
                "The confirmation link is invalid.",
            )));
        }
    };

    let user = app_state
        .db_client
        .get_user(None, Some(&email), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let Some(user) = user else {
        return Ok(Redirect::to(&flash(
            "/auth/login",
            "error",
            "The confirmation link is invalid.",
        )));
    };

    // Re-confirming an already-confirmed account is a no-op success.
    if user.confirmed {
        return Ok(Redirect::to(&flash(
            "/auth/login",
            "notice",
            "Your email was already confirmed. Please log in.",
        )));
    }

    app_state
        .db_client
        .confirm_email(&email)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, "DB error, confirming email: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    if let Err(e) = send_welcome_email(&app_state.env, &email, &user.name).await {
        tracing::warn!("Failed to send welcome email: {}", e);
    }

    tracing::info!(user_id = %user.id, "Email confirmation successful");
    Ok(Redirect::to(&flash(
        "/auth/login",
        "notice",
        "Email confirmed! Please log in.",
    )))
}

/// Kick off the Google login: stash a state nonce in a short-lived
/// cookie and send the browser to the consent screen.
#[instrument(skip(app_state, cookie_jar))]
pub async fn google_login(
    State(app_state): State<AppState>,
    cookie_jar: CookieJar,
) -> Result<impl IntoResponse, HttpError> {
    let state = uuid::Uuid::new_v4().to_string();
    let url = app_state
        .oauth_client
        .authorization_url(&app_state.env, &state)?;

    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, state))
        .path("/auth")
        .http_only(true)
        .secure(true)
        .max_age(time::Duration::minutes(10))
        .build();

    Ok((cookie_jar.add(state_cookie), Redirect::to(&url)))
}

/// Google redirects back here with a code. Exchange it, then link or
/// create the local account and establish a session. Any failure along
/// the way is a login failure, not a 500.
#[instrument(skip(app_state, cookie_jar, query))]
pub async fn google_callback(
    State(app_state): State<AppState>,
    cookie_jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let failed = || {
        Redirect::to(&flash(
            "/auth/login",
            "error",
            "Google login failed. Please try again.",
        ))
    };

    let stored_state = cookie_jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());
    let cookie_jar = cookie_jar.remove(
        Cookie::build((OAUTH_STATE_COOKIE, ""))
            .path("/auth")
            .build(),
    );

    let (Some(code), Some(state)) = (query.code, query.state) else {
        tracing::error!("OAuth callback missing code or state");
        return Ok((cookie_jar, failed()));
    };

    if stored_state.as_deref() != Some(state.as_str()) {
        tracing::error!("OAuth state mismatch");
        return Ok((cookie_jar, failed()));
    }

    let identity = match app_state
        .oauth_client
        .fetch_identity(&app_state.env, &code)
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("OAuth identity fetch failed: {}", e);
            return Ok((cookie_jar, failed()));
        }
    };

    let email = identity.email.to_lowercase();
    let display_name = identity
        .name
        .clone()
        .unwrap_or_else(|| email.split('@').next().unwrap_or("user").to_string());

    // Returning Google user first; only then fall back to linking by
    // email match.
    let by_google_id = app_state
        .db_client
        .get_user(None, None, Some(&identity.sub), None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let user = match by_google_id {
        Some(user) => {
            if let Err(e) = app_state.db_client.update_last_login(user.id).await {
                tracing::warn!("Failed to update last_login: {}", e);
            }
            user
        }
        None => {
            let by_email = app_state
                .db_client
                .get_user(None, Some(&email), None, None)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, getting user: {}", e);
                    HttpError::server_error(ErrorMessage::ServerError.to_string())
                })?;

            match by_email {
                Some(user) => {
                    // Linking by email match attaches the Google
                    // identity to whichever account owns this address.
                    // Logged so the takeover-by-email behavior is
                    // visible.
                    tracing::info!(user_id = %user.id, "Linking Google identity to existing account");
                    app_state
                        .db_client
                        .link_google_account(user.id, &identity.sub, identity.picture.as_deref())
                        .await
                        .map_err(|e| {
                            tracing::error!("DB error, linking google account: {}", e);
                            HttpError::server_error(ErrorMessage::ServerError.to_string())
                        })?
                }
                None => app_state
                    .db_client
                    .save_oauth_user(
                        &display_name,
                        &email,
                        &identity.sub,
                        identity.picture.as_deref(),
                    )
                    .await
                    .map_err(|e| {
                        tracing::error!("DB error, saving oauth user: {}", e);
                        HttpError::server_error(ErrorMessage::ServerError.to_string())
                    })?,
            }
        }
    };

    let session_user = SessionUser {
        user_id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        remember: false,
    };
    let session_id = app_state
        .session_store
        .create(&session_user)
        .await
        .map_err(|e| {
            tracing::error!("Session store error, creating session: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = %user.id, "Google login successful");
    Ok((
        cookie_jar.add(session_cookie(session_id, false)),
        Redirect::to("/"),
    ))
}

async fn forgot_password_page() -> impl IntoResponse {
    Json(MessageResponseDto {
        message: "Enter your email to receive a password reset link.".to_string(),
    })
}

/// Issue a single-use reset token, valid for one hour, and email it.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Form(body): Form<ForgotPasswordDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid forgot_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let email = body.email.to_lowercase();

    let user = app_state
        .db_client
        .get_user(None, Some(&email), None, None)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?
        .ok_or_else(|| HttpError::bad_request("Email not found".to_string()))?;

    let reset_token = uuid::Uuid::new_v4().to_string();
    let expiry = Utc::now() + Duration::hours(1);

    app_state
        .db_client
        .set_reset_token(user.id, &reset_token, expiry)
        .await
        .map_err(|e| {
            tracing::error!("DB error, setting reset token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // The token row is already committed; delivery failure only costs
    // the notification.
    if let Err(e) = send_reset_email(&app_state.env, &email, &user.name, &reset_token).await {
        tracing::warn!("Failed to send reset email: {}", e);
    }

    tracing::info!(user_id = %user.id, "Password reset token issued");
    Ok(Redirect::to(&flash(
        "/auth/login",
        "notice",
        "A password reset link has been sent to your email.",
    )))
}

/// Token pre-check so the frontend can show the form or the failure.
#[instrument(skip(app_state, token))]
pub async fn reset_password_page(
    Path(token): Path<String>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    match lookup_valid_reset_user(&app_state, &token).await? {
        Some(_) => Ok(Json(MessageResponseDto {
            message: "Enter a new password and confirm it.".to_string(),
        })
        .into_response()),
        None => Ok(Redirect::to(&flash(
            "/auth/forgot-password",
            "error",
            "The reset link is invalid or has expired.",
        ))
        .into_response()),
    }
}

/// Redeem a reset token: set the new password and burn the token.
#[instrument(skip(app_state, token, body))]
pub async fn reset_password(
    Path(token): Path<String>,
    State(app_state): State<AppState>,
    Form(body): Form<ResetPasswordDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid reset_password input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let Some(user) = lookup_valid_reset_user(&app_state, &token).await? else {
        return Ok(Redirect::to(&flash(
            "/auth/forgot-password",
            "error",
            "The reset link is invalid or has expired.",
        )));
    };

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    // Clears the token pair in the same statement: single-use.
    app_state
        .db_client
        .reset_password(user.id, &hash_password)
        .await
        .map_err(|e| {
            tracing::error!("DB error, resetting password: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = %user.id, "Password reset successful");
    Ok(Redirect::to(&flash(
        "/auth/login",
        "notice",
        "Password has been reset. Please log in.",
    )))
}

/// Resolve a reset token to its user, honoring the absolute expiry.
async fn lookup_valid_reset_user(
    app_state: &AppState,
    token: &str,
) -> Result<Option<crate::models::User>, HttpError> {
    let user = app_state
        .db_client
        .get_user(None, None, None, Some(token))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting user by reset token: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    Ok(user.filter(|u| reset_token_live(u.reset_token_expiry, Utc::now())))
}

/// A reset token is honored only while its recorded absolute expiry
/// lies in the future; a token whose expiry was already cleared (spent)
/// or never set does not verify.
fn reset_token_live(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expiry.map(|e| e > now).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_token_expires_after_its_window() {
        let now = Utc::now();
        assert!(reset_token_live(Some(now + Duration::minutes(30)), now));
        assert!(!reset_token_live(Some(now - Duration::minutes(1)), now));
        assert!(!reset_token_live(Some(now), now));
    }

    #[test]
    fn spent_token_with_cleared_expiry_never_verifies() {
        assert!(!reset_token_live(None, Utc::now()));
    }

    #[test]
    fn flash_encodes_message_into_query() {
        assert_eq!(
            flash("/auth/login", "notice", "Email confirmed! Please log in."),
            "/auth/login?notice=Email+confirmed%21+Please+log+in."
        );
    }
}
