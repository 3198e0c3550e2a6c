use crate::{
    AppState,
    db::UserExt,
    dtos::{FilterUserDto, LoginUserDto, RegisterUserDto, TokenResponseDto, UserResponseDto},
    error::{ErrorMessage, HttpError},
    mail::mails::send_confirmation_email,
    middleware::{AuthUser, auth},
    policy::{self, Access},
    utils::{confirm, password, token},
};
use axum::{
    Extension, Json, Router, middleware,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

/// JSON API authentication routes, mounted at `/auth/api`.
pub fn api_auth_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route(
            "/profile",
            get(profile).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

/// Register an account over the API. The account starts unconfirmed
/// (a confirmation email goes out), but a bearer token is issued right
/// away for registration-adjacent calls.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid register input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let email = body.email.to_lowercase();

    let hash_password = password::hash(&body.password).map_err(|e| {
        tracing::error!("Password hashing error: {}", e);
        HttpError::server_error(e.to_string())
    })?;

    let user = match app_state
        .db_client
        .save_user(&body.name, &email, &hash_password)
        .await
    {
        Ok(user) => user,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            tracing::error!("DB error, saving user, unique violation: {}", db_err);
            return Err(HttpError::bad_request(
                ErrorMessage::EmailAlreadyRegistered.to_string(),
            ));
        }
        Err(e) => {
            tracing::error!("DB error, saving user: {}", e);
            return Err(HttpError::server_error(
                ErrorMessage::ServerError.to_string(),
            ));
        }
    };

    let confirm_token =
        confirm::create_confirmation_token(&email, app_state.env.app_secret.as_bytes()).map_err(
            |e| {
                tracing::error!("Confirmation token creation error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            },
        )?;

    if let Err(e) = send_confirmation_email(&app_state.env, &email, &user.name, &confirm_token).await
    {
        tracing::warn!("Failed to send confirmation email: {}", e);
    }

    let bearer = token::create_token(&user.id.to_string(), app_state.env.jwt_secret.as_bytes())
        .map_err(|e| {
            tracing::error!("Token creation error: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = %user.id, "API register successful");
    Ok((
        StatusCode::CREATED,
        Json(TokenResponseDto {
            token: bearer,
            user: FilterUserDto::filter_user(&user),
        }),
    ))
}

/// Password login for API clients: confirmed-gated, returns a bearer
/// token with no expiry.
#[instrument(skip(app_state, body), fields(email = %body.email))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
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

    if let Access::Denied(_) = policy::can_login(user.confirmed) {
        return Err(HttpError::unauthorized(
            ErrorMessage::AccountNotConfirmed.to_string(),
        ));
    }

    if let Err(e) = app_state.db_client.update_last_login(user.id).await {
        tracing::warn!("Failed to update last_login: {}", e);
    }

    let bearer = token::create_token(&user.id.to_string(), app_state.env.jwt_secret.as_bytes())
        .map_err(|e| {
            tracing::error!("Token creation error: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    tracing::info!(user_id = %user.id, "API login successful");
    Ok(Json(TokenResponseDto {
        token: bearer,
        user: FilterUserDto::filter_user(&user),
    }))
}

/// Current user's profile, resolved from the bearer token.
#[instrument(skip(auth_user), fields(user_id = %auth_user.user.id))]
pub async fn profile(
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        user: FilterUserDto::filter_user(&auth_user.user),
    }))
}
