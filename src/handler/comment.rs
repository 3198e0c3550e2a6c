use crate::{
    AppState,
    db::{CommentExt, PostExt},
    dtos::{CommentListResponseDto, CommentResponseDto, InputCommentDto},
    error::{ErrorMessage, HttpError},
    middleware::{AuthUser, MaybeAuthUser, auth, maybe_auth},
    policy::{self, Access},
};
use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

/// JSON API comment routes, nested under `/api/posts/{id}/comments`.
pub fn comment_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/posts/{id}/comments",
            get(list_comments)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), maybe_auth)),
        )
        .route(
            "/posts/{id}/comments",
            post(create_comment)
                .route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn db_error(e: sqlx::Error) -> HttpError {
    tracing::error!("DB error: {}", e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

/// Comments under a post, oldest first. The post's visibility rule
/// applies: a private post's thread answers 403 to anyone but the
/// owner.
#[instrument(skip(app_state, viewer))]
pub async fn list_comments(
    State(app_state): State<AppState>,
    Extension(viewer): Extension<MaybeAuthUser>,
    Path(post_id): Path<i32>,
) -> Result<impl IntoResponse, HttpError> {
    let post = app_state
        .db_client
        .get_post(post_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::not_found("Post not found"))?;

    if let Access::Denied(_) = policy::can_view_post(viewer.user_id(), &post) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let comments = app_state
        .db_client
        .get_comments(post_id)
        .await
        .map_err(db_error)?;

    Ok(Json(CommentListResponseDto { comments }))
}

/// Add a comment under a post. Requires a bearer token; only the owner
/// may comment under their private post.
#[instrument(skip(app_state, auth_user, body), fields(user_id = %auth_user.user.id))]
pub async fn create_comment(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<i32>,
    Json(body): Json<InputCommentDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid comment input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let post = app_state
        .db_client
        .get_post(post_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::not_found("Post not found"))?;

    match policy::can_comment(Some(auth_user.user.id), &post) {
        Access::Allowed => {}
        Access::Denied(_) => {
            return Err(HttpError::forbidden(
                ErrorMessage::PermissionDenied.to_string(),
            ));
        }
    }

    let comment = app_state
        .db_client
        .create_comment(auth_user.user.id, post_id, &body.content)
        .await
        .map_err(db_error)?;

    tracing::info!(post_id, comment_id = comment.id, "Comment added");
    Ok((StatusCode::CREATED, Json(CommentResponseDto { comment })))
}
