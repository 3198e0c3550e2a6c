use crate::{
    AppState,
    db::PostExt,
    dtos::{InputPostDto, MessageResponseDto, PostDto, PostListResponseDto, PostResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::{AuthUser, MaybeAuthUser, auth, maybe_auth},
    policy::{self, Access},
};
use axum::{
    Extension, Json, Router, middleware,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use tracing::instrument;
use validator::Validate;

/// JSON API post routes, mounted at `/api`. Mutations require a bearer
/// token; reads take an optional one so owners can see their own
/// private posts.
pub fn post_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts))
        .route(
            "/posts",
            post(create_post)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/posts/{id}",
            get(get_post)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), maybe_auth)),
        )
        .route(
            "/posts/{id}",
            put(update_post)
                .delete(delete_post)
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/my-posts",
            get(my_posts).route_layer(middleware::from_fn_with_state(app_state, auth)),
        )
}

fn db_error(e: sqlx::Error) -> HttpError {
    tracing::error!("DB error: {}", e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

/// Fetch a post and apply the visibility rule: unknown id is 404, a
/// private post the viewer does not own is 403.
async fn fetch_visible_post(
    app_state: &AppState,
    post_id: i32,
    viewer: Option<uuid::Uuid>,
) -> Result<PostDto, HttpError> {
    let post = app_state
        .db_client
        .get_post(post_id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| HttpError::not_found("Post not found"))?;

    match policy::can_view_post(viewer, &post) {
        Access::Allowed => Ok(post),
        Access::Denied(_) => Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        )),
    }
}

/// Public posts, newest first. No authentication required.
#[instrument(skip(app_state))]
pub async fn list_posts(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let posts = app_state
        .db_client
        .get_public_posts()
        .await
        .map_err(db_error)?;

    Ok(Json(PostListResponseDto { posts }))
}

/// Single post. Owners may fetch their private posts by sending a
/// bearer token.
#[instrument(skip(app_state, viewer))]
pub async fn get_post(
    State(app_state): State<AppState>,
    Extension(viewer): Extension<MaybeAuthUser>,
    Path(post_id): Path<i32>,
) -> Result<impl IntoResponse, HttpError> {
    let post = fetch_visible_post(&app_state, post_id, viewer.user_id()).await?;

    Ok(Json(PostResponseDto { post }))
}

/// Create a post. Visibility defaults to public.
#[instrument(skip(app_state, auth_user, body), fields(user_id = %auth_user.user.id))]
pub async fn create_post(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<InputPostDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid post input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let post = app_state
        .db_client
        .create_post(
            auth_user.user.id,
            &body.title,
            &body.content,
            body.is_public.unwrap_or(true),
        )
        .await
        .map_err(db_error)?;

    tracing::info!(post_id = post.id, "Post created");
    Ok((StatusCode::CREATED, Json(PostResponseDto { post })))
}

/// Replace a post's title, content and visibility. Owner-only.
#[instrument(skip(app_state, auth_user, body), fields(user_id = %auth_user.user.id))]
pub async fn update_post(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<i32>,
    Json(body): Json<InputPostDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid post input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let post = fetch_visible_post(&app_state, post_id, Some(auth_user.user.id)).await?;

    if let Access::Denied(_) = policy::can_modify_post(Some(auth_user.user.id), &post) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let post = app_state
        .db_client
        .edit_post(
            post_id,
            &body.title,
            &body.content,
            body.is_public.unwrap_or(post.is_public),
        )
        .await
        .map_err(db_error)?;

    tracing::info!(post_id, "Post updated");
    Ok(Json(PostResponseDto { post }))
}

/// Delete a post; its comments go with it. Owner-only.
#[instrument(skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn delete_post(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(post_id): Path<i32>,
) -> Result<impl IntoResponse, HttpError> {
    let post = fetch_visible_post(&app_state, post_id, Some(auth_user.user.id)).await?;

    if let Access::Denied(_) = policy::can_modify_post(Some(auth_user.user.id), &post) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    app_state
        .db_client
        .delete_post(post_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Post not found"),
            e => db_error(e),
        })?;

    tracing::info!(post_id, "Post deleted");
    Ok(Json(MessageResponseDto {
        message: "Post deleted".to_string(),
    }))
}

/// All of the caller's posts, private ones included.
#[instrument(skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn my_posts(
    State(app_state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, HttpError> {
    let posts = app_state
        .db_client
        .get_posts_by_user(auth_user.user.id)
        .await
        .map_err(db_error)?;

    Ok(Json(PostListResponseDto { posts }))
}
