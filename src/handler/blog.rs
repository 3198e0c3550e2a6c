use crate::{
    AppState,
    db::{CommentExt, PostExt, UserExt},
    dtos::{
        FilterUserDto, InputCommentDto, InputPostDto, MessageResponseDto, PostDto,
        PostListResponseDto, PostPageDto, PostResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    handler::auth::flash,
    policy::{self, Access, DenyReason},
    session::{SessionContext, SessionUser},
};
use axum::{
    Extension, Json, Router,
    extract::{Form, Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::instrument;
use validator::Validate;

/// Browser-facing blog routes, session-cookie authenticated. Denials
/// redirect rather than answering with a bare error body: anonymous
/// visitors go to the login page, ownership and visibility violations
/// go back to the front page with a warning flash.
pub fn blog_handler() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/post/{id}", get(view_post).post(add_comment))
        .route("/create", get(create_page).post(create_post))
        .route("/edit/{id}", get(edit_page).post(edit_post))
        .route("/delete/{id}", post(delete_post))
        .route("/profile", get(profile))
        .route("/my-posts", get(my_posts))
}

/// Resolve the session user or bail out with a login redirect.
fn require_user(context: &SessionContext) -> Result<&SessionUser, Redirect> {
    context
        .user
        .as_ref()
        .ok_or_else(|| Redirect::to(&flash("/auth/login", "notice", "Please log in first")))
}

/// Redirect target for an ownership or visibility denial.
fn denied_target() -> String {
    flash("/", "error", &ErrorMessage::PermissionDenied.to_string())
}

fn denied_redirect() -> Response {
    Redirect::to(&denied_target()).into_response()
}

fn fetch_error(e: sqlx::Error) -> HttpError {
    tracing::error!("DB error: {}", e);
    HttpError::server_error(ErrorMessage::ServerError.to_string())
}

async fn get_post_or_404(app_state: &AppState, post_id: i32) -> Result<PostDto, HttpError> {
    app_state
        .db_client
        .get_post(post_id)
        .await
        .map_err(fetch_error)?
        .ok_or_else(|| HttpError::not_found("Post not found"))
}

/// Front page: every public post, newest first.
#[instrument(skip(app_state))]
pub async fn home(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let posts = app_state
        .db_client
        .get_public_posts()
        .await
        .map_err(fetch_error)?;

    Ok(Json(PostListResponseDto { posts }))
}

/// Post detail page with its comment thread. A private post redirects
/// non-owners away with a warning.
#[instrument(skip(app_state, context))]
pub async fn view_post(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Path(post_id): Path<i32>,
) -> Result<Response, HttpError> {
    let viewer = context.user.as_ref().map(|u| u.user_id);
    let post = get_post_or_404(&app_state, post_id).await?;

    if let Access::Denied(_) = policy::can_view_post(viewer, &post) {
        return Ok(denied_redirect());
    }

    let comments = app_state
        .db_client
        .get_comments(post_id)
        .await
        .map_err(fetch_error)?;

    Ok(Json(PostPageDto { post, comments }).into_response())
}

/// Comment form submission under a post.
#[instrument(skip(app_state, context, body))]
pub async fn add_comment(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Path(post_id): Path<i32>,
    Form(body): Form<InputCommentDto>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    if let Err(e) = body.validate() {
        let target = flash(&format!("/post/{}", post_id), "error", &e.to_string());
        return Ok(Redirect::to(&target).into_response());
    }

    let post = get_post_or_404(&app_state, post_id).await?;

    match policy::can_comment(Some(user.user_id), &post) {
        Access::Allowed => {}
        Access::Denied(DenyReason::Unauthenticated) => {
            return Ok(Redirect::to(&flash("/auth/login", "notice", "Please log in first"))
                .into_response());
        }
        Access::Denied(_) => return Ok(denied_redirect()),
    }

    app_state
        .db_client
        .create_comment(user.user_id, post_id, &body.content)
        .await
        .map_err(fetch_error)?;

    tracing::info!(user_id = %user.user_id, post_id, "Comment added");
    Ok(Redirect::to(&format!("/post/{}", post_id)).into_response())
}

async fn create_page(Extension(context): Extension<SessionContext>) -> Response {
    match require_user(&context) {
        Ok(_) => Json(MessageResponseDto {
            message: "Write a new post with title, content and is_public.".to_string(),
        })
        .into_response(),
        Err(redirect) => redirect.into_response(),
    }
}

/// New post form submission. Visibility defaults to public when the
/// form leaves it unset.
#[instrument(skip(app_state, context, body))]
pub async fn create_post(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Form(body): Form<InputPostDto>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    if let Err(e) = body.validate() {
        return Ok(Redirect::to(&flash("/create", "error", &e.to_string())).into_response());
    }

    let post = app_state
        .db_client
        .create_post(
            user.user_id,
            &body.title,
            &body.content,
            body.is_public.unwrap_or(true),
        )
        .await
        .map_err(fetch_error)?;

    tracing::info!(user_id = %user.user_id, post_id = post.id, "Post created");
    Ok(Redirect::to(&format!("/post/{}", post.id)).into_response())
}

/// Edit page data, owner-only.
#[instrument(skip(app_state, context))]
pub async fn edit_page(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Path(post_id): Path<i32>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let post = get_post_or_404(&app_state, post_id).await?;

    match policy::can_modify_post(Some(user.user_id), &post) {
        Access::Allowed => Ok(Json(PostResponseDto { post }).into_response()),
        Access::Denied(_) => Ok(denied_redirect()),
    }
}

/// Edit form submission, owner-only.
#[instrument(skip(app_state, context, body))]
pub async fn edit_post(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Path(post_id): Path<i32>,
    Form(body): Form<InputPostDto>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    if let Err(e) = body.validate() {
        let target = flash(&format!("/edit/{}", post_id), "error", &e.to_string());
        return Ok(Redirect::to(&target).into_response());
    }

    let post = get_post_or_404(&app_state, post_id).await?;

    if let Access::Denied(_) = policy::can_modify_post(Some(user.user_id), &post) {
        return Ok(denied_redirect());
    }

    let updated = app_state
        .db_client
        .edit_post(
            post_id,
            &body.title,
            &body.content,
            body.is_public.unwrap_or(post.is_public),
        )
        .await
        .map_err(fetch_error)?;

    tracing::info!(user_id = %user.user_id, post_id, "Post edited");
    Ok(Redirect::to(&format!("/post/{}", updated.id)).into_response())
}

/// Delete a post and its comment thread, owner-only.
#[instrument(skip(app_state, context))]
pub async fn delete_post(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
    Path(post_id): Path<i32>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let post = get_post_or_404(&app_state, post_id).await?;

    if let Access::Denied(_) = policy::can_modify_post(Some(user.user_id), &post) {
        return Ok(denied_redirect());
    }

    app_state
        .db_client
        .delete_post(post_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("Post not found"),
            e => fetch_error(e),
        })?;

    tracing::info!(user_id = %user.user_id, post_id, "Post deleted");
    Ok(Redirect::to(&flash("/", "notice", "Post deleted")).into_response())
}

/// Account page for the logged-in user.
#[instrument(skip(app_state, context))]
pub async fn profile(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let account = app_state
        .db_client
        .get_user(Some(user.user_id), None, None, None)
        .await
        .map_err(fetch_error)?
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    Ok(Json(UserResponseDto {
        user: FilterUserDto::filter_user(&account),
    })
    .into_response())
}

/// The logged-in user's own posts, private ones included.
#[instrument(skip(app_state, context))]
pub async fn my_posts(
    State(app_state): State<AppState>,
    Extension(context): Extension<SessionContext>,
) -> Result<Response, HttpError> {
    let user = match require_user(&context) {
        Ok(user) => user.clone(),
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let posts = app_state
        .db_client
        .get_posts_by_user(user.user_id)
        .await
        .map_err(fetch_error)?;

    Ok(Json(PostListResponseDto { posts }).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_redirects_home_with_warning_flash() {
        assert_eq!(
            denied_target(),
            "/?error=You+are+not+allowed+to+perform+this+action"
        );
    }
}
