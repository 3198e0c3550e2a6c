use crate::models::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// DTOs define the exact shape of data exchanged with clients, separate
// from database rows so the wire contract stays explicit per endpoint.

// ============================================================================
// Authentication DTOs
// ============================================================================

/// Signup request, shared by the browser form and `POST /auth/api/register`.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    pub confirm_password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Browser-only "remember me" flag; keeps the session beyond the
    /// browser close. Ignored by the API login route.
    #[serde(default)]
    pub remember: bool,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct ForgotPasswordDto {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ResetPasswordDto {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    pub confirm_password: String,
}

/// Query parameters Google sends back to the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

// ============================================================================
// User response DTOs
// ============================================================================

/// Client-safe view of a user. Excludes the password hash and the
/// reset-token fields.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub confirmed: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            confirmed: user.confirmed,
            avatar_url: user.avatar_url.to_owned(),
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// `{"user": {...}}` envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponseDto {
    pub user: FilterUserDto,
}

/// `{"message": "..."}` envelope for mutations without a body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponseDto {
    pub message: String,
}

/// API login/register success: a bearer token plus the user it names.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponseDto {
    pub token: String,
    pub user: FilterUserDto,
}

// ============================================================================
// Post DTOs
// ============================================================================

/// Post creation/update body, shared by the browser form and the API.
/// `is_public` is optional and defaults to true on create.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InputPostDto {
    #[validate(length(min = 1, message = "Title is required."))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required."))]
    pub content: String,

    pub is_public: Option<bool>,
}

/// Post with its author's display name joined in, matching the wire
/// shape of the post endpoints.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct PostDto {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub author_id: uuid::Uuid,
    pub is_public: bool,
}

/// `{"post": {...}}` envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponseDto {
    pub post: PostDto,
}

/// `{"posts": [...]}` envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponseDto {
    pub posts: Vec<PostDto>,
}

/// Post detail page payload: the post plus its comment thread.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostPageDto {
    pub post: PostDto,
    pub comments: Vec<CommentDto>,
}

// ============================================================================
// Comment DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct InputCommentDto {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Content must be between 1 and 1000 characters"
    ))]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CommentDto {
    pub id: i32,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub author_id: uuid::Uuid,
    pub post_id: i32,
}

/// `{"comment": {...}}` envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponseDto {
    pub comment: CommentDto,
}

/// `{"comments": [...]}` envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponseDto {
    pub comments: Vec<CommentDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn register_rejects_short_password() {
        let body = RegisterUserDto {
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            password: "short".to_string(),
            confirm_password: "short".to_string(),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn register_rejects_mismatched_confirmation() {
        let body = RegisterUserDto {
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            password: "longpass1".to_string(),
            confirm_password: "longpass2".to_string(),
        };
        assert!(body.validate().is_err());
    }

    #[test]
    fn register_accepts_valid_body() {
        let body = RegisterUserDto {
            name: "Ann".to_string(),
            email: "A@x.com".to_string(),
            password: "longpass1".to_string(),
            confirm_password: "longpass1".to_string(),
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn login_remember_defaults_to_false() {
        let body: LoginUserDto =
            serde_json::from_str(r#"{"email":"a@x.com","password":"longpass1"}"#).unwrap();
        assert!(!body.remember);
    }

    #[test]
    fn post_input_visibility_is_optional() {
        let body: InputPostDto =
            serde_json::from_str(r#"{"title":"Hi","content":"Body"}"#).unwrap();
        assert!(body.is_public.is_none());
        assert!(body.validate().is_ok());
    }
}
