pub mod api_auth;
pub mod auth;
pub mod blog;
pub mod comment;
pub mod post;
