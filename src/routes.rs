use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        api_auth::api_auth_handler, auth::auth_handler, blog::blog_handler,
        comment::comment_handler, post::post_handler,
    },
    middleware::load_session,
};

/// Assemble the full route tree.
///
/// Three surfaces share one state: browser auth under /auth and the
/// blog pages at the root (session-cookie based, wrapped in
/// `load_session`), and the JSON API under /auth/api and /api
/// (bearer-token based, auth applied per route inside the handlers).
pub fn create_router(app_state: AppState) -> Router {
    let browser_routes = Router::new()
        .nest("/auth", auth_handler())
        .merge(blog_handler())
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            load_session,
        ));

    Router::new()
        .nest("/auth/api", api_auth_handler(app_state.clone()))
        .nest("/api", post_handler(app_state.clone()))
        .nest("/api", comment_handler(app_state.clone()))
        .merge(browser_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
