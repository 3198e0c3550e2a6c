mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod mail;
mod middleware;
mod models;
mod oauth;
mod policy;
mod routes;
mod session;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use oauth::GoogleOAuthClient;
use session::SessionStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
    pub session_store: SessionStore,
    pub oauth_client: GoogleOAuthClient,
}

#[tokio::main]
async fn main() {
    let _guard = tracing_config::init_tracing();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful!");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>().unwrap())
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let db_client = DBClient::new(pool);

    let manager = match redis::Client::open(config.redis_url.clone()) {
        Ok(client) => match client.get_connection_manager().await {
            Ok(manager) => {
                tracing::info!("Connection to redis is successful!");
                manager
            }
            Err(err) => {
                tracing::error!("Failed to connect to redis: {:?}", err);
                std::process::exit(1);
            }
        },
        Err(err) => {
            tracing::error!("Invalid redis url: {:?}", err);
            std::process::exit(1);
        }
    };

    let session_store = SessionStore::new(manager);

    let oauth_client = GoogleOAuthClient::new(reqwest::Client::new());

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        session_store,
        oauth_client,
    };

    let app = routes::create_router(app_state).layer(cors);

    tracing::info!("Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
