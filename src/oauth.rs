use serde::Deserialize;

use crate::config::Config;
use crate::error::HttpError;

/// Google OAuth client wrapping a shared `reqwest::Client`.
///
/// The browser is first redirected to Google's consent screen; the
/// callback hands us an authorization code which this client exchanges
/// for an access token and then resolves to an identity assertion
/// (subject id, email, name, picture). Cloning is cheap because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    pub conn: reqwest::Client,
}

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Identity assertion extracted from Google's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    /// Google's stable subject id for the account.
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

impl GoogleOAuthClient {
    pub fn new(conn: reqwest::Client) -> Self {
        Self { conn }
    }

    /// Build the consent-screen URL the browser is redirected to.
    /// `state` is a random nonce echoed back on the callback.
    pub fn authorization_url(&self, config: &Config, state: &str) -> Result<String, HttpError> {
        let params = [
            ("client_id", config.google_client_id.as_str()),
            ("redirect_uri", config.google_redirect_url.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state),
        ];

        let query = serde_urlencoded::to_string(params)
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        Ok(format!("{}?{}", AUTH_ENDPOINT, query))
    }

    /// Exchange the callback's authorization code for an identity
    /// assertion: token exchange, then userinfo fetch.
    pub async fn fetch_identity(
        &self,
        config: &Config,
        code: &str,
    ) -> Result<GoogleUserInfo, HttpError> {
        let params = [
            ("code", code),
            ("client_id", config.google_client_id.as_str()),
            ("client_secret", config.google_client_secret.as_str()),
            ("redirect_uri", config.google_redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .conn
            .post(TOKEN_ENDPOINT)
            .form(&params)
            .send()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Google token exchange failed: {}", error_body);
            return Err(HttpError::unauthorized("Google login failed"));
        }

        let token: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        let response = self
            .conn
            .get(USERINFO_ENDPOINT)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Google userinfo request failed: {}", error_body);
            return Err(HttpError::unauthorized("Google login failed"));
        }

        let userinfo: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        Ok(userinfo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            app_secret: String::new(),
            jwt_secret: String::new(),
            smtp_server: String::new(),
            smtp_port: 587,
            smtp_username: String::new(),
            smtp_password: String::new(),
            mail_from: String::new(),
            google_client_id: "test-client-id".to_string(),
            google_client_secret: "test-secret".to_string(),
            google_redirect_url: "http://localhost:8000/auth/google/callback".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 8000,
        }
    }

    #[test]
    fn authorization_url_carries_required_params() {
        let client = GoogleOAuthClient::new(reqwest::Client::new());
        let url = client.authorization_url(&test_config(), "state123").unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fauth%2Fgoogle%2Fcallback"
        ));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("state=state123"));
    }
}
