use super::sendmail::send_email;
use crate::config::Config;

// Bodies are built inline; page rendering belongs to the frontend, and
// these three messages are all the email surface there is.

pub async fn send_confirmation_email(
    config: &Config,
    to_email: &str,
    name: &str,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let confirm_link = format!("{}/auth/confirm/{}", config.frontend_url, token);
    let body = format!(
        "<p>Hi {name},</p>\
         <p>Welcome! Please confirm your email address by clicking the link below. \
         The link is valid for one hour.</p>\
         <p><a href=\"{confirm_link}\">Confirm my email</a></p>\
         <p>If you did not sign up, you can ignore this message.</p>"
    );

    send_email(config, to_email, "Confirm your email", body).await
}

pub async fn send_reset_email(
    config: &Config,
    to_email: &str,
    name: &str,
    token: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let reset_link = format!("{}/auth/reset-password/{}", config.frontend_url, token);
    let body = format!(
        "<p>Hi {name},</p>\
         <p>Someone requested a password reset for your account. The link below is \
         valid for one hour and can be used once.</p>\
         <p><a href=\"{reset_link}\">Reset my password</a></p>\
         <p>If this wasn't you, your password is unchanged and you can ignore this \
         message.</p>"
    );

    send_email(config, to_email, "Reset your password", body).await
}

pub async fn send_welcome_email(
    config: &Config,
    to_email: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = format!(
        "<p>Hi {name},</p>\
         <p>Your email is confirmed and your account is ready. Happy writing!</p>"
    );

    send_email(config, to_email, "Welcome aboard", body).await
}
