use lettre::{
    Message, SmtpTransport, Transport,
    message::{SinglePart, header},
    transport::smtp::authentication::Credentials,
};

use crate::config::Config;

/// Send an HTML email through the configured SMTP relay (STARTTLS).
///
/// Delivery is best-effort: callers log failures as warnings and never
/// roll back the database mutation the email was about.
pub async fn send_email(
    config: &Config,
    to_email: &str,
    subject: &str,
    html_body: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let email = Message::builder()
        .from(config.mail_from.parse()?)
        .to(to_email.parse()?)
        .subject(subject)
        .singlepart(
            SinglePart::builder()
                .header(header::ContentType::TEXT_HTML)
                .body(html_body),
        )?;

    let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
    let mailer = SmtpTransport::starttls_relay(&config.smtp_server)?
        .credentials(creds)
        .port(config.smtp_port)
        .build();

    mailer.send(&email)?;

    Ok(())
}
