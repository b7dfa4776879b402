//! SMTP email delivery.
//!
//! Configuration is loaded from `SMTP_*` environment variables; if
//! `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and no
//! mailer is constructed.

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::content::NotificationContent;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "noreply@studiora.local";

const SUBJECT_PREFIX: &str = "[Studiora]";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Absolute base for links in email bodies, e.g. `https://studiora.ru`.
    pub public_base_url: String,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable             | Required | Default                  |
    /// |----------------------|----------|--------------------------|
    /// | `SMTP_HOST`          | yes      | --                       |
    /// | `SMTP_PORT`          | no       | `587`                    |
    /// | `SMTP_FROM`          | no       | `noreply@studiora.local` |
    /// | `SMTP_USER`          | no       | --                       |
    /// | `SMTP_PASSWORD`      | no       | --                       |
    /// | `PLATFORM_BASE_URL`  | no       | `http://localhost:3000`  |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            public_base_url: std::env::var("PLATFORM_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends notification emails via SMTP.
pub struct EmailDelivery {
    config: EmailConfig,
}

impl EmailDelivery {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Subject and plain-text body for a notification.
    pub fn compose(&self, content: &NotificationContent) -> (String, String) {
        let subject = format!("{SUBJECT_PREFIX} {}", content.title);
        let mut body = content.body.clone();
        if let Some(link) = &content.link {
            body.push_str("\n\n");
            body.push_str(self.config.public_base_url.trim_end_matches('/'));
            body.push_str(link);
        }
        (subject, body)
    }

    /// Send `content` to `to_email`.
    pub async fn deliver(
        &self,
        to_email: &str,
        content: &NotificationContent,
    ) -> Result<(), EmailError> {
        let (subject, body) = self.compose(content);

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, kind = %content.kind, "Notification email sent");
        Ok(())
    }
}
