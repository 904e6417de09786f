//! Outgoing email.
//!
//! [`SmtpMailer`] sends through `lettre`'s async SMTP transport. When
//! `SMTP_HOST` is unset, [`EmailConfig::from_env`] returns `None` and the
//! server runs with [`LogMailer`], which only logs what would have been sent.
//! Mail failures never fail the request that triggered them.

use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_FROM_ADDRESS: &str = "Build Watch <noreply@buildwatch.local>";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load SMTP settings, or `None` when `SMTP_HOST` is unset or empty.
    ///
    /// | Variable        | Required | Default                                  |
    /// |-----------------|----------|------------------------------------------|
    /// | `SMTP_HOST`     | yes      | --                                       |
    /// | `SMTP_PORT`     | no       | `587`                                    |
    /// | `SMTP_FROM`     | no       | `Build Watch <noreply@buildwatch.local>` |
    /// | `SMTP_USER`     | no       | --                                       |
    /// | `SMTP_PASSWORD` | no       | --                                       |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
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
        })
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

/// Sends a plain-text message to one address.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError>;
}

/// SMTP delivery with STARTTLS.
pub struct SmtpMailer {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from_address: config.from_address.clone(),
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(email).await?;
        tracing::info!(to, subject, "Email sent");
        Ok(())
    }
}

/// Fallback used when SMTP is not configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
        tracing::warn!(to, subject, "SMTP not configured; email not sent");
        Ok(())
    }
}

/// Build the mailer for the process: SMTP when configured, otherwise log-only.
pub fn mailer_from_env() -> Arc<dyn Mailer> {
    match EmailConfig::from_env() {
        Some(config) => match SmtpMailer::new(&config) {
            Ok(mailer) => {
                tracing::info!(host = %config.smtp_host, port = config.smtp_port, "SMTP mailer configured");
                Arc::new(mailer)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid SMTP configuration; falling back to log-only mailer");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    }
}

/// Send and log the outcome. Never fails.
pub async fn send_logged(mailer: &dyn Mailer, to: &str, subject: &str, body: &str) {
    if let Err(e) = mailer.send(to, subject, body).await {
        tracing::warn!(to, subject, error = %e, "Failed to send email");
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

pub fn welcome_message(full_name: &str, username: &str, role: &str) -> (String, String) {
    (
        "Welcome to Build Watch".to_string(),
        format!(
            "Hello {full_name},\n\n\
             An account has been created for you.\n\
             Username: {username}\n\
             Role: {role}\n\n\
             Sign in with the password provided by your administrator and change it \
             from your profile page."
        ),
    )
}

pub fn password_reset_message(full_name: &str, temporary_password: &str) -> (String, String) {
    (
        "Your Build Watch password was reset".to_string(),
        format!(
            "Hello {full_name},\n\n\
             An administrator reset your password.\n\
             Temporary password: {temporary_password}\n\n\
             Change it after signing in."
        ),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Records messages instead of sending them.
    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push((to.to_string(), subject.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), EmailError> {
            Err(EmailError::Build("boom".into()))
        }
    }

    #[tokio::test]
    async fn send_logged_delivers_through_the_trait() {
        let mailer = RecordingMailer::default();
        send_logged(&mailer, "a@example.com", "Hi", "body").await;
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("a@example.com".to_string(), "Hi".to_string())]);
    }

    #[tokio::test]
    async fn send_logged_swallows_failures() {
        send_logged(&FailingMailer, "a@example.com", "Hi", "body").await;
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer.send("a@example.com", "Hi", "body").await.is_ok());
    }

    #[test]
    fn messages_mention_their_subject() {
        let (subject, body) = welcome_message("Ana Cruz", "acruz", "EIU");
        assert_eq!(subject, "Welcome to Build Watch");
        assert!(body.contains("acruz"));
        assert!(body.contains("EIU"));

        let (_, body) = password_reset_message("Ana Cruz", "Xy12Zw34Ab56");
        assert!(body.contains("Xy12Zw34Ab56"));
    }
}
