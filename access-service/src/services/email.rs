use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ServiceError;
use crate::config::EmailConfig;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), ServiceError>;

    async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<(), ServiceError>;
}

/// Frontend page a verification link points at.
pub fn verification_link(frontend_url: &str, token: &str) -> String {
    format!("{}/verify-email?token={}", frontend_url.trim_end_matches('/'), token)
}

/// Frontend page a reset link points at.
pub fn reset_password_link(frontend_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), token)
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
    frontend_url: String,
}

impl EmailService {
    pub fn new(config: &EmailConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::starttls_relay(&config.smtp_host)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e)))?
            .credentials(creds)
            .port(config.smtp_port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.smtp_host, port = config.smtp_port, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
            frontend_url: config.frontend_url.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: String,
        html_body: String,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| ServiceError::Internal(e.into()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Internal(e.into()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| ServiceError::Internal(e.into()))?;

        // SmtpTransport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(ServiceError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), ServiceError> {
        let link = verification_link(&self.frontend_url, token);

        self.send_email(
            to_email,
            "Please verify your email",
            format!("Click on the link to verify your email: {}", link),
            format!(r#"<a href="{}">Click here to verify your email</a>"#, link),
        )
        .await
    }

    async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<(), ServiceError> {
        let link = reset_password_link(&self.frontend_url, token);

        self.send_email(
            to_email,
            "Password Reset Request",
            format!(
                "You have requested a password reset. Please click on the following link to reset your password: {}",
                link
            ),
            format!(
                r#"<p>You have requested a password reset. Please click on the following link to reset your password:</p><a href="{}">Reset Password</a>"#,
                link
            ),
        )
        .await
    }
}

/// Used when `EMAIL_ENABLED=false`: logs instead of sending.
#[derive(Clone, Default)]
pub struct LogOnlyEmailService;

#[async_trait]
impl EmailProvider for LogOnlyEmailService {
    async fn send_verification_email(&self, to_email: &str, _token: &str) -> Result<(), ServiceError> {
        tracing::info!(to = %to_email, "Email delivery disabled; verification email not sent");
        Ok(())
    }

    async fn send_password_reset_email(&self, to_email: &str, _token: &str) -> Result<(), ServiceError> {
        tracing::info!(to = %to_email, "Email delivery disabled; reset email not sent");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentEmailKind {
    Verification,
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub kind: SentEmailKind,
    pub to: String,
    pub token: String,
}

/// Records every email instead of sending it. Can be told to fail.
#[derive(Clone, Default)]
pub struct MockEmailService {
    sent: Arc<Mutex<Vec<SentEmail>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Token of the most recent email of `kind` sent to `to`.
    pub fn last_token(&self, kind: SentEmailKind, to: &str) -> Option<String> {
        self.sent()
            .into_iter()
            .rev()
            .find(|e| e.kind == kind && e.to == to)
            .map(|e| e.token)
    }

    fn record(&self, kind: SentEmailKind, to: &str, token: &str) -> Result<(), ServiceError> {
        if self.failing.lock().map(|f| *f).unwrap_or(false) {
            return Err(ServiceError::EmailError("mock delivery failure".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentEmail {
                kind,
                to: to.to_string(),
                token: token.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), ServiceError> {
        self.record(SentEmailKind::Verification, to_email, token)
    }

    async fn send_password_reset_email(&self, to_email: &str, token: &str) -> Result<(), ServiceError> {
        self.record(SentEmailKind::PasswordReset, to_email, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_point_at_frontend_pages() {
        assert_eq!(
            verification_link("https://app.example.com/", "abc"),
            "https://app.example.com/verify-email?token=abc"
        );
        assert_eq!(
            reset_password_link("https://app.example.com", "abc"),
            "https://app.example.com/reset-password?token=abc"
        );
    }

    #[tokio::test]
    async fn test_mock_records_and_fails_on_demand() {
        let mock = MockEmailService::new();
        mock.send_verification_email("a@x.com", "t1").await.unwrap();
        assert_eq!(
            mock.last_token(SentEmailKind::Verification, "a@x.com"),
            Some("t1".to_string())
        );

        mock.set_failing(true);
        assert!(mock.send_password_reset_email("a@x.com", "t2").await.is_err());
        assert_eq!(mock.sent().len(), 1);
    }
}
