use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    Message,
    SmtpTransport,
    Transport,
};
use service_core::axum::async_trait;
use std::time::Duration;

use crate::services::ServiceError;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Deliver a one-time code. `ttl_seconds` is shown to the recipient.
    async fn send_otp_email(
        &self,
        to_email: &str,
        code: &str,
        ttl_seconds: i64,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &crate::config::SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Email(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        ServiceError::Email(e.to_string())
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Email(e.to_string()))?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::Email(e.to_string()))?;

        // Send email in blocking thread pool to avoid blocking async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(
                    to = %to_email,
                    subject = %subject,
                    "Email sent successfully"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %to_email,
                    "Failed to send email"
                );
                Err(ServiceError::Email(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_otp_email(
        &self,
        to_email: &str,
        code: &str,
        ttl_seconds: i64,
    ) -> Result<(), ServiceError> {
        let minutes = ttl_seconds / 60;

        let html_body = format!(
            r###"            <html>
                <body style="font-family: Arial, sans-serif; line-height: 1.4;">
                    <h3>Notebook — Verification Code</h3>
                    <p>Your one-time code is:</p>
                    <h2 style="letter-spacing: 4px;">{}</h2>
                    <p style="color: #666; font-size: 12px;">
                        It expires in {} minutes. If you didn't request this, please ignore this email.
                    </p>
                </body>
            </html>
            "###,
            code, minutes
        );

        let plain_body = format!(
            "Notebook — Verification Code\n\n            Your one-time code is: {}\n\n            It expires in {} minutes. If you didn't request this, please ignore this email.",
            code, minutes
        );

        self.send_email(to_email, "Your verification code", &plain_body, &html_body)
            .await
    }
}

/// Test double that records deliveries instead of sending them.
#[derive(Default)]
pub struct MockEmailService {
    deliveries: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last code delivered to `email`, if any.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_otp_email(
        &self,
        to_email: &str,
        code: &str,
        _ttl_seconds: i64,
    ) -> Result<(), ServiceError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((to_email.to_string(), code.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_service_creation() {
        let config = crate::config::SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            user: "user".to_string(),
            password: "password".to_string(),
            from: "noreply@example.com".to_string(),
        };

        let service = EmailService::new(&config);
        assert!(service.is_ok());
    }

    #[tokio::test]
    async fn mock_records_last_delivery() {
        let mock = MockEmailService::new();
        mock.send_otp_email("a@example.com", "111111", 300)
            .await
            .unwrap();
        mock.send_otp_email("a@example.com", "222222", 300)
            .await
            .unwrap();

        assert_eq!(mock.last_code_for("a@example.com").as_deref(), Some("222222"));
        assert_eq!(mock.last_code_for("b@example.com"), None);
    }
}
