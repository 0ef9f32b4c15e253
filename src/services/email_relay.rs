use crate::config::relay::RelayConfig;
use crate::models::email_request::{EmailRequest, EmailRequestError, ReceivedFields};
use crate::services::mail_transport::{DeliveryError, MailTransport, OutgoingMail};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Missing or empty required fields")]
    MissingFields(ReceivedFields),
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Invalid field types")]
    InvalidFieldTypes,
    #[error("Missing email configuration")]
    Configuration,
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),
    #[error("Could not connect to SMTP server: {0}")]
    Connection(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl From<EmailRequestError> for RelayError {
    fn from(err: EmailRequestError) -> Self {
        match err {
            EmailRequestError::InvalidJson => RelayError::InvalidJson,
            EmailRequestError::MissingFields(received) => RelayError::MissingFields(received),
            EmailRequestError::InvalidEmail => RelayError::InvalidEmail,
            EmailRequestError::InvalidFieldTypes => RelayError::InvalidFieldTypes,
        }
    }
}

impl From<DeliveryError> for RelayError {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Authentication(detail) => RelayError::Authentication(detail),
            DeliveryError::Connection(detail) => RelayError::Connection(detail),
            DeliveryError::Smtp(detail) => RelayError::Smtp(detail),
            DeliveryError::MessageBuild(detail) => RelayError::Internal(detail),
        }
    }
}

/// What the caller gets back after a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    pub receiver: String,
    pub subject: String,
    pub timestamp: String,
}

/// Validates relay requests and hands them to a [`MailTransport`].
pub struct EmailRelay {
    config: RelayConfig,
    transport: Arc<dyn MailTransport>,
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl EmailRelay {
    pub fn new(config: RelayConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self { config, transport }
    }

    pub fn expose_error_details(&self) -> bool {
        self.config.expose_error_details
    }

    pub async fn relay(&self, body: &[u8]) -> Result<RelayReceipt, RelayError> {
        let request = EmailRequest::parse(body)?;

        let credentials = self.config.credentials().ok_or_else(|| {
            tracing::error!("Missing email configuration: EMAIL_USER and EMAIL_PASS must be set");
            RelayError::Configuration
        })?;

        tracing::info!(
            receiver = %request.receiver_email,
            subject = %preview(&request.subject, 50),
            "Processing email request"
        );

        let mail = OutgoingMail {
            credentials,
            to: request.receiver_email.clone(),
            subject: request.subject.clone(),
            body: request.body_text,
        };

        if let Err(err) = self.transport.deliver(mail).await {
            match &err {
                DeliveryError::Authentication(detail) => {
                    tracing::error!("SMTP authentication failed: {}", detail)
                }
                DeliveryError::Connection(detail) => {
                    tracing::error!("Could not connect to SMTP server: {}", detail)
                }
                DeliveryError::Smtp(detail) => tracing::error!("SMTP error: {}", detail),
                DeliveryError::MessageBuild(detail) => {
                    tracing::error!("Unexpected error: {}", detail)
                }
            }
            return Err(err.into());
        }

        tracing::info!("Email sent successfully to {}", request.receiver_email);

        Ok(RelayReceipt {
            receiver: request.receiver_email,
            subject: request.subject,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::relay::MailCredentials;
    use crate::services::mail_transport::MockMailTransport;

    fn configured() -> RelayConfig {
        RelayConfig {
            mail_account: Some("sender@example.com".to_string()),
            mail_credential: Some("app-password".to_string()),
            ..Default::default()
        }
    }

    const PAYLOAD: &[u8] = br#"{"receiver_email":"a@b.com","subject":"Hi","body_text":"Test"}"#;

    #[tokio::test]
    async fn test_relay_sends_from_configured_account() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_deliver()
            .withf(|mail| {
                mail.credentials
                    == MailCredentials {
                        account: "sender@example.com".to_string(),
                        secret: "app-password".to_string(),
                    }
                    && mail.to == "a@b.com"
                    && mail.subject == "Hi"
                    && mail.body == "Test"
            })
            .times(1)
            .returning(|_| Box::pin(async move { Ok(()) }));

        let relay = EmailRelay::new(configured(), Arc::new(transport));
        let receipt = relay.relay(PAYLOAD).await.unwrap();

        assert_eq!(receipt.receiver, "a@b.com");
        assert_eq!(receipt.subject, "Hi");
        assert!(receipt.timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_validation_runs_before_configuration_check() {
        let mut transport = MockMailTransport::new();
        transport.expect_deliver().never();

        let relay = EmailRelay::new(RelayConfig::default(), Arc::new(transport));

        assert_eq!(
            relay.relay(b"{not json").await,
            Err(RelayError::InvalidJson)
        );
        assert_eq!(
            relay
                .relay(br#"{"receiver_email":"nope","subject":"Hi","body_text":"Test"}"#)
                .await,
            Err(RelayError::InvalidEmail)
        );
        assert_eq!(relay.relay(PAYLOAD).await, Err(RelayError::Configuration));
    }

    #[tokio::test]
    async fn test_delivery_failures_are_mapped() {
        let cases = [
            (
                DeliveryError::Authentication("535".to_string()),
                RelayError::Authentication("535".to_string()),
            ),
            (
                DeliveryError::Connection("refused".to_string()),
                RelayError::Connection("refused".to_string()),
            ),
            (
                DeliveryError::Smtp("550".to_string()),
                RelayError::Smtp("550".to_string()),
            ),
            (
                DeliveryError::MessageBuild("bad header".to_string()),
                RelayError::Internal("bad header".to_string()),
            ),
        ];

        for (delivery_error, expected) in cases {
            let mut transport = MockMailTransport::new();
            let error = std::sync::Mutex::new(Some(delivery_error));
            transport.expect_deliver().times(1).returning(move |_| {
                let error = error.lock().unwrap().take().unwrap();
                Box::pin(async move { Err(error) })
            });

            let relay = EmailRelay::new(configured(), Arc::new(transport));
            assert_eq!(relay.relay(PAYLOAD).await, Err(expected));
        }
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("héllo wörld", 4), "héll");
    }
}
