use crate::config::relay::{MailCredentials, SmtpEncryption, SmtpSettings};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

// 530 auth required, 534 mechanism too weak, 535 credentials rejected
const AUTH_FAILURE_CODES: [&str; 3] = ["530", "534", "535"];

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("SMTP authentication failed: {0}")]
    Authentication(String),
    #[error("Could not connect to SMTP server: {0}")]
    Connection(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
}

impl From<SmtpError> for DeliveryError {
    fn from(err: SmtpError) -> Self {
        let detail = err.to_string();

        if let Some(code) = err.status() {
            let code = code.to_string();
            if AUTH_FAILURE_CODES.contains(&code.as_str()) {
                return DeliveryError::Authentication(detail);
            }
            return DeliveryError::Smtp(detail);
        }

        // Without a reply code the failure happened below the SMTP dialogue,
        // unless it was a TLS, parse or client-side problem.
        if err.is_client() || err.is_tls() || err.is_response() {
            DeliveryError::Smtp(detail)
        } else {
            DeliveryError::Connection(detail)
        }
    }
}

/// One plain-text message, sent from the credential's own mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub credentials: MailCredentials,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn to_message(&self) -> Result<Message, DeliveryError> {
        let from: Mailbox = self
            .credentials
            .account
            .parse()
            .map_err(|e| DeliveryError::MessageBuild(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = self
            .to
            .parse()
            .map_err(|e| DeliveryError::MessageBuild(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(self.body.clone())
            .map_err(|e| DeliveryError::MessageBuild(e.to_string()))
    }
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait MailTransport: Send + Sync {
    /// Connects, authenticates and sends a single message. No retries.
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError>;
}

/// Delivers through an SMTP relay with `lettre`, opening a fresh
/// authenticated session for every message.
pub struct SmtpMailTransport {
    settings: SmtpSettings,
}

impl SmtpMailTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn mailer(
        &self,
        credentials: &MailCredentials,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let host = self.settings.host.as_str();
        let builder = match self.settings.encryption {
            SmtpEncryption::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| DeliveryError::Smtp(format!("SMTP starttls error: {}", e)))?,
            SmtpEncryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| DeliveryError::Smtp(format!("SMTP relay error: {}", e)))?,
            SmtpEncryption::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
        };

        Ok(builder
            .port(self.settings.port)
            .credentials(Credentials::new(
                credentials.account.clone(),
                credentials.secret.clone(),
            ))
            .build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        let message = mail.to_message()?;
        let mailer = self.mailer(&mail.credentials)?;

        tracing::debug!(
            host = %self.settings.host,
            port = self.settings.port,
            "Opening SMTP session"
        );

        mailer.send(message).await?;
        Ok(())
    }
}
