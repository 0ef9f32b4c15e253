use std::{env, fmt, str::FromStr};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// How the relay secures its SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtpEncryption {
    /// Plain connection upgraded with STARTTLS before authenticating.
    #[default]
    StartTls,
    /// Implicit TLS from the first byte (port 465 style).
    Tls,
    /// No encryption. Only for local test servers.
    None,
}

impl FromStr for SmtpEncryption {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "starttls" => Ok(SmtpEncryption::StartTls),
            "tls" => Ok(SmtpEncryption::Tls),
            "none" => Ok(SmtpEncryption::None),
            _ => Err(ConfigError::InvalidValue {
                key: "SMTP_ENCRYPTION",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub encryption: SmtpEncryption,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            encryption: SmtpEncryption::StartTls,
        }
    }
}

/// Login for the sending mailbox. The secret is kept out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct MailCredentials {
    pub account: String,
    pub secret: String,
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Everything the mail relay reads from its environment, loaded once at
/// startup and handed to the handler.
///
/// The two secrets stay optional here: a relay without them still starts and
/// answers every request that fails validation, and reports a configuration
/// error for the rest.
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub mail_account: Option<String>,
    pub mail_credential: Option<String>,
    pub smtp: SmtpSettings,
    pub expose_error_details: bool,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("SMTP_HOST").unwrap_or_else(|_| DEFAULT_SMTP_HOST.to_string());
        let port = match env::var("SMTP_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "SMTP_PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_SMTP_PORT,
        };
        let encryption = match env::var("SMTP_ENCRYPTION") {
            Ok(raw) => raw.parse()?,
            Err(_) => SmtpEncryption::default(),
        };

        Ok(Self {
            mail_account: non_empty_var("EMAIL_USER"),
            mail_credential: non_empty_var("EMAIL_PASS"),
            smtp: SmtpSettings {
                host,
                port,
                encryption,
            },
            expose_error_details: super::env_flag_enabled("RELAY_EXPOSE_ERROR_DETAILS"),
        })
    }

    /// Both secrets, or `None` if either is missing or blank.
    pub fn credentials(&self) -> Option<MailCredentials> {
        let account = self.mail_account.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let secret = self.mail_credential.as_deref().filter(|v| !v.is_empty())?;
        Some(MailCredentials {
            account: account.to_string(),
            secret: secret.to_string(),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
