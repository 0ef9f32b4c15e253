pub mod relay;
pub mod session;

use std::env;

pub use relay::{ConfigError, MailCredentials, RelayConfig, SmtpEncryption, SmtpSettings};
pub use session::{validate_production_config, SessionConfig, SessionConfigError};

pub fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub fn is_production() -> bool {
    current_environment() == "production"
}

pub fn env_flag_enabled(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes"))
        .unwrap_or(false)
}
