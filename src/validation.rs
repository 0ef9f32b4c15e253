use once_cell::sync::Lazy;
use regex::Regex;

// local@domain.tld with no whitespace and exactly one '@'
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Syntactic address check shared by signup and the mail relay. Says nothing
/// about deliverability.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}
