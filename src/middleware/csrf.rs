use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CSRF_TOKEN_KEY: &str = "csrf_token";
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Shown above a form whose token was missing, stale or forged.
pub const CSRF_FAILURE_MESSAGE: &str =
    "Invalid security token. Please refresh the page and try again.";

const TOKEN_LIFETIME_SECS: i64 = 86400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfToken {
    pub value: String,
    pub created_at: i64,
}

impl CsrfToken {
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        chrono::Utc::now().timestamp() - self.created_at > TOKEN_LIFETIME_SECS
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("No CSRF token in session")]
    Missing,
    #[error("CSRF token expired")]
    Expired,
    #[error("CSRF token mismatch")]
    Mismatch,
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

// Only a prefix ever reaches the logs
fn token_prefix(value: &str) -> &str {
    value.get(..8).unwrap_or(value)
}

/// Generate a new CSRF token and store it in the session
pub async fn generate_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token = CsrfToken::new();
    let value = token.value.clone();

    session.insert(CSRF_TOKEN_KEY, token).await?;

    debug!("Generated new CSRF token: {}", token_prefix(&value));
    Ok(value)
}

/// Get or create a CSRF token for the session
pub async fn get_or_create_csrf_token(
    session: &Session,
) -> Result<String, tower_sessions::session::Error> {
    let token: Option<CsrfToken> = session.get(CSRF_TOKEN_KEY).await?;

    match token {
        Some(existing) if !existing.is_expired() => Ok(existing.value),
        _ => generate_csrf_token(session).await,
    }
}

/// Checks a submitted form token against the session copy. A valid token is
/// consumed and replaced so a captured form cannot be replayed.
pub async fn validate_csrf_form_field(
    session: &Session,
    form_token: &str,
) -> Result<(), CsrfError> {
    let stored: CsrfToken = session
        .get(CSRF_TOKEN_KEY)
        .await?
        .ok_or_else(|| {
            warn!("No CSRF token in session for form validation");
            CsrfError::Missing
        })?;

    if stored.is_expired() {
        warn!("CSRF token expired during form validation");
        return Err(CsrfError::Expired);
    }

    if form_token != stored.value {
        warn!(
            "CSRF form token mismatch: expected {}, got {}",
            token_prefix(&stored.value),
            token_prefix(form_token)
        );
        return Err(CsrfError::Mismatch);
    }

    debug!("CSRF form token validated, regenerating for replay protection");
    generate_csrf_token(session).await?;

    Ok(())
}
