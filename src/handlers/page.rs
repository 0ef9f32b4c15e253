use crate::auth::middleware::SESSION_USERNAME;
use crate::flash::{self, FlashLevel, FlashMessage};
use crate::middleware::csrf::get_or_create_csrf_token;
use tower_sessions::Session;

/// Data the base layout needs on every page: pending flash messages, the
/// signed-in username for the nav bar and a CSRF token for the logout form.
pub struct PageContext {
    pub messages: Vec<FlashMessage>,
    pub username: Option<String>,
    pub csrf_token: String,
}

impl PageContext {
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(Self {
            messages: flash::take(session).await?,
            username: session.get::<String>(SESSION_USERNAME).await?,
            csrf_token: get_or_create_csrf_token(session).await?,
        })
    }

    pub fn with_message(mut self, level: FlashLevel, text: impl Into<String>) -> Self {
        self.messages.push(FlashMessage::new(level, text));
        self
    }
}
