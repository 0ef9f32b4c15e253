use crate::validation::is_valid_email;
use serde::Serialize;
use serde_json::{Map, Value};

/// A validated relay request. Lives for one invocation and is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub receiver_email: String,
    pub subject: String,
    pub body_text: String,
}

/// Which required fields arrived with usable values. Echoed back to the
/// caller when any of them is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReceivedFields {
    pub receiver_email: bool,
    pub subject: bool,
    pub body_text: bool,
}

impl ReceivedFields {
    pub fn all(&self) -> bool {
        self.receiver_email && self.subject && self.body_text
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailRequestError {
    #[error("Request body must be valid JSON")]
    InvalidJson,
    #[error("Missing or empty required fields")]
    MissingFields(ReceivedFields),
    #[error("receiver_email must be a valid email address")]
    InvalidEmail,
    #[error("subject and body_text must be strings")]
    InvalidFieldTypes,
}

enum Field {
    Missing,
    Text(String),
    NotText,
}

impl Field {
    fn extract(payload: &Map<String, Value>, key: &str) -> Self {
        match payload.get(key) {
            None | Some(Value::Null) => Field::Missing,
            Some(Value::String(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    Field::Missing
                } else {
                    Field::Text(trimmed.to_string())
                }
            }
            Some(_) => Field::NotText,
        }
    }

    fn is_present(&self) -> bool {
        !matches!(self, Field::Missing)
    }
}

impl EmailRequest {
    /// Parses and validates a raw request body.
    ///
    /// Checks run in a fixed order and the first failure wins: JSON syntax
    /// (the body must be an object), presence of all three fields after
    /// trimming, `receiver_email` syntax, then string types for `subject`
    /// and `body_text`. Values are returned trimmed.
    pub fn parse(body: &[u8]) -> Result<Self, EmailRequestError> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|_| EmailRequestError::InvalidJson)?;
        let Value::Object(payload) = payload else {
            return Err(EmailRequestError::InvalidJson);
        };

        let receiver_email = Field::extract(&payload, "receiver_email");
        let subject = Field::extract(&payload, "subject");
        let body_text = Field::extract(&payload, "body_text");

        let received = ReceivedFields {
            receiver_email: receiver_email.is_present(),
            subject: subject.is_present(),
            body_text: body_text.is_present(),
        };
        if !received.all() {
            return Err(EmailRequestError::MissingFields(received));
        }

        let receiver_email = match receiver_email {
            Field::Text(email) if is_valid_email(&email) => email,
            _ => return Err(EmailRequestError::InvalidEmail),
        };

        match (subject, body_text) {
            (Field::Text(subject), Field::Text(body_text)) => Ok(EmailRequest {
                receiver_email,
                subject,
                body_text,
            }),
            _ => Err(EmailRequestError::InvalidFieldTypes),
        }
    }
}
