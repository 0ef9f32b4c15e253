pub mod auth_service;
pub mod email_relay;
pub mod mail_transport;
pub mod media_store;
pub mod password;
pub mod user_service;

pub use auth_service::{AuthService, AuthServiceError, LoginRequest};
pub use email_relay::{EmailRelay, RelayError, RelayReceipt};
pub use mail_transport::{DeliveryError, MailTransport, OutgoingMail, SmtpMailTransport};
pub use media_store::{MediaError, MediaStore, PictureUpload};
pub use user_service::{
    CreateUserRequest, FieldErrors, UpdatePasswordRequest, UserService, UserServiceError,
};
