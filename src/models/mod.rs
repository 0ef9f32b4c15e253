pub mod email_request;
pub mod user;

pub use email_request::{EmailRequest, EmailRequestError, ReceivedFields};
pub use user::{AddressUpdate, NewUser, UnknownUserType, User, UserType};
