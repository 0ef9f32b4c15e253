pub mod dashboard_handlers;
pub mod home_handlers;
pub mod page;
pub mod relay_handlers;

pub use dashboard_handlers::dashboard_handler;
pub use home_handlers::home_handler;
pub use relay_handlers::{
    method_not_allowed_handler, not_found_handler, send_email_handler,
    send_email_options_handler, RelayState,
};
