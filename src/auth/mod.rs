pub mod forms;
pub mod handlers;
pub mod middleware;

pub use handlers::{
    login_handler, login_page, logout_handler, logout_post_handler, signup_handler, signup_page,
};
pub use middleware::{redirect_if_authenticated, require_auth};
