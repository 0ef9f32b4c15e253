use crate::auth;
use crate::handlers::{self, relay_handlers, RelayState};
use crate::middleware::add_security_headers;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
    Router,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

// Signup forms carry an optional profile picture
const MAX_FORM_BYTES: usize = 5 * 1024 * 1024;

/// Portal routes. The caller adds the session layer so tests can swap in an
/// in-memory store.
pub fn portal_router(state: AppState) -> Router {
    let media_root = state.media_store.root().to_path_buf();

    let guest_routes = Router::new()
        .route(
            "/signup",
            get(auth::signup_page).post(auth::signup_handler),
        )
        .route("/login", get(auth::login_page).post(auth::login_handler))
        .route_layer(middleware::from_fn(auth::redirect_if_authenticated));

    let protected_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard_handler))
        .route(
            "/logout",
            get(auth::logout_handler).post(auth::logout_post_handler),
        )
        .route_layer(middleware::from_fn(auth::require_auth));

    Router::new()
        .route("/", get(handlers::home_handler))
        .merge(guest_routes)
        .merge(protected_routes)
        .nest_service("/static", ServeDir::new("static"))
        .nest_service("/media", ServeDir::new(media_root))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES))
        .layer(middleware::from_fn(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn relay_panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Unexpected error in mail relay: {}", detail);

    relay_handlers::relay_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        relay_handlers::internal_error_body(None),
    )
}

pub fn relay_router(state: RelayState) -> Router {
    Router::new()
        .route(
            "/send-email",
            post(handlers::send_email_handler)
                .options(handlers::send_email_options_handler)
                .fallback(handlers::method_not_allowed_handler),
        )
        .fallback(handlers::not_found_handler)
        .layer(CatchPanicLayer::custom(relay_panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
