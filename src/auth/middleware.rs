use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_USERNAME: &str = "username";
pub const SESSION_AUTH_TIMESTAMP: &str = "auth_timestamp";

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

pub async fn current_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>(SESSION_USER_ID).await.ok().flatten()
}

pub async fn require_auth(session: Session, request: Request, next: Next) -> Response {
    if current_user_id(&session).await.is_some() {
        next.run(request).await
    } else {
        Redirect::to(LOGIN_PATH).into_response()
    }
}

pub async fn redirect_if_authenticated(session: Session, request: Request, next: Next) -> Response {
    if current_user_id(&session).await.is_some() {
        Redirect::to(DASHBOARD_PATH).into_response()
    } else {
        next.run(request).await
    }
}
