use crate::error::Result;
use crate::handlers::page::PageContext;
use askama::Template;
use askama_web::WebTemplate;
use axum::response::{IntoResponse, Response};
use tower_sessions::Session;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
struct HomeTemplate {
    page: PageContext,
}

/// GET /
pub async fn home_handler(session: Session) -> Result<Response> {
    let template = HomeTemplate {
        page: PageContext::load(&session).await?,
    };
    Ok(template.into_response())
}
