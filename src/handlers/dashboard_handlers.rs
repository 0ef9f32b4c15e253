use crate::auth::middleware::{LOGIN_PATH, SESSION_USER_ID};
use crate::error::Result;
use crate::handlers::page::PageContext;
use crate::models::user::{User, UserType};
use crate::AppState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

#[derive(Template, WebTemplate)]
#[template(path = "accounts/doctor_dashboard.html")]
struct DoctorDashboardTemplate {
    page: PageContext,
    user: User,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/patient_dashboard.html")]
struct PatientDashboardTemplate {
    page: PageContext,
    user: User,
}

/// GET /dashboard - picks the dashboard matching the account's user type
pub async fn dashboard_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let Some(user_id) = session.get::<i64>(SESSION_USER_ID).await? else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let Some(user) = state.user_service.find_user_by_id(user_id).await? else {
        tracing::warn!(user_id, "Session refers to a missing user, clearing it");
        session.flush().await?;
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let page = PageContext::load(&session).await?;
    let response = match user.user_type {
        UserType::Doctor => DoctorDashboardTemplate { page, user }.into_response(),
        UserType::Patient => PatientDashboardTemplate { page, user }.into_response(),
    };
    Ok(response)
}
