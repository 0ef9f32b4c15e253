use crate::auth::forms::{signup_fields, FormField, SignupValues};
use crate::auth::middleware::{
    DASHBOARD_PATH, LOGIN_PATH, SESSION_AUTH_TIMESTAMP, SESSION_USERNAME, SESSION_USER_ID,
};
use crate::error::{AppError, Result};
use crate::flash::{self, FlashLevel};
use crate::handlers::page::PageContext;
use crate::middleware::csrf::{validate_csrf_form_field, CSRF_FAILURE_MESSAGE, CSRF_FORM_FIELD};
use crate::services::{
    auth_service::{AuthServiceError, LoginRequest},
    media_store::PictureUpload,
    user_service::{FieldErrors, UserServiceError, USERNAME_TAKEN_MESSAGE},
};
use crate::AppState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

pub const SIGNUP_SUCCESS_MESSAGE: &str = "Account created successfully! Please login.";
pub const SIGNUP_INVALID_MESSAGE: &str = "Please correct the errors below.";
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid username or password.";
pub const LOGOUT_MESSAGE: &str = "You have been logged out successfully.";

#[derive(Template, WebTemplate)]
#[template(path = "accounts/signup.html")]
struct SignupTemplate {
    page: PageContext,
    error: Option<String>,
    fields: Vec<FormField>,
}

#[derive(Template, WebTemplate)]
#[template(path = "accounts/login.html")]
struct LoginTemplate {
    page: PageContext,
    error: Option<String>,
    username: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct LogoutForm {
    #[serde(default)]
    csrf_token: String,
}

/// GET /signup
pub async fn signup_page(session: Session) -> Result<Response> {
    let template = SignupTemplate {
        page: PageContext::load(&session).await?,
        error: None,
        fields: signup_fields(&SignupValues::default(), &FieldErrors::default()),
    };
    Ok(template.into_response())
}

async fn render_signup(
    session: &Session,
    values: &SignupValues,
    errors: &FieldErrors,
    error: Option<&str>,
) -> Result<Response> {
    let mut page = PageContext::load(session).await?;
    if !errors.is_empty() {
        page = page.with_message(FlashLevel::Error, SIGNUP_INVALID_MESSAGE);
    }
    let template = SignupTemplate {
        page,
        error: error.map(str::to_string),
        fields: signup_fields(values, errors),
    };
    Ok(template.into_response())
}

async fn read_signup_form(
    mut multipart: Multipart,
) -> Result<(SignupValues, Option<PictureUpload>)> {
    let mut values = SignupValues::default();
    let mut picture = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed form data: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "profile_picture" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

            // Browsers send an empty part when no file was chosen
            if !file_name.is_empty() || !data.is_empty() {
                picture = Some(PictureUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read field: {}", e)))?;
            values.insert(name, value);
        }
    }

    Ok((values, picture))
}

/// POST /signup
pub async fn signup_handler(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let (values, picture) = read_signup_form(multipart).await?;

    if validate_csrf_form_field(&session, values.get(CSRF_FORM_FIELD))
        .await
        .is_err()
    {
        return render_signup(
            &session,
            &values,
            &FieldErrors::default(),
            Some(CSRF_FAILURE_MESSAGE),
        )
        .await;
    }

    let mut request = values.to_request();

    let mut errors = match state.user_service.validate_signup(&request).await {
        Ok(()) => FieldErrors::default(),
        Err(UserServiceError::Invalid(errors)) => errors,
        Err(e) => return Err(e.into()),
    };
    if let Some(upload) = &picture {
        if let Err(e) = upload.validate() {
            errors.add("profile_picture", e.to_string());
        }
    }
    if !errors.is_empty() {
        tracing::debug!("Signup rejected: {}", errors);
        return render_signup(&session, &values, &errors, None).await;
    }

    if let Some(upload) = &picture {
        request.profile_picture = Some(state.media_store.save_profile_picture(upload).await?);
    }
    let stored_picture = request.profile_picture.clone();

    let result = state.user_service.create_user(request).await;
    if result.is_err() {
        if let Some(relative) = &stored_picture {
            state.media_store.discard(relative).await;
        }
    }

    match result {
        Ok(_) => {
            flash::push(&session, FlashLevel::Success, SIGNUP_SUCCESS_MESSAGE).await?;
            Ok(Redirect::to(LOGIN_PATH).into_response())
        }
        Err(UserServiceError::Invalid(errors)) => {
            render_signup(&session, &values, &errors, None).await
        }
        // Lost a race with a concurrent signup for the same username
        Err(UserServiceError::UsernameTaken) => {
            let mut errors = FieldErrors::default();
            errors.add("username", USERNAME_TAKEN_MESSAGE);
            render_signup(&session, &values, &errors, None).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /login
pub async fn login_page(session: Session) -> Result<Response> {
    let template = LoginTemplate {
        page: PageContext::load(&session).await?,
        error: None,
        username: String::new(),
    };
    Ok(template.into_response())
}

async fn render_login(session: &Session, username: &str, error: &str) -> Result<Response> {
    let template = LoginTemplate {
        page: PageContext::load(session).await?,
        error: Some(error.to_string()),
        username: username.to_string(),
    };
    Ok(template.into_response())
}

/// POST /login
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        return render_login(&session, &form.username, CSRF_FAILURE_MESSAGE).await;
    }

    let request = LoginRequest {
        username: form.username.clone(),
        password: form.password,
    };

    match state.auth_service.authenticate(request).await {
        Ok(user) => {
            // New id on privilege change
            session.cycle_id().await?;
            session.insert(SESSION_USER_ID, user.id).await?;
            session.insert(SESSION_USERNAME, &user.username).await?;
            session
                .insert(SESSION_AUTH_TIMESTAMP, chrono::Utc::now().timestamp())
                .await?;

            tracing::info!(user_id = user.id, "User logged in");
            flash::push(
                &session,
                FlashLevel::Success,
                format!("Welcome back, {}!", user.first_name),
            )
            .await?;
            Ok(Redirect::to(DASHBOARD_PATH).into_response())
        }
        Err(AuthServiceError::InvalidCredentials) => {
            tracing::info!("Failed login attempt for {}", form.username.trim());
            render_login(&session, &form.username, LOGIN_FAILED_MESSAGE).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn end_session(session: &Session) -> Result<Response> {
    if let Some(user_id) = session.get::<i64>(SESSION_USER_ID).await? {
        tracing::info!(user_id, "User logged out");
    }
    session.flush().await?;
    flash::push(session, FlashLevel::Info, LOGOUT_MESSAGE).await?;
    Ok(Redirect::to("/").into_response())
}

/// GET /logout
pub async fn logout_handler(session: Session) -> Result<Response> {
    end_session(&session).await
}

/// POST /logout
pub async fn logout_post_handler(
    session: Session,
    Form(form): Form<LogoutForm>,
) -> Result<Response> {
    if validate_csrf_form_field(&session, &form.csrf_token)
        .await
        .is_err()
    {
        flash::push(&session, FlashLevel::Error, CSRF_FAILURE_MESSAGE).await?;
        return Ok(Redirect::to(DASHBOARD_PATH).into_response());
    }
    end_session(&session).await
}
