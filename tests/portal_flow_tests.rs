use std::collections::HashMap;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use health_portal::{
    models::user::UserType, routes::portal_router, services::media_store::MediaStore,
    test_utils::test_helpers, AppState,
};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::{cookie::Cookie, MemoryStore, SessionManagerLayer};

static CSRF_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"name="csrf_token" value="([^"]+)""#).unwrap());

const BOUNDARY: &str = "portal-test-boundary";

/// A browser stand-in: one app, one cookie jar.
struct Browser {
    app: Router,
    pool: SqlitePool,
    media: TempDir,
    cookies: HashMap<String, String>,
}

impl Browser {
    async fn new() -> Self {
        let pool = test_helpers::create_test_db().await.unwrap();
        let media = TempDir::new().unwrap();
        let state = AppState::new(pool.clone(), MediaStore::new(media.path()));
        let app = portal_router(state)
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));

        Self {
            app,
            pool,
            media,
            cookies: HashMap::new(),
        }
    }

    async fn send(&mut self, mut request: Request<Body>) -> Response {
        if !self.cookies.is_empty() {
            let jar = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            request
                .headers_mut()
                .insert(header::COOKIE, jar.parse().unwrap());
        }

        let response = self.app.clone().oneshot(request).await.unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(set_cookie.to_str().unwrap().to_string()).unwrap();
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Fetches a page and pulls the CSRF token out of its form.
    async fn csrf_token(&mut self, uri: &str) -> String {
        let html = body_text(self.get(uri).await).await;
        CSRF_INPUT
            .captures(&html)
            .map(|c| c[1].to_string())
            .expect("page to contain a csrf token")
    }

    async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response {
        let body = fields
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> Response {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"profile_picture\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                    BOUNDARY, file_name, content_type
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn login(&mut self, username: &str, password: &str) -> Response {
        let token = self.csrf_token("/login").await;
        self.post_form(
            "/login",
            &[
                ("username", username),
                ("password", password),
                ("csrf_token", token.as_str()),
            ],
        )
        .await
    }

    async fn user_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect to carry a location")
        .to_str()
        .unwrap()
}

fn signup_fields<'a>(
    token: &'a str,
    password1: &'a str,
    password2: &'a str,
    user_type: &'a str,
) -> Vec<(&'a str, &'a str)> {
    vec![
        ("csrf_token", token),
        ("first_name", "Asha"),
        ("last_name", "Rao"),
        ("username", "asha"),
        ("email", "asha@example.com"),
        ("password1", password1),
        ("password2", password2),
        ("address_line1", "12 MG Road"),
        ("city", "Pune"),
        ("state", "MH"),
        ("pincode", "411001"),
        ("user_type", user_type),
    ]
}

#[tokio::test]
async fn signup_with_mismatched_passwords_creates_no_user() {
    let mut browser = Browser::new().await;
    let token = browser.csrf_token("/signup").await;

    let response = browser
        .post_multipart(
            "/signup",
            &signup_fields(&token, "Sup3rSecret!", "Different1!", "patient"),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Passwords do not match!"));
    assert!(html.contains("Please correct the errors below."));
    // Submitted values come back, passwords do not
    assert!(html.contains(r#"value="asha@example.com""#));
    assert!(!html.contains("Sup3rSecret!"));

    assert_eq!(browser.user_count().await, 0);
}

#[tokio::test]
async fn signup_rejects_weak_passwords_and_blank_fields() {
    let mut browser = Browser::new().await;
    let token = browser.csrf_token("/signup").await;

    let mut fields = signup_fields(&token, "12345678", "12345678", "patient");
    fields.retain(|(name, _)| *name != "city");

    let html = body_text(browser.post_multipart("/signup", &fields, None).await).await;
    assert!(html.contains("This password is entirely numeric."));
    assert!(html.contains("This field is required."));
    assert_eq!(browser.user_count().await, 0);
}

#[tokio::test]
async fn signup_stores_user_and_picture_then_redirects_to_login() {
    let mut browser = Browser::new().await;
    let token = browser.csrf_token("/signup").await;

    let response = browser
        .post_multipart(
            "/signup",
            &signup_fields(&token, "Sup3rSecret!", "Sup3rSecret!", "doctor"),
            Some(("me.png", "image/png", &b"\x89PNG\r\n\x1a\nfake"[..])),
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let (user_type, picture): (String, Option<String>) =
        sqlx::query_as("SELECT user_type, profile_picture FROM users WHERE username = 'asha'")
            .fetch_one(&browser.pool)
            .await
            .unwrap();
    assert_eq!(user_type, "doctor");
    let picture = picture.expect("profile picture path to be stored");
    assert!(picture.starts_with("profile_pictures/"));
    assert!(picture.ends_with(".png"));
    assert!(browser.media.path().join(&picture).exists());

    let html = body_text(browser.get("/login").await).await;
    assert!(html.contains("Account created successfully! Please login."));
}

#[tokio::test]
async fn signup_rejects_non_image_upload() {
    let mut browser = Browser::new().await;
    let token = browser.csrf_token("/signup").await;

    let html = body_text(
        browser
            .post_multipart(
                "/signup",
                &signup_fields(&token, "Sup3rSecret!", "Sup3rSecret!", "patient"),
                Some(("notes.txt", "text/plain", &b"hello"[..])),
            )
            .await,
    )
    .await;

    assert!(html.contains("Upload a valid image."));
    assert_eq!(browser.user_count().await, 0);
}

#[tokio::test]
async fn signup_that_loses_username_race_leaves_no_picture_behind() {
    let mut browser = Browser::new().await;
    // Another signup claims the username between validation and insert
    sqlx::query(
        "CREATE TRIGGER claim_username BEFORE INSERT ON users WHEN NEW.username = 'asha' \
         BEGIN \
           INSERT INTO users (username, email, first_name, last_name, password_hash, \
                              user_type, address_line1, city, state, pincode) \
           VALUES ('asha', 'other@example.com', 'Other', 'Person', 'x', 'patient', \
                   '1 Elsewhere', 'Pune', 'MH', '411001'); \
         END",
    )
    .execute(&browser.pool)
    .await
    .unwrap();
    let token = browser.csrf_token("/signup").await;

    let response = browser
        .post_multipart(
            "/signup",
            &signup_fields(&token, "Sup3rSecret!", "Sup3rSecret!", "doctor"),
            Some(("me.png", "image/png", &b"\x89PNG\r\n\x1a\nfake"[..])),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("A user with that username already exists."));

    let pictures = browser.media.path().join("profile_pictures");
    let leftovers = std::fs::read_dir(&pictures)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn signup_with_bad_csrf_token_is_refused() {
    let mut browser = Browser::new().await;
    browser.csrf_token("/signup").await;

    let html = body_text(
        browser
            .post_multipart(
                "/signup",
                &signup_fields("forged", "Sup3rSecret!", "Sup3rSecret!", "patient"),
                None,
            )
            .await,
    )
    .await;

    assert!(html.contains("Invalid security token. Please refresh the page and try again."));
    assert_eq!(browser.user_count().await, 0);
}

#[tokio::test]
async fn doctor_login_shows_doctor_dashboard() {
    let mut browser = Browser::new().await;
    test_helpers::insert_test_user(&browser.pool, "drmehta", "Sup3rSecret!", UserType::Doctor)
        .await
        .unwrap();

    let response = browser.login("drmehta", "Sup3rSecret!").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");

    let html = body_text(browser.get("/dashboard").await).await;
    assert!(html.contains("Doctor Dashboard"));
    assert!(!html.contains("Patient Dashboard"));
    assert!(html.contains("Welcome back, Test!"));
}

#[tokio::test]
async fn patient_login_shows_patient_dashboard() {
    let mut browser = Browser::new().await;
    test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
        .await
        .unwrap();

    browser.login("ravi", "Sup3rSecret!").await;

    let html = body_text(browser.get("/dashboard").await).await;
    assert!(html.contains("Patient Dashboard"));
    assert!(!html.contains("Doctor Dashboard"));
}

#[tokio::test]
async fn login_records_last_login() {
    let mut browser = Browser::new().await;
    let user_id =
        test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
            .await
            .unwrap();

    browser.login("ravi", "Sup3rSecret!").await;

    let last_login: Option<String> =
        sqlx::query_scalar("SELECT last_login FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_one(&browser.pool)
            .await
            .unwrap();
    assert!(last_login.is_some());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let mut browser = Browser::new().await;
    test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
        .await
        .unwrap();

    for (username, password) in [("ravi", "wrong-password"), ("nobody", "Sup3rSecret!")] {
        let response = browser.login(username, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Invalid username or password."));
    }

    let response = browser.get("/dashboard").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn login_without_csrf_token_is_refused() {
    let mut browser = Browser::new().await;
    test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
        .await
        .unwrap();
    browser.csrf_token("/login").await;

    let response = browser
        .post_form("/login", &[("username", "ravi"), ("password", "Sup3rSecret!")])
        .await;
    let html = body_text(response).await;
    assert!(html.contains("Invalid security token."));

    let response = browser.get("/dashboard").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn anonymous_users_are_sent_to_login() {
    let mut browser = Browser::new().await;

    for uri in ["/dashboard", "/logout"] {
        let response = browser.get(uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/login");
    }
}

#[tokio::test]
async fn signed_in_users_skip_login_and_signup() {
    let mut browser = Browser::new().await;
    test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
        .await
        .unwrap();
    browser.login("ravi", "Sup3rSecret!").await;

    for uri in ["/login", "/signup"] {
        let response = browser.get(uri).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(location(&response), "/dashboard");
    }
}

#[tokio::test]
async fn logout_ends_the_session() {
    let mut browser = Browser::new().await;
    test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
        .await
        .unwrap();
    browser.login("ravi", "Sup3rSecret!").await;

    let token = browser.csrf_token("/dashboard").await;
    let response = browser
        .post_form("/logout", &[("csrf_token", token.as_str())])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let html = body_text(browser.get("/").await).await;
    assert!(html.contains("You have been logged out successfully."));

    let response = browser.get("/dashboard").await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn session_for_deleted_user_is_cleared() {
    let mut browser = Browser::new().await;
    let user_id =
        test_helpers::insert_test_user(&browser.pool, "ravi", "Sup3rSecret!", UserType::Patient)
            .await
            .unwrap();
    browser.login("ravi", "Sup3rSecret!").await;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&browser.pool)
        .await
        .unwrap();

    let response = browser.get("/dashboard").await;
    assert_eq!(location(&response), "/login");

    // Session is gone, so the login page is reachable again
    let response = browser.get("/login").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn pages_carry_security_headers() {
    let mut browser = Browser::new().await;
    let response = browser.get("/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
}
