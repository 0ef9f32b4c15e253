pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod validation;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<services::user_service::UserService>,
    pub auth_service: Arc<services::auth_service::AuthService>,
    pub media_store: Arc<services::media_store::MediaStore>,
}

impl AppState {
    pub fn new(pool: sqlx::SqlitePool, media_store: services::media_store::MediaStore) -> Self {
        let user_repository = Arc::new(repositories::SqliteUserRepository::new(pool));
        Self {
            user_service: Arc::new(services::UserService::new(user_repository.clone())),
            auth_service: Arc::new(services::AuthService::new(user_repository)),
            media_store: Arc::new(media_store),
        }
    }
}
