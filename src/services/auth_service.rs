use crate::models::user::User;
use crate::repositories::user_repository::UserRepository;
use crate::services::password::{hash_password, verify_password};
use once_cell::sync::Lazy;
use std::sync::Arc;

// Verified against when the username is unknown, so both failure paths pay
// for one argon2 verification.
static DUMMY_HASH: Lazy<String> =
    Lazy::new(|| hash_password("not-a-real-account-password").unwrap_or_default());

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] crate::repositories::user_repository::RepositoryError),
}

pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub struct AuthService {
    user_repository: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    /// Checks a username/password pair and stamps `last_login` on success.
    /// Unknown users and wrong passwords produce the same error.
    pub async fn authenticate(&self, request: LoginRequest) -> Result<User, AuthServiceError> {
        let user = match self
            .user_repository
            .find_by_username(request.username.trim())
            .await?
        {
            Some(user) => user,
            None => {
                verify_password(&request.password, &DUMMY_HASH);
                return Err(AuthServiceError::InvalidCredentials);
            }
        };

        if !verify_password(&request.password, &user.password_hash) {
            tracing::debug!(user_id = user.id, "Password mismatch");
            return Err(AuthServiceError::InvalidCredentials);
        }

        if let Err(e) = self.user_repository.record_login(user.id).await {
            tracing::warn!(user_id = user.id, "Failed to record login: {}", e);
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserType;
    use crate::repositories::user_repository::MockUserRepository;
    use crate::services::password::hash_password;
    use mockall::predicate::*;

    fn user_with_password(password: &str) -> User {
        User {
            id: 7,
            username: "asha".to_string(),
            email: "asha@example.com".to_string(),
            first_name: "Asha".to_string(),
            last_name: "Rao".to_string(),
            password_hash: hash_password(password).unwrap(),
            user_type: UserType::Patient,
            profile_picture: None,
            address_line1: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            date_joined: "2025-01-01 00:00:00".to_string(),
            last_login: None,
        }
    }

    #[tokio::test]
    async fn test_authenticate_unknown_username() {
        let mut mock_repo = MockUserRepository::new();

        mock_repo
            .expect_find_by_username()
            .with(eq("ghost"))
            .times(1)
            .returning(|_| Box::pin(async move { Ok(None) }));
        mock_repo.expect_record_login().never();

        let service = AuthService::new(Arc::new(mock_repo));

        let request = LoginRequest {
            username: "ghost".to_string(),
            password: "password123".to_string(),
        };

        let result = service.authenticate(request).await;
        assert!(matches!(result, Err(AuthServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_authenticate_wrong_password() {
        let mut mock_repo = MockUserRepository::new();
        let user = user_with_password("right-password");

        mock_repo
            .expect_find_by_username()
            .with(eq("asha"))
            .times(1)
            .returning(move |_| {
                let user = user.clone();
                Box::pin(async move { Ok(Some(user)) })
            });
        mock_repo.expect_record_login().never();

        let service = AuthService::new(Arc::new(mock_repo));

        let result = service
            .authenticate(LoginRequest {
                username: "asha".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(result, Err(AuthServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_authenticate_success_records_login() {
        let mut mock_repo = MockUserRepository::new();
        let user = user_with_password("right-password");

        mock_repo
            .expect_find_by_username()
            .with(eq("asha"))
            .times(1)
            .returning(move |_| {
                let user = user.clone();
                Box::pin(async move { Ok(Some(user)) })
            });
        mock_repo
            .expect_record_login()
            .with(eq(7))
            .times(1)
            .returning(|_| Box::pin(async move { Ok(()) }));

        let service = AuthService::new(Arc::new(mock_repo));

        let user = service
            .authenticate(LoginRequest {
                username: " asha ".to_string(),
                password: "right-password".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, 7);
    }

    #[test]
    fn test_dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_HASH.starts_with("$argon2"));
        assert!(!verify_password("guess", &DUMMY_HASH));
    }

    #[tokio::test]
    async fn test_unknown_username_costs_a_password_verification() {
        let user = user_with_password("right-password");
        let mut mock_repo = MockUserRepository::new();
        mock_repo.expect_find_by_username().returning(move |name| {
            let found = (name == "asha").then(|| user.clone());
            Box::pin(async move { Ok(found) })
        });
        mock_repo.expect_record_login().never();
        let service = AuthService::new(Arc::new(mock_repo));

        let attempt = |username: &str| LoginRequest {
            username: username.to_string(),
            password: "wrong-password".to_string(),
        };

        // Warm up the lazily built hash before timing anything
        let _ = service.authenticate(attempt("ghost")).await;

        let started = std::time::Instant::now();
        let unknown = service.authenticate(attempt("ghost")).await;
        let unknown_elapsed = started.elapsed();

        let started = std::time::Instant::now();
        let wrong = service.authenticate(attempt("asha")).await;
        let wrong_elapsed = started.elapsed();

        assert!(matches!(unknown, Err(AuthServiceError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AuthServiceError::InvalidCredentials)));
        assert!(
            wrong_elapsed < unknown_elapsed * 5,
            "unknown user took {:?}, wrong password took {:?}",
            unknown_elapsed,
            wrong_elapsed
        );
    }
}
