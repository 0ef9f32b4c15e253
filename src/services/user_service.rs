use crate::models::user::{AddressUpdate, NewUser, User, UserType};
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::services::password::{hash_password, password_problems};
use crate::validation::is_valid_email;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match!";
pub const USERNAME_TAKEN_MESSAGE: &str = "A user with that username already exists.";

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid input: {0}")]
    Invalid(FieldErrors),
    #[error("User not found")]
    UserNotFound,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Password hashing failed: {0}")]
    HashingError(String),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// Raw signup submission, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
    pub user_type: String,
    pub address_line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub profile_picture: Option<String>,
}

pub struct UpdatePasswordRequest {
    pub user_id: i64,
    pub new_password: String,
    pub new_password_confirm: Option<String>,
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

// (field, max length) for the required free-text fields
const TEXT_FIELDS: [(&str, usize); 8] = [
    ("first_name", 100),
    ("last_name", 100),
    ("username", 100),
    ("email", 254),
    ("address_line1", 255),
    ("city", 100),
    ("state", 100),
    ("pincode", 10),
];

fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED_MESSAGE);
        return;
    }
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    /// Runs every signup check and collects all failures.
    pub async fn validate_signup(&self, request: &CreateUserRequest) -> Result<(), UserServiceError> {
        let mut errors = FieldErrors::default();

        for (field, max) in TEXT_FIELDS {
            let value = match field {
                "first_name" => &request.first_name,
                "last_name" => &request.last_name,
                "username" => &request.username,
                "email" => &request.email,
                "address_line1" => &request.address_line1,
                "city" => &request.city,
                "state" => &request.state,
                _ => &request.pincode,
            };
            check_text(&mut errors, field, value, max);
        }

        let username = request.username.trim();
        if !errors.has("username") {
            if !USERNAME_PATTERN.is_match(username) {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            } else if self.repository.find_by_username(username).await?.is_some() {
                errors.add("username", USERNAME_TAKEN_MESSAGE);
            }
        }

        if !errors.has("email") && !is_valid_email(&request.email) {
            errors.add("email", "Enter a valid email address.");
        }

        if request.user_type.trim().is_empty() {
            errors.add("user_type", REQUIRED_MESSAGE);
        } else if let Err(e) = request.user_type.parse::<UserType>() {
            errors.add("user_type", format!("Select a valid choice. {}.", e));
        }

        if request.password1.is_empty() {
            errors.add("password1", REQUIRED_MESSAGE);
        }
        if request.password2.is_empty() {
            errors.add("password2", REQUIRED_MESSAGE);
        }
        if !request.password1.is_empty() && !request.password2.is_empty() {
            if request.password1 != request.password2 {
                errors.add("password2", PASSWORD_MISMATCH_MESSAGE);
            } else {
                for problem in password_problems(&request.password2) {
                    errors.add("password2", problem);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(UserServiceError::Invalid(errors))
        }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        self.validate_signup(&request).await?;

        let user_type = request.user_type.parse::<UserType>().map_err(|e| {
            let mut errors = FieldErrors::default();
            errors.add("user_type", e.to_string());
            UserServiceError::Invalid(errors)
        })?;

        let password_hash = hash_password(&request.password1)
            .map_err(|e| UserServiceError::HashingError(e.to_string()))?;

        let new_user = NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            password_hash,
            user_type,
            profile_picture: request.profile_picture,
            address_line1: request.address_line1.trim().to_string(),
            city: request.city.trim().to_string(),
            state: request.state.trim().to_string(),
            pincode: request.pincode.trim().to_string(),
        };

        match self.repository.create_user(&new_user).await {
            Ok(user) => {
                tracing::info!(
                    user_id = user.id,
                    user_type = %user.user_type,
                    "Created user {}",
                    user.username
                );
                Ok(user)
            }
            Err(RepositoryError::AlreadyExists) => Err(UserServiceError::UsernameTaken),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_username(username.trim()).await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn list_users(
        &self,
        user_type: Option<UserType>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(user_type, limit, offset).await?)
    }

    pub async fn update_password(
        &self,
        request: UpdatePasswordRequest,
    ) -> Result<(), UserServiceError> {
        let mut errors = FieldErrors::default();
        if let Some(ref confirm) = request.new_password_confirm {
            if request.new_password != *confirm {
                errors.add("password2", PASSWORD_MISMATCH_MESSAGE);
            }
        }
        if errors.is_empty() {
            for problem in password_problems(&request.new_password) {
                errors.add("password1", problem);
            }
        }
        if !errors.is_empty() {
            return Err(UserServiceError::Invalid(errors));
        }

        let password_hash = hash_password(&request.new_password)
            .map_err(|e| UserServiceError::HashingError(e.to_string()))?;

        match self
            .repository
            .update_password(request.user_id, &password_hash)
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn update_address(
        &self,
        user_id: i64,
        update: AddressUpdate,
    ) -> Result<(), UserServiceError> {
        let mut errors = FieldErrors::default();
        let fields = [
            ("address_line1", &update.address_line1, 255),
            ("city", &update.city, 100),
            ("state", &update.state, 100),
            ("pincode", &update.pincode, 10),
        ];
        for (field, value, max) in fields {
            if let Some(value) = value {
                check_text(&mut errors, field, value, max);
            }
        }
        if !errors.is_empty() {
            return Err(UserServiceError::Invalid(errors));
        }

        let trimmed = AddressUpdate {
            address_line1: update.address_line1.map(|v| v.trim().to_string()),
            city: update.city.map(|v| v.trim().to_string()),
            state: update.state.map(|v| v.trim().to_string()),
            pincode: update.pincode.map(|v| v.trim().to_string()),
        };

        match self.repository.update_address(user_id, &trimmed).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }
}
