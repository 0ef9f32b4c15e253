use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Account role chosen at signup. Drives dashboard routing and never changes
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Patient,
    Doctor,
}

impl UserType {
    pub const ALL: [UserType; 2] = [UserType::Patient, UserType::Doctor];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Patient => "patient",
            UserType::Doctor => "doctor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UserType::Patient => "Patient",
            UserType::Doctor => "Doctor",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not one of the available choices")]
pub struct UnknownUserType(pub String);

impl FromStr for UserType {
    type Err = UnknownUserType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "patient" => Ok(UserType::Patient),
            "doctor" => Ok(UserType::Doctor),
            other => Err(UnknownUserType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub user_type: UserType,
    pub profile_picture: Option<String>,
    pub address_line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub date_joined: String,
    pub last_login: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_doctor(&self) -> bool {
        self.user_type == UserType::Doctor
    }
}

/// Validated row data for a new account. The password is already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub profile_picture: Option<String>,
    pub address_line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// Partial address edit applied by operators. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressUpdate {
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
}

impl AddressUpdate {
    pub fn is_empty(&self) -> bool {
        self.address_line1.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.pincode.is_none()
    }
}
