use std::collections::HashMap;

use crate::models::user::UserType;
use crate::services::user_service::{CreateUserRequest, FieldErrors};

pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One rendered form input with its previous value and error messages.
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub value: String,
    pub required: bool,
    pub max_length: usize,
    pub options: Vec<SelectOption>,
    pub errors: Vec<String>,
}

impl FormField {
    pub fn is_select(&self) -> bool {
        self.input_type == "select"
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// (name, label, input type, required, max length)
const SIGNUP_FIELDS: [(&str, &str, &str, bool, usize); 12] = [
    ("first_name", "First name", "text", true, 100),
    ("last_name", "Last name", "text", true, 100),
    ("username", "Username", "text", true, 100),
    ("email", "Email", "email", true, 254),
    ("profile_picture", "Profile picture", "file", false, 0),
    ("password1", "Password", "password", true, 0),
    ("password2", "Password confirmation", "password", true, 0),
    ("address_line1", "Address line1", "text", true, 255),
    ("city", "City", "text", true, 100),
    ("state", "State", "text", true, 100),
    ("pincode", "Pincode", "text", true, 10),
    ("user_type", "User type", "select", true, 0),
];

/// Text values of a submitted signup form, keyed by field name.
#[derive(Debug, Default)]
pub struct SignupValues(HashMap<String, String>);

impl SignupValues {
    pub fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn to_request(&self) -> CreateUserRequest {
        CreateUserRequest {
            username: self.get("username").to_string(),
            email: self.get("email").to_string(),
            first_name: self.get("first_name").to_string(),
            last_name: self.get("last_name").to_string(),
            password1: self.get("password1").to_string(),
            password2: self.get("password2").to_string(),
            user_type: self.get("user_type").to_string(),
            address_line1: self.get("address_line1").to_string(),
            city: self.get("city").to_string(),
            state: self.get("state").to_string(),
            pincode: self.get("pincode").to_string(),
            profile_picture: None,
        }
    }
}

/// Builds the signup inputs. Passwords are never echoed back and file
/// inputs cannot be prefilled.
pub fn signup_fields(values: &SignupValues, errors: &FieldErrors) -> Vec<FormField> {
    SIGNUP_FIELDS
        .iter()
        .map(|&(name, label, input_type, required, max_length)| {
            let value = match input_type {
                "password" | "file" => String::new(),
                _ => values.get(name).to_string(),
            };
            let options = if input_type == "select" {
                UserType::ALL
                    .iter()
                    .map(|user_type| SelectOption {
                        value: user_type.as_str(),
                        label: user_type.label(),
                        selected: value == user_type.as_str(),
                    })
                    .collect()
            } else {
                Vec::new()
            };

            FormField {
                name,
                label,
                input_type,
                value,
                required,
                max_length,
                options,
                errors: errors.get(name).to_vec(),
            }
        })
        .collect()
}
