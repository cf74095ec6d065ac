use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::IgnoredAny, Serialize};

use crate::users::dto::{LoginRequest, RegisterRequest, TextField};

pub const MIN_PASSWORD_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = "@$!%*?&#";

pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Please provide a valid email address";
pub const PASSWORD_NOT_STRING: &str = "Password must be a string";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";
pub const PASSWORD_TOO_WEAK: &str = "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validated view over a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_strong_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

// Every rule runs on its field; an absent email fails both format and presence.
fn check_email(email: &TextField, errors: &mut Vec<FieldError>) {
    if !email.as_str().is_some_and(is_valid_email) {
        errors.push(FieldError::new("email", EMAIL_INVALID));
    }
    if email.is_empty() {
        errors.push(FieldError::new("email", EMAIL_REQUIRED));
    }
}

fn check_unknown(unknown: &BTreeMap<String, IgnoredAny>, errors: &mut Vec<FieldError>) {
    for name in unknown.keys() {
        errors.push(FieldError::new(
            name.as_str(),
            format!("property {name} should not exist"),
        ));
    }
}

fn finish<'a>(
    email: &'a TextField,
    password: &'a TextField,
    errors: Vec<FieldError>,
) -> Result<Credentials<'a>, Vec<FieldError>> {
    match (email.as_str(), password.as_str()) {
        (Some(email), Some(password)) if errors.is_empty() => Ok(Credentials { email, password }),
        _ => Err(errors),
    }
}

/// Collects every failing rule, not just the first.
pub fn validate_register(req: &RegisterRequest) -> Result<Credentials<'_>, Vec<FieldError>> {
    let mut errors = Vec::new();
    check_unknown(&req.unknown, &mut errors);
    check_email(&req.email, &mut errors);

    let password = req.password.as_str();
    if password.is_none() {
        errors.push(FieldError::new("password", PASSWORD_NOT_STRING));
    }
    if req.password.is_empty() {
        errors.push(FieldError::new("password", PASSWORD_REQUIRED));
    }
    if !password.is_some_and(|p| p.chars().count() >= MIN_PASSWORD_LEN) {
        errors.push(FieldError::new("password", PASSWORD_TOO_SHORT));
    }
    if !password.is_some_and(is_strong_password) {
        errors.push(FieldError::new("password", PASSWORD_TOO_WEAK));
    }

    finish(&req.email, &req.password, errors)
}

/// Presence and email shape only; no complexity rules on login.
pub fn validate_login(req: &LoginRequest) -> Result<Credentials<'_>, Vec<FieldError>> {
    let mut errors = Vec::new();
    check_unknown(&req.unknown, &mut errors);
    check_email(&req.email, &mut errors);
    if req.password.is_empty() {
        errors.push(FieldError::new("password", PASSWORD_REQUIRED));
    } else if req.password.as_str().is_none() {
        errors.push(FieldError::new("password", PASSWORD_NOT_STRING));
    }

    finish(&req.email, &req.password, errors)
}
