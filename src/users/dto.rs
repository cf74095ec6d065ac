use std::collections::BTreeMap;

use serde::{de::IgnoredAny, Deserialize, Serialize};

/// A JSON field expected to hold a string. Anything else is kept around so the
/// validator can report it instead of the deserializer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Text(String),
    #[default]
    Absent, // missing or null
    Other(IgnoredAny),
}

impl TextField {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Absent, null or `""`.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Absent => true,
            Self::Other(_) => false,
        }
    }
}

impl From<&str> for TextField {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Request body for registration.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: TextField,
    #[serde(default)]
    pub password: TextField,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, IgnoredAny>,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: TextField,
    #[serde(default)]
    pub password: TextField,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, IgnoredAny>,
}

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: &'static str,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self {
            success: true,
            message,
            data,
        }
    }
}
