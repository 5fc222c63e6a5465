use serde::{Deserialize, Serialize};

use crate::MAX_MESSAGE_LEN;

// -- Session claims --

/// Claims carried by the `curr_user` session cookie. Shared by the session
/// middleware and the login/signup handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub exp: usize,
}

// -- Flash notices --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Danger,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { category: FlashCategory::Success, message: message.into() }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self { category: FlashCategory::Danger, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self { category: FlashCategory::Info, message: message.into() }
    }
}

// -- Auth forms --

#[derive(Debug, Default, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image_url: Option<String>,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push("Username is required.");
        }
        if !is_valid_email(&self.email) {
            errors.push("Invalid email address.");
        }
        if self.password.chars().count() < 6 {
            errors.push("Password must be at least 6 characters.");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Profile --

#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// Current password, required to confirm the edit.
    pub password: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push("Username is required.");
        }
        if !is_valid_email(&self.email) {
            errors.push("Invalid email address.");
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct MessageForm {
    pub text: String,
}

impl MessageForm {
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let len = self.text.trim().chars().count();
        if len == 0 {
            Err(vec!["Message text is required."])
        } else if len > MAX_MESSAGE_LEN {
            Err(vec!["Messages are limited to 140 characters."])
        } else {
            Ok(())
        }
    }
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
}

impl UserSearchQuery {
    /// The search term, or `None` when absent or blank.
    pub fn term(&self) -> Option<&str> {
        non_empty(&self.q)
    }
}

/// Treats an empty HTML form field the same as a missing one.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}
