//! Form validation shared by every session form.
//!
//! Runs before any network call. Every field is checked and all messages
//! are collected, so the caller can show them inline next to each field
//! plus one aggregate warning.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::api::{SignInForm, SignUpForm};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 12;
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const NAME_REQUIRED: &str = "The name field is required.";
pub const NAME_INCOMPLETE: &str = "Enter your first and last name.";
pub const EMAIL_REQUIRED: &str = "The email field is required.";
pub const EMAIL_INVALID: &str = "Please enter a valid email.";
pub const PASSWORD_REQUIRED: &str = "The password field is required.";
pub const PASSWORD_WEAK: &str = "The password must be 8 to 12 characters long and include at least one uppercase \
                                 letter, one number and one special character.";
pub const CONFIRM_REQUIRED: &str = "Confirm your password.";
pub const CONFIRM_MISMATCH: &str = "Passwords do not match.";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("static email pattern"));

/// Inline error message per form field. `None` means the field is fine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_password: Option<&'static str>,
}

impl FieldErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password.is_none() && self.confirm_password.is_none()
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check an email address. Expects the normalized form.
///
/// # Errors
///
/// Returns the inline message when the email is empty or malformed.
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err(EMAIL_REQUIRED);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(EMAIL_INVALID);
    }
    Ok(())
}

/// 8–12 characters with an upper-case letter, a digit and a special character.
#[must_use]
pub fn password_meets_policy(password: &str) -> bool {
    let len = password.chars().count();
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len)
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c))
}

/// Validate a sign-in form. The password is only required, not re-checked against the policy.
///
/// # Errors
///
/// Returns every failing field's message.
pub fn validate_sign_in(form: &SignInForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors { email: validate_email(&form.email).err(), ..FieldErrors::default() };
    if form.password.is_empty() {
        errors.password = Some(PASSWORD_REQUIRED);
    }
    errors.into_result()
}

/// Validate a sign-up form.
///
/// # Errors
///
/// Returns every failing field's message.
pub fn validate_sign_up(form: &SignUpForm) -> Result<(), FieldErrors> {
    let name = form.name.trim();
    let mut errors = FieldErrors::default();

    if name.is_empty() {
        errors.name = Some(NAME_REQUIRED);
    } else if name.split_whitespace().count() < 2 {
        errors.name = Some(NAME_INCOMPLETE);
    }

    errors.email = validate_email(&form.email).err();

    if form.password.is_empty() {
        errors.password = Some(PASSWORD_REQUIRED);
    } else if !password_meets_policy(&form.password) {
        errors.password = Some(PASSWORD_WEAK);
    }

    if form.confirm_password.is_empty() {
        errors.confirm_password = Some(CONFIRM_REQUIRED);
    } else if form.password != form.confirm_password {
        errors.confirm_password = Some(CONFIRM_MISMATCH);
    }

    errors.into_result()
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
