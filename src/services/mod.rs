//! Session services.
//!
//! DESIGN
//! ======
//! Leaves first: `token_store` persists the session token, `claims` decodes
//! it, `api` talks to the REST backend, `validation` checks form input.
//! `session` composes those into the sign-in / sign-up / sign-out state
//! machine, and `guard` gates page loads on the stored token.

pub mod api;
pub mod claims;
pub mod guard;
pub mod session;
pub mod token_store;
pub mod validation;

use serde::Serialize;

// =============================================================================
// ROUTES
// =============================================================================

/// Navigation targets the session flows can send a caller to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Public landing page, which is also the sign-in form.
    Landing,
    SignUp,
    Dashboard,
    /// Informational page for signed-in users without the management role.
    AppInfo,
    Category,
    Product,
    Products,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::SignUp => "/signup",
            Self::Dashboard => "/dashboard",
            Self::AppInfo => "/app-info",
            Self::Category => "/category",
            Self::Product => "/product",
            Self::Products => "/products",
        }
    }
}

/// Where the header logo leads: the dashboard when signed in, the landing page otherwise.
#[must_use]
pub fn home_route(is_authenticated: bool) -> Route {
    if is_authenticated { Route::Dashboard } else { Route::Landing }
}

// =============================================================================
// NOTICES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A user-facing notification (toast) produced by a session flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
