//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the backend client, the route guard built over it, and the cookie
//! settings every request-scoped token store is created with. Nothing about
//! an individual session lives here; that is per request.

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::Config;
use crate::services::api::AuthApi;
use crate::services::guard::RouteGuard;
use crate::services::session::AuthSession;
use crate::services::token_store::{CookieOptions, CookieTokenStore};

/// Session cookie name, flags and expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
    pub options: CookieOptions,
}

impl CookieSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            options: CookieOptions::with_max_age_days(config.session_max_age_days),
        }
    }
}

/// Shared application state. Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn AuthApi>,
    pub guard: RouteGuard,
    pub cookie: Arc<CookieSettings>,
}

impl AppState {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, cookie: CookieSettings) -> Self {
        Self { guard: RouteGuard::new(api.clone()), api, cookie: Arc::new(cookie) }
    }

    /// Token store over the session cookie of one request.
    #[must_use]
    pub fn token_store(&self, headers: &HeaderMap) -> Arc<CookieTokenStore> {
        let store = CookieTokenStore::from_headers(headers, &self.cookie.name, self.cookie.secure);
        Arc::new(store.with_path(&self.cookie.options.path))
    }

    /// Session context for one request, sharing `store` with the caller.
    #[must_use]
    pub fn session(&self, store: Arc<CookieTokenStore>) -> AuthSession {
        AuthSession::new(self.api.clone(), store, self.cookie.options.clone())
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
