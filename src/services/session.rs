//! Auth session manager: sign-in, sign-up, sign-out and startup hydration.
//!
//! STATE MACHINE
//! =============
//! `Unauthenticated` → `Hydrating` (stored token found at startup) →
//! `Authenticated` on a successful identity lookup, or back to
//! `Unauthenticated` (store cleared) when the lookup fails. `sign_in`
//! moves any state to `Authenticated`; `sign_out` moves any state to
//! `Unauthenticated`.
//!
//! ORDERING
//! ========
//! The issued token is written to the store before it becomes the bearer
//! credential for `fetch`. Overlapping sign-in / sign-up submissions on one
//! session are rejected with `AuthError::Busy` instead of racing.
//!
//! Only the token is persisted. The user identity is always re-derived
//! from the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::api::{ApiError, AuthApi, SignInForm, SignUpForm, User};
use super::token_store::{CookieOptions, TokenStore};
use super::validation::{self, FieldErrors};
use super::{Notice, Route};

pub const SIGN_IN_SUCCESS: &str = "Signed in successfully!";
pub const SIGN_UP_SUCCESS: &str = "Account created successfully!";
pub const FORM_WARNING: &str = "Fill in the fields correctly!";
pub const BUSY_WARNING: &str = "A request is already in progress. Please wait.";
pub const UNREACHABLE: &str = "Could not reach the server. Please try again.";

const SIGN_IN_401: &str = "Incorrect email and/or password.";
const SIGN_IN_400: &str = "Email and password are required.";
const SIGN_IN_500: &str = "Internal server error.";
const SIGN_IN_GENERIC: &str = "Could not sign in, check your credentials.";
const SIGN_UP_DUPLICATE: &str = "This email is already registered.";
const SIGN_UP_GENERIC: &str = "Could not complete sign-up. Try again or use another email.";

// =============================================================================
// STATE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// A stored token was found and the identity lookup is pending.
    Hydrating,
    Authenticated(User),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HydrateOutcome {
    /// No stored token.
    Anonymous,
    /// Another `hydrate` on this session is still waiting for the lookup.
    Pending,
    Authenticated(User),
    /// The stored token was rejected or could not be checked; it has been cleared.
    Expired { redirect: Route },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInOutcome {
    pub user: User,
    pub destination: Route,
    pub notice: Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub destination: Route,
    pub notice: Notice,
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Client-side validation failed; nothing was sent.
    #[error("form validation failed")]
    Invalid(FieldErrors),

    /// Another sign-in or sign-up is still pending on this session.
    #[error("another session request is in flight")]
    Busy,

    /// 401 from the backend.
    #[error("credentials rejected: {message}")]
    Credentials { message: String },

    /// 400 from the backend.
    #[error("request rejected: {message}")]
    BadRequest { message: String },

    /// 409 on sign-up.
    #[error("email already registered: {message}")]
    DuplicateEmail { message: String },

    /// Any other non-2xx status.
    #[error("backend error {status}: {message}")]
    Server { status: u16, message: String },

    /// The backend could not be reached or answered garbage.
    #[error("backend unreachable: {0}")]
    Transport(String),
}

impl AuthError {
    /// The notification to show the user for this failure.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Invalid(_) => Notice::warning(FORM_WARNING),
            Self::Busy => Notice::warning(BUSY_WARNING),
            Self::Credentials { message }
            | Self::BadRequest { message }
            | Self::DuplicateEmail { message }
            | Self::Server { message, .. } => Notice::error(message.clone()),
            Self::Transport(_) => Notice::error(UNREACHABLE),
        }
    }

    /// Inline per-field messages, for validation failures.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }

    /// HTTP status class the failure corresponds to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Invalid(_) => 422,
            Self::Busy | Self::DuplicateEmail { .. } => 409,
            Self::Credentials { .. } => 401,
            Self::BadRequest { .. } => 400,
            Self::Server { status, .. } => *status,
            Self::Transport(_) => 502,
        }
    }
}

fn backend_text(err: &ApiError, fallback: &str) -> String {
    err.backend_message().unwrap_or(fallback).to_owned()
}

fn sign_in_error(err: &ApiError) -> AuthError {
    match err {
        ApiError::Status { status: 401, .. } => AuthError::Credentials { message: backend_text(err, SIGN_IN_401) },
        ApiError::Status { status: 400, .. } => AuthError::BadRequest { message: backend_text(err, SIGN_IN_400) },
        ApiError::Status { status: 500, .. } => {
            AuthError::Server { status: 500, message: backend_text(err, SIGN_IN_500) }
        }
        ApiError::Status { status, .. } => AuthError::Server { status: *status, message: SIGN_IN_GENERIC.to_owned() },
        ApiError::Transport(e) | ApiError::Parse(e) | ApiError::HttpClientBuild(e) => AuthError::Transport(e.clone()),
    }
}

fn sign_up_error(err: &ApiError) -> AuthError {
    match err {
        ApiError::Status { status: 409, .. } => {
            AuthError::DuplicateEmail { message: backend_text(err, SIGN_UP_DUPLICATE) }
        }
        ApiError::Status { status: 400, .. } => AuthError::BadRequest { message: backend_text(err, SIGN_UP_GENERIC) },
        ApiError::Status { status, .. } => AuthError::Server { status: *status, message: SIGN_UP_GENERIC.to_owned() },
        ApiError::Transport(e) | ApiError::Parse(e) | ApiError::HttpClientBuild(e) => AuthError::Transport(e.clone()),
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Releases the in-flight flag when a submission finishes, on every path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AuthError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| AuthError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-client session context: one instance per browser request on the
/// server, one per process in the CLI.
pub struct AuthSession {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
    cookie: CookieOptions,
    state: Mutex<SessionState>,
    bearer: Mutex<Option<String>>,
    in_flight: AtomicBool,
}

impl AuthSession {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>, cookie: CookieOptions) -> Self {
        Self {
            api,
            store,
            cookie,
            state: Mutex::new(SessionState::Unauthenticated),
            bearer: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    fn state_mut(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_bearer(&self, token: Option<String>) {
        *self.bearer.lock().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn bearer(&self) -> Option<String> {
        self.bearer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state_mut().clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        match &*self.state_mut() {
            SessionState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(*self.state_mut(), SessionState::Authenticated(_))
    }

    /// Resolve the identity behind a stored token, once, at session start.
    pub async fn hydrate(&self) -> HydrateOutcome {
        let token = {
            let mut state = self.state_mut();
            match &*state {
                SessionState::Authenticated(user) => return HydrateOutcome::Authenticated(user.clone()),
                SessionState::Hydrating => return HydrateOutcome::Pending,
                SessionState::Unauthenticated => {}
            }
            let Some(token) = self.store.read() else {
                return HydrateOutcome::Anonymous;
            };
            *state = SessionState::Hydrating;
            token
        };

        match self.api.user_detail(&token).await {
            Ok(user) => {
                self.set_bearer(Some(token));
                *self.state_mut() = SessionState::Authenticated(user.clone());
                tracing::debug!(user_id = %user.id, "session hydrated");
                HydrateOutcome::Authenticated(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stored session rejected, signing out");
                HydrateOutcome::Expired { redirect: self.sign_out() }
            }
        }
    }

    /// Submit credentials and, on success, persist the issued token.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` without a network call when the form fails validation,
    /// `Busy` when another submission is pending, and a status-specific error
    /// when the backend refuses. The session state is unchanged on error.
    pub async fn sign_in(&self, form: SignInForm) -> Result<SignInOutcome, AuthError> {
        let form = SignInForm { email: validation::normalize_email(&form.email), ..form };
        validation::validate_sign_in(&form).map_err(AuthError::Invalid)?;
        let _in_flight = InFlight::acquire(&self.in_flight)?;

        let session = self.api.create_session(&form).await.map_err(|e| {
            tracing::warn!(error = %e, "sign-in failed");
            sign_in_error(&e)
        })?;

        self.store.save(&session.token, &self.cookie);
        self.set_bearer(Some(session.token));

        let user = User { id: session.id, name: session.name, email: form.email, is_gestao: session.is_gestao };
        *self.state_mut() = SessionState::Authenticated(user.clone());

        let destination = if user.is_gestao { Route::Dashboard } else { Route::AppInfo };
        tracing::info!(user_id = %user.id, destination = destination.path(), "signed in");
        Ok(SignInOutcome { user, destination, notice: Notice::success(SIGN_IN_SUCCESS) })
    }

    /// Register a new account. Does not sign the user in.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` without a network call when the form fails validation,
    /// `Busy` when another submission is pending, `DuplicateEmail` on 409, and a
    /// generic failure otherwise.
    pub async fn sign_up(&self, form: SignUpForm) -> Result<SignUpOutcome, AuthError> {
        let form = SignUpForm { email: validation::normalize_email(&form.email), ..form };
        validation::validate_sign_up(&form).map_err(AuthError::Invalid)?;
        let _in_flight = InFlight::acquire(&self.in_flight)?;

        self.api.create_user(&form).await.map_err(|e| {
            tracing::warn!(error = %e, "sign-up failed");
            sign_up_error(&e)
        })?;

        tracing::info!("account created");
        Ok(SignUpOutcome { destination: Route::Landing, notice: Notice::success(SIGN_UP_SUCCESS) })
    }

    /// Drop the session. Always succeeds and always lands on the public page.
    pub fn sign_out(&self) -> Route {
        self.store.clear();
        self.set_bearer(None);
        *self.state_mut() = SessionState::Unauthenticated;
        Route::Landing
    }

    /// `GET` page data with the session's bearer credential, if one is installed.
    ///
    /// # Errors
    ///
    /// Returns the backend error unchanged.
    pub async fn fetch(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        let bearer = self.bearer();
        self.api.fetch(path, bearer.as_deref()).await
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
