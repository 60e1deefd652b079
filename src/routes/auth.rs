//! Session form endpoints: sign-in, sign-up, sign-out and "who am I".
//!
//! Each request gets its own `AuthSession` over the request's cookie
//! store. Whatever the session writes to the store (the issued token on
//! sign-in, the removal cookie on sign-out or a rejected hydration) goes
//! back to the browser through the returned jar.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::services::api::{SignInForm, SignUpForm, User};
use crate::services::session::{AuthError, HydrateOutcome};
use crate::services::validation::FieldErrors;
use crate::services::{Notice, Route};
use crate::state::AppState;

/// Body of every session form response.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    /// Path the client should navigate to next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl SessionBody {
    fn navigate(route: Route) -> Self {
        Self { user: None, destination: Some(route.path()), notice: None, fields: None }
    }
}

impl From<&AuthError> for SessionBody {
    fn from(err: &AuthError) -> Self {
        Self { user: None, destination: None, notice: Some(err.notice()), fields: err.field_errors().cloned() }
    }
}

fn error_status(err: &AuthError) -> StatusCode {
    StatusCode::from_u16(err.status()).unwrap_or(StatusCode::BAD_GATEWAY)
}

/// `POST /api/session`: sign in and set the session cookie.
pub async fn sign_in(State(state): State<AppState>, headers: HeaderMap, Json(form): Json<SignInForm>) -> Response {
    let store = state.token_store(&headers);
    let session = state.session(store.clone());

    match session.sign_in(form).await {
        Ok(outcome) => {
            let body = SessionBody {
                user: Some(outcome.user),
                destination: Some(outcome.destination.path()),
                notice: Some(outcome.notice),
                fields: None,
            };
            (store.jar(), Json(body)).into_response()
        }
        Err(e) => (error_status(&e), Json(SessionBody::from(&e))).into_response(),
    }
}

/// `POST /api/user`: register an account. Does not sign in.
pub async fn sign_up(State(state): State<AppState>, headers: HeaderMap, Json(form): Json<SignUpForm>) -> Response {
    let session = state.session(state.token_store(&headers));

    match session.sign_up(form).await {
        Ok(outcome) => {
            let body = SessionBody { notice: Some(outcome.notice), ..SessionBody::navigate(outcome.destination) };
            (StatusCode::CREATED, Json(body)).into_response()
        }
        Err(e) => (error_status(&e), Json(SessionBody::from(&e))).into_response(),
    }
}

/// `POST /api/session/logout`: clear the session cookie.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let destination = state.session(store.clone()).sign_out();
    (store.jar(), Json(SessionBody::navigate(destination))).into_response()
}

/// `GET /api/me`: resolve the caller's identity from the session cookie.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let session = state.session(store.clone());

    match session.hydrate().await {
        HydrateOutcome::Authenticated(user) => Json(user).into_response(),
        HydrateOutcome::Anonymous => {
            (StatusCode::UNAUTHORIZED, Json(SessionBody::navigate(Route::Landing))).into_response()
        }
        HydrateOutcome::Pending => {
            let busy = AuthError::Busy;
            (error_status(&busy), Json(SessionBody::from(&busy))).into_response()
        }
        HydrateOutcome::Expired { redirect } => {
            (StatusCode::UNAUTHORIZED, store.jar(), Json(SessionBody::navigate(redirect))).into_response()
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
