//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The back office talks to this server, never to the REST backend
//! directly. Page routes return guarded JSON page props (or a redirect when
//! the guard says no); `/api/*` routes carry the session forms. Every
//! handler builds its token store from the request's cookies and hands the
//! jar back so cookie writes become `Set-Cookie` headers.

pub mod auth;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::services::guard::{PageError, PageOutcome};
use crate::services::token_store::CookieTokenStore;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::landing))
        .route("/signup", get(pages::sign_up))
        .route("/dashboard", get(pages::dashboard))
        .route("/category", get(pages::category))
        .route("/product", get(pages::product))
        .route("/products", get(pages::products))
        .route("/app-info", get(pages::app_info))
        .route("/api/session", post(auth::sign_in))
        .route("/api/session/logout", post(auth::sign_out))
        .route("/api/user", post(auth::sign_up))
        .route("/api/me", get(auth::me))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn page_error_response(err: &PageError) -> Response {
    let status = match err {
        PageError::Unauthorized => StatusCode::UNAUTHORIZED,
        PageError::Api(_) => StatusCode::BAD_GATEWAY,
        PageError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %err, status = status.as_u16(), "page load failed");
    (status, Json(ErrorBody { error: err.to_string() })).into_response()
}

/// Turn a guarded page result into a response, emitting any cookie changes the guard made.
pub(crate) fn page_response<P: Serialize>(
    store: &CookieTokenStore,
    result: Result<PageOutcome<P>, PageError>,
) -> Response {
    let jar = store.jar();
    match result {
        Ok(PageOutcome::Render(props)) => (jar, Json(props)).into_response(),
        Ok(PageOutcome::Redirect(route)) => (jar, Redirect::temporary(route.path())).into_response(),
        Err(e) => (jar, page_error_response(&e)).into_response(),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

// =============================================================================
// TEST HELPERS
// =============================================================================
