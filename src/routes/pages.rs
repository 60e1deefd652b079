//! Back-office page props.
//!
//! Each handler wraps its data loading in the route guard. Management pages
//! get the server-resolved user from the guard and render the header from
//! it; page data is fetched with the caller's own session token.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::page_response;
use crate::services::api::{ApiError, AuthApi, User};
use crate::services::guard::{Access, PageContext, PageError};
use crate::services::{Route, home_route};
use crate::state::AppState;

pub const APP_DOWNLOAD_URL: &str = "https://play.google.com";

// =============================================================================
// PROPS
// =============================================================================

/// Signed-in header: greeting, avatar initials and where the logo leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderProps {
    pub first_name: String,
    pub initials: String,
    pub home: &'static str,
}

impl HeaderProps {
    #[must_use]
    pub fn for_user(user: Option<&User>) -> Self {
        Self {
            first_name: user.map(User::first_name).unwrap_or_default().to_owned(),
            initials: user.map_or_else(|| "U".to_owned(), User::initials),
            home: home_route(user.is_some()).path(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GuestProps {
    pub page: Route,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Table number; the backend sends either a number or a string.
    pub table: serde_json::Value,
    /// `true` once the order is finished.
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub name: Option<String>,
}

impl Order {
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.status && !self.draft
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardProps {
    pub header: HeaderProps,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct CategoryProps {
    pub header: HeaderProps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProductFormProps {
    pub header: HeaderProps,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Decimal price as the backend formats it.
    pub price: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductsProps {
    pub header: HeaderProps,
    pub products: Vec<Product>,
}

#[derive(Debug, Serialize)]
pub struct AppInfoProps {
    pub title: &'static str,
    pub message: &'static str,
    pub download_url: &'static str,
}

// =============================================================================
// DATA LOADING
// =============================================================================

async fn load<T: DeserializeOwned>(api: &dyn AuthApi, ctx: &PageContext, path: &str) -> Result<T, PageError> {
    let value = api.fetch(path, Some(&ctx.token)).await?;
    serde_json::from_value(value).map_err(|e| PageError::Api(ApiError::Parse(e.to_string())))
}

/// Open orders from a `GET /orders` body. A non-list body (the backend's
/// `{message}` for "nothing found") means no orders.
#[must_use]
pub fn open_orders(body: serde_json::Value) -> Vec<Order> {
    let serde_json::Value::Array(items) = body else {
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Order>(item) {
            Ok(order) => Some(order),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed order");
                None
            }
        })
        .filter(Order::is_open)
        .collect()
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /`: sign-in page, signed-out callers only.
pub async fn landing(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let result = state
        .guard
        .guest(store.as_ref(), || async { Ok(GuestProps { page: Route::Landing, title: "E2E Burguer - Sign in" }) })
        .await;
    page_response(&store, result)
}

/// `GET /signup`: sign-up page, signed-out callers only.
pub async fn sign_up(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let result = state
        .guard
        .guest(store.as_ref(), || async {
            Ok(GuestProps { page: Route::SignUp, title: "E2E Burguer - Create account" })
        })
        .await;
    page_response(&store, result)
}

/// `GET /dashboard`: open orders.
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let api = state.api.as_ref();
    let result = state
        .guard
        .protect(store.as_ref(), Access::Management, |ctx| async move {
            let body = api.fetch("/orders", Some(&ctx.token)).await?;
            Ok::<_, PageError>(DashboardProps {
                header: HeaderProps::for_user(ctx.user.as_ref()),
                orders: open_orders(body),
            })
        })
        .await;
    page_response(&store, result)
}

/// `GET /category`: new category form.
pub async fn category(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let result = state
        .guard
        .protect(store.as_ref(), Access::Management, |ctx| async move {
            Ok(CategoryProps { header: HeaderProps::for_user(ctx.user.as_ref()) })
        })
        .await;
    page_response(&store, result)
}

/// `GET /product`: new product form with the category picker.
pub async fn product(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let api = state.api.as_ref();
    let result = state
        .guard
        .protect(store.as_ref(), Access::Management, |ctx| async move {
            let categories = load(api, &ctx, "/category/list").await?;
            Ok::<_, PageError>(ProductFormProps { header: HeaderProps::for_user(ctx.user.as_ref()), categories })
        })
        .await;
    page_response(&store, result)
}

/// `GET /products`: product catalogue.
pub async fn products(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let api = state.api.as_ref();
    let result = state
        .guard
        .protect(store.as_ref(), Access::Management, |ctx| async move {
            let products = load(api, &ctx, "/products").await?;
            Ok::<_, PageError>(ProductsProps { header: HeaderProps::for_user(ctx.user.as_ref()), products })
        })
        .await;
    page_response(&store, result)
}

/// `GET /app-info`: where non-management users land.
pub async fn app_info(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.token_store(&headers);
    let result = state
        .guard
        .protect(store.as_ref(), Access::Authenticated, |_ctx| async {
            Ok::<_, PageError>(AppInfoProps {
                title: "E2E Burguer app access",
                message: "New features are coming to the mobile app soon. We will let you know when it is \
                          ready to download.",
                download_url: APP_DOWNLOAD_URL,
            })
        })
        .await;
    page_response(&store, result)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
