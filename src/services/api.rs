//! REST backend client: session, registration, identity and page data.
//!
//! The backend is external. This module only knows its request/response
//! shapes: `POST /session`, `POST /user`, `GET /user/detail`, plus bearer
//! authorized `GET`s for page data. `AuthApi` is the seam the session
//! manager and the route guard depend on, so tests swap in mocks.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ApiTimeouts;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect failure, timeout).
    #[error("backend request failed: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("backend returned status {status}")]
    Status { status: u16, message: Option<String> },

    /// The response body did not match the expected shape.
    #[error("backend response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// The backend rejected the credential presented with the request.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }

    /// The backend's own `{error}` text, when it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Sign-in form; also the `POST /session` body.
///
/// Missing fields deserialize as empty so they reach form validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Sign-up form; also the `POST /user` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub is_gestao: bool,
}

/// Successful `POST /session` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub is_gestao: bool,
}

/// The signed-in user, as the backend describes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Management ("gestão") role flag.
    #[serde(default)]
    pub is_gestao: bool,
}

impl User {
    /// Avatar initials: first letter of each name part, upper-cased. `"U"` when the name is blank.
    #[must_use]
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect();
        if initials.is_empty() { "U".to_owned() } else { initials }
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

// =============================================================================
// TRAIT
// =============================================================================

/// Operations the session flows need from the REST backend.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /session`.
    async fn create_session(&self, form: &SignInForm) -> Result<SessionResponse, ApiError>;

    /// `POST /user`.
    async fn create_user(&self, form: &SignUpForm) -> Result<(), ApiError>;

    /// `GET /user/detail` with `token` as the bearer credential.
    async fn user_detail(&self, token: &str) -> Result<User, ApiError>;

    /// Authorized `GET` of page data. `None` sends the request without credentials.
    async fn fetch(&self, path: &str, token: Option<&str>) -> Result<serde_json::Value, ApiError>;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeouts: ApiTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(status_error(status, &text));
        }
        Ok(text)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ApiError> {
        let text = self.send(request).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl AuthApi for BackendClient {
    async fn create_session(&self, form: &SignInForm) -> Result<SessionResponse, ApiError> {
        self.send_json(self.http.post(self.url("/session")).json(form)).await
    }

    async fn create_user(&self, form: &SignUpForm) -> Result<(), ApiError> {
        self.send(self.http.post(self.url("/user")).json(form)).await.map(|_| ())
    }

    async fn user_detail(&self, token: &str) -> Result<User, ApiError> {
        self.send_json(self.http.get(self.url("/user/detail")).bearer_auth(token)).await
    }

    async fn fetch(&self, path: &str, token: Option<&str>) -> Result<serde_json::Value, ApiError> {
        let request = self.http.get(self.url(path));
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        self.send_json(request).await
    }
}

/// Build the error for a non-2xx response, keeping the backend's `{error}` text if present.
pub(crate) fn status_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty());
    ApiError::Status { status, message }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
