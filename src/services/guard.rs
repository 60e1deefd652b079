//! Route guards for page data loading.
//!
//! DESIGN
//! ======
//! `protect` wraps a page handler and runs before any of the page's own
//! backend calls:
//!
//! 1. no stored token → landing page, handler not invoked
//! 2. token does not decode → clear store, landing page
//! 3. management pages only: ask the backend for the user's role; a
//!    non-management user goes to the informational page, a rejected token
//!    is cleared and sent to the landing page
//! 4. run the handler; an authentication failure inside it clears the
//!    store and lands on the landing page, anything else propagates
//!
//! `guest` is the inverse for pages only reachable while signed out.
//!
//! The role comes from the backend on every guarded load, never from the
//! locally decoded claims; the decode only rejects malformed tokens early.

use std::future::Future;
use std::sync::Arc;

use super::Route;
use super::api::{ApiError, AuthApi, User};
use super::claims;
use super::token_store::TokenStore;

/// Who may load a protected page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any signed-in user.
    Authenticated,
    /// Signed-in users with the management role.
    Management,
}

/// Result of a guarded page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<P> {
    Render(P),
    Redirect(Route),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
    /// The backend rejected the session token while loading the page.
    #[error("session token rejected")]
    Unauthorized,

    #[error(transparent)]
    Api(ApiError),

    #[error("page load failed: {0}")]
    Other(String),
}

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        if err.is_auth() { Self::Unauthorized } else { Self::Api(err) }
    }
}

/// What a protected handler knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub token: String,
    /// Resolved for `Access::Management` pages; `None` otherwise.
    pub user: Option<User>,
}

#[derive(Clone)]
pub struct RouteGuard {
    api: Arc<dyn AuthApi>,
}

impl RouteGuard {
    pub fn new(api: Arc<dyn AuthApi>) -> Self {
        Self { api }
    }

    /// Run `handler` only for a caller with a valid session and the required access.
    ///
    /// # Errors
    ///
    /// Propagates handler errors other than [`PageError::Unauthorized`], and
    /// backend failures other than a rejected token during the role check.
    pub async fn protect<P, F, Fut>(
        &self,
        store: &dyn TokenStore,
        access: Access,
        handler: F,
    ) -> Result<PageOutcome<P>, PageError>
    where
        F: FnOnce(PageContext) -> Fut,
        Fut: Future<Output = Result<P, PageError>>,
    {
        let Some(token) = store.read() else {
            return Ok(PageOutcome::Redirect(Route::Landing));
        };

        if claims::decode(&token).is_none() {
            tracing::info!("malformed session token, clearing");
            store.clear();
            return Ok(PageOutcome::Redirect(Route::Landing));
        }

        let user = match access {
            Access::Authenticated => None,
            Access::Management => match self.api.user_detail(&token).await {
                Ok(user) if user.is_gestao => Some(user),
                Ok(user) => {
                    tracing::debug!(user_id = %user.id, "non-management user on management page");
                    return Ok(PageOutcome::Redirect(Route::AppInfo));
                }
                Err(e) if e.is_auth() => {
                    tracing::info!(error = %e, "session token rejected during role check, clearing");
                    store.clear();
                    return Ok(PageOutcome::Redirect(Route::Landing));
                }
                Err(e) => return Err(PageError::Api(e)),
            },
        };

        match handler(PageContext { token, user }).await {
            Ok(props) => Ok(PageOutcome::Render(props)),
            Err(PageError::Unauthorized) => {
                tracing::info!("session token rejected by page handler, clearing");
                store.clear();
                Ok(PageOutcome::Redirect(Route::Landing))
            }
            Err(e) => Err(e),
        }
    }

    /// Run `handler` only for a caller without a stored session token.
    ///
    /// # Errors
    ///
    /// Propagates handler errors.
    pub async fn guest<P, F, Fut>(&self, store: &dyn TokenStore, handler: F) -> Result<PageOutcome<P>, PageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P, PageError>>,
    {
        if store.read().is_some() {
            return Ok(PageOutcome::Redirect(Route::Dashboard));
        }
        handler().await.map(PageOutcome::Render)
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
