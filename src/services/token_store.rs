//! Session token persistence.
//!
//! DESIGN
//! ======
//! At most one session token exists per client context. `TokenStore` hides
//! where it lives: the request's cookie jar on the server, a JSON file for
//! the CLI, plain memory for tests and embedders.
//!
//! ERROR HANDLING
//! ==============
//! Storage failures are logged and swallowed. `save` and `clear` degrade to
//! no-ops and `read` reports "absent", so a broken store never takes the
//! caller down with it. `clear` is idempotent.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Expiry policy and scope applied when a token is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub path: String,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self { max_age: Duration::days(DEFAULT_MAX_AGE_DAYS), path: "/".to_owned() }
    }
}

impl CookieOptions {
    #[must_use]
    pub fn with_max_age_days(days: i64) -> Self {
        Self { max_age: Duration::days(days), ..Self::default() }
    }
}

/// Durable home of the session token.
pub trait TokenStore: Send + Sync {
    /// Store `token`, replacing any previous one.
    fn save(&self, token: &str, options: &CookieOptions);

    /// The current token, or `None` when absent.
    fn read(&self) -> Option<String>;

    /// Remove the token. No-op when already absent.
    fn clear(&self);
}

/// Recovers a poisoned lock with a warning.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("token store lock poisoned, recovering");
        poisoned.into_inner()
    })
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_owned())) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn save(&self, token: &str, _options: &CookieOptions) {
        *lock(&self.token) = Some(token.to_owned());
    }

    fn read(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    fn clear(&self) {
        lock(&self.token).take();
    }
}

// =============================================================================
// COOKIE
// =============================================================================

/// Request-scoped store over the browser's cookie jar.
///
/// Reads come from the incoming `Cookie` header; writes accumulate in the
/// jar, which the handler returns so axum emits the `Set-Cookie` headers.
/// Removal cookies use the path of the last save (`/` until then).
pub struct CookieTokenStore {
    jar: Mutex<CookieJar>,
    name: String,
    secure: bool,
    path: Mutex<String>,
}

impl CookieTokenStore {
    #[must_use]
    pub fn new(jar: CookieJar, name: &str, secure: bool) -> Self {
        Self { jar: Mutex::new(jar), name: name.to_owned(), secure, path: Mutex::new("/".to_owned()) }
    }

    /// Scope used by `clear` before anything has been saved.
    #[must_use]
    pub fn with_path(self, path: &str) -> Self {
        *lock(&self.path) = path.to_owned();
        self
    }

    #[must_use]
    pub fn from_headers(headers: &HeaderMap, name: &str, secure: bool) -> Self {
        Self::new(CookieJar::from_headers(headers), name, secure)
    }

    /// Snapshot of the jar including every pending change.
    #[must_use]
    pub fn jar(&self) -> CookieJar {
        lock(&self.jar).clone()
    }

    fn cookie(&self, value: String, path: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((self.name.clone(), value))
            .path(path)
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }
}

impl TokenStore for CookieTokenStore {
    fn save(&self, token: &str, options: &CookieOptions) {
        let cookie = self.cookie(token.to_owned(), options.path.clone(), options.max_age);
        lock(&self.path).clone_from(&options.path);
        let mut jar = lock(&self.jar);
        *jar = jar.clone().add(cookie);
    }

    fn read(&self) -> Option<String> {
        let jar = lock(&self.jar);
        jar.get(&self.name)
            .map(Cookie::value)
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
    }

    fn clear(&self) {
        let path = lock(&self.path).clone();
        let removal = self.cookie(String::new(), path, Duration::ZERO);
        let mut jar = lock(&self.jar);
        *jar = jar.clone().add(removal);
    }
}

// =============================================================================
// FILE
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    path: String,
    /// Unix seconds after which the token is treated as absent.
    expires_at: i64,
}

/// JSON file store for long-lived terminal sessions. On unix the file is
/// readable by its owner only.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, stored: &StoredToken) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec(stored)?;

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
        let mut file = options.open(&self.path)?;
        // `mode` only applies on creation; tighten files left by older runs.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt as _;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(&body)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str, options: &CookieOptions) {
        let stored = StoredToken {
            token: token.to_owned(),
            path: options.path.clone(),
            expires_at: unix_now().saturating_add(options.max_age.whole_seconds()),
        };
        if let Err(e) = self.write(&stored) {
            tracing::warn!(error = %e, path = %self.path.display(), "token store save failed");
        }
    }

    fn read(&self) -> Option<String> {
        let body = match std::fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "token store read failed");
                return None;
            }
        };
        let stored: StoredToken = match serde_json::from_slice(&body) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, path = %self.path.display(), "token store file is corrupt");
                return None;
            }
        };
        (stored.expires_at > unix_now() && !stored.token.is_empty()).then_some(stored.token)
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "token store clear failed"),
        }
    }
}

#[cfg(test)]
#[path = "token_store_test.rs"]
mod tests;
