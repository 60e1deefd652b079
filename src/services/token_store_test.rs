use super::*;
use axum::http::header::{COOKIE, HeaderValue};

// =============================================================================
// CookieOptions
// =============================================================================

#[test]
fn default_options_are_thirty_days_site_wide() {
    let options = CookieOptions::default();
    assert_eq!(options.max_age, Duration::days(30));
    assert_eq!(options.path, "/");
}

#[test]
fn with_max_age_days_keeps_root_path() {
    let options = CookieOptions::with_max_age_days(7);
    assert_eq!(options.max_age, Duration::days(7));
    assert_eq!(options.path, "/");
}

// =============================================================================
// MemoryTokenStore
// =============================================================================

#[test]
fn memory_read_absent_by_default() {
    assert_eq!(MemoryTokenStore::new().read(), None);
}

#[test]
fn memory_save_then_read() {
    let store = MemoryTokenStore::new();
    store.save("abc.def.ghi", &CookieOptions::default());
    assert_eq!(store.read().as_deref(), Some("abc.def.ghi"));
}

#[test]
fn memory_save_overwrites() {
    let store = MemoryTokenStore::with_token("old");
    store.save("new", &CookieOptions::default());
    assert_eq!(store.read().as_deref(), Some("new"));
}

#[test]
fn memory_clear_is_idempotent() {
    let store = MemoryTokenStore::with_token("tok");
    store.clear();
    assert_eq!(store.read(), None);
    store.clear();
    assert_eq!(store.read(), None);
}

#[test]
fn memory_recovers_from_poisoned_lock() {
    let store = MemoryTokenStore::with_token("tok");
    let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _held = store.token.lock().unwrap();
        panic!("panic while holding the token lock");
    }));
    assert!(poisoned.is_err());
    assert!(store.token.is_poisoned());

    assert_eq!(store.read().as_deref(), Some("tok"));
    store.save("next", &CookieOptions::default());
    assert_eq!(store.read().as_deref(), Some("next"));
    store.clear();
    assert_eq!(store.read(), None);
}

// =============================================================================
// CookieTokenStore
// =============================================================================

fn headers_with_cookie(raw: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(raw).unwrap());
    headers
}

#[test]
fn cookie_reads_named_cookie_from_request() {
    let store = CookieTokenStore::from_headers(&headers_with_cookie("other=1; bo.token=tok-1"), "bo.token", false);
    assert_eq!(store.read().as_deref(), Some("tok-1"));
}

#[test]
fn cookie_absent_when_not_sent() {
    let store = CookieTokenStore::from_headers(&HeaderMap::new(), "bo.token", false);
    assert_eq!(store.read(), None);
}

#[test]
fn cookie_save_sets_http_only_cookie_with_options() {
    let store = CookieTokenStore::new(CookieJar::new(), "bo.token", true);
    store.save("tok-2", &CookieOptions::default());
    assert_eq!(store.read().as_deref(), Some("tok-2"));

    let jar = store.jar();
    let cookie = jar.get("bo.token").unwrap();
    assert_eq!(cookie.value(), "tok-2");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.max_age(), Some(Duration::days(30)));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
}

#[test]
fn cookie_clear_emits_expired_removal() {
    let store = CookieTokenStore::from_headers(&headers_with_cookie("bo.token=tok-3"), "bo.token", false);
    store.clear();
    assert_eq!(store.read(), None);

    let jar = store.jar();
    let cookie = jar.get("bo.token").unwrap();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

#[test]
fn cookie_clear_uses_path_of_last_save() {
    let store = CookieTokenStore::new(CookieJar::new(), "bo.token", false);
    let scoped = CookieOptions { path: "/app".into(), ..CookieOptions::default() };
    store.save("tok-4", &scoped);
    store.clear();

    let jar = store.jar();
    let cookie = jar.get("bo.token").unwrap();
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.path(), Some("/app"));
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
}

#[test]
fn cookie_clear_uses_configured_path_without_save() {
    let headers = headers_with_cookie("bo.token=tok-5");
    let store = CookieTokenStore::from_headers(&headers, "bo.token", false).with_path("/app");
    store.clear();

    let jar = store.jar();
    assert_eq!(jar.get("bo.token").unwrap().path(), Some("/app"));
}

#[test]
fn cookie_clear_twice_does_not_panic() {
    let store = CookieTokenStore::new(CookieJar::new(), "bo.token", false);
    store.clear();
    store.clear();
    assert_eq!(store.read(), None);
}

// =============================================================================
// FileTokenStore
// =============================================================================

#[test]
fn file_read_missing_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("token.json"));
    assert_eq!(store.read(), None);
}

#[test]
fn file_save_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("nested").join("token.json"));
    store.save("tok-file", &CookieOptions::default());
    assert_eq!(store.read().as_deref(), Some("tok-file"));

    // A second handle on the same file sees the same token.
    let reopened = FileTokenStore::new(store.path());
    assert_eq!(reopened.read().as_deref(), Some("tok-file"));
}

#[test]
fn file_expired_token_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("token.json"));
    let expired = CookieOptions { max_age: Duration::seconds(-60), path: "/".into() };
    store.save("tok-old", &expired);
    assert_eq!(store.read(), None);
}

#[test]
fn file_corrupt_contents_are_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, b"{not json").unwrap();
    assert_eq!(FileTokenStore::new(path).read(), None);
}

#[test]
fn file_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("token.json"));
    store.save("tok", &CookieOptions::default());
    store.clear();
    assert_eq!(store.read(), None);
    store.clear();
    assert_eq!(store.read(), None);
}

#[test]
fn file_save_into_unwritable_location_degrades_to_noop() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where a directory is expected makes create_dir_all fail.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"x").unwrap();
    let store = FileTokenStore::new(blocker.join("token.json"));
    store.save("tok", &CookieOptions::default());
    assert_eq!(store.read(), None);
}

#[cfg(unix)]
#[test]
fn file_is_private_to_owner() {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path().join("token.json"));
    store.save("tok", &CookieOptions::default());

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[test]
fn file_save_tightens_existing_permissions() {
    use std::os::unix::fs::PermissionsExt as _;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("token.json");
    std::fs::write(&path, b"{}").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let store = FileTokenStore::new(&path);
    store.save("tok", &CookieOptions::default());

    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(store.read().as_deref(), Some("tok"));
}
