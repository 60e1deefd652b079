use super::*;
use crate::services::token_store::MemoryTokenStore;
use crate::state::test_helpers::{MockApi, manager, staff, token_with_claims};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

fn guard(api: &Arc<MockApi>) -> RouteGuard {
    RouteGuard::new(api.clone())
}

fn manager_token() -> String {
    token_with_claims(&json!({"sub": "1", "isGestao": true}))
}

fn staff_token() -> String {
    token_with_claims(&json!({"sub": "2", "isGestao": false}))
}

/// Handler that counts invocations and echoes the context.
async fn echo(calls: &AtomicUsize, ctx: PageContext) -> Result<PageContext, PageError> {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(ctx)
}

// =============================================================================
// protect
// =============================================================================

#[tokio::test]
async fn missing_token_redirects_to_landing() {
    let api = Arc::new(MockApi::default());
    let store = MemoryTokenStore::new();
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api).protect(&store, Access::Management, |ctx| echo(&calls, ctx)).await.unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::Landing));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(MockApi::calls(&api.detail_calls), 0);
}

#[tokio::test]
async fn undecodable_token_is_cleared() {
    let api = Arc::new(MockApi::default().with_detail(Ok(manager())));
    let store = MemoryTokenStore::with_token("not-a-token");
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api).protect(&store, Access::Authenticated, |ctx| echo(&calls, ctx)).await.unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::Landing));
    assert_eq!(store.read(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(MockApi::calls(&api.detail_calls), 0);
}

#[tokio::test]
async fn management_user_renders_with_resolved_identity() {
    let api = Arc::new(MockApi::default().with_detail(Ok(manager())));
    let token = manager_token();
    let store = MemoryTokenStore::with_token(&token);
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api).protect(&store, Access::Management, |ctx| echo(&calls, ctx)).await.unwrap();

    assert_eq!(outcome, PageOutcome::Render(PageContext { token: token.clone(), user: Some(manager()) }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.read(), Some(token));
}

#[tokio::test]
async fn non_management_user_goes_to_app_info() {
    let api = Arc::new(MockApi::default().with_detail(Ok(staff())));
    let store = MemoryTokenStore::with_token(&staff_token());
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api).protect(&store, Access::Management, |ctx| echo(&calls, ctx)).await.unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::AppInfo));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(store.read().is_some());
}

#[tokio::test]
async fn server_role_overrides_token_claims() {
    // Claims say management; the backend says otherwise.
    let api = Arc::new(MockApi::default().with_detail(Ok(staff())));
    let store = MemoryTokenStore::with_token(&manager_token());
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api).protect(&store, Access::Management, |ctx| echo(&calls, ctx)).await.unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::AppInfo));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_token_during_role_check_is_cleared() {
    for status in [401, 403] {
        let api = Arc::new(MockApi::default().with_detail(Err(ApiError::Status { status, message: None })));
        let store = MemoryTokenStore::with_token(&manager_token());
        let calls = AtomicUsize::new(0);

        let outcome = guard(&api).protect(&store, Access::Management, |ctx| echo(&calls, ctx)).await.unwrap();

        assert_eq!(outcome, PageOutcome::Redirect(Route::Landing), "status {status}");
        assert_eq!(store.read(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn role_check_transport_failure_propagates() {
    let api = Arc::new(MockApi::default().with_detail(Err(ApiError::Transport("connection refused".into()))));
    let token = manager_token();
    let store = MemoryTokenStore::with_token(&token);
    let calls = AtomicUsize::new(0);

    let err = guard(&api).protect(&store, Access::Management, |ctx| echo(&calls, ctx)).await.unwrap_err();

    assert_eq!(err, PageError::Api(ApiError::Transport("connection refused".into())));
    assert_eq!(store.read(), Some(token));
}

#[tokio::test]
async fn authenticated_access_skips_role_check() {
    let api = Arc::new(MockApi::default());
    let token = staff_token();
    let store = MemoryTokenStore::with_token(&token);
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api).protect(&store, Access::Authenticated, |ctx| echo(&calls, ctx)).await.unwrap();

    assert_eq!(outcome, PageOutcome::Render(PageContext { token, user: None }));
    assert_eq!(MockApi::calls(&api.detail_calls), 0);
}

#[tokio::test]
async fn handler_unauthorized_clears_store() {
    let api = Arc::new(MockApi::default().with_detail(Ok(manager())));
    let store = MemoryTokenStore::with_token(&manager_token());

    let outcome = guard(&api)
        .protect(&store, Access::Management, |_ctx| async { Err::<(), _>(PageError::Unauthorized) })
        .await
        .unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::Landing));
    assert_eq!(store.read(), None);
}

#[tokio::test]
async fn handler_backend_401_is_treated_as_unauthorized() {
    let api = Arc::new(MockApi::default());
    let store = MemoryTokenStore::with_token(&staff_token());

    let outcome = guard(&api)
        .protect(&store, Access::Authenticated, |_ctx| async {
            let err = ApiError::Status { status: 401, message: None };
            Err::<(), _>(PageError::from(err))
        })
        .await
        .unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::Landing));
    assert_eq!(store.read(), None);
}

#[tokio::test]
async fn handler_other_errors_propagate() {
    let api = Arc::new(MockApi::default());
    let token = staff_token();
    let store = MemoryTokenStore::with_token(&token);

    let err = guard(&api)
        .protect(&store, Access::Authenticated, |_ctx| async {
            Err::<(), _>(PageError::from(ApiError::Status { status: 500, message: None }))
        })
        .await
        .unwrap_err();

    assert_eq!(err, PageError::Api(ApiError::Status { status: 500, message: None }));
    assert_eq!(store.read(), Some(token));
}

// =============================================================================
// guest
// =============================================================================

#[tokio::test]
async fn guest_page_renders_without_token() {
    let api = Arc::new(MockApi::default());
    let store = MemoryTokenStore::new();

    let outcome = guard(&api).guest(&store, || async { Ok("sign-in form") }).await.unwrap();
    assert_eq!(outcome, PageOutcome::Render("sign-in form"));
}

#[tokio::test]
async fn guest_page_redirects_signed_in_caller() {
    let api = Arc::new(MockApi::default());
    let store = MemoryTokenStore::with_token(&manager_token());
    let calls = AtomicUsize::new(0);

    let outcome = guard(&api)
        .guest(&store, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(outcome, PageOutcome::Redirect(Route::Dashboard));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
