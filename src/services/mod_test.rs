use super::*;

#[test]
fn route_paths() {
    assert_eq!(Route::Landing.path(), "/");
    assert_eq!(Route::SignUp.path(), "/signup");
    assert_eq!(Route::Dashboard.path(), "/dashboard");
    assert_eq!(Route::AppInfo.path(), "/app-info");
    assert_eq!(Route::Category.path(), "/category");
    assert_eq!(Route::Product.path(), "/product");
    assert_eq!(Route::Products.path(), "/products");
}

#[test]
fn home_route_depends_on_authentication() {
    assert_eq!(home_route(true), Route::Dashboard);
    assert_eq!(home_route(false), Route::Landing);
}

#[test]
fn notice_serializes_level_snake_case() {
    let json = serde_json::to_value(Notice::warning("careful")).unwrap();
    assert_eq!(json["level"], "warning");
    assert_eq!(json["message"], "careful");
}
