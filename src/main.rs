use std::sync::Arc;

use backoffice::config::Config;
use backoffice::routes;
use backoffice::services::api::BackendClient;
use backoffice::state::{AppState, CookieSettings};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env().expect("invalid configuration");
    let client = BackendClient::new(&config.api_url, config.timeouts).expect("backend client init failed");
    let state = AppState::new(Arc::new(client), CookieSettings::from_config(&config));

    let app = routes::app(state);
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, api_url = %config.api_url, "backoffice listening");
    axum::serve(listener, app).await.expect("server failed");
}
