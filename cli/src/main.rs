use std::path::PathBuf;
use std::sync::Arc;

use backoffice::config::ApiTimeouts;
use backoffice::routes::pages::open_orders;
use backoffice::services::Route;
use backoffice::services::api::{ApiError, AuthApi, BackendClient, SignInForm, SignUpForm};
use backoffice::services::guard::{Access, PageError, PageOutcome, RouteGuard};
use backoffice::services::session::{AuthError, AuthSession, HydrateOutcome};
use backoffice::services::token_store::{CookieOptions, FileTokenStore};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}", .0.notice().message)]
    Auth(#[from] AuthError),
    #[error("backend error: {0}")]
    Api(#[from] ApiError),
    #[error("page load failed: {0}")]
    Page(#[from] PageError),
    #[error("not signed in; run `backoffice-cli login` first")]
    NotSignedIn,
    #[error("access denied; the server redirected to {0}")]
    Redirected(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "backoffice-cli", about = "E2E Burguer back-office session CLI")]
struct Cli {
    #[arg(long, env = "BACKOFFICE_API_URL", default_value = "http://127.0.0.1:3333")]
    api_url: String,

    /// Where the session token is kept between invocations.
    #[arg(long, env = "BACKOFFICE_TOKEN_FILE", default_value = ".backoffice/session.json")]
    token_file: PathBuf,

    #[arg(long, env = "SESSION_MAX_AGE_DAYS", default_value_t = 30)]
    max_age_days: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account. Does not sign in.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BACKOFFICE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Defaults to `--password`.
        #[arg(long)]
        confirm_password: Option<String>,
        /// Register with the management role.
        #[arg(long)]
        gestao: bool,
    },
    /// Forget the stored session token.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// List open orders (management only).
    Orders,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(tracing::Level::WARN).init();

    let cli = Cli::parse();
    let api = Arc::new(BackendClient::new(&cli.api_url, ApiTimeouts::default())?);
    let store = Arc::new(FileTokenStore::new(cli.token_file));
    let session = AuthSession::new(api.clone(), store.clone(), CookieOptions::with_max_age_days(cli.max_age_days));

    match cli.command {
        Command::Login { email, password } => run_login(&session, SignInForm { email, password }).await,
        Command::Signup { name, email, password, confirm_password, gestao } => {
            let form = SignUpForm {
                name,
                email,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                is_gestao: gestao,
            };
            run_signup(&session, form).await
        }
        Command::Logout => run_logout(&session),
        Command::Whoami => run_whoami(&session).await,
        Command::Orders => run_orders(api, store.as_ref()).await,
    }
}

fn report_fields(err: &AuthError) {
    if let Some(fields) = err.field_errors() {
        if let Ok(rendered) = serde_json::to_string_pretty(fields) {
            eprintln!("{rendered}");
        }
    }
}

async fn run_login(session: &AuthSession, form: SignInForm) -> Result<(), CliError> {
    let outcome = session.sign_in(form).await.inspect_err(report_fields)?;
    print_json(&json!({
        "user": outcome.user,
        "destination": outcome.destination.path(),
        "notice": outcome.notice,
    }))
}

async fn run_signup(session: &AuthSession, form: SignUpForm) -> Result<(), CliError> {
    let outcome = session.sign_up(form).await.inspect_err(report_fields)?;
    print_json(&json!({
        "destination": outcome.destination.path(),
        "notice": outcome.notice,
    }))
}

fn run_logout(session: &AuthSession) -> Result<(), CliError> {
    let destination = session.sign_out();
    print_json(&json!({ "destination": destination.path() }))
}

async fn run_whoami(session: &AuthSession) -> Result<(), CliError> {
    match session.hydrate().await {
        HydrateOutcome::Authenticated(user) => print_json(&serde_json::to_value(user)?),
        HydrateOutcome::Pending => Err(CliError::Auth(AuthError::Busy)),
        HydrateOutcome::Anonymous | HydrateOutcome::Expired { .. } => Err(CliError::NotSignedIn),
    }
}

/// Same gate as the dashboard page: management role confirmed by the server first.
async fn run_orders(api: Arc<BackendClient>, store: &FileTokenStore) -> Result<(), CliError> {
    let guard = RouteGuard::new(api.clone());
    let outcome = guard
        .protect(store, Access::Management, |ctx| async move {
            let body = api.fetch("/orders", Some(&ctx.token)).await?;
            Ok::<_, PageError>(open_orders(body))
        })
        .await?;

    match outcome {
        PageOutcome::Render(orders) => print_json(&serde_json::to_value(orders)?),
        PageOutcome::Redirect(Route::Landing) => Err(CliError::NotSignedIn),
        PageOutcome::Redirect(route) => Err(CliError::Redirected(route.path())),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
