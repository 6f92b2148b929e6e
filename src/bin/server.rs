use std::{
    env,
    fs::{self, OpenOptions},
    net::SocketAddr,
    path::PathBuf,
    process::exit,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use kasi::{
    AppState, CookieSettings, PasswordHash, build_router, ensure_bootstrap_admin,
    get_local_offset, graceful_shutdown, logging_middleware,
};

/// The fallback cookie secret for local development.
const DEV_SESSION_SECRET: &str = "kasi-development-secret-change-me";

/// The password given to the bootstrap admin when `DEFAULT_ADMIN_PASSWORD` is not set.
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// The web server for Kasi, a shared expense tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. The parent directory is
    /// created if it does not exist.
    #[arg(long, default_value = "data/kasi.db")]
    db_path: PathBuf,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// The directory with the stylesheet and other static files.
    #[arg(long, default_value = "static/")]
    static_dir: PathBuf,

    /// The canonical name of the local timezone, e.g. "Asia/Colombo".
    /// Used for today's date and the monthly totals.
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// Only send the auth cookie over HTTPS.
    #[arg(long)]
    secure_cookies: bool,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    if get_local_offset(&args.timezone).is_none() {
        tracing::error!("Invalid timezone {}", args.timezone);
        exit(1);
    }

    if let Some(parent) = args.db_path.parent().filter(|parent| !parent.as_os_str().is_empty())
        && let Err(error) = fs::create_dir_all(parent)
    {
        tracing::error!("Could not create directory {}: {error}", parent.display());
        exit(1);
    }

    let secret = env::var("SESSION_SECRET").unwrap_or_else(|_| {
        tracing::warn!(
            "The environment variable 'SESSION_SECRET' is not set, using the development secret. \
            Set it before exposing the server to other people."
        );
        DEV_SESSION_SECRET.to_owned()
    });

    let connection = Connection::open(&args.db_path).unwrap_or_else(|error| {
        tracing::error!(
            "Could not open database file at {}: {error}",
            args.db_path.display()
        );
        exit(1);
    });

    let state = AppState::new(
        connection,
        args.db_path.clone(),
        &secret,
        &args.timezone,
        CookieSettings {
            secure: args.secure_cookies,
            ..Default::default()
        },
    )
    .unwrap_or_else(|error| {
        tracing::error!("Could not initialize the app: {error}");
        exit(1);
    });

    create_bootstrap_admin(&state);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = build_router(state, &args.static_dir).layer(middleware::from_fn(logging_middleware));
    let router = add_tracing_layer(router);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        exit(1);
    }
}

fn create_bootstrap_admin(state: &AppState) {
    let password =
        env::var("DEFAULT_ADMIN_PASSWORD").unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_owned());

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            exit(1);
        }
    };

    match ensure_bootstrap_admin(&password, PasswordHash::DEFAULT_COST, &connection) {
        Ok(Some(admin)) => tracing::warn!(
            "Created the admin user \"{}\". Change the default password from the settings page.",
            admin.username
        ),
        Ok(None) => {}
        Err(error) => {
            tracing::error!("Could not create the admin user: {error}");
            exit(1);
        }
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
    {
        Ok(file) => file,
        Err(error) => {
            eprintln!("Could not create log file: {error}");
            exit(1);
        }
    };

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
