use std::{env, net::SocketAddr};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use fintrack::{AppState, build_router, graceful_shutdown};

/// The default port to serve the API from.
const DEFAULT_PORT: u16 = 8000;

/// The REST API server for fintrack.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database. Defaults to the
    /// environment variable FINTRACK_DB, then to "fintrack.db".
    #[arg(long)]
    db_path: Option<String>,

    /// The port to serve the API from. Defaults to the environment variable
    /// FINTRACK_PORT, then to 8000.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let db_path = args
        .db_path
        .or_else(|| env::var("FINTRACK_DB").ok())
        .unwrap_or_else(|| "fintrack.db".to_string());
    let port = args
        .port
        .unwrap_or_else(|| parse_port_or_default("FINTRACK_PORT", DEFAULT_PORT));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    let connection = Connection::open(&db_path)
        .unwrap_or_else(|error| panic!("Could not open database at {db_path}: {error}"));
    let state = AppState::new(connection).expect("Could not initialize the database.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Could not start the server.");
}

/// Parse a port number from the environment variable `env_key`.
///
/// Falls back to `default_port` if the variable is unset or does not parse as
/// a port number.
fn parse_port_or_default(env_key: &str, default_port: u16) -> u16 {
    let port_string = match env::var(env_key) {
        Ok(string) => string,
        Err(_) => return default_port,
    };

    match port_string.parse() {
        Ok(port) => port,
        Err(error) => {
            tracing::warn!(
                "An error occurred parsing the port number \"{port_string}\" from the environment variable {env_key}: {error}. Using the default port {default_port}."
            );
            default_port
        }
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty())
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
