//! Assembles the application's HTTP routes.

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState,
    category::{create_category_endpoint, delete_category_endpoint, get_categories_endpoint},
    dashboard::{get_history_endpoint, get_summary_endpoint},
    endpoints,
    export::export_transactions_endpoint,
    generation::generate_fixed_endpoint,
    recurring::{
        create_template_endpoint, delete_template_endpoint, get_active_templates_endpoint,
    },
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transactions_endpoint,
        update_transaction_endpoint,
    },
};

/// Create the router for the application's API.
///
/// The router allows cross-origin requests from any origin so that a browser
/// frontend served elsewhere can call the API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            endpoints::CATEGORIES,
            post(create_category_endpoint).get(get_categories_endpoint),
        )
        .route(endpoints::CATEGORY, delete(delete_category_endpoint))
        .route(
            endpoints::RECURRING,
            post(create_template_endpoint).get(get_active_templates_endpoint),
        )
        .route(endpoints::RECURRING_TEMPLATE, delete(delete_template_endpoint))
        .route(
            endpoints::TRANSACTIONS,
            post(create_transaction_endpoint).get(get_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::GENERATE_FIXED, post(generate_fixed_endpoint))
        .route(
            endpoints::TRANSACTIONS_EXPORT,
            get(export_transactions_endpoint),
        )
        .route(endpoints::DASHBOARD_SUMMARY, get(get_summary_endpoint))
        .route(endpoints::DASHBOARD_HISTORY, get(get_history_endpoint))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod routing_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{AppState, build_router, endpoints};

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn export_route_takes_precedence_over_transaction_id() {
        let server = get_test_server();

        let response = server.get(endpoints::TRANSACTIONS_EXPORT).await;

        response.assert_status_ok();
        response.assert_header("content-type", "text/csv; charset=utf-8");
    }

    #[tokio::test]
    async fn unknown_route_returns_not_found() {
        let server = get_test_server();

        server.get("/nonsense").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn cross_origin_requests_are_allowed() {
        let server = get_test_server();

        let response = server
            .get(endpoints::CATEGORIES)
            .add_header(
                axum::http::header::ORIGIN,
                axum::http::HeaderValue::from_static("https://example.com"),
            )
            .await;

        response.assert_status_ok();
        response.assert_header("access-control-allow-origin", "*");
    }
}
