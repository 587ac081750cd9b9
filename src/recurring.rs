//! Recurring expense templates describe obligations that repeat every month,
//! e.g. rent or utilities. Templates never appear in the dashboard aggregates;
//! they are only a source for the month generator.

use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AppState, Error, category::get_category, database_id::DatabaseId};

/// A reusable definition of a periodic expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTemplate {
    /// The ID of the template.
    pub id: DatabaseId,
    /// A text description of the obligation, e.g. "Rent".
    pub description: String,
    /// The expected amount of the expense each month.
    pub estimated_amount: f64,
    /// The category to assign to generated transactions.
    pub category_id: DatabaseId,
    /// Whether the template should be used when generating fixed transactions.
    pub active: bool,
}

/// The data for creating a new [RecurringTemplate].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecurringTemplate {
    /// A text description of the obligation.
    pub description: String,
    /// The expected amount of the expense each month.
    pub estimated_amount: f64,
    /// The category to assign to generated transactions.
    pub category_id: DatabaseId,
    /// Whether the template should be used when generating fixed transactions.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

pub(crate) fn create_recurring_template_table(
    connection: &Connection,
) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS recurring_template (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            estimated_amount REAL NOT NULL,
            category_id INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            FOREIGN KEY(category_id) REFERENCES category(id)
        )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_template(row: &Row) -> Result<RecurringTemplate, rusqlite::Error> {
    Ok(RecurringTemplate {
        id: row.get(0)?,
        description: row.get(1)?,
        estimated_amount: row.get(2)?,
        category_id: row.get(3)?,
        active: row.get(4)?,
    })
}

/// Create a recurring template in the database.
///
/// The category is validated the same way as for transactions.
///
/// # Errors
/// Returns [Error::InvalidCategory] if `category_id` does not refer to an
/// existing category, or [Error::SqlError] if there is some other SQL error.
pub fn create_template(
    new_template: NewRecurringTemplate,
    connection: &Connection,
) -> Result<RecurringTemplate, Error> {
    get_category(new_template.category_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCategory,
        error => error,
    })?;

    connection.execute(
        "INSERT INTO recurring_template (description, estimated_amount, category_id, active)
         VALUES (?1, ?2, ?3, ?4)",
        (
            &new_template.description,
            new_template.estimated_amount,
            new_template.category_id,
            new_template.active,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(RecurringTemplate {
        id,
        description: new_template.description,
        estimated_amount: new_template.estimated_amount,
        category_id: new_template.category_id,
        active: new_template.active,
    })
}

/// Retrieve the templates with the active flag set.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_active_templates(connection: &Connection) -> Result<Vec<RecurringTemplate>, Error> {
    connection
        .prepare(
            "SELECT id, description, estimated_amount, category_id, active
             FROM recurring_template WHERE active = 1",
        )?
        .query_map([], map_row_to_template)?
        .map(|maybe_template| maybe_template.map_err(|error| error.into()))
        .collect()
}

/// Delete the template with `id`.
///
/// Unlike categories and transactions, deleting a template that does not exist
/// is treated as success so that the operation is idempotent.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn delete_template(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM recurring_template WHERE id = ?1", (id,))?;

    Ok(())
}

/// A route handler for creating a new recurring template.
///
/// This function will return the status code 404 if the category does not exist.
pub async fn create_template_endpoint(
    State(state): State<AppState>,
    Json(new_template): Json<NewRecurringTemplate>,
) -> Result<Json<RecurringTemplate>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    create_template(new_template, &connection).map(Json)
}

/// A route handler for listing active recurring templates.
pub async fn get_active_templates_endpoint(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecurringTemplate>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_active_templates(&connection).map(Json)
}

/// A route handler for deleting a recurring template by its ID.
///
/// Deleting a template that does not exist succeeds with no state change.
pub async fn delete_template_endpoint(
    State(state): State<AppState>,
    Path(template_id): Path<DatabaseId>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    delete_template(template_id, &connection)?;

    Ok(Json(json!({ "ok": true })))
}


#[cfg(test)]
mod recurring_route_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, build_router, category::Category, endpoints};

    use super::RecurringTemplate;

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");

        TestServer::new(build_router(state))
    }

    async fn create_category(server: &TestServer) -> Category {
        server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Housing", "type": "EXPENSE" }))
            .await
            .json::<Category>()
    }

    #[tokio::test]
    async fn create_template() {
        let server = get_test_server();
        let category = create_category(&server).await;

        let response = server
            .post(endpoints::RECURRING)
            .json(&json!({
                "description": "Rent",
                "estimated_amount": 1200.0,
                "category_id": category.id,
            }))
            .await;

        response.assert_status_ok();

        let template = response.json::<RecurringTemplate>();
        assert_eq!(template.description, "Rent");
        // The active flag defaults to true when omitted.
        assert!(template.active);
    }

    #[tokio::test]
    async fn create_template_with_missing_category_returns_not_found() {
        let server = get_test_server();

        let response = server
            .post(endpoints::RECURRING)
            .json(&json!({
                "description": "Rent",
                "estimated_amount": 1200.0,
                "category_id": 999,
            }))
            .await;

        response.assert_status_not_found();
    }

    #[tokio::test]
    async fn list_returns_only_active_templates() {
        let server = get_test_server();
        let category = create_category(&server).await;

        for (description, active) in [("Rent", true), ("Old gym", false)] {
            server
                .post(endpoints::RECURRING)
                .json(&json!({
                    "description": description,
                    "estimated_amount": 50.0,
                    "category_id": category.id,
                    "active": active,
                }))
                .await
                .assert_status_ok();
        }

        let templates = server
            .get(endpoints::RECURRING)
            .await
            .json::<Vec<RecurringTemplate>>();

        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].description, "Rent");
    }

    #[tokio::test]
    async fn delete_missing_template_succeeds() {
        let server = get_test_server();

        server.delete("/recurring/999").await.assert_status_ok();
    }
}
