//! Categories group transactions and decide whether their amounts count as
//! income or expenses. This module defines the category types, their SQL, and
//! the category route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{AppState, Error, database_id::DatabaseId};

/// Whether a category's transactions count as money earned or money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    /// Money earned, e.g. wages.
    Income,
    /// Money spent, e.g. groceries or rent.
    Expense,
}

impl CategoryType {
    /// The string stored in the database for this category type.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "INCOME",
            CategoryType::Expense => "EXPENSE",
        }
    }
}

impl ToSql for CategoryType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CategoryType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "INCOME" => Ok(CategoryType::Income),
            "EXPENSE" => Ok(CategoryType::Expense),
            other => Err(FromSqlError::Other(
                format!("invalid category type {other:?}").into(),
            )),
        }
    }
}

/// The name of a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    /// This function will return an error if `name` is an empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The hex color assigned to categories created without an explicit color.
pub const DEFAULT_COLOR_HEX: &str = "#CCCCCC";

fn default_color_hex() -> String {
    DEFAULT_COLOR_HEX.to_string()
}

/// A category for income or expenses, e.g. 'Groceries', 'Rent', 'Wages'.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: DatabaseId,
    /// The name of the category.
    pub name: CategoryName,
    /// The display color as a hex string, e.g. "#CCCCCC".
    pub color_hex: String,
    /// Whether the category's transactions are income or expenses.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

/// The data for creating a new [Category].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewCategory {
    /// The name of the category. Must not be empty.
    pub name: String,
    /// The display color as a hex string. Defaults to [DEFAULT_COLOR_HEX].
    #[serde(default = "default_color_hex")]
    pub color_hex: String,
    /// Whether the category's transactions are income or expenses.
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

pub(crate) fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            color_hex TEXT NOT NULL DEFAULT '#CCCCCC',
            category_type TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_category(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let color_hex = row.get(2)?;
    let category_type = row.get(3)?;

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        color_hex,
        category_type,
    })
}

/// Create a category in the database.
///
/// # Errors
/// Returns [Error::EmptyCategoryName] if the name is an empty string, or
/// [Error::SqlError] if there is an SQL error.
pub fn create_category(
    new_category: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = CategoryName::new(&new_category.name)?;

    connection.execute(
        "INSERT INTO category (name, color_hex, category_type) VALUES (?1, ?2, ?3)",
        (
            name.as_ref(),
            &new_category.color_hex,
            new_category.category_type,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name,
        color_hex: new_category.color_hex,
        category_type: new_category.category_type,
    })
}

/// Retrieve a category by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a category, or
/// [Error::SqlError] if there is some other SQL error.
pub fn get_category(id: DatabaseId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, color_hex, category_type FROM category WHERE id = :id")?
        .query_row(&[(":id", &id)], map_row_to_category)
        .map_err(|error| error.into())
}

/// Retrieve all categories in insertion order.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, color_hex, category_type FROM category ORDER BY id")?
        .query_map([], map_row_to_category)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Delete the category with `id`.
///
/// Transactions and recurring templates that reference the category are left
/// in place, pointing at a category that no longer exists. The CSV export and
/// the dashboard treat such rows as having no category.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a category, or
/// [Error::SqlError] if there is an SQL error.
pub fn delete_category(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM category WHERE id = ?1", (id,))?;

    if rows_deleted == 0 {
        Err(Error::NotFound)
    } else {
        Ok(())
    }
}

/// A route handler for creating a new category.
pub async fn create_category_endpoint(
    State(state): State<AppState>,
    Json(new_category): Json<NewCategory>,
) -> Result<Json<Category>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    create_category(new_category, &connection).map(Json)
}

/// A route handler for listing all categories.
pub async fn get_categories_endpoint(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_categories(&connection).map(Json)
}

/// A route handler for deleting a category by its ID.
///
/// This function will return the status code 404 if the category does not exist.
pub async fn delete_category_endpoint(
    State(state): State<AppState>,
    Path(category_id): Path<DatabaseId>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    delete_category(category_id, &connection)?;

    Ok(Json(json!({ "message": "Category deleted" })))
}


#[cfg(test)]
mod category_route_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, build_router, endpoints};

    use super::{Category, CategoryType};

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn create_category() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({
                "name": "Groceries",
                "color_hex": "#00FF00",
                "type": "EXPENSE",
            }))
            .await;

        response.assert_status_ok();

        let category = response.json::<Category>();
        assert_eq!(category.name.as_ref(), "Groceries");
        assert_eq!(category.category_type, CategoryType::Expense);
    }

    #[tokio::test]
    async fn create_category_uses_default_color() {
        let server = get_test_server();

        let category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({
                "name": "Wages",
                "type": "INCOME",
            }))
            .await
            .json::<Category>();

        assert_eq!(category.color_hex, "#CCCCCC");
    }

    #[tokio::test]
    async fn create_category_with_empty_name_fails() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CATEGORIES)
            .json(&json!({
                "name": "",
                "type": "EXPENSE",
            }))
            .await;

        response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn list_categories() {
        let server = get_test_server();

        for name in ["Wages", "Rent"] {
            server
                .post(endpoints::CATEGORIES)
                .json(&json!({ "name": name, "type": "EXPENSE" }))
                .await
                .assert_status_ok();
        }

        let categories = server.get(endpoints::CATEGORIES).await.json::<Vec<Category>>();

        let names: Vec<&str> = categories
            .iter()
            .map(|category| category.name.as_ref())
            .collect();
        assert_eq!(names, vec!["Wages", "Rent"]);
    }

    #[tokio::test]
    async fn delete_missing_category_returns_not_found() {
        let server = get_test_server();

        server.delete("/categories/999").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_category_succeeds() {
        let server = get_test_server();

        let category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Temp", "type": "EXPENSE" }))
            .await
            .json::<Category>();

        server
            .delete(&format!("/categories/{}", category.id))
            .await
            .assert_status_ok();

        let categories = server.get(endpoints::CATEGORIES).await.json::<Vec<Category>>();
        assert_eq!(categories, vec![]);
    }
}
