//! This file defines the `Transaction` type, the core type of the ledger, and
//! the CRUD route handlers for transactions.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::{Date, Month};

use crate::{
    AppState, Error,
    category::get_category,
    database_id::DatabaseId,
};

/// An income or expense entry, i.e. an event where money was earned or spent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: DatabaseId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money earned or spent.
    pub amount: f64,
    /// When the transaction happened.
    #[serde(rename = "transaction_date")]
    pub date: Date,
    /// The category that describes the type of the transaction.
    pub category_id: DatabaseId,
    /// Whether the transaction was generated from a recurring template.
    pub is_fixed: bool,
    /// Whether the transaction has been paid.
    pub is_paid: bool,
    /// How the transaction was or will be paid, e.g. "Invoice".
    pub payment_method: Option<String>,
}

/// The data for creating a new [Transaction], and for replacing the fields of
/// an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    /// A text description of what the transaction is for.
    pub description: String,
    /// The amount of money earned or spent.
    pub amount: f64,
    /// When the transaction happened.
    #[serde(rename = "transaction_date")]
    pub date: Date,
    /// The category that describes the type of the transaction.
    pub category_id: DatabaseId,
    /// Whether the transaction was generated from a recurring template.
    #[serde(default)]
    pub is_fixed: bool,
    /// Whether the transaction has been paid.
    #[serde(default)]
    pub is_paid: bool,
    /// How the transaction was or will be paid.
    #[serde(default)]
    pub payment_method: Option<String>,
}

pub(crate) fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            amount REAL NOT NULL,
            date TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            is_fixed INTEGER NOT NULL DEFAULT 0,
            is_paid INTEGER NOT NULL DEFAULT 0,
            payment_method TEXT,
            FOREIGN KEY(category_id) REFERENCES category(id)
        )",
        (),
    )?;

    Ok(())
}

pub(crate) fn map_row_to_transaction(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        date: row.get(3)?,
        category_id: row.get(4)?,
        is_fixed: row.get(5)?,
        is_paid: row.get(6)?,
        payment_method: row.get(7)?,
    })
}

/// The first and last day of the calendar month `month` in `year`.
///
/// # Errors
/// Returns [Error::InvalidDate] if the parts cannot be combined into valid dates.
pub(crate) fn month_bounds(month: Month, year: i32) -> Result<(Date, Date), Error> {
    let first_day = Date::from_calendar_date(year, month, 1)?;
    let last_day = Date::from_calendar_date(year, month, time::util::days_in_year_month(year, month))?;

    Ok((first_day, last_day))
}

/// Create a new transaction in the database.
///
/// # Errors
/// Returns [Error::InvalidCategory] if `category_id` does not refer to an
/// existing category, or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    get_category(new_transaction.category_id, connection).map_err(|error| match error {
        // A 'not found' error does not make sense on an insert function, so we
        // instead indicate that the category id (a foreign key) is invalid.
        Error::NotFound => Error::InvalidCategory,
        error => error,
    })?;

    connection.execute(
        "INSERT INTO \"transaction\"
            (description, amount, date, category_id, is_fixed, is_paid, payment_method)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            &new_transaction.description,
            new_transaction.amount,
            new_transaction.date,
            new_transaction.category_id,
            new_transaction.is_fixed,
            new_transaction.is_paid,
            &new_transaction.payment_method,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Transaction {
        id,
        description: new_transaction.description,
        amount: new_transaction.amount,
        date: new_transaction.date,
        category_id: new_transaction.category_id,
        is_fixed: new_transaction.is_fixed,
        is_paid: new_transaction.is_paid,
        payment_method: new_transaction.payment_method,
    })
}

/// The query parameters for listing transactions.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct TransactionListQuery {
    /// Include only transactions within this calendar month (1 to 12).
    /// Ignored unless `year` is also given.
    pub month: Option<u8>,
    /// Include only transactions within this year. Ignored unless `month` is
    /// also given.
    pub year: Option<i32>,
}

/// Retrieve transactions from the database.
///
/// When both `month` and `year` are given, only transactions dated within that
/// calendar month (first to last day inclusive) are returned. Otherwise all
/// transactions are returned. Callers must not rely on the returned order.
///
/// # Errors
/// Returns [Error::InvalidDate] if `month` is not a valid calendar month, or
/// [Error::SqlError] if there is an SQL error.
pub fn get_transactions(
    query: TransactionListQuery,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    const COLUMNS: &str =
        "id, description, amount, date, category_id, is_fixed, is_paid, payment_method";

    match (query.month, query.year) {
        (Some(month), Some(year)) => {
            let month = Month::try_from(month)?;
            let (first_day, last_day) = month_bounds(month, year)?;

            connection
                .prepare(&format!(
                    "SELECT {COLUMNS} FROM \"transaction\" WHERE date BETWEEN :start AND :end"
                ))?
                .query_map(
                    &[(":start", &first_day), (":end", &last_day)],
                    map_row_to_transaction,
                )?
                .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
                .collect()
        }
        _ => connection
            .prepare(&format!("SELECT {COLUMNS} FROM \"transaction\""))?
            .query_map([], map_row_to_transaction)?
            .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
            .collect(),
    }
}

/// Replace every field of the transaction with `id` with the fields of `update`.
///
/// The category is not re-checked here: unlike creation, an update may point a
/// transaction at a category that has since been deleted.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction, or
/// [Error::SqlError] if there is an SQL error.
pub fn update_transaction(
    id: DatabaseId,
    update: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let rows_updated = connection.execute(
        "UPDATE \"transaction\"
         SET description = ?1, amount = ?2, date = ?3, category_id = ?4,
             is_fixed = ?5, is_paid = ?6, payment_method = ?7
         WHERE id = ?8",
        (
            &update.description,
            update.amount,
            update.date,
            update.category_id,
            update.is_fixed,
            update.is_paid,
            &update.payment_method,
            id,
        ),
    )?;

    if rows_updated == 0 {
        return Err(Error::NotFound);
    }

    Ok(Transaction {
        id,
        description: update.description,
        amount: update.amount,
        date: update.date,
        category_id: update.category_id,
        is_fixed: update.is_fixed,
        is_paid: update.is_paid,
        payment_method: update.payment_method,
    })
}

/// Delete the transaction with `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a transaction, or
/// [Error::SqlError] if there is an SQL error.
pub fn delete_transaction(id: DatabaseId, connection: &Connection) -> Result<(), Error> {
    let rows_deleted = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;

    if rows_deleted == 0 {
        Err(Error::NotFound)
    } else {
        Ok(())
    }
}

/// A route handler for creating a new transaction.
///
/// This function will return the status code 404 if the category does not exist.
pub async fn create_transaction_endpoint(
    State(state): State<AppState>,
    Json(new_transaction): Json<NewTransaction>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    create_transaction(new_transaction, &connection).map(Json)
}

/// A route handler for listing transactions, optionally filtered to a month.
pub async fn get_transactions_endpoint(
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_transactions(query, &connection).map(Json)
}

/// A route handler for replacing a transaction's fields.
///
/// This function will return the status code 404 if the transaction does not exist.
pub async fn update_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseId>,
    Json(update): Json<NewTransaction>,
) -> Result<Json<Transaction>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    update_transaction(transaction_id, update, &connection).map(Json)
}

/// A route handler for deleting a transaction by its ID.
///
/// This function will return the status code 404 if the transaction does not exist.
pub async fn delete_transaction_endpoint(
    State(state): State<AppState>,
    Path(transaction_id): Path<DatabaseId>,
) -> Result<Json<Value>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    delete_transaction(transaction_id, &connection)?;

    Ok(Json(json!({ "message": "Transaction deleted" })))
}
