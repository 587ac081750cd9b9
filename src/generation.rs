//! Materializes recurring templates into concrete fixed transactions for a
//! given calendar month.

use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};
use time::Month;

use crate::{
    AppState, Error, recurring::get_active_templates, transaction::month_bounds,
};

/// The payment method assigned to generated fixed transactions.
pub const FIXED_PAYMENT_METHOD: &str = "Invoice";

/// The day of the month that generated transactions fall due on, clamped to
/// the last day of short months.
const DUE_DAY: u8 = 10;

/// Create the missing fixed transactions for `month` of `year`.
///
/// For each active recurring template, a transaction is created unless one
/// with the same description and category already exists within the month.
/// Generated transactions are dated on day [DUE_DAY] (or the last day of the
/// month if it is shorter), marked as fixed and unpaid, and use
/// [FIXED_PAYMENT_METHOD].
///
/// Calling this function twice for the same period creates no additional
/// transactions. The caller must hold the application's connection mutex for
/// the duration of the call; combined with the wrapping SQL transaction this
/// keeps the existence check and the insert atomic with respect to other
/// requests.
///
/// Returns the number of transactions created.
///
/// # Errors
/// Returns [Error::InvalidDate] if the month boundaries cannot be computed, or
/// [Error::SqlError] if there is an SQL error.
pub fn generate_fixed_transactions(
    month: Month,
    year: i32,
    connection: &Connection,
) -> Result<usize, Error> {
    let (first_day, last_day) = month_bounds(month, year)?;
    let due_day = first_day.replace_day(DUE_DAY.min(last_day.day()))?;

    let templates = get_active_templates(connection)?;

    let sql_transaction = connection.unchecked_transaction()?;
    let mut created = 0;

    {
        let mut exists_statement = sql_transaction.prepare(
            "SELECT EXISTS(
                SELECT 1 FROM \"transaction\"
                WHERE description = ?1 AND category_id = ?2 AND date BETWEEN ?3 AND ?4
             )",
        )?;
        let mut insert_statement = sql_transaction.prepare(
            "INSERT INTO \"transaction\"
                (description, amount, date, category_id, is_fixed, is_paid, payment_method)
             VALUES (?1, ?2, ?3, ?4, 1, 0, ?5)",
        )?;

        for template in templates {
            let already_generated: bool = exists_statement.query_row(
                (
                    &template.description,
                    template.category_id,
                    first_day,
                    last_day,
                ),
                |row| row.get(0),
            )?;

            if already_generated {
                continue;
            }

            insert_statement.execute((
                &template.description,
                template.estimated_amount,
                due_day,
                template.category_id,
                FIXED_PAYMENT_METHOD,
            ))?;
            created += 1;
        }
    }

    sql_transaction.commit()?;

    tracing::info!("Generated {created} fixed transactions for {month}/{year}");

    Ok(created)
}

/// A route handler that runs the month generator for the month and year in the
/// request path and reports how many transactions were created.
pub async fn generate_fixed_endpoint(
    State(state): State<AppState>,
    Path((month, year)): Path<(u8, i32)>,
) -> Result<Json<Value>, Error> {
    let month = Month::try_from(month)?;
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let created = generate_fixed_transactions(month, year, &connection)?;

    Ok(Json(json!({ "created": created })))
}
