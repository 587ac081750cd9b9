//! Computes the dashboard aggregates: monthly income/expense/balance totals
//! and the twelve month history for a year.

use axum::{
    Json,
    extract::{Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Month;

use crate::{AppState, Error, category::CategoryType, transaction::month_bounds};

/// The aggregate totals for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    /// The sum of all income transactions in the month.
    pub income_total: f64,
    /// The sum of all expense transactions in the month.
    pub expense_total: f64,
    /// `income_total` minus `expense_total`.
    pub balance: f64,
    /// The sum of unpaid expense transactions in the month.
    pub pending_expense: f64,
}

/// The income and expense totals for one month of a year's history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
    /// The calendar month, 1 to 12.
    pub month: u8,
    /// The sum of all income transactions in the month.
    pub income_total: f64,
    /// The sum of all expense transactions in the month.
    pub expense_total: f64,
}

/// Sum the transaction amounts within the month joined to categories of
/// `category_type`, optionally restricted by paid status.
///
/// Months with no matching transactions sum to `0.0`, never to NULL.
fn sum_amount(
    category_type: CategoryType,
    is_paid: Option<bool>,
    month: Month,
    year: i32,
    connection: &Connection,
) -> Result<f64, Error> {
    let (first_day, last_day) = month_bounds(month, year)?;

    let total = match is_paid {
        Some(is_paid) => connection
            .prepare(
                "SELECT COALESCE(SUM(t.amount), 0.0)
                 FROM \"transaction\" t
                 INNER JOIN category c ON c.id = t.category_id
                 WHERE c.category_type = ?1
                   AND t.date BETWEEN ?2 AND ?3
                   AND t.is_paid = ?4",
            )?
            .query_row((category_type, first_day, last_day, is_paid), |row| {
                row.get(0)
            })?,
        None => connection
            .prepare(
                "SELECT COALESCE(SUM(t.amount), 0.0)
                 FROM \"transaction\" t
                 INNER JOIN category c ON c.id = t.category_id
                 WHERE c.category_type = ?1
                   AND t.date BETWEEN ?2 AND ?3",
            )?
            .query_row((category_type, first_day, last_day), |row| row.get(0))?,
    };

    Ok(total)
}

/// Compute the aggregate totals for `month` of `year`.
///
/// # Errors
/// Returns [Error::InvalidDate] if the month boundaries cannot be computed, or
/// [Error::SqlError] if there is an SQL error.
pub fn get_monthly_summary(
    month: Month,
    year: i32,
    connection: &Connection,
) -> Result<TransactionSummary, Error> {
    let income_total = sum_amount(CategoryType::Income, None, month, year, connection)?;
    let expense_total = sum_amount(CategoryType::Expense, None, month, year, connection)?;
    let pending_expense =
        sum_amount(CategoryType::Expense, Some(false), month, year, connection)?;

    Ok(TransactionSummary {
        income_total,
        expense_total,
        balance: income_total - expense_total,
        pending_expense,
    })
}

/// Compute the income and expense totals for every month of `year`, January
/// to December, including months with no activity.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_yearly_history(year: i32, connection: &Connection) -> Result<Vec<MonthTotals>, Error> {
    (1..=12u8)
        .map(|month_number| {
            let month = Month::try_from(month_number)?;

            Ok(MonthTotals {
                month: month_number,
                income_total: sum_amount(CategoryType::Income, None, month, year, connection)?,
                expense_total: sum_amount(CategoryType::Expense, None, month, year, connection)?,
            })
        })
        .collect()
}

/// The query parameters for the monthly summary.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SummaryQuery {
    /// The calendar month, 1 to 12.
    pub month: u8,
    /// The year of the month to summarize.
    pub year: i32,
}

/// The query parameters for the yearly history.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HistoryQuery {
    /// The year to compute the history for.
    pub year: i32,
}

/// A route handler for the monthly dashboard summary.
pub async fn get_summary_endpoint(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<TransactionSummary>, Error> {
    let month = Month::try_from(query.month)?;
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_monthly_summary(month, query.year, &connection).map(Json)
}

/// A route handler for the twelve month dashboard history.
pub async fn get_history_endpoint(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MonthTotals>>, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    get_yearly_history(query.year, &connection).map(Json)
}
