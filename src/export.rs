//! Exports the transaction table as a spreadsheet friendly CSV file.
//!
//! The file uses a semicolon delimiter, a UTF-8 byte order mark, day first
//! dates and decimal comma amounts so that it opens cleanly in spreadsheet
//! applications configured for European locales.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{AppState, Error};

/// The UTF-8 byte order mark, prepended so spreadsheet applications detect the
/// encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The category name shown for transactions whose category has been deleted.
const NO_CATEGORY: &str = "No Category";

const EXPORT_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day]/[month]/[year]");

struct ExportRow {
    id: i64,
    date: Date,
    description: String,
    amount: f64,
    category_name: Option<String>,
    category_type: Option<String>,
    is_paid: bool,
    is_fixed: bool,
}

/// Format an amount with two decimal places and a decimal comma.
fn format_amount(amount: f64) -> String {
    format!("{amount:.2}").replace('.', ",")
}

/// Render every transaction as CSV, ordered by date then ID.
///
/// Transactions whose category no longer exists are still exported, with
/// [NO_CATEGORY] in the category column.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error, or [Error::CsvError] if
/// the CSV output cannot be produced.
pub fn export_transactions_csv(connection: &Connection) -> Result<Vec<u8>, Error> {
    let rows: Vec<ExportRow> = connection
        .prepare(
            "SELECT t.id, t.date, t.description, t.amount,
                    c.name, c.category_type, t.is_paid, t.is_fixed
             FROM \"transaction\" t
             LEFT JOIN category c ON c.id = t.category_id
             ORDER BY t.date, t.id",
        )?
        .query_map([], |row| {
            Ok(ExportRow {
                id: row.get(0)?,
                date: row.get(1)?,
                description: row.get(2)?,
                amount: row.get(3)?,
                category_name: row.get(4)?,
                category_type: row.get(5)?,
                is_paid: row.get(6)?,
                is_fixed: row.get(7)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    let mut buffer = Vec::from(UTF8_BOM);

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(&mut buffer);

        writer
            .write_record([
                "ID",
                "Date",
                "Description",
                "Amount",
                "Category",
                "Type",
                "Status",
                "Fixed",
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;

        for row in rows {
            let date = row
                .date
                .format(EXPORT_DATE_FORMAT)
                .map_err(|error| Error::CsvError(error.to_string()))?;

            writer
                .write_record([
                    row.id.to_string(),
                    date,
                    row.description,
                    format_amount(row.amount),
                    row.category_name.unwrap_or_else(|| NO_CATEGORY.to_string()),
                    row.category_type.unwrap_or_default(),
                    if row.is_paid { "Paid" } else { "Pending" }.to_string(),
                    if row.is_fixed { "Yes" } else { "No" }.to_string(),
                ])
                .map_err(|error| Error::CsvError(error.to_string()))?;
        }

        writer
            .flush()
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    Ok(buffer)
}

/// A route handler that downloads all transactions as a CSV attachment.
pub async fn export_transactions_endpoint(
    State(state): State<AppState>,
) -> Result<Response, Error> {
    let connection = state.db_connection.lock().map_err(|_| Error::DatabaseLock)?;

    let csv_bytes = export_transactions_csv(&connection)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv_bytes,
    )
        .into_response())
}

#[cfg(test)]
mod export_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        category::{Category, CategoryType, NewCategory, create_category, delete_category},
        db::initialize,
        transaction::{NewTransaction, create_transaction},
    };

    use super::{UTF8_BOM, export_transactions_csv, format_amount};

    fn get_test_connection_and_category() -> (Connection, Category) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let category = create_category(
            NewCategory {
                name: "Groceries".to_string(),
                color_hex: "#CCCCCC".to_string(),
                category_type: CategoryType::Expense,
            },
            &connection,
        )
        .unwrap();

        (connection, category)
    }

    fn export_lines(connection: &Connection) -> Vec<String> {
        let bytes = export_transactions_csv(connection).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));

        String::from_utf8(bytes[UTF8_BOM.len()..].to_vec())
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    fn format_amount_uses_two_decimals_and_a_comma() {
        assert_eq!(format_amount(1200.0), "1200,00");
        assert_eq!(format_amount(19.955), "19,95");
        assert_eq!(format_amount(0.5), "0,50");
    }

    #[test]
    fn export_of_empty_table_is_header_only() {
        let (connection, _) = get_test_connection_and_category();

        let lines = export_lines(&connection);

        assert_eq!(
            lines,
            vec!["ID;Date;Description;Amount;Category;Type;Status;Fixed"]
        );
    }

    #[test]
    fn export_formats_rows_for_spreadsheets() {
        let (connection, category) = get_test_connection_and_category();

        let transaction = create_transaction(
            NewTransaction {
                description: "Weekly shop".to_string(),
                amount: 84.5,
                date: date!(2025 - 06 - 03),
                category_id: category.id,
                is_fixed: false,
                is_paid: true,
                payment_method: None,
            },
            &connection,
        )
        .unwrap();

        let lines = export_lines(&connection);

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            format!(
                "{};03/06/2025;Weekly shop;84,50;Groceries;EXPENSE;Paid;No",
                transaction.id
            )
        );
    }

    #[test]
    fn export_orders_rows_by_date() {
        let (connection, category) = get_test_connection_and_category();

        for (description, date) in [
            ("Later", date!(2025 - 06 - 20)),
            ("Earlier", date!(2025 - 06 - 01)),
        ] {
            create_transaction(
                NewTransaction {
                    description: description.to_string(),
                    amount: 10.0,
                    date,
                    category_id: category.id,
                    is_fixed: false,
                    is_paid: false,
                    payment_method: None,
                },
                &connection,
            )
            .unwrap();
        }

        let lines = export_lines(&connection);

        assert!(lines[1].contains("Earlier"));
        assert!(lines[2].contains("Later"));
    }

    #[test]
    fn export_keeps_transactions_with_a_deleted_category() {
        let (connection, category) = get_test_connection_and_category();

        create_transaction(
            NewTransaction {
                description: "Orphaned".to_string(),
                amount: 25.0,
                date: date!(2025 - 06 - 03),
                category_id: category.id,
                is_fixed: false,
                is_paid: false,
                payment_method: None,
            },
            &connection,
        )
        .unwrap();
        delete_category(category.id, &connection).unwrap();

        let lines = export_lines(&connection);

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("No Category"));
        assert!(lines[1].contains("Pending"));
    }
}

#[cfg(test)]
mod export_route_tests {
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{AppState, build_router, category::Category, endpoints};

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        let state = AppState::new(connection).expect("Could not initialize database.");

        TestServer::new(build_router(state))
    }

    #[tokio::test]
    async fn export_downloads_a_csv_attachment() {
        let server = get_test_server();

        let category = server
            .post(endpoints::CATEGORIES)
            .json(&json!({ "name": "Groceries", "type": "EXPENSE" }))
            .await
            .json::<Category>();

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({
                "description": "Weekly shop",
                "amount": 84.5,
                "transaction_date": "2025-06-03",
                "category_id": category.id,
            }))
            .await
            .assert_status_ok();

        let response = server.get(endpoints::TRANSACTIONS_EXPORT).await;

        response.assert_status_ok();
        response.assert_header("content-type", "text/csv; charset=utf-8");
        response.assert_header(
            "content-disposition",
            "attachment; filename=\"transactions.csv\"",
        );

        let body = response.text();
        assert!(body.contains("ID;Date;Description;Amount;Category;Type;Status;Fixed"));
        assert!(body.contains("03/06/2025;Weekly shop;84,50"));
    }
}
