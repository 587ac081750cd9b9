//! The API endpoint URIs.

/// The route to create and list categories.
pub const CATEGORIES: &str = "/categories/";
/// The route to delete a category.
pub const CATEGORY: &str = "/categories/{category_id}";
/// The route to create and list recurring expense templates.
pub const RECURRING: &str = "/recurring/";
/// The route to delete a recurring expense template.
pub const RECURRING_TEMPLATE: &str = "/recurring/{template_id}";
/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/transactions/";
/// The route to update or delete a transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";
/// The route to materialize fixed transactions from the recurring templates.
pub const GENERATE_FIXED: &str = "/transactions/generate-fixed/{month}/{year}";
/// The route to export all transactions as CSV.
pub const TRANSACTIONS_EXPORT: &str = "/transactions/export";
/// The route for the monthly dashboard summary.
pub const DASHBOARD_SUMMARY: &str = "/dashboard/summary";
/// The route for the twelve month dashboard history.
pub const DASHBOARD_HISTORY: &str = "/dashboard/history";
