//! The integer type used for database row IDs.

/// Alias for the integer type that SQLite uses for row IDs.
pub type DatabaseId = i64;
