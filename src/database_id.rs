//! Database ID type definitions.

/// The ID of a card in the application database.
pub type CardId = i64;

/// The ID of a transaction in the application database.
pub type TransactionId = i64;
