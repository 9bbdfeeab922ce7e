//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    card::get_card,
    database_id::{CardId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction adds money to or takes money from a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money earned, added to the card's balance.
    Income,
    /// Money spent, taken from the card's balance.
    Expense,
}

impl TransactionKind {
    /// The name used for the kind in the database and the REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }

    /// The signed change a transaction of this kind makes to its card's balance.
    pub fn balance_delta(&self, amount: Amount) -> i64 {
        match self {
            TransactionKind::Income => amount.as_i64(),
            TransactionKind::Expense => -amount.as_i64(),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    /// Parse a transaction kind, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            _ => Err(Error::InvalidArgument(format!(
                "\"{s}\" is not a transaction type, expected INCOME or EXPENSE"
            ))),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// A strictly positive amount of money in minor currency units (e.g. cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    /// Create an amount, rejecting zero and negative values.
    ///
    /// # Errors
    /// Returns [Error::InvalidArgument] if `minor_units` is not greater than zero.
    pub fn new(minor_units: i64) -> Result<Self, Error> {
        if minor_units > 0 {
            Ok(Self(minor_units))
        } else {
            Err(Error::InvalidArgument(format!(
                "the amount must be greater than zero, got {minor_units}"
            )))
        }
    }

    /// The amount in minor currency units.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// An income or expense recorded against a card.
///
/// Transactions are never edited. To correct one, delete it and record a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The card the transaction was recorded against.
    pub card_id: CardId,
    /// Whether the transaction is an income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// The amount of money moved, always positive, in minor currency units.
    pub amount: i64,
    /// When the transaction was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('INCOME', 'EXPENSE')),
                amount INTEGER NOT NULL CHECK (amount > 0),
                created_at TEXT NOT NULL,
                FOREIGN KEY(card_id) REFERENCES card(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
        (),
    )?;

    // Used for listing a card's transactions newest first.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_card_created
         ON \"transaction\"(card_id, created_at, id);",
        (),
    )?;

    Ok(())
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, card_id, kind, amount, created_at FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Get the transactions recorded against `card_id`, newest first.
///
/// Transactions recorded at the same time are ordered by ID, highest first.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `card_id` does not refer to a valid card,
/// - or [Error::SqlError] there is some other SQL error.
pub fn list_transactions(
    card_id: CardId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    get_card(card_id, connection)?;

    connection
        .prepare(
            "SELECT id, card_id, kind, amount, created_at FROM \"transaction\"
             WHERE card_id = :card_id
             ORDER BY created_at DESC, id DESC",
        )?
        .query_map(&[(":card_id", &card_id)], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let card_id = row.get(1)?;
    let kind = row.get(2)?;
    let amount = row.get(3)?;
    let created_at = row.get(4)?;

    Ok(Transaction {
        id,
        card_id,
        kind,
        amount,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
