//! Opening SQLite connections and creating the application's tables.

use std::{path::Path, time::Duration};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, card::create_card_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// How long a connection waits for another connection's write lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the SQLite database file at `path`, creating it if it does not exist.
///
/// The connection uses write-ahead logging so readers do not block the single
/// writer, and waits up to [BUSY_TIMEOUT] for another connection's write lock.
/// The returned connection has not been initialized, call [initialize] before
/// using it.
///
/// # Errors
/// Returns an error if the file cannot be opened or the pragmas cannot be set.
pub fn open_connection(path: impl AsRef<Path>) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(BUSY_TIMEOUT)?;

    let journal_mode: String =
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!("SQLite journal mode set to {journal_mode}");

    Ok(connection)
}

/// Create the tables for the domain models if they do not exist yet.
///
/// Also turns on foreign key enforcement for `connection`, which SQLite
/// leaves off by default and tracks per connection.
///
/// # Errors
/// Returns an error if there is an SQL error, in which case no tables are created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_card_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
