//! Defines the card model and the database queries for creating and reading cards.
//!
//! A card's `current_balance` is set to its starting balance on creation and is
//! afterwards only changed by the balance engine in [crate::transaction].

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserID, database_id::CardId};

/// The name of the card every user gets when they register.
pub const DEFAULT_CARD_NAME: &str = "My card";

/// The starting balance, in minor currency units, for cards created without one.
pub const DEFAULT_STARTING_BALANCE: i64 = 10_000;

/// A named account that holds a balance for a user.
///
/// Balances are integers in minor currency units (e.g. cents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// The ID of the card.
    pub id: CardId,
    /// The user that owns the card.
    pub user_id: UserID,
    /// The display name of the card.
    pub name: String,
    /// The balance the card was created with.
    pub starting_balance: i64,
    /// The starting balance plus all income minus all expenses recorded against the card.
    pub current_balance: i64,
    /// When the card was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Create the card table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_card_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS card (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                starting_balance INTEGER NOT NULL CHECK (starting_balance >= 0),
                current_balance INTEGER NOT NULL CHECK (current_balance >= 0),
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_card_user ON card(user_id);",
        (),
    )?;

    Ok(())
}

/// Create a new card for `user_id` whose current balance starts at `starting_balance`.
///
/// `name` is trimmed before it is stored.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidArgument] if `name` is blank or `starting_balance` is negative,
/// - [Error::NotFound] if `user_id` does not refer to a registered user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_card(
    user_id: UserID,
    name: &str,
    starting_balance: i64,
    connection: &Connection,
) -> Result<Card, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("a card name is required".to_owned()));
    }

    if starting_balance < 0 {
        return Err(Error::InvalidArgument(format!(
            "the starting balance must not be negative, got {starting_balance}"
        )));
    }

    let card = connection
        .prepare(
            "INSERT INTO card (user_id, name, starting_balance, current_balance, created_at)
             VALUES (?1, ?2, ?3, ?3, ?4)
             RETURNING id, user_id, name, starting_balance, current_balance, created_at",
        )?
        .query_row(
            (
                user_id.as_i64(),
                name,
                starting_balance,
                OffsetDateTime::now_utc(),
            ),
            map_card_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::NotFound,
            error => error.into(),
        })?;

    tracing::info!(card_id = card.id, %user_id, starting_balance, "created card");

    Ok(card)
}

/// Retrieve a card from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid card,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_card(id: CardId, connection: &Connection) -> Result<Card, Error> {
    let card = connection
        .prepare(
            "SELECT id, user_id, name, starting_balance, current_balance, created_at
             FROM card WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_card_row)?;

    Ok(card)
}

/// Get all the cards that belong to `user_id`, oldest first.
///
/// Returns an empty list for users without cards, including unknown users.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn list_cards(user_id: UserID, connection: &Connection) -> Result<Vec<Card>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, starting_balance, current_balance, created_at
             FROM card WHERE user_id = :user_id ORDER BY id ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_card_row)?
        .map(|maybe_card| maybe_card.map_err(Error::from))
        .collect()
}

/// Map a database row to a Card.
pub fn map_card_row(row: &Row) -> Result<Card, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_user_id = row.get(1)?;
    let name = row.get(2)?;
    let starting_balance = row.get(3)?;
    let current_balance = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(Card {
        id,
        user_id: UserID::new(raw_user_id),
        name,
        starting_balance,
        current_balance,
        created_at,
    })
}
