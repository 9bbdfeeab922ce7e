//! The balance engine: the only code that changes a card's balance.
//!
//! Recording a transaction together with its effect on the card, and deleting a
//! transaction together with the reversal of that effect, each run inside one
//! `BEGIN IMMEDIATE` SQL transaction. SQLite hands out its write lock when the
//! SQL transaction begins, so no other connection can change the balance
//! between the overdraft check and the balance update. A rejected request
//! rolls back before anything is written.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Card, Error,
    card::get_card,
    database_id::{CardId, TransactionId},
    transaction::core::{Amount, Transaction, TransactionKind, get_transaction, map_transaction_row},
};

/// Record a transaction against `card_id` and apply it to the card's balance.
///
/// The balance check, the insert and the balance update happen as one atomic
/// unit: either all of them are written or none are.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `card_id` does not refer to a valid card,
/// - [Error::InsufficientFunds] if `kind` is an expense larger than the card's balance,
/// - [Error::InvalidArgument] if the new balance would overflow,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn record_transaction(
    card_id: CardId,
    kind: TransactionKind,
    amount: Amount,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let balance = read_balance(card_id, &sql_transaction)?;
    let new_balance =
        apply_delta(balance, kind.balance_delta(amount)).inspect_err(|error| {
            tracing::warn!(
                card_id,
                %kind,
                amount = amount.as_i64(),
                balance,
                "rejected transaction: {error}"
            )
        })?;

    let transaction = sql_transaction
        .prepare(
            "INSERT INTO \"transaction\" (card_id, kind, amount, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id, card_id, kind, amount, created_at",
        )?
        .query_row(
            (card_id, kind, amount.as_i64(), OffsetDateTime::now_utc()),
            map_transaction_row,
        )?;
    write_balance(card_id, new_balance, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::info!(
        transaction_id = transaction.id,
        card_id,
        %kind,
        amount = transaction.amount,
        balance = new_balance,
        "committed transaction"
    );

    Ok(transaction)
}

/// Delete the transaction `id` and reverse its effect on its card's balance.
///
/// Returns the card with its updated balance. The delete and the reversal
/// happen as one atomic unit. A deleted transaction is gone for good, deleting
/// it again fails with [Error::NotFound].
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::InsufficientFunds] if the transaction is an income and removing it
///   would make the card's balance negative,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<Card, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let transaction = get_transaction(id, &sql_transaction)?;
    let amount = Amount::new(transaction.amount)?;
    let balance = read_balance(transaction.card_id, &sql_transaction)?;
    let new_balance = apply_delta(balance, -transaction.kind.balance_delta(amount))
        .inspect_err(|error| {
            tracing::warn!(
                transaction_id = id,
                card_id = transaction.card_id,
                balance,
                "refused to reverse transaction: {error}"
            )
        })?;

    sql_transaction.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?;
    write_balance(transaction.card_id, new_balance, &sql_transaction)?;
    let card = get_card(transaction.card_id, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::info!(
        transaction_id = id,
        card_id = card.id,
        kind = %transaction.kind,
        amount = transaction.amount,
        balance = card.current_balance,
        "reversed transaction"
    );

    Ok(card)
}

/// A comparison of a card's stored balance with the balance rebuilt from its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    /// The card that was audited.
    pub card_id: CardId,
    /// The balance the card was created with.
    pub starting_balance: i64,
    /// The balance stored on the card.
    pub stored_balance: i64,
    /// The starting balance plus all income minus all expenses currently recorded.
    ///
    /// Wider than the stored balance so that long histories near the `i64` limits still add up.
    pub replayed_balance: i128,
    /// Whether the stored and replayed balances agree.
    pub consistent: bool,
}

/// Rebuild the balance of `card_id` from its transactions and compare it with the stored balance.
///
/// This only reads. A mismatch is reported, never repaired.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `card_id` does not refer to a valid card,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn audit_card_balance(card_id: CardId, connection: &Connection) -> Result<BalanceAudit, Error> {
    let (starting_balance, stored_balance): (i64, i64) = connection.query_row(
        "SELECT starting_balance, current_balance FROM card WHERE id = ?1",
        (card_id,),
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    // SQLite's SUM() errors once a running total leaves the i64 range.
    let mut statement =
        connection.prepare("SELECT kind, amount FROM \"transaction\" WHERE card_id = ?1")?;
    let replayed_balance = statement
        .query_map((card_id,), |row| {
            Ok((row.get::<_, TransactionKind>(0)?, row.get::<_, i64>(1)?))
        })?
        .try_fold(
            i128::from(starting_balance),
            |balance, row| -> Result<i128, Error> {
                let (kind, amount) = row?;
                Ok(match kind {
                    TransactionKind::Income => balance + i128::from(amount),
                    TransactionKind::Expense => balance - i128::from(amount),
                })
            },
        )?;

    Ok(BalanceAudit {
        card_id,
        starting_balance,
        stored_balance,
        replayed_balance,
        consistent: i128::from(stored_balance) == replayed_balance,
    })
}

fn read_balance(card_id: CardId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT current_balance FROM card WHERE id = ?1",
            (card_id,),
            |row| row.get(0),
        )
        .map_err(Error::from)
}

fn write_balance(card_id: CardId, balance: i64, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "UPDATE card SET current_balance = ?1 WHERE id = ?2",
        (balance, card_id),
    )?;

    Ok(())
}

/// Work out a balance after a change of `delta`, refusing to go below zero.
fn apply_delta(balance: i64, delta: i64) -> Result<i64, Error> {
    let new_balance = balance.checked_add(delta).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "a change of {delta} would overflow the balance of {balance}"
        ))
    })?;

    if new_balance < 0 {
        return Err(Error::InsufficientFunds {
            balance,
            amount: -delta,
        });
    }

    Ok(new_balance)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        Amount, Card, Email, Error, PasswordHash, TransactionKind, User, create_card,
        create_user, db::initialize, get_card,
        transaction::{count_transactions, list_transactions},
    };

    use super::{apply_delta, audit_card_balance, delete_transaction, record_transaction};

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn create_test_user(connection: &Connection) -> User {
        create_user(
            "Test User",
            Email::new("foo@bar.baz").unwrap(),
            PasswordHash::new_unchecked("hunter2"),
            connection,
        )
        .unwrap()
    }

    fn create_test_card(starting_balance: i64, connection: &Connection) -> Card {
        let user = create_test_user(connection);
        create_card(user.id, "Test card", starting_balance, connection).unwrap()
    }

    fn income(amount: i64) -> (TransactionKind, Amount) {
        (TransactionKind::Income, Amount::new(amount).unwrap())
    }

    fn expense(amount: i64) -> (TransactionKind, Amount) {
        (TransactionKind::Expense, Amount::new(amount).unwrap())
    }

    #[track_caller]
    fn assert_balance(card: &Card, want: i64, connection: &Connection) {
        let got = get_card(card.id, connection).unwrap().current_balance;
        assert_eq!(got, want, "got balance {got}, want {want}");
    }

    #[test]
    fn income_increases_balance() {
        let conn = get_test_connection();
        let card = create_test_card(10_000, &conn);
        let (kind, amount) = income(500);

        let transaction = record_transaction(card.id, kind, amount, &conn).unwrap();

        assert_eq!(transaction.card_id, card.id);
        assert_eq!(transaction.kind, TransactionKind::Income);
        assert_eq!(transaction.amount, 500);
        assert_balance(&card, 10_500, &conn);
    }

    #[test]
    fn expense_larger_than_balance_is_rejected() {
        let conn = get_test_connection();
        let card = create_test_card(10_000, &conn);
        let (kind, amount) = income(500);
        record_transaction(card.id, kind, amount, &conn).unwrap();

        let (kind, amount) = expense(10_600);
        let result = record_transaction(card.id, kind, amount, &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientFunds {
                balance: 10_500,
                amount: 10_600
            })
        );
        assert_balance(&card, 10_500, &conn);
    }

    #[test]
    fn rejected_expense_leaves_no_trace() {
        let conn = get_test_connection();
        let card = create_test_card(100, &conn);

        let (kind, amount) = expense(101);
        let result = record_transaction(card.id, kind, amount, &conn);

        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_balance(&card, 100, &conn);
    }

    #[test]
    fn expense_equal_to_balance_empties_card() {
        let conn = get_test_connection();
        let card = create_test_card(100, &conn);

        let (kind, amount) = expense(100);
        record_transaction(card.id, kind, amount, &conn).unwrap();

        assert_balance(&card, 0, &conn);
    }

    #[test]
    fn delete_reverses_expense() {
        let conn = get_test_connection();
        let card = create_test_card(10_500, &conn);
        let (kind, amount) = expense(500);
        let transaction = record_transaction(card.id, kind, amount, &conn).unwrap();
        assert_balance(&card, 10_000, &conn);

        let updated_card = delete_transaction(transaction.id, &conn).unwrap();

        assert_eq!(updated_card.current_balance, 10_500);
        assert_balance(&card, 10_500, &conn);
        assert_eq!(list_transactions(card.id, &conn), Ok(vec![]));
    }

    #[test]
    fn record_then_delete_restores_exact_balance() {
        let conn = get_test_connection();
        let card = create_test_card(1_234, &conn);

        for (kind, amount) in [income(1), expense(1_234), income(987_654)] {
            let before = get_card(card.id, &conn).unwrap().current_balance;
            let transaction = record_transaction(card.id, kind, amount, &conn).unwrap();

            let after = delete_transaction(transaction.id, &conn).unwrap();

            assert_eq!(after.current_balance, before);
        }
    }

    #[test]
    fn record_fails_on_unknown_card() {
        let conn = get_test_connection();
        let card = create_test_card(100, &conn);

        let (kind, amount) = income(50);
        let result = record_transaction(card.id + 1, kind, amount, &conn);

        assert_eq!(result, Err(Error::NotFound));
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_balance(&card, 100, &conn);
    }

    #[test]
    fn delete_fails_on_unknown_transaction() {
        let conn = get_test_connection();

        assert_eq!(delete_transaction(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn deleted_transaction_cannot_be_reversed_twice() {
        let conn = get_test_connection();
        let card = create_test_card(100, &conn);
        let (kind, amount) = expense(40);
        let transaction = record_transaction(card.id, kind, amount, &conn).unwrap();
        delete_transaction(transaction.id, &conn).unwrap();

        let result = delete_transaction(transaction.id, &conn);

        assert_eq!(result, Err(Error::NotFound));
        assert_balance(&card, 100, &conn);
    }

    #[test]
    fn delete_refuses_income_reversal_that_would_overdraw() {
        let conn = get_test_connection();
        let card = create_test_card(0, &conn);
        let (kind, amount) = income(100);
        let salary = record_transaction(card.id, kind, amount, &conn).unwrap();
        let (kind, amount) = expense(80);
        record_transaction(card.id, kind, amount, &conn).unwrap();

        let result = delete_transaction(salary.id, &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientFunds {
                balance: 20,
                amount: 100
            })
        );
        assert_balance(&card, 20, &conn);
        assert_eq!(count_transactions(&conn), Ok(2));
    }

    #[test]
    fn income_that_would_overflow_is_rejected() {
        let conn = get_test_connection();
        let card = create_test_card(i64::MAX - 10, &conn);

        let (kind, amount) = income(11);
        let result = record_transaction(card.id, kind, amount, &conn);

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_balance(&card, i64::MAX - 10, &conn);
        assert_eq!(count_transactions(&conn), Ok(0));
    }

    #[test]
    fn transactions_on_one_card_do_not_touch_another() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let first = create_card(user.id, "First", 100, &conn).unwrap();
        let second = create_card(user.id, "Second", 100, &conn).unwrap();

        let (kind, amount) = expense(60);
        record_transaction(first.id, kind, amount, &conn).unwrap();

        assert_balance(&first, 40, &conn);
        assert_balance(&second, 100, &conn);
    }

    #[test]
    fn audit_matches_history() {
        let conn = get_test_connection();
        let card = create_test_card(1_000, &conn);
        for (kind, amount) in [income(250), expense(100), expense(1_150), income(5)] {
            record_transaction(card.id, kind, amount, &conn).unwrap();
        }

        let audit = audit_card_balance(card.id, &conn).unwrap();

        assert_eq!(audit.starting_balance, 1_000);
        assert_eq!(audit.replayed_balance, 5);
        assert_eq!(audit.stored_balance, 5);
        assert!(audit.consistent);
    }

    #[test]
    fn audit_reports_tampered_balance() {
        let conn = get_test_connection();
        let card = create_test_card(1_000, &conn);
        conn.execute(
            "UPDATE card SET current_balance = 5 WHERE id = ?1",
            (card.id,),
        )
        .unwrap();

        let audit = audit_card_balance(card.id, &conn).unwrap();

        assert_eq!(audit.replayed_balance, 1_000);
        assert_eq!(audit.stored_balance, 5);
        assert!(!audit.consistent);
    }

    #[test]
    fn audit_adds_up_history_beyond_i64_range() {
        let conn = get_test_connection();
        let card = create_test_card(0, &conn);
        let (income_kind, max) = income(i64::MAX);
        let (expense_kind, _) = expense(i64::MAX);

        record_transaction(card.id, income_kind, max, &conn).unwrap();
        let first_expense = record_transaction(card.id, expense_kind, max, &conn).unwrap();
        record_transaction(card.id, income_kind, max, &conn).unwrap();
        record_transaction(card.id, expense_kind, max, &conn).unwrap();
        delete_transaction(first_expense.id, &conn).unwrap();

        let audit = audit_card_balance(card.id, &conn).unwrap();

        assert_balance(&card, i64::MAX, &conn);
        assert_eq!(audit.stored_balance, i64::MAX);
        assert_eq!(audit.replayed_balance, i128::from(i64::MAX));
        assert!(audit.consistent);
    }

    #[test]
    fn audit_fails_on_unknown_card() {
        let conn = get_test_connection();

        assert_eq!(audit_card_balance(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn storage_refuses_negative_balance() {
        let conn = get_test_connection();
        let card = create_test_card(10, &conn);

        let result = conn.execute(
            "UPDATE card SET current_balance = -1 WHERE id = ?1",
            (card.id,),
        );

        assert!(result.is_err());
        assert_balance(&card, 10, &conn);
    }

    #[test]
    fn apply_delta_checks_bounds() {
        assert_eq!(apply_delta(100, -100), Ok(0));
        assert_eq!(
            apply_delta(100, -101),
            Err(Error::InsufficientFunds {
                balance: 100,
                amount: 101
            })
        );
        assert!(matches!(
            apply_delta(i64::MAX, 1),
            Err(Error::InvalidArgument(_))
        ));
    }
}
