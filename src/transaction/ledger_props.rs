//! Property tests for the balance engine over arbitrary sequences of operations.

use proptest::prelude::*;
use rusqlite::Connection;

use crate::{
    Amount, Card, Error, TransactionKind, audit_card_balance, db::initialize, get_card,
    test_utils::seed_card, transaction::list_transactions,
};

use super::ledger::{delete_transaction, record_transaction};

const CARD_COUNT: usize = 3;

#[derive(Debug, Clone)]
enum Operation {
    Record {
        card: usize,
        kind: TransactionKind,
        amount: i64,
    },
    /// Delete the live transaction at this position, wrapped to the number of live transactions.
    Delete { pick: usize },
}

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![Just(TransactionKind::Income), Just(TransactionKind::Expense)]
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (0..CARD_COUNT, kind_strategy(), 1i64..=5_000)
            .prop_map(|(card, kind, amount)| Operation::Record { card, kind, amount }),
        1 => any::<usize>().prop_map(|pick| Operation::Delete { pick }),
    ]
}

fn setup(starting_balances: &[i64]) -> (Connection, Vec<Card>) {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();
    let cards = starting_balances
        .iter()
        .map(|&balance| seed_card(balance, &connection))
        .collect();

    (connection, cards)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn balances_match_history_and_stay_non_negative(
        starting_balances in prop::collection::vec(0i64..=10_000, CARD_COUNT),
        operations in prop::collection::vec(operation_strategy(), 1..60),
    ) {
        let (connection, cards) = setup(&starting_balances);
        let mut model_balances = starting_balances.clone();
        // (transaction ID, card position, balance delta)
        let mut live: Vec<(i64, usize, i64)> = Vec::new();

        for operation in operations {
            match operation {
                Operation::Record { card, kind, amount } => {
                    let amount = Amount::new(amount).unwrap();
                    let delta = kind.balance_delta(amount);
                    let result = record_transaction(cards[card].id, kind, amount, &connection);

                    if model_balances[card] + delta >= 0 {
                        let transaction = result.unwrap();
                        model_balances[card] += delta;
                        live.push((transaction.id, card, delta));
                    } else {
                        let is_insufficient_funds =
                            matches!(result, Err(Error::InsufficientFunds { .. }));
                        prop_assert!(is_insufficient_funds, "want InsufficientFunds, got {:?}", result);
                    }
                }
                Operation::Delete { pick } => {
                    if live.is_empty() {
                        continue;
                    }
                    let position = pick % live.len();
                    let (id, card, delta) = live[position];
                    let result = delete_transaction(id, &connection);

                    if model_balances[card] - delta >= 0 {
                        prop_assert_eq!(result.unwrap().current_balance, model_balances[card] - delta);
                        model_balances[card] -= delta;
                        live.remove(position);
                    } else {
                        let is_insufficient_funds =
                            matches!(result, Err(Error::InsufficientFunds { .. }));
                        prop_assert!(is_insufficient_funds, "want InsufficientFunds, got {:?}", result);
                    }
                }
            }

            for (position, card) in cards.iter().enumerate() {
                let audit = audit_card_balance(card.id, &connection).unwrap();
                prop_assert!(audit.consistent, "balance drifted from history: {:?}", audit);
                prop_assert!(audit.stored_balance >= 0);
                prop_assert_eq!(audit.stored_balance, model_balances[position]);
            }
        }

        let recorded: usize = cards
            .iter()
            .map(|card| list_transactions(card.id, &connection).unwrap().len())
            .sum();
        prop_assert_eq!(recorded, live.len());
    }

    #[test]
    fn deleting_a_recorded_transaction_restores_the_balance(
        starting_balance in 0i64..=10_000,
        kind in kind_strategy(),
        amount in 1i64..=10_000,
    ) {
        let (connection, cards) = setup(&[starting_balance]);
        let card_id = cards[0].id;
        let amount = Amount::new(amount).unwrap();

        match record_transaction(card_id, kind, amount, &connection) {
            Ok(transaction) => {
                let card = delete_transaction(transaction.id, &connection).unwrap();
                prop_assert_eq!(card.current_balance, starting_balance);
            }
            Err(error) => {
                prop_assert_eq!(kind, TransactionKind::Expense);
                prop_assert!(amount.as_i64() > starting_balance, "unexpected rejection: {}", error);
                prop_assert_eq!(get_card(card_id, &connection).unwrap().current_balance, starting_balance);
            }
        }
    }
}
