//! Transactions and the balance engine.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the queries for reading transactions
//! - The balance engine that records and deletes transactions together with
//!   their effect on a card's balance
//! - The route handlers for the transaction API

mod core;
mod create_transaction_endpoint;
mod delete_transaction_endpoint;
mod get_transaction_endpoint;
mod ledger;

#[cfg(test)]
mod ledger_props;

pub use core::{
    Amount, Transaction, TransactionKind, create_transaction_table, get_transaction,
    list_transactions,
};
pub use create_transaction_endpoint::create_transaction_endpoint;
pub use delete_transaction_endpoint::delete_transaction_endpoint;
pub use get_transaction_endpoint::get_transaction_endpoint;
pub use ledger::{
    BalanceAudit, audit_card_balance, delete_transaction, record_transaction,
};

#[cfg(test)]
pub use core::count_transactions;
