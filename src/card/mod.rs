//! Cards: the balance-bearing accounts that transactions are recorded against.
//!
//! This module contains:
//! - The `Card` model and the queries for creating and reading cards
//! - The route handlers for creating, reading, auditing and listing cards

mod core;
mod create_endpoint;
mod get_endpoint;
mod list_endpoint;

pub use core::{
    Card, DEFAULT_CARD_NAME, DEFAULT_STARTING_BALANCE, create_card, create_card_table, get_card,
    list_cards,
};
pub use create_endpoint::create_card_endpoint;
pub use get_endpoint::{get_card_audit_endpoint, get_card_endpoint};
pub use list_endpoint::list_user_cards_endpoint;
