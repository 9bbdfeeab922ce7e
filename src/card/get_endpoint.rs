//! Defines the endpoints for reading a single card.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::PathRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, BalanceAudit, Card, Error, Transaction, audit_card_balance, card::get_card,
    database_id::CardId, list_transactions,
};

/// The state needed to read a card.
#[derive(Debug, Clone)]
pub struct GetCardState {
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GetCardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A card together with its transactions, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct CardDetails {
    /// The card and its current balance.
    pub card: Card,
    /// Every transaction recorded against the card, newest first.
    pub transactions: Vec<Transaction>,
}

/// A route handler that responds with a card and its transaction history.
pub async fn get_card_endpoint(
    State(state): State<GetCardState>,
    path: Result<Path<CardId>, PathRejection>,
) -> Result<Json<CardDetails>, Error> {
    let Path(card_id) = path?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let card = get_card(card_id, &connection)?;
    let transactions = list_transactions(card_id, &connection)?;

    Ok(Json(CardDetails { card, transactions }))
}

/// A route handler that compares a card's stored balance with its transaction history.
pub async fn get_card_audit_endpoint(
    State(state): State<GetCardState>,
    path: Result<Path<CardId>, PathRejection>,
) -> Result<Json<BalanceAudit>, Error> {
    let Path(card_id) = path?;
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let audit = audit_card_balance(card_id, &connection)?;
    if !audit.consistent {
        tracing::error!(
            card_id,
            stored_balance = audit.stored_balance,
            replayed_balance = audit.replayed_balance,
            "card balance does not match its transaction history"
        );
    }

    Ok(Json(audit))
}
