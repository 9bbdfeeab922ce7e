//! Defines the endpoint for recording a new transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    database_id::{CardId, TransactionId},
    endpoints::{self, format_endpoint},
    transaction::{Amount, TransactionKind, record_transaction},
};

/// The state needed to record a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body for recording a transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// The card the transaction is recorded against.
    pub card_id: CardId,
    /// Either "INCOME" or "EXPENSE", in any case.
    #[serde(rename = "type")]
    pub kind: String,
    /// The amount in minor currency units, must be greater than zero.
    pub amount: i64,
}

/// The JSON body sent back for a recorded transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionCreated {
    /// The ID of the new transaction.
    pub id: TransactionId,
}

/// A route handler for recording a new transaction against a card.
///
/// Responds with 201 Created and the new transaction's ID. The request is
/// validated before the database is touched.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    request: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(request) = request?;
    let kind: TransactionKind = request.kind.parse()?;
    let amount = Amount::new(request.amount)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = record_transaction(request.card_id, kind, amount, &connection)?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::TRANSACTION, transaction.id))],
        Json(TransactionCreated { id: transaction.id }),
    )
        .into_response())
}
