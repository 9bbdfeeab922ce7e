//! Defines the endpoint for creating a card.
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
    AppState, Error, UserID,
    card::{DEFAULT_STARTING_BALANCE, create_card},
    database_id::CardId,
    endpoints::{self, format_endpoint},
};

/// The state needed to create a card.
#[derive(Debug, Clone)]
pub struct CreateCardState {
    /// The database connection for managing cards.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body for creating a card.
#[derive(Debug, Serialize, Deserialize)]
pub struct CardRequest {
    /// The user that will own the card.
    pub user_id: UserID,
    /// The display name of the card.
    pub name: String,
    /// The balance to start with, defaults to [DEFAULT_STARTING_BALANCE].
    #[serde(default)]
    pub starting_balance: Option<i64>,
}

/// The JSON body sent back for a created card.
#[derive(Debug, Serialize, Deserialize)]
pub struct CardCreated {
    /// The ID of the new card.
    pub id: CardId,
}

/// A route handler for creating a card, responds with 201 Created and the card's ID.
pub async fn create_card_endpoint(
    State(state): State<CreateCardState>,
    request: Result<Json<CardRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(request) = request?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let card = create_card(
        request.user_id,
        &request.name,
        request.starting_balance.unwrap_or(DEFAULT_STARTING_BALANCE),
        &connection,
    )?;

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::CARD, card.id))],
        Json(CardCreated { id: card.id }),
    )
        .into_response())
}
