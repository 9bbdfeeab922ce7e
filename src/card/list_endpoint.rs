use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State, rejection::PathRejection},
};
use rusqlite::Connection;

use crate::{AppState, Card, Error, UserID, card::list_cards, get_user_by_id};

/// The state needed to list a user's cards.
#[derive(Debug, Clone)]
pub struct ListCardsState {
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListCardsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that responds with all of a user's cards, oldest first.
///
/// Unknown users get a 404 rather than an empty list.
pub async fn list_user_cards_endpoint(
    State(state): State<ListCardsState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Card>>, Error> {
    let Path(user_id) = path?;
    let user_id = UserID::new(user_id);
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    get_user_by_id(user_id, &connection)?;

    list_cards(user_id, &connection).map(Json)
}
