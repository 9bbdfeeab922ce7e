//! The endpoint for registering a new user, who starts out with a default card.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Card, DEFAULT_CARD_NAME, DEFAULT_STARTING_BALANCE, Email, Error, PasswordHash, User,
    ValidatedPassword, create_card, create_user, user::UserSummary,
};

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for managing users and cards.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used to hash the new user's password.
    pub password_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: state.password_cost,
        }
    }
}

/// The JSON body for registering a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// The name shown to the user.
    pub name: String,
    /// The user's email, normalized before it is stored.
    pub email: String,
    /// The user's password in plain text.
    pub password: String,
}

/// A route handler for registering a new user.
///
/// Responds with 201 Created and the new user's ID, name and normalized email.
pub async fn register_user(
    State(state): State<RegistrationState>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(request) = request?;

    let email = Email::new(&request.email)?;
    let validated_password =
        ValidatedPassword::new(&request.password, &[request.name.as_str(), email.as_str()])?;
    // bcrypt is CPU-bound.
    let password_cost = state.password_cost;
    let password_hash =
        tokio::task::spawn_blocking(move || PasswordHash::new(validated_password, password_cost))
            .await
            .map_err(|error| {
                tracing::error!("the password hashing task failed: {error}");
                Error::HashingError(error.to_string())
            })?
            .inspect_err(|error| {
                tracing::error!("an error occurred while hashing a password: {error}")
            })?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let (user, _) =
        create_user_with_default_card(&request.name, email, password_hash, &connection)?;

    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))).into_response())
}

/// Create a user and their default card in one SQL transaction.
///
/// The card is named [DEFAULT_CARD_NAME] and starts with [DEFAULT_STARTING_BALANCE].
/// If either insert fails, neither the user nor the card is stored.
///
/// # Errors
/// Returns a:
/// - [Error::InvalidArgument] if `name` is blank,
/// - [Error::DuplicateEmail] if `email` already belongs to a user,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user_with_default_card(
    name: &str,
    email: Email,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(User, Card), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let user = create_user(name, email, password_hash, &transaction)?;
    let card = create_card(
        user.id,
        DEFAULT_CARD_NAME,
        DEFAULT_STARTING_BALANCE,
        &transaction,
    )?;

    transaction.commit()?;

    Ok((user, card))
}
