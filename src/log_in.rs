//! This file defines the route for checking a user's email and password.
//!
//! Sessions are handled by the client, a successful log in only tells the
//! client who the user is.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Email, Error, get_user_by_email, user::UserSummary};

/// The state needed to log in a user.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body for logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// The email the user registered with, in any case.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// Handler for log-in requests via the POST method.
///
/// Responds with the user's ID, name and email if the credentials match a
/// registered user. An unknown email and a wrong password get the same 401
/// response.
pub async fn post_log_in(
    State(state): State<LoginState>,
    request: Result<Json<LogInData>, JsonRejection>,
) -> Result<Json<UserSummary>, Error> {
    let Json(user_data) = request?;

    let email = Email::new(&user_data.email)?;
    if user_data.password.is_empty() {
        return Err(Error::InvalidArgument("a password is required".to_owned()));
    }

    let user = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    let password = user_data.password;
    let password_hash = user.password_hash.clone();
    let is_password_valid = tokio::task::spawn_blocking(move || password_hash.verify(&password))
        .await
        .map_err(|error| {
            tracing::error!("the password verification task failed: {error}");
            Error::HashingError(error.to_string())
        })?
        .map_err(|error| {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            Error::HashingError(error.to_string())
        })?;

    if !is_password_valid {
        tracing::info!(user_id = %user.id, "rejected log in with wrong password");
        return Err(Error::InvalidCredentials);
    }

    Ok(Json(UserSummary::from(&user)))
}
