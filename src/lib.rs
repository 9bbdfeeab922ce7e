//! Wallet is a small personal-finance web app: users hold one or more cards
//! and record income and expense transactions against them.
//!
//! This library provides a JSON REST API over a SQLite database. The part that
//! matters most is the balance engine in [record_transaction] and
//! [delete_transaction]: a card's balance is only ever changed as a side effect
//! of recording or deleting a transaction, inside a single SQL transaction that
//! holds the write lock from the balance check to the balance update.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod card;
mod database_id;
mod db;
mod email;
mod endpoints;
mod log_in;
mod logging;
mod password;
mod register_user;
mod routing;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use card::{
    Card, DEFAULT_CARD_NAME, DEFAULT_STARTING_BALANCE, create_card, get_card, list_cards,
};
pub use database_id::{CardId, TransactionId};
pub use db::{initialize as initialize_db, open_connection};
pub use email::Email;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::create_user_with_default_card;
pub use routing::build_router;
pub use transaction::{
    Amount, BalanceAudit, Transaction, TransactionKind, audit_card_balance, delete_transaction,
    get_transaction, list_transactions, record_transaction,
};
pub use user::{User, UserID, create_user, get_user_by_email, get_user_by_id};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`. If a signal cannot be listened
/// for, only the other one will trigger the shutdown.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("could not listen for ctrl+c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate_signal) => {
                terminate_signal.recv().await;
            }
            Err(error) => {
                tracing::error!("could not listen for the terminate signal: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        _ = ctrl_c => "ctrl+c",
        _ = terminate => "terminate",
    };

    tracing::info!("received {signal_name} signal, shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(1)));
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An expense (or the reversal of an income) would make a card's balance
    /// negative.
    ///
    /// Nothing is written when this error is returned.
    #[error("insufficient funds: a balance of {balance} cannot cover {amount}")]
    InsufficientFunds {
        /// The card's balance at the time of the check.
        balance: i64,
        /// The amount that would have been taken from the balance.
        amount: i64,
    },

    /// The client sent malformed input, e.g. a non-positive amount, an unknown
    /// transaction kind or a missing field.
    ///
    /// Raised before any write is attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The email address is already registered to another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The email and password combination did not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidArgument(rejection.body_text())
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InsufficientFunds { .. } | Error::InvalidArgument(_) | Error::TooWeak(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                let body = ErrorBody {
                    error: "an unexpected error occurred, check the server logs for more details"
                        .to_owned(),
                };
                return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}
