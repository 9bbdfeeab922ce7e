//! The URIs of the JSON API.
//!
//! For endpoints that take a parameter, e.g., '/api/cards/{card_id}', use [format_endpoint].

/// The route for checking that the server is up.
pub const HEALTH: &str = "/health";
/// The route for registering a new user.
pub const REGISTER_API: &str = "/api/register";
/// The route for checking a user's email and password.
pub const LOG_IN_API: &str = "/api/login";
/// The route to create a card.
pub const CARDS: &str = "/api/cards";
/// The route to access a single card and its transactions.
pub const CARD: &str = "/api/cards/{card_id}";
/// The route to compare a card's stored balance with its transaction history.
pub const CARD_AUDIT: &str = "/api/cards/{card_id}/audit";
/// The route to list a user's cards.
pub const USER_CARDS: &str = "/api/users/{user_id}/cards";
/// The route to record transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter starts with a left brace and ends with the next right brace,
/// e.g. '{card_id}' in '/api/cards/{card_id}'. Only the first parameter is
/// replaced. A parameter missing its right brace runs to the end of the path.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{id}{}",
        &endpoint_path[..param_start],
        &endpoint_path[param_end..]
    )
}
