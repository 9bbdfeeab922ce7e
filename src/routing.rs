//! Application router configuration.

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use crate::{
    AppState, Error,
    card::{
        create_card_endpoint, get_card_audit_endpoint, get_card_endpoint, list_user_cards_endpoint,
    },
    endpoints,
    log_in::post_log_in,
    register_user::register_user,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Cross-origin requests are allowed from anywhere since the web client is
/// served separately from the API.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER_API, post(register_user))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::CARDS, post(create_card_endpoint))
        .route(endpoints::CARD, get(get_card_endpoint))
        .route(endpoints::CARD_AUDIT, get(get_card_audit_endpoint))
        .route(endpoints::USER_CARDS, get(list_user_cards_endpoint))
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .fallback(get_404_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
