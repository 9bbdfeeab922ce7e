use axum_test::TestResponse;
use rusqlite::Connection;

use crate::{AppState, Card, Email, PasswordHash, User, create_card, create_user};

/// The lowest cost bcrypt accepts, keeps hashing in tests fast.
pub(crate) const TEST_PASSWORD_COST: u32 = 4;

pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection)
        .expect("Could not initialize database")
        .with_password_cost(TEST_PASSWORD_COST)
}

/// Insert a user with a unique email into an initialized database.
pub(crate) fn seed_user(connection: &Connection) -> User {
    let user_count: i64 = connection
        .query_row("SELECT COUNT(id) FROM user", [], |row| row.get(0))
        .expect("Could not count users");
    let email = Email::new(&format!("user{user_count}@example.com")).expect("Invalid test email");

    create_user(
        "Test User",
        email,
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .expect("Could not create test user")
}

/// Insert a new user and a card with `starting_balance` into an initialized database.
pub(crate) fn seed_card(starting_balance: i64, connection: &Connection) -> Card {
    let user = seed_user(connection);

    create_card(user.id, "Test card", starting_balance, connection)
        .expect("Could not create test card")
}

#[track_caller]
pub(crate) fn assert_error_contains(response: &TestResponse, want: &str) {
    let body = response.json::<serde_json::Value>();
    let message = body["error"]
        .as_str()
        .unwrap_or_else(|| panic!("response body {body} has no error message"));

    assert!(
        message.contains(want),
        "want error message containing {want:?}, got {message:?}"
    );
}
