#![allow(missing_docs)]

pub(crate) mod http;

pub(crate) use http::{assert_error_contains, get_test_app_state, seed_card, seed_user};
