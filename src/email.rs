//! Normalized email addresses.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// An email address that has been trimmed and lowercased.
///
/// Emails are compared and stored in this form, so `Ana@Example.com ` and
/// `ana@example.com` refer to the same user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Normalize and validate an email address.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidArgument] if `raw_email` is blank or does not
    /// look like `local@domain`.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let email = raw_email.trim().to_lowercase();

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(email)),
            _ => Err(Error::InvalidArgument(format!(
                "\"{raw_email}\" is not a valid email address"
            ))),
        }
    }

    /// Create a new `Email` without any validation or normalization.
    ///
    /// The caller should ensure that `raw_email` is already normalized, e.g. it was read back from
    /// the database. For emails coming from the user (e.g., via the REST API), this function should
    /// **not** be used, instead use the checked version.
    pub fn new_unchecked(raw_email: String) -> Self {
        Self(raw_email)
    }

    /// The normalized address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
