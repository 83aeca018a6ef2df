use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
///
/// `password` holds the encoded form produced by a
/// [`PasswordAuthenticator`](crate::auth::PasswordAuthenticator), never plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
    pub address: String,
}

/// Payload for registering a new user.
#[derive(Debug, Clone)]
pub struct UserCreate {
    pub username: String,
    pub password: String,
    pub address: String,
}

impl User {
    /// Creates a user with a fresh id. `encoded_password` must already be encoded.
    pub fn new(
        username: impl Into<String>,
        encoded_password: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: encoded_password.into(),
            address: address.into(),
        }
    }
}
