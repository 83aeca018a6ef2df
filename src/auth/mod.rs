//! Users and password checking.
//!
//! Only consulted by the foreground session; the worker never calls into it.

pub mod directory;

pub use directory::*;

use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while registering or authenticating users.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Wrong password")]
    WrongPassword,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("No password strategy with id {0}")]
    UnknownStrategy(u32),
}

/// Separates the strategy id from the encoded password.
pub const ID_DIVIDER: char = '$';

/// One way of storing passwords.
pub trait PasswordStrategy: Send + Sync {
    /// Stable id written in front of every encoding.
    fn id(&self) -> u32;

    fn name(&self) -> &'static str;

    fn encode(&self, password: &str) -> String;

    /// Checks `password` against an encoding produced by [`PasswordStrategy::encode`].
    fn verify(&self, password: &str, encoded: &str) -> bool;
}

/// Stores the password as is.
pub struct PlainStrategy;

impl PasswordStrategy for PlainStrategy {
    fn id(&self) -> u32 {
        0
    }

    fn name(&self) -> &'static str {
        "plain"
    }

    fn encode(&self, password: &str) -> String {
        password.to_string()
    }

    fn verify(&self, password: &str, encoded: &str) -> bool {
        password == encoded
    }
}

/// Encodes with a default strategy and verifies with whichever strategy an
/// encoding names.
///
/// Encodings look like `<id>$<payload>`.
pub struct PasswordAuthenticator {
    strategies: Vec<Box<dyn PasswordStrategy>>,
    default_id: u32,
}

impl Default for PasswordAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordAuthenticator {
    /// An authenticator with the plain strategy registered and selected.
    pub fn new() -> Self {
        let mut auth = Self {
            strategies: Vec::new(),
            default_id: 0,
        };
        auth.register(Box::new(PlainStrategy));
        auth
    }

    /// Adds (or replaces) a strategy.
    pub fn register(&mut self, strategy: Box<dyn PasswordStrategy>) {
        info!(id = strategy.id(), name = strategy.name(), "Registered password strategy");
        self.strategies.retain(|s| s.id() != strategy.id());
        self.strategies.push(strategy);
    }

    pub fn default_strategy(&self) -> u32 {
        self.default_id
    }

    /// Selects the strategy used by [`PasswordAuthenticator::encode`].
    pub fn set_default_strategy(&mut self, id: u32) -> Result<(), AuthError> {
        if self.strategy(id).is_none() {
            return Err(AuthError::UnknownStrategy(id));
        }
        self.default_id = id;
        Ok(())
    }

    pub fn encode(&self, password: &str) -> Result<String, AuthError> {
        let strategy = self
            .strategy(self.default_id)
            .ok_or(AuthError::UnknownStrategy(self.default_id))?;
        Ok(format!("{}{ID_DIVIDER}{}", strategy.id(), strategy.encode(password)))
    }

    /// False for malformed encodings and unknown strategies.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((id, payload)) = encoded.split_once(ID_DIVIDER) else {
            warn!("Password encoding without strategy id");
            return false;
        };
        let Ok(id) = id.parse::<u32>() else {
            warn!("Invalid password strategy id");
            return false;
        };
        match self.strategy(id) {
            Some(strategy) => strategy.verify(password, payload),
            None => {
                warn!(id, "Cannot find password strategy");
                false
            }
        }
    }

    fn strategy(&self, id: u32) -> Option<&dyn PasswordStrategy> {
        self.strategies
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.as_ref())
    }
}
