use super::{AuthError, PasswordAuthenticator};
use crate::model::{User, UserCreate};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Registered users, indexed by id and by case-insensitive username.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    by_id: HashMap<Uuid, User>,
    by_name: HashMap<String, Uuid>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes the password and registers a new user.
    pub fn register(
        &mut self,
        params: UserCreate,
        auth: &PasswordAuthenticator,
    ) -> Result<User, AuthError> {
        let encoded = auth.encode(&params.password)?;
        let user = User::new(params.username, encoded, params.address);
        self.insert(user.clone())?;
        Ok(user)
    }

    /// Inserts an existing user (e.g. one loaded from disk).
    pub fn insert(&mut self, user: User) -> Result<(), AuthError> {
        let key = normalize(&user.username);
        if self.by_name.contains_key(&key) || self.by_id.contains_key(&user.id) {
            return Err(AuthError::UsernameTaken(user.username));
        }
        info!(user = %user.username, "Registered user");
        self.by_name.insert(key, user.id);
        self.by_id.insert(user.id, user);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<&User> {
        self.by_id.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&User> {
        self.by_name
            .get(&normalize(name))
            .and_then(|id| self.by_id.get(id))
    }

    /// Returns the removed user, if any.
    pub fn remove(&mut self, id: Uuid) -> Option<User> {
        let user = self.by_id.remove(&id)?;
        self.by_name.remove(&normalize(&user.username));
        Some(user)
    }

    /// Looks the user up by name and checks the password.
    pub fn authenticate(
        &self,
        username: &str,
        password: &str,
        auth: &PasswordAuthenticator,
    ) -> Result<&User, AuthError> {
        let user = self
            .by_name(username)
            .ok_or_else(|| AuthError::UnknownUser(username.to_string()))?;
        if !auth.verify(password, &user.password) {
            return Err(AuthError::WrongPassword);
        }
        Ok(user)
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> + '_ {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
