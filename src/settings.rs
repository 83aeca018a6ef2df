//! User-facing settings, persisted as JSON.

use serde::{Deserialize, Serialize};

/// Preferences the user can change at runtime.
///
/// Missing fields fall back to their defaults when loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Id of the password strategy used for new passwords.
    pub password_storage_strategy: u32,
    /// Whether the background worker should run while someone is logged in.
    pub delivery_enabled: bool,
    /// Mean automatic transitions per minute.
    pub delivery_intensity: f64,
    /// Probability that an in-transit delivery fails.
    pub delivery_fail_rate: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            password_storage_strategy: 0,
            delivery_enabled: true,
            delivery_intensity: 6.0,
            delivery_fail_rate: 0.2,
        }
    }
}
