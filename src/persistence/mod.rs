//! JSON persistence of users, deliveries and settings.
//!
//! Users and deliveries are written as versioned records:
//!
//! ```json
//! { "version": 1, "deliveries": [ { "type": "standard", ... } ] }
//! ```
//!
//! Loading never fails. A missing file, unreadable file, bad JSON or a
//! different version all yield an empty collection; a single bad or duplicate
//! record is skipped and the rest are kept.

use crate::auth::UserDirectory;
use crate::delivery_actor::DeliveryStore;
use crate::model::{Delivery, User};
use crate::settings::AppSettings;
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Version written to, and required from, every record file.
pub const RECORD_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Locations of the three data files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub deliveries: PathBuf,
    pub users: PathBuf,
    pub settings: PathBuf,
}

impl DataFiles {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            deliveries: dir.join("deliveries.json"),
            users: dir.join("users.json"),
            settings: dir.join("settings.json"),
        }
    }
}

#[derive(Serialize)]
struct DeliveryRecords<'a> {
    version: u64,
    deliveries: Vec<&'a Delivery>,
}

#[derive(Serialize)]
struct UserRecords<'a> {
    version: u64,
    users: Vec<&'a User>,
}

/// Loads deliveries; see the module docs for the fallback rules.
pub fn load_deliveries(path: &Path) -> DeliveryStore {
    let mut store = DeliveryStore::new();
    let Some(records) = read_records(path, "deliveries") else {
        return store;
    };
    for record in records {
        match serde_json::from_value::<Delivery>(record) {
            Ok(delivery) => {
                let code = delivery.code();
                if let Err(e) = store.add(delivery) {
                    error!(%code, error = %e, "Skipping delivery, is the file corrupted?");
                }
            }
            Err(e) => error!(error = %e, "Skipping unreadable delivery record"),
        }
    }
    info!(count = store.len(), "Loaded deliveries");
    store
}

pub fn save_deliveries<'a>(
    path: &Path,
    deliveries: impl IntoIterator<Item = &'a Delivery>,
) -> Result<(), PersistenceError> {
    let records = DeliveryRecords {
        version: RECORD_VERSION,
        deliveries: deliveries.into_iter().collect(),
    };
    write_json(path, &records)?;
    info!(count = records.deliveries.len(), "Saved deliveries");
    Ok(())
}

/// Loads users; see the module docs for the fallback rules.
pub fn load_users(path: &Path) -> UserDirectory {
    let mut users = UserDirectory::new();
    let Some(records) = read_records(path, "users") else {
        return users;
    };
    for record in records {
        match serde_json::from_value::<User>(record) {
            Ok(user) => {
                if let Err(e) = users.insert(user) {
                    error!(error = %e, "Skipping user, is the file corrupted?");
                }
            }
            Err(e) => error!(error = %e, "Skipping unreadable user record"),
        }
    }
    info!(count = users.len(), "Loaded users");
    users
}

pub fn save_users(path: &Path, users: &UserDirectory) -> Result<(), PersistenceError> {
    let records = UserRecords {
        version: RECORD_VERSION,
        users: users.iter().collect(),
    };
    write_json(path, &records)?;
    info!(count = records.users.len(), "Saved users");
    Ok(())
}

/// Loads settings, falling back to defaults on any problem.
pub fn load_settings(path: &Path) -> AppSettings {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "Settings file not found, using defaults");
            return AppSettings::default();
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error reading settings, using defaults");
            return AppSettings::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        error!(error = %e, "Failed to parse settings, using defaults");
        AppSettings::default()
    })
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), PersistenceError> {
    write_json(path, settings)
}

/// The `field` array of a versioned record file, or `None` if the file is
/// unusable as a whole.
fn read_records(path: &Path, field: &str) -> Option<Vec<Value>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "{field} file not found");
            return None;
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error reading {field} file, using empty db");
            return None;
        }
    };
    let mut root: Value = match serde_json::from_str(&contents) {
        Ok(root) => root,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to parse JSON");
            return None;
        }
    };
    let version = root.get("version").and_then(Value::as_u64);
    if version != Some(RECORD_VERSION) {
        error!(?version, "Failed to load {field}, incompatible db version");
        return None;
    }
    match root.get_mut(field).map(Value::take) {
        Some(Value::Array(records)) => Some(records),
        _ => {
            error!("Failed to load {field}, missing record list");
            None
        }
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let io_error = |source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).map_err(io_error)
}
