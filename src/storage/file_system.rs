use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::account::RegistryState;
use crate::error::StorageError;
use crate::tonconnect::TonConnectConnection;

/// File-system persistence for registry state and TonConnect connections.
///
/// Layout under the base directory:
/// ```text
/// registry.json       accounts, active selection, wallet prefs
/// connections.json    TonConnect connections
/// credentials/        encrypted seed blobs (owned by the vault)
/// ```
#[derive(Clone)]
pub struct Storage {
    base_path: PathBuf,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            base_path: PathBuf::from("./wallet-data"),
        }
    }

    /// Create storage with custom base directory (for testing)
    pub fn new_with_base_dir(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_path
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.base_path.join("credentials")
    }

    fn save_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.base_path.join(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn load_json<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StorageError> {
        let path = self.base_path.join(file);
        if !path.exists() {
            return Ok(T::default());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save_registry(&self, state: &RegistryState) -> Result<(), StorageError> {
        self.save_json("registry.json", state)
    }

    /// Load registry state, or an empty one if nothing was persisted yet.
    pub fn load_registry(&self) -> Result<RegistryState, StorageError> {
        self.load_json("registry.json")
    }

    pub fn save_connections(&self, connections: &[TonConnectConnection]) -> Result<(), StorageError> {
        self.save_json("connections.json", &connections.to_vec())
    }

    pub fn load_connections(&self) -> Result<Vec<TonConnectConnection>, StorageError> {
        self.load_json("connections.json")
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
