//! Persisted DApp connections
//!
//! One record per (DApp origin, wallet); reconnecting the same pair replaces
//! the prior record. Connections die on explicit disconnect and on account
//! removal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::proof::TonProof;
use crate::account::{TonAddress, WalletId};
use crate::error::WalletError;
use crate::storage::Storage;

/// Request types a connected DApp may send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    SendTransaction,
    SignData,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TonConnectConnection {
    pub dapp_origin: String,
    pub manifest_url: String,
    pub wallet_id: WalletId,
    pub address: TonAddress,
    pub proof: Option<TonProof>,
    pub issued_at: DateTime<Utc>,
    pub scope: BTreeSet<RequestKind>,
}

/// File-backed connection set. Reads and writes go through [`Storage`] on
/// every operation so the on-disk state is never ahead of or behind a
/// partially-applied mutation.
pub struct ConnectionStore {
    storage: Storage,
}

impl ConnectionStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn list(&self) -> Result<Vec<TonConnectConnection>, WalletError> {
        Ok(self.storage.load_connections()?)
    }

    pub fn find(
        &self,
        origin: &str,
        wallet_id: WalletId,
    ) -> Result<Option<TonConnectConnection>, WalletError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|c| c.dapp_origin == origin && c.wallet_id == wallet_id))
    }

    /// Insert or replace the connection for (origin, wallet). Reconnection
    /// is idempotent: the second proof replaces the first.
    pub fn upsert(&self, connection: TonConnectConnection) -> Result<(), WalletError> {
        let mut connections = self.list()?;
        connections.retain(|c| {
            !(c.dapp_origin == connection.dapp_origin && c.wallet_id == connection.wallet_id)
        });
        log::info!(
            "Storing connection {} <-> wallet {}",
            connection.dapp_origin,
            connection.wallet_id
        );
        connections.push(connection);
        self.storage.save_connections(&connections)?;
        Ok(())
    }

    pub fn remove(&self, origin: &str, wallet_id: WalletId) -> Result<bool, WalletError> {
        let mut connections = self.list()?;
        let before = connections.len();
        connections.retain(|c| !(c.dapp_origin == origin && c.wallet_id == wallet_id));
        let removed = connections.len() != before;
        if removed {
            log::info!("Removed connection {} <-> wallet {}", origin, wallet_id);
            self.storage.save_connections(&connections)?;
        }
        Ok(removed)
    }

    /// Cascade for account removal: drop every connection bound to any of
    /// the removed wallets.
    pub fn remove_for_wallets(&self, wallet_ids: &[WalletId]) -> Result<usize, WalletError> {
        let mut connections = self.list()?;
        let before = connections.len();
        connections.retain(|c| !wallet_ids.contains(&c.wallet_id));
        let removed = before - connections.len();
        if removed > 0 {
            log::info!("Removed {} connections for {} wallets", removed, wallet_ids.len());
            self.storage.save_connections(&connections)?;
        }
        Ok(removed)
    }
}
