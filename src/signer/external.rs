//! Hardware and QR signers
//!
//! Both delegate the actual signature to an external round-trip and may
//! suspend indefinitely while the user acts on the device. The transports
//! surface `UserCancelled` when the user backs out and `DeviceCommunication`
//! on transport failure; neither produces a partial signature.

use async_trait::async_trait;
use std::sync::Arc;

use super::Signer;
use crate::builder::{Signature, UnsignedMessage};
use crate::error::WalletError;
use crate::storage::UnlockCredential;

/// Ledger-style USB/BLE device boundary. Implemented by the platform layer.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn sign_transaction(
        &self,
        device_id: &str,
        account_index: u32,
        signing_hash: [u8; 32],
    ) -> Result<Signature, WalletError>;

    async fn sign_proof(
        &self,
        device_id: &str,
        account_index: u32,
        payload: &[u8],
    ) -> Result<Signature, WalletError>;
}

/// Air-gapped QR round-trip: display a request, scan the signed response.
#[async_trait]
pub trait QrTransport: Send + Sync {
    async fn exchange(&self, request: &[u8]) -> Result<Signature, WalletError>;
}

pub struct LedgerSigner {
    transport: Arc<dyn DeviceTransport>,
    device_id: String,
    account_index: u32,
}

impl LedgerSigner {
    pub fn new(transport: Arc<dyn DeviceTransport>, device_id: String, account_index: u32) -> Self {
        Self {
            transport,
            device_id,
            account_index,
        }
    }
}

#[async_trait]
impl Signer for LedgerSigner {
    async fn sign(
        &self,
        message: &UnsignedMessage,
        _unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        log::info!(
            "Requesting device signature from {} (seqno {})",
            self.device_id,
            message.seqno
        );
        self.transport
            .sign_transaction(&self.device_id, self.account_index, message.signing_hash())
            .await
    }

    async fn sign_proof(
        &self,
        payload: &[u8],
        _unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        self.transport
            .sign_proof(&self.device_id, self.account_index, payload)
            .await
    }
}

pub struct KeystoneSigner {
    transport: Arc<dyn QrTransport>,
    device_label: String,
}

impl KeystoneSigner {
    pub fn new(transport: Arc<dyn QrTransport>, device_label: String) -> Self {
        Self {
            transport,
            device_label,
        }
    }
}

#[async_trait]
impl Signer for KeystoneSigner {
    async fn sign(
        &self,
        message: &UnsignedMessage,
        _unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        log::info!("Awaiting QR round-trip with {}", self.device_label);
        self.transport.exchange(&message.signing_hash()).await
    }

    async fn sign_proof(
        &self,
        payload: &[u8],
        _unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        self.transport.exchange(payload).await
    }
}
