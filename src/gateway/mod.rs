//! Blockchain gateway boundary
//!
//! The minimal read/broadcast surface the signing flow needs. Everything else
//! (balances for display, NFT listings, history) belongs to the out-of-scope
//! data layer.

mod toncenter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::account::TonAddress;
use crate::builder::{SignedMessage, UnsignedMessage};
use crate::error::WalletError;

pub use toncenter::ToncenterGateway;

/// Fungible-token contract metadata the builder needs for routing and
/// gasless eligibility.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JettonMetadata {
    pub symbol: String,
    pub decimals: u32,
    /// Whether a relayer accepts this jetton as fee payment
    pub supports_gasless: bool,
    /// Relayer fee in token minor units when gasless is used
    pub gasless_fee: u128,
}

#[async_trait]
pub trait BlockchainGateway: Send + Sync {
    /// Current sequence number of the wallet contract.
    async fn sequence_number(&self, address: &TonAddress) -> Result<u32, WalletError>;

    /// Native balance in nanotons.
    async fn balance(&self, address: &TonAddress) -> Result<u128, WalletError>;

    /// Jetton balance of `owner` for the given master contract, in token
    /// minor units.
    async fn jetton_balance(
        &self,
        owner: &TonAddress,
        master: &TonAddress,
    ) -> Result<u128, WalletError>;

    /// Metadata of a jetton master contract. Unknown contracts fail
    /// `UnsupportedAsset`.
    async fn jetton_metadata(&self, master: &TonAddress) -> Result<JettonMetadata, WalletError>;

    /// Network fee estimate for a drafted message, in nanotons.
    async fn estimate_fee(&self, message: &UnsignedMessage) -> Result<u128, WalletError>;

    /// Remaining battery charges for a wallet.
    async fn battery_credit(&self, address: &TonAddress) -> Result<u64, WalletError>;

    /// Broadcast a signed message; returns the transaction hash.
    ///
    /// Not assumed idempotent: callers must never re-sign-and-rebroadcast on
    /// a `Network` failure.
    async fn broadcast(&self, message: &SignedMessage) -> Result<String, WalletError>;
}
