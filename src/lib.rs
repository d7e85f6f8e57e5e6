//! TON wallet core: accounts, keys, and transactions
//!
//! Platform-neutral engine for a TON wallet front-end. The UI layer owns
//! rendering and user prompts; this crate owns everything between the prompt
//! and the chain:
//!
//! - **Account registry**: ordered accounts, one active (account, wallet)
//!   selection, per-wallet preferences
//! - **Credential vault**: seed phrases encrypted at rest, unlocked only for
//!   the duration of a single signing operation
//! - **Transaction builder**: intent validation, fee estimation, and
//!   deterministic sender-strategy selection (regular, gasless, battery)
//! - **Signers**: seed phrase, Ledger, Keystone QR, and threshold multisig
//!   behind one trait
//! - **TonConnect bridge**: DApp handshakes, ownership proofs, and request
//!   handling with protocol error codes
//!
//! # Example
//!
//! ```ignore
//! use ton_wallet_core::{
//!     AssetId, CoreConfig, SendOutcome, Storage, TransferIntent, WalletManager,
//! };
//!
//! let manager = WalletManager::new(
//!     CoreConfig::from_env(),
//!     Storage::new(),
//!     gateway,
//!     approval,
//!     ledger,
//!     keystone,
//! )?;
//!
//! let (account_id, mnemonic) = manager.create_account("Main", &credential).await?;
//! // show `mnemonic` to the user for backup, then drop it
//!
//! let outcome = manager
//!     .send(TransferIntent {
//!         asset: AssetId::Ton,
//!         recipient: "UQ...".to_string(),
//!         amount: 5_000_000_000,
//!         comment: Some("lunch".to_string()),
//!         strategy_preference: None,
//!     })
//!     .await?;
//! ```

pub mod account;
pub mod approval;
pub mod builder;
pub mod config;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod queue;
pub mod signer;
pub mod storage;
pub mod tonconnect;

pub use account::{
    Account, AccountId, AccountKind, BatterySettings, CredentialId, Network, Registry,
    RegistryEvent, RegistryState, TonAddress, Wallet, WalletId, WalletPrefs, WalletPrefsPatch,
    WalletVersion,
};
pub use approval::{ApprovalGate, ConnectionDecision};
pub use builder::{
    AssetId, OutboundMessage, Payload, SenderStrategy, Signature, SignedMessage, TransferIntent,
    UnsignedMessage,
};
pub use config::CoreConfig;
pub use error::{DappErrorCode, StorageError, WalletError};
pub use gateway::{BlockchainGateway, JettonMetadata, ToncenterGateway};
pub use manager::{DappTransferMessage, SendOutcome, WalletManager};
pub use signer::{
    DeviceTransport, MultisigArena, MultisigStatus, PendingTxId, QrTransport, Signer,
    SignerFactory,
};
pub use storage::{CredentialStore, FileVault, Storage, UnlockCredential};
pub use tonconnect::{
    parse_connect_url, Bridge, ConnectSession, DappError, DappManifest, RequestKind, SessionState,
    TonConnectConnection, TonProof,
};
