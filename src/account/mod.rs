//! Accounts, wallets, addresses and the registry

mod account;
mod address;
mod prefs;
mod registry;
mod wallet;

pub use account::{Account, AccountId, AccountKind, CredentialId, SignerKind, DEFAULT_WALLET_VERSION};
pub use address::TonAddress;
pub use prefs::{BatterySettings, WalletPrefs, WalletPrefsPatch};
pub use registry::{Registry, RegistryEvent, RegistryState};
pub use wallet::{Network, Wallet, WalletId, WalletVersion};
