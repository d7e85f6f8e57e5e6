//! Account variants and their capability queries
//!
//! An account is polymorphic over how it can sign: seed phrases, hardware
//! devices, QR signers, multisig participation, or nothing at all
//! (watch-only). Behavior that branches on the variant goes through
//! exhaustive matches here, so adding a variant is a compile-time-checked
//! change everywhere it matters.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::account::{Network, Wallet, WalletId, WalletVersion};
use crate::error::WalletError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an encrypted secret inside the credential vault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(pub Uuid);

impl CredentialId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccountKind {
    /// Single wallet derived from an encrypted seed phrase
    Mnemonic { credential_id: CredentialId },
    /// One seed, many derived wallets
    MultiMnemonic { credential_id: CredentialId },
    /// Mnemonic account pinned to testnet
    Testnet { credential_id: CredentialId },
    /// Hardware device over a transport round-trip
    Ledger { device_id: String, account_index: u32 },
    /// Air-gapped QR signer
    Keystone { device_label: String },
    /// No signing capability at all
    WatchOnly,
    /// Threshold signer; `signers` are the participant public keys and
    /// `local_credential_id` backs this device's own partial signature
    Multisig {
        threshold: u8,
        signers: Vec<[u8; 32]>,
        local_credential_id: CredentialId,
    },
}

/// Which signer implementation serves an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerKind {
    Mnemonic,
    Ledger,
    Keystone,
    Multisig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub label: String,
    pub kind: AccountKind,
    wallets: Vec<Wallet>,
    active_wallet: usize,
}

impl Account {
    /// Build an account. Every account has at least one wallet.
    pub fn new(label: impl Into<String>, kind: AccountKind, wallets: Vec<Wallet>) -> Result<Self, WalletError> {
        if wallets.is_empty() {
            return Err(WalletError::Internal(
                "account must own at least one wallet".to_string(),
            ));
        }
        Ok(Self {
            id: AccountId::generate(),
            label: label.into(),
            kind,
            wallets,
            active_wallet: 0,
        })
    }

    pub fn wallets(&self) -> &[Wallet] {
        &self.wallets
    }

    pub fn wallet(&self, index: usize) -> Option<&Wallet> {
        self.wallets.get(index)
    }

    pub fn wallet_by_id(&self, id: WalletId) -> Option<&Wallet> {
        self.wallets.iter().find(|w| w.id == id)
    }

    pub fn active_wallet_index(&self) -> usize {
        self.active_wallet
    }

    pub fn active_wallet(&self) -> &Wallet {
        // Index validity is an invariant maintained by the registry
        &self.wallets[self.active_wallet]
    }

    pub(crate) fn set_active_wallet(&mut self, index: usize) -> Result<(), WalletError> {
        if index >= self.wallets.len() {
            return Err(WalletError::NotFound(format!(
                "wallet index {} out of range for account {}",
                index, self.id
            )));
        }
        self.active_wallet = index;
        Ok(())
    }

    /// Whether this account can produce signatures at all.
    pub fn can_sign(&self) -> bool {
        match &self.kind {
            AccountKind::Mnemonic { .. }
            | AccountKind::MultiMnemonic { .. }
            | AccountKind::Testnet { .. }
            | AccountKind::Ledger { .. }
            | AccountKind::Keystone { .. }
            | AccountKind::Multisig { .. } => true,
            AccountKind::WatchOnly => false,
        }
    }

    /// Whether more wallets may be derived under this account.
    pub fn can_derive_more(&self) -> bool {
        match &self.kind {
            AccountKind::MultiMnemonic { .. } => true,
            AccountKind::Mnemonic { .. }
            | AccountKind::Testnet { .. }
            | AccountKind::Ledger { .. }
            | AccountKind::Keystone { .. }
            | AccountKind::WatchOnly
            | AccountKind::Multisig { .. } => false,
        }
    }

    /// Resolve the signer implementation for this account, or fail before
    /// any network or vault interaction for watch-only accounts.
    pub fn signer_kind(&self) -> Result<SignerKind, WalletError> {
        match &self.kind {
            AccountKind::Mnemonic { .. }
            | AccountKind::MultiMnemonic { .. }
            | AccountKind::Testnet { .. } => Ok(SignerKind::Mnemonic),
            AccountKind::Ledger { .. } => Ok(SignerKind::Ledger),
            AccountKind::Keystone { .. } => Ok(SignerKind::Keystone),
            AccountKind::Multisig { .. } => Ok(SignerKind::Multisig),
            AccountKind::WatchOnly => Err(WalletError::SignerUnavailable(format!(
                "account {} is watch-only",
                self.id
            ))),
        }
    }

    /// The vault credential backing this account, if any.
    pub fn credential_id(&self) -> Option<CredentialId> {
        match &self.kind {
            AccountKind::Mnemonic { credential_id }
            | AccountKind::MultiMnemonic { credential_id }
            | AccountKind::Testnet { credential_id } => Some(*credential_id),
            AccountKind::Multisig {
                local_credential_id,
                ..
            } => Some(*local_credential_id),
            AccountKind::Ledger { .. } | AccountKind::Keystone { .. } | AccountKind::WatchOnly => {
                None
            }
        }
    }

    /// Append a derived wallet. Only multi-wallet accounts accept this.
    pub fn push_wallet(&mut self, wallet: Wallet) -> Result<(), WalletError> {
        if !self.can_derive_more() {
            return Err(WalletError::Internal(format!(
                "account {} cannot derive additional wallets",
                self.id
            )));
        }
        self.wallets.push(wallet);
        Ok(())
    }

    /// Network every wallet of this account lives on.
    pub fn network(&self) -> Network {
        // Wallets of one account never mix networks; the first is canonical.
        self.wallets[0].network
    }
}

/// Helper for tests and account creation: the version new wallets default to.
pub const DEFAULT_WALLET_VERSION: WalletVersion = WalletVersion::V4R2;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::TonAddress;

    fn wallet(network: Network) -> Wallet {
        Wallet::new(
            TonAddress::new(0, rand::random()),
            rand::random(),
            DEFAULT_WALLET_VERSION,
            network,
        )
    }

    #[test]
    fn test_empty_account_rejected() {
        let result = Account::new("empty", AccountKind::WatchOnly, vec![]);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_only_has_no_signer() {
        let account =
            Account::new("cold", AccountKind::WatchOnly, vec![wallet(Network::Mainnet)]).unwrap();
        assert!(!account.can_sign());
        assert!(matches!(
            account.signer_kind(),
            Err(WalletError::SignerUnavailable(_))
        ));
    }

    #[test]
    fn test_only_multi_mnemonic_derives() {
        let mut single = Account::new(
            "main",
            AccountKind::Mnemonic {
                credential_id: CredentialId::generate(),
            },
            vec![wallet(Network::Mainnet)],
        )
        .unwrap();
        assert!(single.push_wallet(wallet(Network::Mainnet)).is_err());

        let mut multi = Account::new(
            "multi",
            AccountKind::MultiMnemonic {
                credential_id: CredentialId::generate(),
            },
            vec![wallet(Network::Mainnet)],
        )
        .unwrap();
        assert!(multi.push_wallet(wallet(Network::Mainnet)).is_ok());
        assert_eq!(multi.wallets().len(), 2);
    }

    #[test]
    fn test_set_active_wallet_bounds() {
        let mut account = Account::new(
            "main",
            AccountKind::Mnemonic {
                credential_id: CredentialId::generate(),
            },
            vec![wallet(Network::Mainnet)],
        )
        .unwrap();
        assert!(account.set_active_wallet(0).is_ok());
        assert!(matches!(
            account.set_active_wallet(1),
            Err(WalletError::NotFound(_))
        ));
    }
}
