//! Signer capability abstraction
//!
//! Each account variant resolves to a signer implementation through an
//! exhaustive match in [`SignerFactory::signer_for`]; watch-only accounts
//! fail `SignerUnavailable` before any vault, device, or network contact.

mod external;
mod mnemonic;
mod multisig;

use async_trait::async_trait;
use std::sync::Arc;

use crate::account::{Account, AccountKind, Wallet};
use crate::builder::{Signature, UnsignedMessage};
use crate::error::WalletError;
use crate::storage::{CredentialStore, UnlockCredential};

pub use external::{DeviceTransport, KeystoneSigner, LedgerSigner, QrTransport};
pub use mnemonic::MnemonicSigner;
pub use multisig::{MultisigArena, MultisigSigner, MultisigStatus, PendingTxId};

#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign a built transfer message.
    ///
    /// For multisig accounts this produces and records one partial
    /// signature; broadcast readiness is tracked by the pending arena.
    async fn sign(
        &self,
        message: &UnsignedMessage,
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError>;

    /// Sign an arbitrary challenge payload (TonConnect proof).
    async fn sign_proof(
        &self,
        payload: &[u8],
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError>;
}

/// Wires account variants to signer implementations and their collaborators.
pub struct SignerFactory {
    vault: Arc<dyn CredentialStore>,
    ledger: Arc<dyn DeviceTransport>,
    keystone: Arc<dyn QrTransport>,
    arena: Arc<MultisigArena>,
}

impl SignerFactory {
    pub fn new(
        vault: Arc<dyn CredentialStore>,
        ledger: Arc<dyn DeviceTransport>,
        keystone: Arc<dyn QrTransport>,
        arena: Arc<MultisigArena>,
    ) -> Self {
        Self {
            vault,
            ledger,
            keystone,
            arena,
        }
    }

    pub fn arena(&self) -> &Arc<MultisigArena> {
        &self.arena
    }

    /// Resolve the signer for one wallet of an account.
    pub fn signer_for(
        &self,
        account: &Account,
        wallet: &Wallet,
    ) -> Result<Box<dyn Signer>, WalletError> {
        let wallet_index = account
            .wallets()
            .iter()
            .position(|w| w.id == wallet.id)
            .ok_or_else(|| {
                WalletError::NotFound(format!("wallet {} in account {}", wallet.id, account.id))
            })? as u32;

        match &account.kind {
            AccountKind::Mnemonic { credential_id }
            | AccountKind::MultiMnemonic { credential_id }
            | AccountKind::Testnet { credential_id } => Ok(Box::new(MnemonicSigner::new(
                self.vault.clone(),
                *credential_id,
                wallet_index,
                wallet.public_key,
            ))),
            AccountKind::Ledger {
                device_id,
                account_index,
            } => Ok(Box::new(LedgerSigner::new(
                self.ledger.clone(),
                device_id.clone(),
                *account_index,
            ))),
            AccountKind::Keystone { device_label } => Ok(Box::new(KeystoneSigner::new(
                self.keystone.clone(),
                device_label.clone(),
            ))),
            AccountKind::Multisig {
                threshold,
                signers,
                local_credential_id,
            } => {
                let inner = MnemonicSigner::new_participant(
                    self.vault.clone(),
                    *local_credential_id,
                    wallet_index,
                );
                Ok(Box::new(MultisigSigner::new(
                    inner,
                    self.arena.clone(),
                    *threshold,
                    signers.clone(),
                )))
            }
            AccountKind::WatchOnly => Err(WalletError::SignerUnavailable(format!(
                "account {} is watch-only",
                account.id
            ))),
        }
    }
}
