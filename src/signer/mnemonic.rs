//! Seed-phrase signer
//!
//! The single place where decrypted key material exists outside the vault:
//! the seed is unlocked inside one blocking call, used to derive the signing
//! key, and wiped on every exit path (`UnlockedSeed` and the dalek key both
//! zeroize on drop).

use async_trait::async_trait;
use ed25519_dalek::Signer as DalekSigner;
use std::sync::Arc;

use super::Signer;
use crate::account::CredentialId;
use crate::builder::{Signature, UnsignedMessage};
use crate::error::WalletError;
use crate::storage::{CredentialStore, UnlockCredential};

pub struct MnemonicSigner {
    store: Arc<dyn CredentialStore>,
    credential_id: CredentialId,
    wallet_index: u32,
    /// When set, the derived key must match this wallet public key; a
    /// mismatch means the vault holds a different seed than the wallet was
    /// created from.
    expected_public_key: Option<[u8; 32]>,
}

impl MnemonicSigner {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        credential_id: CredentialId,
        wallet_index: u32,
        expected_public_key: [u8; 32],
    ) -> Self {
        Self {
            store,
            credential_id,
            wallet_index,
            expected_public_key: Some(expected_public_key),
        }
    }

    /// Signer for a multisig participant key; the wallet public key belongs
    /// to the multisig contract, so no per-wallet key check applies.
    pub fn new_participant(
        store: Arc<dyn CredentialStore>,
        credential_id: CredentialId,
        wallet_index: u32,
    ) -> Self {
        Self {
            store,
            credential_id,
            wallet_index,
            expected_public_key: None,
        }
    }

    /// The participant public key this signer would sign with.
    pub async fn public_key(&self, unlock: &UnlockCredential) -> Result<[u8; 32], WalletError> {
        let store = self.store.clone();
        let credential_id = self.credential_id;
        let wallet_index = self.wallet_index;
        let unlock = unlock.clone();

        tokio::task::spawn_blocking(move || {
            let blob = store.encrypted_secret(credential_id)?;
            let seed = store.unlock(&blob, &unlock)?;
            Ok(seed.signing_key(wallet_index).verifying_key().to_bytes())
        })
        .await
        .map_err(|e| WalletError::Internal(format!("unlock task panicked: {}", e)))?
    }

    /// Scoped unlock + sign. Argon2 and the signature itself are CPU work,
    /// so the whole scope runs on the blocking pool.
    async fn sign_bytes(
        &self,
        payload: Vec<u8>,
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        let store = self.store.clone();
        let credential_id = self.credential_id;
        let wallet_index = self.wallet_index;
        let expected = self.expected_public_key;
        let unlock = unlock.clone();

        tokio::task::spawn_blocking(move || {
            let blob = store.encrypted_secret(credential_id)?;
            let seed = store.unlock(&blob, &unlock)?;
            let key = seed.signing_key(wallet_index);

            if let Some(expected) = expected {
                if key.verifying_key().to_bytes() != expected {
                    log::error!(
                        "Credential {} does not derive the expected wallet key",
                        credential_id
                    );
                    return Err(WalletError::InvalidCredential);
                }
            }

            Ok(Signature(key.sign(&payload).to_bytes()))
            // `seed` and `key` drop here and zeroize, on success and error
            // paths alike.
        })
        .await
        .map_err(|e| WalletError::Internal(format!("signing task panicked: {}", e)))?
    }
}

#[async_trait]
impl Signer for MnemonicSigner {
    async fn sign(
        &self,
        message: &UnsignedMessage,
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        self.sign_bytes(message.signing_hash().to_vec(), unlock).await
    }

    async fn sign_proof(
        &self,
        payload: &[u8],
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        self.sign_bytes(payload.to_vec(), unlock).await
    }
}
