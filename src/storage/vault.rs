//! Encrypted credential vault
//!
//! Stores seed phrases encrypted at rest:
//! - Argon2id for credential-based key derivation
//! - ChaCha20-Poly1305 for authenticated encryption
//!
//! Decrypted key material exists only inside [`UnlockedSeed`], which zeroizes
//! on drop. The vault never caches, logs, or returns plaintext by any other
//! path.

use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use ed25519_dalek::SigningKey;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::account::CredentialId;
use crate::error::{StorageError, WalletError};

/// Current vault file format version
const VAULT_VERSION: u32 = 1;

/// What the user (or the platform keystore, for biometrics) presents to
/// decrypt a stored seed.
#[derive(Clone)]
pub enum UnlockCredential {
    Password(String),
    /// Opaque token released by the platform after a successful biometric
    /// prompt; prompting itself is outside this core.
    Biometric(Vec<u8>),
}

impl UnlockCredential {
    fn key_material(&self) -> &[u8] {
        match self {
            UnlockCredential::Password(p) => p.as_bytes(),
            UnlockCredential::Biometric(t) => t.as_slice(),
        }
    }
}

/// Encrypted seed blob as persisted on disk. Opaque to every component
/// except the vault.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedSecret {
    version: u32,
    /// Argon2 salt, hex encoded
    salt: String,
    /// ChaCha20-Poly1305 nonce (12 bytes), hex encoded
    nonce: String,
    /// Encrypted mnemonic phrase, hex encoded
    ciphertext: String,
}

/// Decrypted seed material, scoped to a single signing operation.
///
/// Both the raw seed and any signing key derived from it are wiped when this
/// value leaves scope, on every exit path.
#[derive(ZeroizeOnDrop)]
pub struct UnlockedSeed {
    seed: [u8; 64],
}

impl UnlockedSeed {
    pub(crate) fn from_mnemonic(mnemonic: &bip39::Mnemonic) -> Self {
        Self {
            seed: mnemonic.to_seed(""),
        }
    }

    /// Derive the ed25519 signing key for a wallet index.
    ///
    /// Index 0 is the account's primary wallet; multi-wallet accounts step
    /// the index for each derived wallet.
    pub fn signing_key(&self, wallet_index: u32) -> SigningKey {
        use sha2::{Digest, Sha512};

        let mut hasher = Sha512::new();
        hasher.update(self.seed);
        hasher.update(wallet_index.to_be_bytes());
        let digest = hasher.finalize();

        let mut key_bytes = [0u8; 32];
        key_bytes.copy_from_slice(&digest[..32]);
        let key = SigningKey::from_bytes(&key_bytes);
        key_bytes.zeroize();
        key
    }
}

fn derive_key(credential: &UnlockCredential, salt: &[u8]) -> Result<[u8; 32], WalletError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(credential.key_material(), salt, &mut key)
        .map_err(|e| WalletError::Internal(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

impl EncryptedSecret {
    pub fn encrypt(
        mnemonic: &bip39::Mnemonic,
        credential: &UnlockCredential,
    ) -> Result<Self, WalletError> {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let mut key = derive_key(credential, &salt)?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| WalletError::Internal("failed to create cipher".to_string()))?;
        key.zeroize();

        let mut phrase = mnemonic.to_string();
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), phrase.as_bytes())
            .map_err(|_| WalletError::Internal("encryption failed".to_string()))?;
        phrase.zeroize();

        Ok(Self {
            version: VAULT_VERSION,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        })
    }

    /// Decrypt into scoped seed material. A wrong password or tampered blob
    /// fails `InvalidCredential`.
    pub fn unlock(&self, credential: &UnlockCredential) -> Result<UnlockedSeed, WalletError> {
        if self.version != VAULT_VERSION {
            return Err(WalletError::Internal(format!(
                "unsupported vault version {}",
                self.version
            )));
        }

        let salt =
            hex::decode(&self.salt).map_err(|_| WalletError::Internal("bad salt".to_string()))?;
        let nonce_bytes = hex::decode(&self.nonce)
            .map_err(|_| WalletError::Internal("bad nonce".to_string()))?;
        let ciphertext = hex::decode(&self.ciphertext)
            .map_err(|_| WalletError::Internal("bad ciphertext".to_string()))?;
        if nonce_bytes.len() != 12 {
            return Err(WalletError::Internal("bad nonce length".to_string()));
        }

        let mut key = derive_key(credential, &salt)?;
        let cipher = ChaCha20Poly1305::new_from_slice(&key)
            .map_err(|_| WalletError::Internal("failed to create cipher".to_string()))?;
        key.zeroize();

        // AEAD failure means wrong credential or tampering; either way the
        // caller presented something that does not open this blob.
        let mut plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| WalletError::InvalidCredential)?;

        let result = std::str::from_utf8(&plaintext)
            .map_err(|_| WalletError::InvalidCredential)
            .and_then(|phrase| {
                bip39::Mnemonic::parse(phrase).map_err(|_| WalletError::InvalidCredential)
            })
            .map(|mnemonic| UnlockedSeed::from_mnemonic(&mnemonic));
        plaintext.zeroize();
        result
    }
}

/// Boundary consumed by the mnemonic signer.
pub trait CredentialStore: Send + Sync {
    fn encrypted_secret(&self, id: CredentialId) -> Result<EncryptedSecret, WalletError>;

    fn unlock(
        &self,
        blob: &EncryptedSecret,
        credential: &UnlockCredential,
    ) -> Result<UnlockedSeed, WalletError>;
}

/// File-backed vault: one JSON blob per credential id.
pub struct FileVault {
    dir: PathBuf,
}

impl FileVault {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn blob_path(&self, id: CredentialId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Encrypt and persist a mnemonic, returning the credential id accounts
    /// reference it by.
    pub fn store_mnemonic(
        &self,
        mnemonic: &bip39::Mnemonic,
        credential: &UnlockCredential,
    ) -> Result<CredentialId, WalletError> {
        let id = CredentialId::generate();
        let blob = EncryptedSecret::encrypt(mnemonic, credential)?;

        fs::create_dir_all(&self.dir).map_err(StorageError::Io)?;
        let json = serde_json::to_string_pretty(&blob).map_err(StorageError::Json)?;
        fs::write(self.blob_path(id), json).map_err(StorageError::Io)?;

        log::info!("Stored encrypted credential {}", id);
        Ok(id)
    }

    /// Remove a credential blob; part of the account-removal cascade.
    pub fn delete(&self, id: CredentialId) -> Result<(), WalletError> {
        let path = self.blob_path(id);
        if path.exists() {
            fs::remove_file(path).map_err(StorageError::Io)?;
            log::warn!("Deleted credential {}", id);
        }
        Ok(())
    }
}

impl CredentialStore for FileVault {
    fn encrypted_secret(&self, id: CredentialId) -> Result<EncryptedSecret, WalletError> {
        let path = self.blob_path(id);
        if !path.exists() {
            return Err(WalletError::NotFound(format!("credential {}", id)));
        }
        let contents = fs::read_to_string(path).map_err(StorageError::Io)?;
        Ok(serde_json::from_str(&contents).map_err(StorageError::Json)?)
    }

    fn unlock(
        &self,
        blob: &EncryptedSecret,
        credential: &UnlockCredential,
    ) -> Result<UnlockedSeed, WalletError> {
        blob.unlock(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mnemonic() -> bip39::Mnemonic {
        bip39::Mnemonic::parse(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap()
    }

    #[test]
    fn test_encrypt_unlock_round_trip() {
        let credential = UnlockCredential::Password("hunter2".to_string());
        let blob = EncryptedSecret::encrypt(&test_mnemonic(), &credential).unwrap();
        let seed = blob.unlock(&credential).unwrap();
        // Same mnemonic, same derived key
        let key_a = seed.signing_key(0);
        let key_b = UnlockedSeed::from_mnemonic(&test_mnemonic()).signing_key(0);
        assert_eq!(key_a.to_bytes(), key_b.to_bytes());
    }

    #[test]
    fn test_wrong_password_fails() {
        let blob = EncryptedSecret::encrypt(
            &test_mnemonic(),
            &UnlockCredential::Password("correct".to_string()),
        )
        .unwrap();
        let result = blob.unlock(&UnlockCredential::Password("wrong".to_string()));
        assert!(matches!(result, Err(WalletError::InvalidCredential)));
    }

    #[test]
    fn test_wallet_indices_derive_distinct_keys() {
        let seed = UnlockedSeed::from_mnemonic(&test_mnemonic());
        assert_ne!(seed.signing_key(0).to_bytes(), seed.signing_key(1).to_bytes());
    }

    #[test]
    fn test_file_vault_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileVault::new(dir.path().to_path_buf());
        let credential = UnlockCredential::Password("pw".to_string());

        let id = vault.store_mnemonic(&test_mnemonic(), &credential).unwrap();
        let blob = vault.encrypted_secret(id).unwrap();
        assert!(vault.unlock(&blob, &credential).is_ok());

        vault.delete(id).unwrap();
        assert!(matches!(
            vault.encrypted_secret(id),
            Err(WalletError::NotFound(_))
        ));
    }
}
