//! Persistence: registry/connection files and the encrypted credential vault

mod file_system;
mod vault;

pub use file_system::Storage;
pub use vault::{CredentialStore, EncryptedSecret, FileVault, UnlockCredential, UnlockedSeed};
