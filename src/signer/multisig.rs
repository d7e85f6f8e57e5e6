//! Threshold signing
//!
//! Partial signatures accumulate in an arena of pending transactions keyed
//! by the message's signing hash. A transaction becomes broadcast-ready when
//! the threshold is crossed; [`MultisigArena::take_ready`] then assembles the
//! envelope and consumes the entry, exactly once.

use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::{Verifier, VerifyingKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use super::{MnemonicSigner, Signer};
use crate::builder::{Signature, SignedMessage, UnsignedMessage};
use crate::error::WalletError;
use crate::storage::UnlockCredential;

/// Pending-transaction identifier: the signing hash of the message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PendingTxId(pub [u8; 32]);

impl PendingTxId {
    pub fn of(message: &UnsignedMessage) -> Self {
        Self(message.signing_hash())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultisigStatus {
    /// More partial signatures needed
    Pending { have: usize, need: usize },
    /// Threshold reached; `take_ready` will yield the envelope
    Ready,
}

struct PendingEntry {
    message: UnsignedMessage,
    threshold: u8,
    signers: Vec<[u8; 32]>,
    collected: BTreeMap<[u8; 32], Signature>,
}

/// Shared across all multisig accounts of one manager instance.
pub struct MultisigArena {
    entries: Mutex<HashMap<PendingTxId, PendingEntry>>,
}

impl MultisigArena {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record a partial signature, opening the pending entry if this is the
    /// first one. The signature is verified against the message and the
    /// public key checked against the signer set; duplicates are idempotent.
    pub fn add_signature(
        &self,
        message: &UnsignedMessage,
        threshold: u8,
        signers: &[[u8; 32]],
        signer_pk: [u8; 32],
        signature: Signature,
    ) -> Result<MultisigStatus, WalletError> {
        if !signers.contains(&signer_pk) {
            return Err(WalletError::InvalidCredential);
        }
        // The chain rejects the message past `valid_until`; collecting more
        // signatures for it is pointless.
        if message.valid_until < Utc::now().timestamp() as u64 {
            return Err(WalletError::Expired);
        }

        let verifying_key =
            VerifyingKey::from_bytes(&signer_pk).map_err(|_| WalletError::InvalidCredential)?;
        let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key
            .verify(&message.signing_hash(), &dalek_sig)
            .map_err(|_| WalletError::InvalidCredential)?;

        let id = PendingTxId::of(message);
        let mut entries = self.entries.lock().expect("arena lock poisoned");
        Self::sweep(&mut entries);

        let entry = entries.entry(id).or_insert_with(|| PendingEntry {
            message: message.clone(),
            threshold,
            signers: signers.to_vec(),
            collected: BTreeMap::new(),
        });
        entry.collected.insert(signer_pk, signature);

        let have = entry.collected.len();
        let need = entry.threshold as usize;
        log::info!(
            "Multisig {}: {}/{} signatures collected",
            hex::encode(id.0),
            have,
            need
        );
        if have < need {
            Ok(MultisigStatus::Pending { have, need })
        } else {
            Ok(MultisigStatus::Ready)
        }
    }

    /// Collected/needed counts for a pending transaction, if still open.
    pub fn pending(&self, id: PendingTxId) -> Option<(usize, usize)> {
        let mut entries = self.entries.lock().expect("arena lock poisoned");
        Self::sweep(&mut entries);
        entries
            .get(&id)
            .map(|e| (e.collected.len(), e.threshold as usize))
    }

    /// Drop an abandoned pending transaction and its collected signatures.
    /// Returns whether an entry was open under this id.
    pub fn discard(&self, id: PendingTxId) -> bool {
        let mut entries = self.entries.lock().expect("arena lock poisoned");
        let removed = entries.remove(&id).is_some();
        if removed {
            log::info!("Multisig {} discarded", hex::encode(id.0));
        }
        removed
    }

    /// Entries whose message the chain would no longer accept only hold
    /// signatures for a transaction that can never broadcast.
    fn sweep(entries: &mut HashMap<PendingTxId, PendingEntry>) {
        let now = Utc::now().timestamp() as u64;
        entries.retain(|id, entry| {
            let live = entry.message.valid_until >= now;
            if !live {
                log::info!("Multisig {} expired, dropping entry", hex::encode(id.0));
            }
            live
        });
    }

    /// Consume a threshold-complete entry and assemble the broadcast
    /// envelope. Returns `None` while signatures are still missing; after a
    /// successful take the id is unknown.
    pub fn take_ready(&self, id: PendingTxId) -> Option<SignedMessage> {
        let mut entries = self.entries.lock().expect("arena lock poisoned");
        Self::sweep(&mut entries);
        let ready = entries
            .get(&id)
            .map(|e| e.collected.len() >= e.threshold as usize)
            .unwrap_or(false);
        if !ready {
            return None;
        }

        let entry = entries.remove(&id).expect("entry present");
        let mut signatures: Vec<Signature> = entry.collected.into_values().collect();
        let first = signatures.remove(0);
        // signers list kept for audit symmetry; not part of the envelope
        let _ = entry.signers;
        log::info!("Multisig {} reached threshold, broadcast-ready", hex::encode(id.0));

        Some(SignedMessage {
            message: entry.message,
            signature: first,
            cosignatures: signatures,
        })
    }
}

impl Default for MultisigArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Produces this device's partial signature and records it in the arena.
pub struct MultisigSigner {
    inner: MnemonicSigner,
    arena: Arc<MultisigArena>,
    threshold: u8,
    signers: Vec<[u8; 32]>,
}

impl MultisigSigner {
    pub fn new(
        inner: MnemonicSigner,
        arena: Arc<MultisigArena>,
        threshold: u8,
        signers: Vec<[u8; 32]>,
    ) -> Self {
        Self {
            inner,
            arena,
            threshold,
            signers,
        }
    }
}

#[async_trait]
impl Signer for MultisigSigner {
    async fn sign(
        &self,
        message: &UnsignedMessage,
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        let signer_pk = self.inner.public_key(unlock).await?;
        let signature = self.inner.sign(message, unlock).await?;

        self.arena
            .add_signature(message, self.threshold, &self.signers, signer_pk, signature)?;
        Ok(signature)
    }

    async fn sign_proof(
        &self,
        payload: &[u8],
        unlock: &UnlockCredential,
    ) -> Result<Signature, WalletError> {
        // Proofs are single-signer: the local participant attests.
        self.inner.sign_proof(payload, unlock).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{Network, TonAddress, WalletId, DEFAULT_WALLET_VERSION};
    use crate::builder::{OutboundMessage, SenderStrategy};
    use ed25519_dalek::{Signer as _, SigningKey};

    fn message(valid_until: u64) -> UnsignedMessage {
        UnsignedMessage {
            wallet_id: WalletId::generate(),
            from: TonAddress::new(0, [1; 32]),
            network: Network::Mainnet,
            version: DEFAULT_WALLET_VERSION,
            seqno: 3,
            valid_until,
            strategy: SenderStrategy::Regular,
            fee_estimate: 5_000_000,
            messages: vec![OutboundMessage {
                destination: TonAddress::new(0, [2; 32]),
                amount: 1_000_000_000,
                payload: None,
            }],
        }
    }

    fn live_deadline() -> u64 {
        Utc::now().timestamp() as u64 + 600
    }

    fn partial(key: &SigningKey, message: &UnsignedMessage) -> ([u8; 32], Signature) {
        (
            key.verifying_key().to_bytes(),
            Signature(key.sign(&message.signing_hash()).to_bytes()),
        )
    }

    #[test]
    fn test_discard_drops_pending_entry() {
        let alice = SigningKey::from_bytes(&[11; 32]);
        let bob = SigningKey::from_bytes(&[12; 32]);
        let signers = [alice.verifying_key().to_bytes(), bob.verifying_key().to_bytes()];

        let arena = MultisigArena::new();
        let msg = message(live_deadline());
        let (pk, sig) = partial(&alice, &msg);
        let status = arena.add_signature(&msg, 2, &signers, pk, sig).unwrap();
        assert_eq!(status, MultisigStatus::Pending { have: 1, need: 2 });

        let id = PendingTxId::of(&msg);
        assert!(arena.discard(id));
        assert_eq!(arena.pending(id), None);
        // Already gone; a second discard is a no-op.
        assert!(!arena.discard(id));
    }

    #[test]
    fn test_expired_message_collects_nothing() {
        let alice = SigningKey::from_bytes(&[11; 32]);
        let signers = [alice.verifying_key().to_bytes()];

        let arena = MultisigArena::new();
        let msg = message(Utc::now().timestamp() as u64 - 60);
        let (pk, sig) = partial(&alice, &msg);
        assert!(matches!(
            arena.add_signature(&msg, 1, &signers, pk, sig),
            Err(WalletError::Expired)
        ));
        assert_eq!(arena.pending(PendingTxId::of(&msg)), None);
        assert!(arena.take_ready(PendingTxId::of(&msg)).is_none());
    }
}
