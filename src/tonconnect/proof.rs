//! Ownership proofs (`ton_proof`)
//!
//! The proof binds {DApp origin, wallet address, challenge payload,
//! timestamp} and is verifiable by the DApp against the wallet's public key.
//! The byte layout is fixed by the TonConnect protocol:
//!
//! ```text
//! message   = "ton-proof-item-v2/" ++ workchain(i32 BE) ++ address_hash
//!             ++ domain_len(u32 LE) ++ domain ++ timestamp(u64 LE) ++ payload
//! signature = Ed25519(sha256(0xffff ++ "ton-connect" ++ sha256(message)))
//! ```

use chrono::Utc;
use ed25519_dalek::{Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::account::TonAddress;
use crate::builder::Signature;
use crate::error::WalletError;

const PROOF_PREFIX: &[u8] = b"ton-proof-item-v2/";
const CHALLENGE_PREFIX: &[u8] = b"ton-connect";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TonProof {
    pub timestamp: u64,
    pub domain: String,
    pub payload: String,
    pub signature: Signature,
}

/// The exact bytes a signer commits to for a proof.
pub fn bytes_to_sign(
    address: &TonAddress,
    domain: &str,
    timestamp: u64,
    payload: &str,
) -> Vec<u8> {
    let mut message = Vec::new();
    message.extend_from_slice(PROOF_PREFIX);
    message.extend_from_slice(&(address.workchain as i32).to_be_bytes());
    message.extend_from_slice(&address.hash);
    message.extend_from_slice(&(domain.len() as u32).to_le_bytes());
    message.extend_from_slice(domain.as_bytes());
    message.extend_from_slice(&timestamp.to_le_bytes());
    message.extend_from_slice(payload.as_bytes());

    let mut challenge = Vec::new();
    challenge.extend_from_slice(&[0xff, 0xff]);
    challenge.extend_from_slice(CHALLENGE_PREFIX);
    challenge.extend_from_slice(&Sha256::digest(&message));

    Sha256::digest(&challenge).to_vec()
}

impl TonProof {
    pub fn assemble(domain: String, payload: String, timestamp: u64, signature: Signature) -> Self {
        Self {
            timestamp,
            domain,
            payload,
            signature,
        }
    }

    /// Verify structure, freshness and signature. Stale proofs are rejected
    /// to prevent replay.
    pub fn verify(
        &self,
        address: &TonAddress,
        public_key: &[u8; 32],
        ttl_secs: u64,
    ) -> Result<(), WalletError> {
        // The timestamp comes off the wire; saturate instead of trusting it
        // not to overflow.
        let now = Utc::now().timestamp() as u64;
        if self.timestamp.saturating_add(ttl_secs) < now {
            return Err(WalletError::Expired);
        }

        let digest = bytes_to_sign(address, &self.domain, self.timestamp, &self.payload);
        let key = VerifyingKey::from_bytes(public_key)
            .map_err(|_| WalletError::Internal("bad wallet public key".into()))?;
        let signature = ed25519_dalek::Signature::from_bytes(&self.signature.0);
        key.verify(&digest, &signature)
            .map_err(|_| WalletError::Internal("proof signature does not verify".into()))
    }
}
