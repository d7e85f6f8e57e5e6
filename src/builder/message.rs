//! Transfer intents and chain messages

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::account::{Network, TonAddress, WalletId, WalletVersion};

/// Nanotons attached to a jetton-wallet call to pay for its forwarding.
pub const JETTON_TRANSFER_DEPOSIT: u128 = 50_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetId {
    /// The native coin (9 decimals)
    Ton,
    /// A fungible-token master contract
    Jetton { master: TonAddress },
}

impl AssetId {
    pub fn describe(&self) -> String {
        match self {
            AssetId::Ton => "TON".to_string(),
            AssetId::Jetton { master } => format!("jetton {}", master.to_raw()),
        }
    }
}

/// How the network fee for a transfer gets paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderStrategy {
    /// The wallet pays from its native balance
    Regular,
    /// A relayer covers the fee for a token-denominated cut
    Gasless,
    /// Pre-purchased fee credit pays the fee
    Battery,
}

impl SenderStrategy {
    fn tag(&self) -> u8 {
        match self {
            SenderStrategy::Regular => 0,
            SenderStrategy::Gasless => 1,
            SenderStrategy::Battery => 2,
        }
    }
}

/// One send operation as the UI (or a DApp) expresses it. Ephemeral; never
/// persisted.
#[derive(Clone, Debug)]
pub struct TransferIntent {
    pub asset: AssetId,
    pub recipient: String,
    /// Integer minor units: nanotons for TON, token minor units for jettons
    pub amount: u128,
    pub comment: Option<String>,
    pub strategy_preference: Option<SenderStrategy>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Payload {
    Comment { text: String },
    JettonTransfer {
        master: TonAddress,
        token_amount: u128,
        recipient: TonAddress,
    },
    Raw { bytes: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub destination: TonAddress,
    /// Nanotons attached to this message
    pub amount: u128,
    pub payload: Option<Payload>,
}

/// A fully built, strategy-tagged message awaiting a signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedMessage {
    pub wallet_id: WalletId,
    pub from: TonAddress,
    pub network: Network,
    pub version: WalletVersion,
    pub seqno: u32,
    /// Unix seconds after which the chain rejects this message
    pub valid_until: u64,
    pub strategy: SenderStrategy,
    /// Estimated network fee in nanotons
    pub fee_estimate: u128,
    pub messages: Vec<OutboundMessage>,
}

impl UnsignedMessage {
    /// Deterministic body encoding; this is what gets signed.
    pub fn body_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.wallet_id(self.network).to_be_bytes());
        out.extend_from_slice(&self.seqno.to_be_bytes());
        out.extend_from_slice(&self.valid_until.to_be_bytes());
        out.push(self.strategy.tag());
        out.push(self.messages.len() as u8);
        for msg in &self.messages {
            encode_address(&mut out, &msg.destination);
            out.extend_from_slice(&msg.amount.to_be_bytes());
            match &msg.payload {
                None => out.push(0xff),
                Some(Payload::Comment { text }) => {
                    out.push(0x00);
                    out.extend_from_slice(&(text.len() as u32).to_be_bytes());
                    out.extend_from_slice(text.as_bytes());
                }
                Some(Payload::JettonTransfer {
                    master,
                    token_amount,
                    recipient,
                }) => {
                    out.push(0x01);
                    encode_address(&mut out, master);
                    out.extend_from_slice(&token_amount.to_be_bytes());
                    encode_address(&mut out, recipient);
                }
                Some(Payload::Raw { bytes }) => {
                    out.push(0x02);
                    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                    out.extend_from_slice(bytes);
                }
            }
        }
        out
    }

    pub fn body_base64(&self) -> String {
        STANDARD.encode(self.body_bytes())
    }

    /// The 32-byte digest a signer commits to.
    pub fn signing_hash(&self) -> [u8; 32] {
        Sha256::digest(self.body_bytes()).into()
    }
}

fn encode_address(out: &mut Vec<u8>, address: &TonAddress) {
    out.push(address.workchain as u8);
    out.extend_from_slice(&address.hash);
}

/// Ed25519 signature over an unsigned message's signing hash.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let array: [u8; 64] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}..)", &self.to_hex()[..16])
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_hex(&s).ok_or_else(|| serde::de::Error::custom("bad signature hex"))
    }
}

/// A signed message ready for broadcast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedMessage {
    pub message: UnsignedMessage,
    pub signature: Signature,
    /// Additional partial signatures for threshold wallets; empty otherwise
    #[serde(default)]
    pub cosignatures: Vec<Signature>,
}

impl SignedMessage {
    pub fn new(message: UnsignedMessage, signature: Signature) -> Self {
        Self {
            message,
            signature,
            cosignatures: Vec::new(),
        }
    }

    /// External-message envelope: signatures followed by the signed body.
    pub fn boc_base64(&self) -> String {
        let mut bytes = Vec::with_capacity(64 + 256);
        bytes.extend_from_slice(&self.signature.0);
        for sig in &self.cosignatures {
            bytes.extend_from_slice(&sig.0);
        }
        bytes.extend_from_slice(&self.message.body_bytes());
        STANDARD.encode(bytes)
    }
}
