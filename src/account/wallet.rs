//! On-chain wallet instances

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::account::TonAddress;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Chain id string used on the TonConnect wire.
    pub fn tonconnect_id(&self) -> &'static str {
        match self {
            Network::Mainnet => "-239",
            Network::Testnet => "-3",
        }
    }
}

/// Wallet contract version; affects message-encoding rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletVersion {
    V3R2,
    V4R2,
    V5R1,
}

impl WalletVersion {
    /// Subwallet id baked into the wallet contract's state init.
    pub fn wallet_id(&self, network: Network) -> u32 {
        match self {
            // v3/v4 use the classic default regardless of network
            WalletVersion::V3R2 | WalletVersion::V4R2 => 698983191,
            // v5 encodes the network in the wallet id
            WalletVersion::V5R1 => match network {
                Network::Mainnet => 2147483409,
                Network::Testnet => 2147483645,
            },
        }
    }
}

impl fmt::Display for WalletVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WalletVersion::V3R2 => "v3r2",
            WalletVersion::V4R2 => "v4r2",
            WalletVersion::V5R1 => "v5r1",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub Uuid);

impl WalletId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One on-chain address instance. Immutable once created; owned exclusively
/// by its parent account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub address: TonAddress,
    pub public_key: [u8; 32],
    pub version: WalletVersion,
    pub network: Network,
}

impl Wallet {
    pub fn new(
        address: TonAddress,
        public_key: [u8; 32],
        version: WalletVersion,
        network: Network,
    ) -> Self {
        Self {
            id: WalletId::generate(),
            address,
            public_key,
            version,
            network,
        }
    }

    /// Derive the wallet for a public key: the address is the hash of the
    /// contract's initial state, which is fixed by the version, the subwallet
    /// id, and the key.
    pub fn for_public_key(
        public_key: [u8; 32],
        version: WalletVersion,
        network: Network,
    ) -> Self {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(version.to_string().as_bytes());
        hasher.update(version.wallet_id(network).to_be_bytes());
        hasher.update(public_key);
        let hash: [u8; 32] = hasher.finalize().into();

        Self::new(TonAddress::new(0, hash), public_key, version, network)
    }
}
