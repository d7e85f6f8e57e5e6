//! TON address parsing and formatting
//!
//! Handles both the raw form (`0:hex64`) and the user-facing friendly form
//! (36 bytes: tag, workchain, hash, CRC-16/XMODEM; base64 or base64url).

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use crc::{Crc, CRC_16_XMODEM};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::account::Network;
use crate::error::WalletError;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Friendly-form tag bits
const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const FLAG_TESTNET_ONLY: u8 = 0x80;

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct TonAddress {
    pub workchain: i8,
    pub hash: [u8; 32],
    /// Set when the friendly form carried the testnet-only flag
    #[serde(default)]
    pub testnet_only: bool,
    #[serde(default)]
    pub bounceable: bool,
}

/// Identity is the on-chain (workchain, hash) pair; the bounceable and
/// testnet-only bits are display/routing hints carried by the friendly form
/// and must not split one account into two.
impl PartialEq for TonAddress {
    fn eq(&self, other: &Self) -> bool {
        self.workchain == other.workchain && self.hash == other.hash
    }
}

impl Eq for TonAddress {}

impl std::hash::Hash for TonAddress {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.workchain.hash(state);
        self.hash.hash(state);
    }
}

impl TonAddress {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self {
            workchain,
            hash,
            testnet_only: false,
            bounceable: true,
        }
    }

    /// Parse either the raw or the friendly form.
    pub fn parse(s: &str) -> Result<Self, WalletError> {
        if s.contains(':') {
            Self::parse_raw(s)
        } else {
            Self::parse_friendly(s)
        }
    }

    fn parse_raw(s: &str) -> Result<Self, WalletError> {
        let (wc_str, hash_str) = s
            .split_once(':')
            .ok_or_else(|| WalletError::InvalidAddress(s.to_string()))?;

        let workchain: i8 = wc_str
            .parse()
            .map_err(|_| WalletError::InvalidAddress(format!("bad workchain in '{}'", s)))?;

        let hash_bytes = hex::decode(hash_str)
            .map_err(|_| WalletError::InvalidAddress(format!("bad hash hex in '{}'", s)))?;
        let hash: [u8; 32] = hash_bytes
            .try_into()
            .map_err(|_| WalletError::InvalidAddress(format!("hash must be 32 bytes: '{}'", s)))?;

        Ok(Self::new(workchain, hash))
    }

    fn parse_friendly(s: &str) -> Result<Self, WalletError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .or_else(|_| STANDARD.decode(s))
            .map_err(|_| WalletError::InvalidAddress(format!("bad base64: '{}'", s)))?;

        if bytes.len() != 36 {
            return Err(WalletError::InvalidAddress(format!(
                "friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let expected = CRC16.checksum(&bytes[..34]);
        let actual = u16::from_be_bytes([bytes[34], bytes[35]]);
        if expected != actual {
            return Err(WalletError::InvalidAddress(format!(
                "checksum mismatch in '{}'",
                s
            )));
        }

        let tag = bytes[0];
        let testnet_only = tag & FLAG_TESTNET_ONLY != 0;
        let bounceable = match tag & !FLAG_TESTNET_ONLY {
            TAG_BOUNCEABLE => true,
            TAG_NON_BOUNCEABLE => false,
            other => {
                return Err(WalletError::InvalidAddress(format!(
                    "unknown address tag 0x{:02x}",
                    other
                )))
            }
        };

        let workchain = bytes[1] as i8;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain,
            hash,
            testnet_only,
            bounceable,
        })
    }

    /// Reject addresses flagged for the wrong network.
    ///
    /// Only the testnet-only flag is a hard mismatch: an unflagged address is
    /// valid on either network.
    pub fn require_network(&self, network: Network) -> Result<&Self, WalletError> {
        if self.testnet_only && network == Network::Mainnet {
            return Err(WalletError::NetworkMismatch(format!(
                "testnet-only address {} used on mainnet",
                self.to_raw()
            )));
        }
        Ok(self)
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    pub fn to_friendly(&self, bounceable: bool, testnet_only: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if testnet_only {
            tag |= FLAG_TESTNET_ONLY;
        }

        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = CRC16.checksum(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());

        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

impl fmt::Debug for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TonAddress({})", self.to_raw())
    }
}

impl FromStr for TonAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TonAddress {
        TonAddress::new(0, [0xab; 32])
    }

    #[test]
    fn test_raw_round_trip() {
        let addr = sample();
        let raw = addr.to_raw();
        let parsed = TonAddress::parse(&raw).unwrap();
        assert_eq!(parsed.workchain, 0);
        assert_eq!(parsed.hash, [0xab; 32]);
    }

    #[test]
    fn test_friendly_round_trip() {
        let addr = sample();
        let friendly = addr.to_friendly(true, false);
        let parsed = TonAddress::parse(&friendly).unwrap();
        assert_eq!(parsed.hash, addr.hash);
        assert!(parsed.bounceable);
        assert!(!parsed.testnet_only);
    }

    #[test]
    fn test_display_flags_do_not_split_identity() {
        let raw = TonAddress::parse(&sample().to_raw()).unwrap();
        let non_bounceable = TonAddress::parse(&sample().to_friendly(false, false)).unwrap();
        assert!(!non_bounceable.bounceable);
        assert_eq!(raw, non_bounceable);

        let mut set = std::collections::HashSet::new();
        set.insert(raw);
        assert!(set.contains(&non_bounceable));
    }

    #[test]
    fn test_checksum_rejected() {
        let addr = sample();
        let friendly = addr.to_friendly(true, false);
        // Flip a character in the hash section
        let mut chars: Vec<char> = friendly.chars().collect();
        chars[10] = if chars[10] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert!(matches!(
            TonAddress::parse(&tampered),
            Err(WalletError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_testnet_flag_blocks_mainnet() {
        let addr = sample();
        let friendly = addr.to_friendly(true, true);
        let parsed = TonAddress::parse(&friendly).unwrap();
        assert!(parsed.testnet_only);
        assert!(matches!(
            parsed.require_network(Network::Mainnet),
            Err(WalletError::NetworkMismatch(_))
        ));
        assert!(parsed.require_network(Network::Testnet).is_ok());
    }

    #[test]
    fn test_masterchain_workchain() {
        let addr = TonAddress::new(-1, [1; 32]);
        let parsed = TonAddress::parse(&addr.to_friendly(false, false)).unwrap();
        assert_eq!(parsed.workchain, -1);
        assert!(!parsed.bounceable);
    }
}
