/// Core configuration from environment variables
///
/// Controls the TON network, the toncenter endpoint used by the blockchain
/// gateway, and TonConnect freshness windows.
use std::env;

use crate::account::Network;

#[derive(Clone, Debug)]
pub struct CoreConfig {
    /// TON network the core operates on
    pub network: Network,
    /// Toncenter API base URL
    pub toncenter_url: String,
    /// How long an unsigned message stays valid once built, in seconds
    pub message_ttl_secs: u64,
    /// TonConnect proof/challenge freshness window, in seconds
    pub proof_ttl_secs: u64,
    /// DApp manifest fetch timeout, in seconds
    pub manifest_timeout_secs: u64,
}

impl CoreConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `TON_NETWORK`: "mainnet" (default) or "testnet"
    /// - `TONCENTER_URL`: toncenter API endpoint (optional, network default)
    /// - `TONCONNECT_PROOF_TTL_SECS`: proof freshness window (default 900)
    /// - `TONCONNECT_MANIFEST_TIMEOUT_SECS`: manifest fetch timeout (default 10)
    pub fn from_env() -> Self {
        let network_str = env::var("TON_NETWORK")
            .unwrap_or_else(|_| "mainnet".to_string())
            .to_lowercase();

        let network = match network_str.as_str() {
            "testnet" => {
                log::info!("Using TESTNET network");
                Network::Testnet
            }
            "mainnet" | "" => Network::Mainnet,
            other => {
                log::warn!("Unknown network '{}', defaulting to mainnet", other);
                Network::Mainnet
            }
        };

        let toncenter_url = env::var("TONCENTER_URL").unwrap_or_else(|_| {
            match network {
                Network::Mainnet => "https://toncenter.com/api/v2".to_string(),
                Network::Testnet => "https://testnet.toncenter.com/api/v2".to_string(),
            }
        });

        let proof_ttl_secs = env::var("TONCONNECT_PROOF_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(900);

        let manifest_timeout_secs = env::var("TONCONNECT_MANIFEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            network,
            toncenter_url,
            message_ttl_secs: 300,
            proof_ttl_secs,
            manifest_timeout_secs,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            toncenter_url: "https://toncenter.com/api/v2".to_string(),
            message_ttl_secs: 300,
            proof_ttl_secs: 900,
            manifest_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mainnet() {
        let config = CoreConfig::default();
        assert!(matches!(config.network, Network::Mainnet));
        assert_eq!(config.proof_ttl_secs, 900);
    }

    #[test]
    fn test_testnet_config() {
        let config = CoreConfig {
            network: Network::Testnet,
            toncenter_url: "https://testnet.toncenter.com/api/v2".to_string(),
            ..Default::default()
        };
        assert!(config.toncenter_url.contains("testnet"));
    }
}
