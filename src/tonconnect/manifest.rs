//! DApp manifest fetching and validation

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::error::WalletError;

/// Manifest a DApp publishes at the URL its connect request names. `url`,
/// `name` and `iconUrl` are required for a valid identity.
#[derive(Clone, Debug, Deserialize)]
pub struct DappManifest {
    pub url: String,
    pub name: String,
    #[serde(rename = "iconUrl")]
    pub icon_url: String,
    #[serde(rename = "termsOfUseUrl")]
    pub terms_of_use_url: Option<String>,
    #[serde(rename = "privacyPolicyUrl")]
    pub privacy_policy_url: Option<String>,
}

impl DappManifest {
    /// Host part of the declared DApp URL; this is the origin proofs and
    /// connections bind to.
    pub fn origin(&self) -> Result<String, WalletError> {
        let url = Url::parse(&self.url)
            .map_err(|e| WalletError::ManifestFetchFailed(format!("bad dapp url: {}", e)))?;
        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::ManifestFetchFailed("dapp url has no host".into()))
    }

    fn validate(self) -> Result<Self, WalletError> {
        if self.url.is_empty() || self.name.is_empty() || self.icon_url.is_empty() {
            return Err(WalletError::ManifestFetchFailed(
                "manifest missing required fields".into(),
            ));
        }
        self.origin()?;
        Ok(self)
    }
}

pub struct ManifestFetcher {
    client: reqwest::Client,
}

impl ManifestFetcher {
    /// One attempt with a hard timeout; retrying is the caller's decision.
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub async fn fetch(&self, manifest_url: &str) -> Result<DappManifest, WalletError> {
        log::info!("Fetching DApp manifest from {}", manifest_url);

        let response = self
            .client
            .get(manifest_url)
            .send()
            .await
            .map_err(|e| WalletError::ManifestFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WalletError::ManifestFetchFailed(format!(
                "status {}",
                response.status()
            )));
        }

        let manifest: DappManifest = response
            .json()
            .await
            .map_err(|e| WalletError::ManifestFetchFailed(format!("malformed manifest: {}", e)))?;

        manifest.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_fields() {
        let manifest = DappManifest {
            url: "https://app.example.com".into(),
            name: String::new(),
            icon_url: "https://app.example.com/icon.png".into(),
            terms_of_use_url: None,
            privacy_policy_url: None,
        };
        assert!(matches!(
            manifest.validate(),
            Err(WalletError::ManifestFetchFailed(_))
        ));
    }

    #[test]
    fn test_origin_is_host() {
        let manifest = DappManifest {
            url: "https://app.example.com/deep/path".into(),
            name: "Example".into(),
            icon_url: "https://app.example.com/icon.png".into(),
            terms_of_use_url: None,
            privacy_policy_url: None,
        };
        assert_eq!(manifest.origin().unwrap(), "app.example.com");
    }
}
