//! Toncenter HTTP gateway
//!
//! Production implementation of [`BlockchainGateway`] over the toncenter
//! JSON API. All failures surface as `WalletError::Network`; the core never
//! retries a broadcast on its own.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{BlockchainGateway, JettonMetadata};
use crate::account::TonAddress;
use crate::builder::{SignedMessage, UnsignedMessage};
use crate::error::WalletError;

pub struct ToncenterGateway {
    base_url: String,
    client: reqwest::Client,
}

impl ToncenterGateway {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, WalletError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("GET {}: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(WalletError::Network(format!(
                "GET {}: status {}",
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("GET {}: bad JSON: {}", path, e)))
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, WalletError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("POST {}: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(WalletError::Network(format!(
                "POST {}: status {}",
                path,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::Network(format!("POST {}: bad JSON: {}", path, e)))
    }
}

#[async_trait]
impl BlockchainGateway for ToncenterGateway {
    async fn sequence_number(&self, address: &TonAddress) -> Result<u32, WalletError> {
        let body = json!({
            "address": address.to_raw(),
            "method": "seqno",
            "stack": [],
        });
        let resp = self.post("runGetMethod", body).await?;

        // An uninitialized wallet contract has no seqno method yet; its
        // first message uses seqno 0.
        if resp["result"]["exit_code"].as_i64().unwrap_or(0) != 0 {
            return Ok(0);
        }

        resp["result"]["stack"][0][1]
            .as_str()
            .and_then(|s| u32::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .ok_or_else(|| WalletError::Network("seqno missing from response".to_string()))
    }

    async fn balance(&self, address: &TonAddress) -> Result<u128, WalletError> {
        let resp = self
            .get(&format!("getAddressBalance?address={}", address.to_raw()))
            .await?;
        resp["result"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| WalletError::Network("balance missing from response".to_string()))
    }

    async fn jetton_balance(
        &self,
        owner: &TonAddress,
        master: &TonAddress,
    ) -> Result<u128, WalletError> {
        let body = json!({
            "address": master.to_raw(),
            "method": "get_wallet_data",
            "stack": [["tvm.Slice", owner.to_raw()]],
        });
        let resp = self.post("runGetMethod", body).await?;
        resp["result"]["stack"][0][1]
            .as_str()
            .and_then(|s| u128::from_str_radix(s.trim_start_matches("0x"), 16).ok())
            .ok_or_else(|| WalletError::Network("jetton balance missing from response".to_string()))
    }

    async fn jetton_metadata(&self, master: &TonAddress) -> Result<JettonMetadata, WalletError> {
        let resp = self
            .get(&format!("getTokenData?address={}", master.to_raw()))
            .await?;

        let data = &resp["result"];
        if data.is_null() {
            return Err(WalletError::UnsupportedAsset(master.to_raw()));
        }

        Ok(JettonMetadata {
            symbol: data["jetton_content"]["symbol"]
                .as_str()
                .unwrap_or("UNKNOWN")
                .to_string(),
            decimals: data["jetton_content"]["decimals"]
                .as_str()
                .and_then(|d| d.parse().ok())
                .unwrap_or(9),
            supports_gasless: data["gasless"].as_bool().unwrap_or(false),
            gasless_fee: data["gasless_fee"]
                .as_str()
                .and_then(|f| f.parse().ok())
                .unwrap_or(0),
        })
    }

    async fn estimate_fee(&self, message: &UnsignedMessage) -> Result<u128, WalletError> {
        let body = json!({
            "address": message.from.to_raw(),
            "body": message.body_base64(),
            "ignore_chksig": true,
        });
        let resp = self.post("estimateFee", body).await?;

        let fees = &resp["result"]["source_fees"];
        let total = ["in_fwd_fee", "storage_fee", "gas_fee", "fwd_fee"]
            .iter()
            .map(|k| fees[k].as_u64().unwrap_or(0) as u128)
            .sum();
        Ok(total)
    }

    async fn battery_credit(&self, address: &TonAddress) -> Result<u64, WalletError> {
        // Battery balances live with the sponsorship service, not the chain.
        // The endpoint mirrors toncenter's shape for a uniform client.
        let resp = self
            .get(&format!("getBatteryCredit?address={}", address.to_raw()))
            .await?;
        resp["result"]
            .as_u64()
            .ok_or_else(|| WalletError::Network("battery credit missing from response".to_string()))
    }

    async fn broadcast(&self, message: &SignedMessage) -> Result<String, WalletError> {
        log::info!(
            "Broadcasting message from {} (seqno {})",
            message.message.from.to_raw(),
            message.message.seqno
        );

        let body = json!({ "boc": message.boc_base64() });
        let resp = self.post("sendBocReturnHash", body).await?;

        resp["result"]["hash"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Network("tx hash missing from response".to_string()))
    }
}
