//! Connection deep-link parsing
//!
//! Universal links look like
//! `tc://?v=2&id=<session>&r=<urlencoded request JSON>` (or the same query on
//! an https bridge URL). Anything malformed or unversioned fails
//! `InvalidConnectionRequest`.

use serde::Deserialize;
use url::Url;

use crate::error::WalletError;

/// Protocol version this bridge speaks.
pub const SUPPORTED_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectItem {
    /// DApp asks for the wallet address
    TonAddr,
    /// DApp asks for an ownership proof over this challenge payload
    TonProof { payload: String },
}

#[derive(Clone, Debug)]
pub struct ConnectRequest {
    pub version: u32,
    pub session_id: String,
    pub manifest_url: String,
    pub items: Vec<ConnectItem>,
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(rename = "manifestUrl")]
    manifest_url: String,
    items: Vec<RawItem>,
}

#[derive(Deserialize)]
struct RawItem {
    name: String,
    payload: Option<String>,
}

pub fn parse_connect_url(link: &str) -> Result<ConnectRequest, WalletError> {
    let url = Url::parse(link)
        .map_err(|e| WalletError::InvalidConnectionRequest(format!("bad URL: {}", e)))?;

    let mut version = None;
    let mut session_id = None;
    let mut request_json = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "v" => version = value.parse::<u32>().ok(),
            "id" => session_id = Some(value.into_owned()),
            "r" => request_json = Some(value.into_owned()),
            _ => {}
        }
    }

    let version = version
        .ok_or_else(|| WalletError::InvalidConnectionRequest("missing protocol version".into()))?;
    if version != SUPPORTED_VERSION {
        return Err(WalletError::InvalidConnectionRequest(format!(
            "unsupported protocol version {}",
            version
        )));
    }
    let session_id = session_id
        .ok_or_else(|| WalletError::InvalidConnectionRequest("missing session id".into()))?;
    let request_json = request_json
        .ok_or_else(|| WalletError::InvalidConnectionRequest("missing request payload".into()))?;

    let raw: RawRequest = serde_json::from_str(&request_json)
        .map_err(|e| WalletError::InvalidConnectionRequest(format!("bad request JSON: {}", e)))?;

    let mut items = Vec::new();
    for item in raw.items {
        match item.name.as_str() {
            "ton_addr" => items.push(ConnectItem::TonAddr),
            "ton_proof" => items.push(ConnectItem::TonProof {
                payload: item.payload.unwrap_or_default(),
            }),
            other => {
                log::debug!("Ignoring unknown connect item '{}'", other);
            }
        }
    }
    if items.is_empty() {
        return Err(WalletError::InvalidConnectionRequest(
            "request carries no known items".into(),
        ));
    }

    Ok(ConnectRequest {
        version,
        session_id,
        manifest_url: raw.manifest_url,
        items,
    })
}
