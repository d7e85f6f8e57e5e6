//! TonConnect DApp bridge

mod bridge;
mod connection;
mod link;
mod manifest;
mod proof;

pub use bridge::{Bridge, ConnectSession, DappError, RequestFlow, RequestState, SessionState};
pub use connection::{ConnectionStore, RequestKind, TonConnectConnection};
pub use link::{parse_connect_url, ConnectItem, ConnectRequest, SUPPORTED_VERSION};
pub use manifest::{DappManifest, ManifestFetcher};
pub use proof::{bytes_to_sign, TonProof};
