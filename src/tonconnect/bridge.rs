//! TonConnect bridge state machines
//!
//! One [`ConnectSession`] per inbound connect link:
//! `Idle -> ManifestFetching -> AwaitingUserApproval -> ProofIssuing ->
//! Connected -> (Disconnected | Expired)`. Failures return the session to a
//! well-defined non-partial state; no connection record is persisted before
//! `Connected`.
//!
//! A parallel [`RequestFlow`] tracks each transaction-approval request from
//! an already-connected DApp.

use chrono::Utc;

use super::connection::{ConnectionStore, RequestKind, TonConnectConnection};
use super::link::{parse_connect_url, ConnectItem, ConnectRequest};
use super::manifest::{DappManifest, ManifestFetcher};
use super::proof::{bytes_to_sign, TonProof};
use crate::account::{Account, Wallet, WalletId};
use crate::approval::{ApprovalGate, ConnectionDecision};
use crate::config::CoreConfig;
use crate::error::WalletError;
use crate::signer::Signer;
use crate::storage::UnlockCredential;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ManifestFetching,
    AwaitingUserApproval,
    ProofIssuing,
    Connected,
    Disconnected,
    Expired,
}

/// One handshake attempt with a DApp.
pub struct ConnectSession {
    request: ConnectRequest,
    state: SessionState,
    manifest: Option<DappManifest>,
    opened_at: u64,
}

impl ConnectSession {
    fn new(request: ConnectRequest) -> Self {
        Self {
            request,
            state: SessionState::Idle,
            manifest: None,
            opened_at: Utc::now().timestamp() as u64,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> &str {
        &self.request.session_id
    }

    pub fn manifest(&self) -> Option<&DappManifest> {
        self.manifest.as_ref()
    }

    fn age_secs(&self) -> u64 {
        (Utc::now().timestamp() as u64).saturating_sub(self.opened_at)
    }

    /// The proof challenge the DApp supplied, if it asked for one.
    fn proof_payload(&self) -> Option<&str> {
        self.request.items.iter().find_map(|item| match item {
            ConnectItem::TonProof { payload } => Some(payload.as_str()),
            ConnectItem::TonAddr => None,
        })
    }
}

/// Sub-machine for one transaction-approval request on a connected session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestState {
    RequestReceived,
    AwaitingUserApproval,
    Signing,
    Broadcast,
    Completed,
    Rejected,
    Failed,
}

pub struct RequestFlow {
    state: RequestState,
}

impl RequestFlow {
    pub fn new() -> Self {
        Self {
            state: RequestState::RequestReceived,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn awaiting_approval(&mut self) {
        self.state = RequestState::AwaitingUserApproval;
    }

    pub fn signing(&mut self) {
        self.state = RequestState::Signing;
    }

    pub fn broadcasting(&mut self) {
        self.state = RequestState::Broadcast;
    }

    pub fn completed(&mut self) {
        self.state = RequestState::Completed;
    }

    pub fn rejected(&mut self) {
        self.state = RequestState::Rejected;
    }

    pub fn failed(&mut self) {
        self.state = RequestState::Failed;
    }
}

impl Default for RequestFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured rejection returned to a DApp; carries a numeric code from the
/// fixed protocol set, never a raw error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DappError {
    pub code: u32,
    pub message: String,
}

impl DappError {
    pub fn from_wallet_error(error: &WalletError) -> Self {
        Self {
            code: error.dapp_error_code() as u32,
            message: error.to_string(),
        }
    }
}

pub struct Bridge {
    fetcher: ManifestFetcher,
    store: ConnectionStore,
    proof_ttl_secs: u64,
}

impl Bridge {
    pub fn new(config: &CoreConfig, store: ConnectionStore) -> Self {
        Self {
            fetcher: ManifestFetcher::new(config.manifest_timeout_secs),
            store,
            proof_ttl_secs: config.proof_ttl_secs,
        }
    }

    pub fn connections(&self) -> &ConnectionStore {
        &self.store
    }

    /// Parse a connect deep link into a fresh session.
    pub fn open_session(&self, link: &str) -> Result<ConnectSession, WalletError> {
        let request = parse_connect_url(link)?;
        log::info!("Opened TonConnect session {}", request.session_id);
        Ok(ConnectSession::new(request))
    }

    /// Drive one session through the full handshake.
    ///
    /// Cancellation or failure at any suspension point returns the session
    /// to `Idle` (or `Disconnected` on explicit rejection) with nothing
    /// persisted. The vault credential is requested only at the
    /// proof-issuing step, after the user has approved the connection, and
    /// only when the DApp asked for a proof at all.
    pub async fn connect(
        &self,
        session: &mut ConnectSession,
        account: &Account,
        wallet: &Wallet,
        signer: &dyn Signer,
        approval: &dyn ApprovalGate,
    ) -> Result<TonConnectConnection, WalletError> {
        session.state = SessionState::ManifestFetching;
        let manifest = match self.fetcher.fetch(&session.request.manifest_url).await {
            Ok(manifest) => manifest,
            Err(e) => {
                session.state = SessionState::Idle;
                return Err(e);
            }
        };
        let origin = manifest.origin()?;
        session.manifest = Some(manifest.clone());

        session.state = SessionState::AwaitingUserApproval;
        let decision = match approval.approve_connection(&manifest, wallet).await {
            Ok(decision) => decision,
            Err(e) => {
                session.state = SessionState::Idle;
                return Err(e);
            }
        };
        let scope = match decision {
            ConnectionDecision::Approved { scope } => scope,
            ConnectionDecision::Rejected => {
                session.state = SessionState::Disconnected;
                return Err(WalletError::UserRejected);
            }
        };

        // Stale challenges must not be answered; a slow approval can push
        // the session past the freshness window.
        if session.age_secs() > self.proof_ttl_secs {
            session.state = SessionState::Expired;
            return Err(WalletError::Expired);
        }

        session.state = SessionState::ProofIssuing;
        let proof = match session.proof_payload() {
            Some(payload) => {
                // The credential prompt belongs to proof issuance, not the
                // handshake as a whole: no proof requested, no prompt.
                let unlock = if account.credential_id().is_some() {
                    match approval.request_unlock(&account.label).await {
                        Ok(unlock) => unlock,
                        Err(e) => {
                            session.state = SessionState::Idle;
                            return Err(e);
                        }
                    }
                } else {
                    UnlockCredential::Password(String::new())
                };
                let timestamp = Utc::now().timestamp() as u64;
                let digest = bytes_to_sign(&wallet.address, &origin, timestamp, payload);
                let signature = match signer.sign_proof(&digest, &unlock).await {
                    Ok(signature) => signature,
                    Err(e) => {
                        session.state = SessionState::Idle;
                        return Err(e);
                    }
                };
                Some(TonProof::assemble(
                    origin.clone(),
                    payload.to_string(),
                    timestamp,
                    signature,
                ))
            }
            None => None,
        };

        let connection = TonConnectConnection {
            dapp_origin: origin,
            manifest_url: session.request.manifest_url.clone(),
            wallet_id: wallet.id,
            address: wallet.address,
            proof,
            issued_at: Utc::now(),
            scope,
        };
        self.store.upsert(connection.clone())?;

        session.state = SessionState::Connected;
        log::info!(
            "Session {} connected to {}",
            session.request.session_id,
            connection.dapp_origin
        );
        Ok(connection)
    }

    /// Scope check for an inbound request; runs before any signer or
    /// gateway interaction.
    pub fn validate_scope(
        &self,
        connection: &TonConnectConnection,
        kind: RequestKind,
    ) -> Result<(), WalletError> {
        if !connection.scope.contains(&kind) {
            return Err(WalletError::ScopeViolation(format!(
                "{} was not granted {:?}",
                connection.dapp_origin, kind
            )));
        }
        Ok(())
    }

    /// Explicit disconnect; removes the stored connection.
    pub fn disconnect(&self, origin: &str, wallet_id: WalletId) -> Result<(), WalletError> {
        if !self.store.remove(origin, wallet_id)? {
            return Err(WalletError::NotFound(format!("connection to {}", origin)));
        }
        Ok(())
    }
}
