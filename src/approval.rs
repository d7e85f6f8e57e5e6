//! User-decision boundary
//!
//! The UI layer implements this gate. Every method may suspend indefinitely
//! while the user decides and must be cancellable by its implementor, in
//! which case it returns `UserCancelled`.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::account::Wallet;
use crate::builder::OutboundMessage;
use crate::error::WalletError;
use crate::storage::UnlockCredential;
use crate::tonconnect::{DappManifest, RequestKind};

/// Outcome of a connection-approval prompt.
#[derive(Clone, Debug)]
pub enum ConnectionDecision {
    /// User approved and granted this request scope to the DApp
    Approved { scope: BTreeSet<RequestKind> },
    Rejected,
}

#[async_trait]
pub trait ApprovalGate: Send + Sync {
    /// Surface a DApp's identity for a connect decision.
    async fn approve_connection(
        &self,
        manifest: &DappManifest,
        wallet: &Wallet,
    ) -> Result<ConnectionDecision, WalletError>;

    /// Surface an outbound transfer (local or DApp-initiated) for approval.
    async fn approve_transaction(
        &self,
        origin: &str,
        messages: &[OutboundMessage],
    ) -> Result<bool, WalletError>;

    /// Prompt for the credential that unlocks the active account's seed.
    async fn request_unlock(&self, account_label: &str) -> Result<UnlockCredential, WalletError>;
}
