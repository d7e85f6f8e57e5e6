use thiserror::Error;

/// TonConnect wire error codes sent to a DApp in structured rejections.
///
/// These values are fixed by the protocol; DApps switch on the number,
/// not the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DappErrorCode {
    Unknown = 0,
    BadRequest = 1,
    UnknownApp = 100,
    UserDeclined = 300,
    MethodNotSupported = 400,
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Address network mismatch: {0}")]
    NetworkMismatch(String),

    #[error("Insufficient balance: need {needed} nanotons, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("Insufficient battery credit: need {needed} charges, have {available}")]
    InsufficientCredit { needed: u64, available: u64 },

    #[error("Asset not supported for this operation: {0}")]
    UnsupportedAsset(String),

    #[error("No affordable sender strategy for this transfer")]
    NoAffordableSenderStrategy,

    #[error("No signer available: {0}")]
    SignerUnavailable(String),

    #[error("Invalid credential")]
    InvalidCredential,

    #[error("Cancelled by user")]
    UserCancelled,

    #[error("Rejected by user")]
    UserRejected,

    #[error("Device communication error: {0}")]
    DeviceCommunication(String),

    #[error("Manifest fetch failed: {0}")]
    ManifestFetchFailed(String),

    #[error("Invalid connection request: {0}")]
    InvalidConnectionRequest(String),

    #[error("Request outside granted scope: {0}")]
    ScopeViolation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Duplicate wallet id: {0}")]
    DuplicateWalletId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection expired")]
    Expired,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WalletError {
    /// Translate a failure into the fixed TonConnect numeric code set.
    ///
    /// Every DApp-facing rejection goes through this mapping; a raw error
    /// string never crosses the bridge boundary on its own.
    pub fn dapp_error_code(&self) -> DappErrorCode {
        match self {
            WalletError::UserRejected | WalletError::UserCancelled => DappErrorCode::UserDeclined,
            WalletError::ScopeViolation(_) => DappErrorCode::MethodNotSupported,
            WalletError::InvalidConnectionRequest(_)
            | WalletError::InvalidAddress(_)
            | WalletError::NetworkMismatch(_)
            | WalletError::ManifestFetchFailed(_) => DappErrorCode::BadRequest,
            WalletError::NotFound(_) | WalletError::Expired => DappErrorCode::UnknownApp,
            _ => DappErrorCode::Unknown,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
