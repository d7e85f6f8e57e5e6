/// Common test utilities for wallet-core integration tests
///
/// Provides shared infrastructure:
/// - Test environment setup with temp-dir storage and automatic cleanup
/// - Scriptable blockchain gateway mock
/// - Approval gate and device transport stubs
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use ton_wallet_core::approval::{ApprovalGate, ConnectionDecision};
use ton_wallet_core::signer::{DeviceTransport, QrTransport};
use ton_wallet_core::tonconnect::{DappManifest, RequestKind};
use ton_wallet_core::{
    BlockchainGateway, CoreConfig, JettonMetadata, Network, Signature, SignedMessage, Storage,
    TonAddress, UnlockCredential, UnsignedMessage, Wallet, WalletError, WalletManager,
};

pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub fn init_logging() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub fn password() -> UnlockCredential {
    UnlockCredential::Password(TEST_PASSWORD.to_string())
}

/// Scriptable gateway: balances and fees are set by the test, broadcasts are
/// recorded, and every call is counted so tests can assert a flow never
/// touched the network.
pub struct MockGateway {
    pub seqno: AtomicU32,
    pub balance: Mutex<u128>,
    pub fee: Mutex<u128>,
    pub battery: Mutex<u64>,
    pub jettons: Mutex<HashMap<TonAddress, JettonMetadata>>,
    pub jetton_balances: Mutex<HashMap<TonAddress, u128>>,
    pub broadcasts: Mutex<Vec<SignedMessage>>,
    pub fail_broadcast: AtomicBool,
    pub calls: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            seqno: AtomicU32::new(7),
            balance: Mutex::new(10_000_000_000), // 10 TON
            fee: Mutex::new(5_000_000),
            battery: Mutex::new(0),
            jettons: Mutex::new(HashMap::new()),
            jetton_balances: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            fail_broadcast: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_balance(&self, nanotons: u128) {
        *self.balance.lock().unwrap() = nanotons;
    }

    pub fn set_battery(&self, charges: u64) {
        *self.battery.lock().unwrap() = charges;
    }

    pub fn add_jetton(&self, master: TonAddress, metadata: JettonMetadata, balance: u128) {
        self.jettons.lock().unwrap().insert(master, metadata);
        self.jetton_balances.lock().unwrap().insert(master, balance);
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touched(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlockchainGateway for MockGateway {
    async fn sequence_number(&self, _address: &TonAddress) -> Result<u32, WalletError> {
        self.touched();
        Ok(self.seqno.load(Ordering::SeqCst))
    }

    async fn balance(&self, _address: &TonAddress) -> Result<u128, WalletError> {
        self.touched();
        Ok(*self.balance.lock().unwrap())
    }

    async fn jetton_balance(
        &self,
        _owner: &TonAddress,
        master: &TonAddress,
    ) -> Result<u128, WalletError> {
        self.touched();
        Ok(*self.jetton_balances.lock().unwrap().get(master).unwrap_or(&0))
    }

    async fn jetton_metadata(&self, master: &TonAddress) -> Result<JettonMetadata, WalletError> {
        self.touched();
        self.jettons
            .lock()
            .unwrap()
            .get(master)
            .cloned()
            .ok_or_else(|| WalletError::UnsupportedAsset(master.to_raw()))
    }

    async fn estimate_fee(&self, _message: &UnsignedMessage) -> Result<u128, WalletError> {
        self.touched();
        Ok(*self.fee.lock().unwrap())
    }

    async fn battery_credit(&self, _address: &TonAddress) -> Result<u64, WalletError> {
        self.touched();
        Ok(*self.battery.lock().unwrap())
    }

    async fn broadcast(&self, message: &SignedMessage) -> Result<String, WalletError> {
        self.touched();
        if self.fail_broadcast.load(Ordering::SeqCst) {
            return Err(WalletError::Network("connection reset".to_string()));
        }
        use sha2::{Digest, Sha256};
        let hash = hex::encode(Sha256::digest(message.boc_base64().as_bytes()));
        self.broadcasts.lock().unwrap().push(message.clone());
        Ok(hash)
    }
}

/// Approval gate with fixed answers; counts unlock prompts so tests can
/// assert a rejected flow never reached the vault.
pub struct StaticApprovalGate {
    pub approve: AtomicBool,
    pub scope: Mutex<BTreeSet<RequestKind>>,
    pub unlock_calls: AtomicUsize,
}

impl StaticApprovalGate {
    pub fn approving() -> Self {
        let mut scope = BTreeSet::new();
        scope.insert(RequestKind::SendTransaction);
        Self {
            approve: AtomicBool::new(true),
            scope: Mutex::new(scope),
            unlock_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        let gate = Self::approving();
        gate.approve.store(false, Ordering::SeqCst);
        gate
    }
}

#[async_trait]
impl ApprovalGate for StaticApprovalGate {
    async fn approve_connection(
        &self,
        _manifest: &DappManifest,
        _wallet: &Wallet,
    ) -> Result<ConnectionDecision, WalletError> {
        if self.approve.load(Ordering::SeqCst) {
            Ok(ConnectionDecision::Approved {
                scope: self.scope.lock().unwrap().clone(),
            })
        } else {
            Ok(ConnectionDecision::Rejected)
        }
    }

    async fn approve_transaction(
        &self,
        _origin: &str,
        _messages: &[ton_wallet_core::OutboundMessage],
    ) -> Result<bool, WalletError> {
        Ok(self.approve.load(Ordering::SeqCst))
    }

    async fn request_unlock(&self, _account_label: &str) -> Result<UnlockCredential, WalletError> {
        self.unlock_calls.fetch_add(1, Ordering::SeqCst);
        Ok(password())
    }
}

/// Device transports that always fail: the integration tests exercise
/// seed-phrase and multisig paths, not hardware round-trips.
pub struct NoDevice;

#[async_trait]
impl DeviceTransport for NoDevice {
    async fn sign_transaction(
        &self,
        device_id: &str,
        _account_index: u32,
        _signing_hash: [u8; 32],
    ) -> Result<Signature, WalletError> {
        Err(WalletError::DeviceCommunication(format!(
            "{} not connected",
            device_id
        )))
    }

    async fn sign_proof(
        &self,
        device_id: &str,
        _account_index: u32,
        _payload: &[u8],
    ) -> Result<Signature, WalletError> {
        Err(WalletError::DeviceCommunication(format!(
            "{} not connected",
            device_id
        )))
    }
}

#[async_trait]
impl QrTransport for NoDevice {
    async fn exchange(&self, _request: &[u8]) -> Result<Signature, WalletError> {
        Err(WalletError::DeviceCommunication("no QR scanner".to_string()))
    }
}

/// Test environment with automatic cleanup through TempDir.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub manager: WalletManager,
    pub gateway: Arc<MockGateway>,
    pub approval: Arc<StaticApprovalGate>,
}

impl TestEnvironment {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_approval(StaticApprovalGate::approving())
    }

    pub fn with_approval(approval: StaticApprovalGate) -> anyhow::Result<Self> {
        init_logging();
        let temp_dir = TempDir::new()?;
        log::info!("Test directory: {:?}", temp_dir.path());

        let storage = Storage::new_with_base_dir(temp_dir.path().to_path_buf());
        let gateway = Arc::new(MockGateway::new());
        let approval = Arc::new(approval);
        let manager = WalletManager::new(
            CoreConfig::default(),
            storage,
            gateway.clone(),
            approval.clone(),
            Arc::new(NoDevice),
            Arc::new(NoDevice),
        )?;

        Ok(Self {
            temp_dir,
            manager,
            gateway,
            approval,
        })
    }

    /// Re-open a manager over the same storage, as an app restart would.
    pub fn reopen(&self) -> anyhow::Result<WalletManager> {
        let storage = Storage::new_with_base_dir(self.temp_dir.path().to_path_buf());
        Ok(WalletManager::new(
            CoreConfig::default(),
            storage,
            self.gateway.clone(),
            self.approval.clone(),
            Arc::new(NoDevice),
            Arc::new(NoDevice),
        )?)
    }
}

/// A mainnet address distinct from anything the manager derives.
pub fn recipient_address() -> String {
    format!("0:{}", "42".repeat(32))
}

#[allow(dead_code)]
pub fn mainnet() -> Network {
    Network::Mainnet
}
