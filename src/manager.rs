//! Wallet manager
//!
//! Top-level orchestration: owns the registry, storage, credential vault,
//! signer factory, TonConnect bridge, and per-account operation queues, and
//! drives every multi-component flow (account lifecycle, transfers, DApp
//! requests). UI layers talk to this type and to the traits it consumes
//! ([`ApprovalGate`], [`BlockchainGateway`]); they never reach the
//! collaborators directly.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::account::{
    Account, AccountId, AccountKind, Network, Registry, RegistryEvent, TonAddress, Wallet,
    WalletId, WalletPrefs, WalletPrefsPatch, WalletVersion, DEFAULT_WALLET_VERSION,
};
use crate::approval::ApprovalGate;
use crate::builder::{
    self, OutboundMessage, Payload, Signature, SignedMessage, TransferIntent, UnsignedMessage,
};
use crate::config::CoreConfig;
use crate::error::WalletError;
use crate::gateway::BlockchainGateway;
use crate::queue::AccountQueues;
use crate::signer::{
    DeviceTransport, MnemonicSigner, MultisigArena, PendingTxId, QrTransport, SignerFactory,
};
use crate::storage::{FileVault, Storage, UnlockCredential};
use crate::tonconnect::{
    Bridge, ConnectionStore, DappError, RequestFlow, RequestKind, RequestState,
    TonConnectConnection,
};

/// Result of a send flow.
#[derive(Debug)]
pub enum SendOutcome {
    /// Message accepted by the network
    Broadcast {
        tx_hash: String,
        message: SignedMessage,
    },
    /// Multisig transfer waiting for more partial signatures; `message` is
    /// what the other participants must sign
    AwaitingSignatures {
        pending_id: PendingTxId,
        message: UnsignedMessage,
        have: usize,
        need: usize,
    },
}

/// One transfer inside a DApp `sendTransaction` request, as it arrives off
/// the wire.
#[derive(Clone, Debug)]
pub struct DappTransferMessage {
    pub address: String,
    pub amount: u128,
    /// Base64 message body supplied by the DApp, passed through opaquely
    pub payload: Option<String>,
}

pub struct WalletManager {
    config: CoreConfig,
    storage: Storage,
    registry: Mutex<Registry>,
    vault: Arc<FileVault>,
    gateway: Arc<dyn BlockchainGateway>,
    approval: Arc<dyn ApprovalGate>,
    signer_factory: SignerFactory,
    arena: Arc<MultisigArena>,
    bridge: Bridge,
    queues: AccountQueues,
}

impl WalletManager {
    /// Load persisted state and wire up the component graph.
    pub fn new(
        config: CoreConfig,
        storage: Storage,
        gateway: Arc<dyn BlockchainGateway>,
        approval: Arc<dyn ApprovalGate>,
        ledger: Arc<dyn DeviceTransport>,
        keystone: Arc<dyn QrTransport>,
    ) -> Result<Self, WalletError> {
        let state = storage.load_registry()?;
        log::info!(
            "Loaded registry: {} accounts, active={:?}",
            state.accounts.len(),
            state.active
        );
        let registry = Registry::from_state(state);

        let vault = Arc::new(FileVault::new(storage.credentials_dir()));
        let arena = Arc::new(MultisigArena::new());
        let signer_factory =
            SignerFactory::new(vault.clone(), ledger, keystone, arena.clone());
        let bridge = Bridge::new(&config, ConnectionStore::new(storage.clone()));

        Ok(Self {
            config,
            storage,
            registry: Mutex::new(registry),
            vault,
            gateway,
            approval,
            signer_factory,
            arena,
            bridge,
            queues: AccountQueues::new(),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Subscribe to registry change events.
    pub async fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RegistryEvent> {
        self.registry.lock().await.subscribe()
    }

    fn persist(&self, registry: &Registry) -> Result<(), WalletError> {
        Ok(self.storage.save_registry(&registry.to_state())?)
    }

    // ---- account lifecycle ----------------------------------------------

    /// Create a fresh account from newly generated entropy. Returns the
    /// mnemonic exactly once, for the backup prompt; it is never stored in
    /// plaintext.
    pub async fn create_account(
        &self,
        label: &str,
        credential: &UnlockCredential,
    ) -> Result<(AccountId, bip39::Mnemonic), WalletError> {
        let mut entropy = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut entropy);
        let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
            .map_err(|e| WalletError::Internal(format!("entropy rejected: {}", e)))?;

        let id = self
            .import_mnemonic(label, &mnemonic, credential, false)
            .await?;
        Ok((id, mnemonic))
    }

    /// Import an existing seed phrase as a single-wallet account.
    pub async fn import_account(
        &self,
        label: &str,
        phrase: &str,
        credential: &UnlockCredential,
    ) -> Result<AccountId, WalletError> {
        let mnemonic =
            bip39::Mnemonic::parse(phrase).map_err(|_| WalletError::InvalidCredential)?;
        self.import_mnemonic(label, &mnemonic, credential, false).await
    }

    /// Import a seed phrase as a multi-wallet account; further wallets can
    /// be derived with [`derive_wallet`](Self::derive_wallet).
    pub async fn import_multi_wallet_account(
        &self,
        label: &str,
        phrase: &str,
        credential: &UnlockCredential,
    ) -> Result<AccountId, WalletError> {
        let mnemonic =
            bip39::Mnemonic::parse(phrase).map_err(|_| WalletError::InvalidCredential)?;
        self.import_mnemonic(label, &mnemonic, credential, true).await
    }

    async fn import_mnemonic(
        &self,
        label: &str,
        mnemonic: &bip39::Mnemonic,
        credential: &UnlockCredential,
        multi_wallet: bool,
    ) -> Result<AccountId, WalletError> {
        let credential_id = self.vault.store_mnemonic(mnemonic, credential)?;

        let seed = crate::storage::UnlockedSeed::from_mnemonic(mnemonic);
        let public_key = seed.signing_key(0).verifying_key().to_bytes();
        drop(seed);

        let wallet =
            Wallet::for_public_key(public_key, DEFAULT_WALLET_VERSION, self.config.network);
        let kind = if multi_wallet {
            AccountKind::MultiMnemonic { credential_id }
        } else {
            match self.config.network {
                Network::Testnet => AccountKind::Testnet { credential_id },
                Network::Mainnet => AccountKind::Mnemonic { credential_id },
            }
        };
        let account = Account::new(label, kind, vec![wallet])?;

        self.add_account(account).await
    }

    /// Register a wallet whose key never touches this device.
    pub async fn add_watch_only(
        &self,
        label: &str,
        address: &str,
    ) -> Result<AccountId, WalletError> {
        let address = TonAddress::parse(address)?;
        address.require_network(self.config.network)?;

        let wallet = Wallet::new(address, [0u8; 32], DEFAULT_WALLET_VERSION, self.config.network);
        let account = Account::new(label, AccountKind::WatchOnly, vec![wallet])?;
        self.add_account(account).await
    }

    /// Register a hardware-device account from the key the device reported.
    pub async fn add_ledger_account(
        &self,
        label: &str,
        device_id: &str,
        account_index: u32,
        public_key: [u8; 32],
    ) -> Result<AccountId, WalletError> {
        let wallet =
            Wallet::for_public_key(public_key, DEFAULT_WALLET_VERSION, self.config.network);
        let account = Account::new(
            label,
            AccountKind::Ledger {
                device_id: device_id.to_string(),
                account_index,
            },
            vec![wallet],
        )?;
        self.add_account(account).await
    }

    /// Register an air-gapped QR-signer account.
    pub async fn add_keystone_account(
        &self,
        label: &str,
        device_label: &str,
        public_key: [u8; 32],
    ) -> Result<AccountId, WalletError> {
        let wallet =
            Wallet::for_public_key(public_key, DEFAULT_WALLET_VERSION, self.config.network);
        let account = Account::new(
            label,
            AccountKind::Keystone {
                device_label: device_label.to_string(),
            },
            vec![wallet],
        )?;
        self.add_account(account).await
    }

    /// Register a threshold account. The local phrase backs this device's
    /// partial signature; its key must be one of `signers`.
    pub async fn add_multisig_account(
        &self,
        label: &str,
        threshold: u8,
        signers: Vec<[u8; 32]>,
        local_phrase: &str,
        credential: &UnlockCredential,
    ) -> Result<AccountId, WalletError> {
        if threshold == 0 || threshold as usize > signers.len() {
            return Err(WalletError::Internal(format!(
                "threshold {} out of range for {} signers",
                threshold,
                signers.len()
            )));
        }

        let mnemonic =
            bip39::Mnemonic::parse(local_phrase).map_err(|_| WalletError::InvalidCredential)?;
        let seed = crate::storage::UnlockedSeed::from_mnemonic(&mnemonic);
        let local_key = seed.signing_key(0).verifying_key().to_bytes();
        drop(seed);
        if !signers.contains(&local_key) {
            return Err(WalletError::InvalidCredential);
        }

        let local_credential_id = self.vault.store_mnemonic(&mnemonic, credential)?;

        // The contract identity is fixed by the ordered signer set and the
        // threshold; every participant derives the same address.
        let contract_key = multisig_contract_key(threshold, &signers);
        let wallet = Wallet::for_public_key(
            contract_key,
            DEFAULT_WALLET_VERSION,
            self.config.network,
        );
        let account = Account::new(
            label,
            AccountKind::Multisig {
                threshold,
                signers,
                local_credential_id,
            },
            vec![wallet],
        )?;
        self.add_account(account).await
    }

    async fn add_account(&self, account: Account) -> Result<AccountId, WalletError> {
        let mut registry = self.registry.lock().await;
        let id = registry.add_account(account)?;
        self.persist(&registry)?;
        Ok(id)
    }

    /// Remove an account and cascade: its TonConnect connections die, its
    /// vault credential is wiped, and its queue slot is released.
    pub async fn remove_account(&self, id: AccountId) -> Result<(), WalletError> {
        // Wait out any in-flight operation before tearing down.
        let _queue = self.queues.acquire(id).await;

        let removed = {
            let mut registry = self.registry.lock().await;
            let removed = registry.remove_account(id)?;
            self.persist(&registry)?;
            removed
        };

        let wallet_ids: Vec<WalletId> = removed.wallets().iter().map(|w| w.id).collect();
        self.bridge.connections().remove_for_wallets(&wallet_ids)?;
        if let Some(credential_id) = removed.credential_id() {
            self.vault.delete(credential_id)?;
        }
        self.queues.forget(id);
        Ok(())
    }

    /// Derive the next wallet under a multi-wallet account.
    pub async fn derive_wallet(
        &self,
        account_id: AccountId,
        version: WalletVersion,
        credential: &UnlockCredential,
    ) -> Result<WalletId, WalletError> {
        let (credential_id, wallet_index, network) = {
            let registry = self.registry.lock().await;
            let account = registry
                .account(account_id)
                .ok_or_else(|| WalletError::NotFound(format!("account {}", account_id)))?;
            if !account.can_derive_more() {
                return Err(WalletError::Internal(format!(
                    "account {} cannot derive additional wallets",
                    account_id
                )));
            }
            let credential_id = account
                .credential_id()
                .ok_or_else(|| WalletError::Internal("derivable account without credential".to_string()))?;
            (credential_id, account.wallets().len() as u32, account.network())
        };

        let participant =
            MnemonicSigner::new_participant(self.vault.clone(), credential_id, wallet_index);
        let public_key = participant.public_key(credential).await?;
        let wallet = Wallet::for_public_key(public_key, version, network);

        let mut registry = self.registry.lock().await;
        let wallet_id = registry.add_derived_wallet(account_id, wallet)?;
        self.persist(&registry)?;
        log::info!("Derived wallet {} under account {}", wallet_id, account_id);
        Ok(wallet_id)
    }

    pub async fn list_accounts(&self) -> Vec<Account> {
        self.registry.lock().await.list_accounts().to_vec()
    }

    pub async fn active(&self) -> Option<(Account, Wallet)> {
        let registry = self.registry.lock().await;
        registry.active().map(|(a, w)| (a.clone(), w.clone()))
    }

    pub async fn set_active(
        &self,
        id: AccountId,
        wallet_index: usize,
    ) -> Result<(), WalletError> {
        let mut registry = self.registry.lock().await;
        registry.set_active(id, wallet_index)?;
        self.persist(&registry)
    }

    pub async fn rename_account(&self, id: AccountId, label: &str) -> Result<(), WalletError> {
        let mut registry = self.registry.lock().await;
        registry.rename_account(id, label)?;
        self.persist(&registry)
    }

    pub async fn wallet_prefs(&self, id: WalletId) -> Option<WalletPrefs> {
        self.registry.lock().await.wallet_prefs(id).cloned()
    }

    pub async fn update_wallet_prefs(
        &self,
        id: WalletId,
        patch: WalletPrefsPatch,
    ) -> Result<(), WalletError> {
        let mut registry = self.registry.lock().await;
        registry.update_wallet_prefs(id, patch)?;
        self.persist(&registry)
    }

    // ---- transfers -------------------------------------------------------

    /// Send from the active wallet.
    ///
    /// Holds the account's queue slot from the first seqno read through
    /// broadcast. A broadcast that fails with a network error is ambiguous
    /// (the message may have been accepted); the caller must surface that to
    /// the user instead of re-signing, or the retry could double-spend the
    /// seqno window.
    pub async fn send(&self, intent: TransferIntent) -> Result<SendOutcome, WalletError> {
        let (account, wallet, prefs) = {
            let registry = self.registry.lock().await;
            let (account, wallet) = registry
                .active()
                .ok_or_else(|| WalletError::NotFound("active account".to_string()))?;
            let prefs = registry.wallet_prefs(wallet.id).cloned().unwrap_or_default();
            (account.clone(), wallet.clone(), prefs)
        };

        // Resolves before any queue, vault, or network interaction;
        // watch-only accounts fail here.
        let signer = self.signer_factory.signer_for(&account, &wallet)?;

        let _queue = self.queues.acquire(account.id).await;
        let unsigned = builder::build(
            self.gateway.as_ref(),
            &wallet,
            &prefs,
            &intent,
            self.config.message_ttl_secs,
        )
        .await?;

        if !self
            .approval
            .approve_transaction("local", &unsigned.messages)
            .await?
        {
            return Err(WalletError::UserRejected);
        }

        let unlock = self.resolve_unlock(&account).await?;
        let signature = signer.sign(&unsigned, &unlock).await?;
        self.finish_send(&account, unsigned, signature).await
    }

    /// Feed in a partial signature collected out-of-band from another
    /// multisig participant, broadcasting if it completes the threshold.
    pub async fn submit_cosigner_signature(
        &self,
        account_id: AccountId,
        message: &UnsignedMessage,
        signer_key: [u8; 32],
        signature: Signature,
    ) -> Result<SendOutcome, WalletError> {
        let (threshold, signers) = {
            let registry = self.registry.lock().await;
            let account = registry
                .account(account_id)
                .ok_or_else(|| WalletError::NotFound(format!("account {}", account_id)))?;
            match &account.kind {
                AccountKind::Multisig {
                    threshold, signers, ..
                } => (*threshold, signers.clone()),
                _ => {
                    return Err(WalletError::Internal(format!(
                        "account {} is not multisig",
                        account_id
                    )))
                }
            }
        };

        let _queue = self.queues.acquire(account_id).await;
        self.arena
            .add_signature(message, threshold, &signers, signer_key, signature)?;
        self.resolve_multisig(message).await
    }

    async fn finish_send(
        &self,
        account: &Account,
        unsigned: UnsignedMessage,
        signature: Signature,
    ) -> Result<SendOutcome, WalletError> {
        if matches!(account.kind, AccountKind::Multisig { .. }) {
            // The signer already recorded our partial signature.
            self.resolve_multisig(&unsigned).await
        } else {
            let signed = SignedMessage::new(unsigned, signature);
            let tx_hash = self.gateway.broadcast(&signed).await?;
            log::info!("Broadcast transaction {}", tx_hash);
            Ok(SendOutcome::Broadcast {
                tx_hash,
                message: signed,
            })
        }
    }

    async fn resolve_multisig(
        &self,
        message: &UnsignedMessage,
    ) -> Result<SendOutcome, WalletError> {
        let pending_id = PendingTxId::of(message);
        if let Some(signed) = self.arena.take_ready(pending_id) {
            let tx_hash = self.gateway.broadcast(&signed).await?;
            log::info!("Broadcast multisig transaction {}", tx_hash);
            return Ok(SendOutcome::Broadcast {
                tx_hash,
                message: signed,
            });
        }
        let (have, need) = self
            .arena
            .pending(pending_id)
            .ok_or_else(|| WalletError::Internal("pending entry vanished".to_string()))?;
        Ok(SendOutcome::AwaitingSignatures {
            pending_id,
            message: message.clone(),
            have,
            need,
        })
    }

    async fn resolve_unlock(&self, account: &Account) -> Result<UnlockCredential, WalletError> {
        if account.credential_id().is_some() {
            self.approval.request_unlock(&account.label).await
        } else {
            // Device-backed signers never read the credential.
            Ok(UnlockCredential::Password(String::new()))
        }
    }

    // ---- TonConnect ------------------------------------------------------

    /// Run the full TonConnect handshake for a deep link against the active
    /// wallet.
    pub async fn connect_dapp(&self, link: &str) -> Result<TonConnectConnection, WalletError> {
        let (account, wallet) = self
            .active()
            .await
            .ok_or_else(|| WalletError::NotFound("active account".to_string()))?;
        let signer = self.signer_factory.signer_for(&account, &wallet)?;

        let mut session = self.bridge.open_session(link)?;
        self.bridge
            .connect(
                &mut session,
                &account,
                &wallet,
                signer.as_ref(),
                self.approval.as_ref(),
            )
            .await
    }

    pub fn list_connections(&self) -> Result<Vec<TonConnectConnection>, WalletError> {
        self.bridge.connections().list()
    }

    pub fn disconnect_dapp(&self, origin: &str, wallet_id: WalletId) -> Result<(), WalletError> {
        self.bridge.disconnect(origin, wallet_id)
    }

    /// Handle a `sendTransaction` request from a connected DApp.
    ///
    /// Failures map to the protocol's numeric error codes; the scope check
    /// runs before any signer or gateway interaction.
    pub async fn handle_dapp_request(
        &self,
        origin: &str,
        wallet_id: WalletId,
        messages: Vec<DappTransferMessage>,
    ) -> Result<String, DappError> {
        let mut flow = RequestFlow::new();
        match self
            .dapp_request_inner(origin, wallet_id, messages, &mut flow)
            .await
        {
            Ok(tx_hash) => {
                flow.completed();
                Ok(tx_hash)
            }
            Err(e) => {
                if flow.state() != RequestState::Rejected {
                    flow.failed();
                }
                let dapp_error = DappError::from_wallet_error(&e);
                log::warn!(
                    "DApp request from {} ended {:?}: code={} {}",
                    origin,
                    flow.state(),
                    dapp_error.code,
                    dapp_error.message
                );
                Err(dapp_error)
            }
        }
    }

    async fn dapp_request_inner(
        &self,
        origin: &str,
        wallet_id: WalletId,
        messages: Vec<DappTransferMessage>,
        flow: &mut RequestFlow,
    ) -> Result<String, WalletError> {
        let connection = self
            .bridge
            .connections()
            .find(origin, wallet_id)?
            .ok_or_else(|| WalletError::NotFound(format!("connection to {}", origin)))?;
        self.bridge
            .validate_scope(&connection, RequestKind::SendTransaction)?;

        let (account, wallet) = {
            let registry = self.registry.lock().await;
            let (account, wallet) = registry
                .wallet(wallet_id)
                .ok_or_else(|| WalletError::NotFound(format!("wallet {}", wallet_id)))?;
            (account.clone(), wallet.clone())
        };
        let signer = self.signer_factory.signer_for(&account, &wallet)?;

        let outbound = messages
            .into_iter()
            .map(|m| dapp_outbound(m, wallet.network))
            .collect::<Result<Vec<_>, _>>()?;

        flow.awaiting_approval();
        if !self.approval.approve_transaction(origin, &outbound).await? {
            flow.rejected();
            return Err(WalletError::UserRejected);
        }

        let _queue = self.queues.acquire(account.id).await;
        let unsigned = builder::build_raw(
            self.gateway.as_ref(),
            &wallet,
            outbound,
            self.config.message_ttl_secs,
        )
        .await?;

        flow.signing();
        let unlock = self.resolve_unlock(&account).await?;
        let signature = signer.sign(&unsigned, &unlock).await?;

        flow.broadcasting();
        match self.finish_send(&account, unsigned, signature).await? {
            SendOutcome::Broadcast { tx_hash, .. } => Ok(tx_hash),
            SendOutcome::AwaitingSignatures { have, need, .. } => {
                // A DApp expects a hash now; outstanding cosigners mean the
                // request cannot complete within the protocol exchange.
                Err(WalletError::SignerUnavailable(format!(
                    "threshold signatures outstanding ({}/{})",
                    have, need
                )))
            }
        }
    }
}

/// Deterministic contract identity for a threshold signer set.
fn multisig_contract_key(threshold: u8, signers: &[[u8; 32]]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update([threshold]);
    for signer in signers {
        hasher.update(signer);
    }
    hasher.finalize().into()
}

fn dapp_outbound(
    message: DappTransferMessage,
    network: Network,
) -> Result<OutboundMessage, WalletError> {
    let destination = TonAddress::parse(&message.address)?;
    destination.require_network(network)?;

    let payload = match message.payload {
        Some(encoded) => {
            use base64::engine::general_purpose::STANDARD;
            use base64::Engine;
            let bytes = STANDARD.decode(&encoded).map_err(|_| {
                WalletError::InvalidConnectionRequest("payload is not valid base64".to_string())
            })?;
            Some(Payload::Raw { bytes })
        }
        None => None,
    };

    Ok(OutboundMessage {
        destination,
        amount: message.amount,
        payload,
    })
}
