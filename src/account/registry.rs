//! Account registry
//!
//! Owns the ordered set of accounts, the single active (account, wallet)
//! selection, and per-wallet preferences. Every mutation keeps the active
//! selection coherent: it always resolves to an existing account/wallet, or
//! is explicitly `None` before any account exists.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::account::{Account, AccountId, Wallet, WalletId, WalletPrefs, WalletPrefsPatch};
use crate::error::WalletError;

/// State-change notifications for out-of-core subscribers (UI layer).
#[derive(Clone, Debug)]
pub enum RegistryEvent {
    AccountAdded(AccountId),
    AccountRemoved(AccountId),
    ActiveChanged(Option<(AccountId, usize)>),
    PrefsUpdated(WalletId),
}

/// Serializable snapshot of the registry, persisted as one JSON document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryState {
    pub accounts: Vec<Account>,
    pub active: Option<(AccountId, usize)>,
    pub prefs: HashMap<WalletId, WalletPrefs>,
}

pub struct Registry {
    accounts: Vec<Account>,
    active: Option<(AccountId, usize)>,
    prefs: HashMap<WalletId, WalletPrefs>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Registry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            accounts: Vec::new(),
            active: None,
            prefs: HashMap::new(),
            events,
        }
    }

    pub fn from_state(state: RegistryState) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            accounts: state.accounts,
            active: state.active,
            prefs: state.prefs,
            events,
        }
    }

    pub fn to_state(&self) -> RegistryState {
        RegistryState {
            accounts: self.accounts.clone(),
            active: self.active,
            prefs: self.prefs.clone(),
        }
    }

    /// Subscribe to state-change events. Lagging subscribers miss events
    /// rather than blocking mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is fine; send only fails when nobody listens.
        let _ = self.events.send(event);
    }

    /// Accounts in insertion order.
    pub fn list_accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn account_mut(&mut self, id: AccountId) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == id)
    }

    /// Find a wallet anywhere in the registry.
    pub fn wallet(&self, id: WalletId) -> Option<(&Account, &Wallet)> {
        self.accounts
            .iter()
            .find_map(|a| a.wallet_by_id(id).map(|w| (a, w)))
    }

    /// Add an account. The first account added becomes active. Fails if any
    /// contained wallet id already exists elsewhere.
    pub fn add_account(&mut self, account: Account) -> Result<AccountId, WalletError> {
        for wallet in account.wallets() {
            if self.wallet(wallet.id).is_some() {
                return Err(WalletError::DuplicateWalletId(wallet.id.to_string()));
            }
        }

        let id = account.id;
        for wallet in account.wallets() {
            self.prefs.entry(wallet.id).or_default();
        }
        self.accounts.push(account);

        if self.active.is_none() {
            self.active = Some((id, 0));
            self.emit(RegistryEvent::ActiveChanged(self.active));
        }
        self.emit(RegistryEvent::AccountAdded(id));

        log::info!("Account {} added ({} total)", id, self.accounts.len());
        Ok(id)
    }

    /// Remove an account and return it for cascade cleanup (connections,
    /// vault credentials). If it was active, the first remaining account
    /// becomes active, or the selection becomes none.
    pub fn remove_account(&mut self, id: AccountId) -> Result<Account, WalletError> {
        let position = self
            .accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))?;

        let removed = self.accounts.remove(position);
        for wallet in removed.wallets() {
            self.prefs.remove(&wallet.id);
        }

        if matches!(self.active, Some((active_id, _)) if active_id == id) {
            self.active = self.accounts.first().map(|a| (a.id, a.active_wallet_index()));
            self.emit(RegistryEvent::ActiveChanged(self.active));
        }
        self.emit(RegistryEvent::AccountRemoved(id));

        log::info!("Account {} removed ({} remaining)", id, self.accounts.len());
        Ok(removed)
    }

    /// Atomically switch the active selection. Validates both the account id
    /// and the wallet index before mutating anything.
    pub fn set_active(&mut self, id: AccountId, wallet_index: usize) -> Result<(), WalletError> {
        {
            let account = self
                .account(id)
                .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))?;
            if account.wallet(wallet_index).is_none() {
                return Err(WalletError::NotFound(format!(
                    "wallet index {} in account {}",
                    wallet_index, id
                )));
            }
        }

        // Both halves checked; now mutate.
        let account = self.account_mut(id).expect("validated above");
        account.set_active_wallet(wallet_index)?;
        self.active = Some((id, wallet_index));
        self.emit(RegistryEvent::ActiveChanged(self.active));
        Ok(())
    }

    pub fn active_selection(&self) -> Option<(AccountId, usize)> {
        self.active
    }

    /// Resolve the active selection to the concrete account and wallet.
    pub fn active(&self) -> Option<(&Account, &Wallet)> {
        let (id, index) = self.active?;
        let account = self.account(id)?;
        let wallet = account.wallet(index)?;
        Some((account, wallet))
    }

    pub fn rename_account(&mut self, id: AccountId, label: impl Into<String>) -> Result<(), WalletError> {
        let account = self
            .account_mut(id)
            .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))?;
        account.label = label.into();
        Ok(())
    }

    /// Append a derived wallet to a multi-wallet account.
    pub fn add_derived_wallet(&mut self, id: AccountId, wallet: Wallet) -> Result<WalletId, WalletError> {
        if self.wallet(wallet.id).is_some() {
            return Err(WalletError::DuplicateWalletId(wallet.id.to_string()));
        }
        let wallet_id = wallet.id;
        let account = self
            .account_mut(id)
            .ok_or_else(|| WalletError::NotFound(format!("account {}", id)))?;
        account.push_wallet(wallet)?;
        self.prefs.entry(wallet_id).or_default();
        Ok(wallet_id)
    }

    pub fn wallet_prefs(&self, id: WalletId) -> Option<&WalletPrefs> {
        self.prefs.get(&id)
    }

    /// Merge a patch into a wallet's preferences; unset fields untouched.
    pub fn update_wallet_prefs(
        &mut self,
        id: WalletId,
        patch: WalletPrefsPatch,
    ) -> Result<(), WalletError> {
        if self.wallet(id).is_none() {
            return Err(WalletError::NotFound(format!("wallet {}", id)));
        }
        self.prefs.entry(id).or_default().apply(patch);
        self.emit(RegistryEvent::PrefsUpdated(id));
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
