//! Per-wallet mutable preferences
//!
//! Pinned/hidden/trusted/spam asset sets and battery sponsorship settings.
//! Mutated only through explicit patches; lifecycle tied to the wallet.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatterySettings {
    /// Whether battery-sponsored sending is enabled for this wallet
    pub enabled: bool,
    /// Pre-purchased fee charges remaining
    pub charges: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPrefs {
    pub pinned_assets: BTreeSet<String>,
    pub hidden_assets: BTreeSet<String>,
    pub trusted_assets: BTreeSet<String>,
    pub spam_assets: BTreeSet<String>,
    pub battery: BatterySettings,
}

/// Partial update for [`WalletPrefs`]. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WalletPrefsPatch {
    pub pinned_assets: Option<BTreeSet<String>>,
    pub hidden_assets: Option<BTreeSet<String>>,
    pub trusted_assets: Option<BTreeSet<String>>,
    pub spam_assets: Option<BTreeSet<String>>,
    pub battery: Option<BatterySettings>,
}

impl WalletPrefs {
    pub fn apply(&mut self, patch: WalletPrefsPatch) {
        if let Some(pinned) = patch.pinned_assets {
            self.pinned_assets = pinned;
        }
        if let Some(hidden) = patch.hidden_assets {
            self.hidden_assets = hidden;
        }
        if let Some(trusted) = patch.trusted_assets {
            self.trusted_assets = trusted;
        }
        if let Some(spam) = patch.spam_assets {
            self.spam_assets = spam;
        }
        if let Some(battery) = patch.battery {
            self.battery = battery;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merges_only_set_fields() {
        let mut prefs = WalletPrefs::default();
        prefs.pinned_assets.insert("TON".to_string());
        prefs.battery = BatterySettings {
            enabled: true,
            charges: 5,
        };

        let patch = WalletPrefsPatch {
            hidden_assets: Some(BTreeSet::from(["SCAM".to_string()])),
            ..Default::default()
        };
        prefs.apply(patch);

        assert!(prefs.pinned_assets.contains("TON"));
        assert!(prefs.hidden_assets.contains("SCAM"));
        assert_eq!(prefs.battery.charges, 5);
    }

    #[test]
    fn test_patch_replaces_whole_set() {
        let mut prefs = WalletPrefs::default();
        prefs.pinned_assets.insert("TON".to_string());

        let patch = WalletPrefsPatch {
            pinned_assets: Some(BTreeSet::from(["USDT".to_string()])),
            ..Default::default()
        };
        prefs.apply(patch);

        assert!(!prefs.pinned_assets.contains("TON"));
        assert!(prefs.pinned_assets.contains("USDT"));
    }
}
