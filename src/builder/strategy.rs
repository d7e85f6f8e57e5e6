//! Sender-strategy selection
//!
//! An explicit user preference is tried first; otherwise the fallback order
//! is Regular -> Gasless -> Battery, first affordable option. The order is
//! deterministic, not balance-optimal.

use crate::account::{Wallet, WalletPrefs};
use crate::builder::message::{AssetId, SenderStrategy, TransferIntent, JETTON_TRANSFER_DEPOSIT};
use crate::error::WalletError;
use crate::gateway::{BlockchainGateway, JettonMetadata};

const FALLBACK_ORDER: [SenderStrategy; 3] = [
    SenderStrategy::Regular,
    SenderStrategy::Gasless,
    SenderStrategy::Battery,
];

pub(crate) async fn select_strategy(
    gateway: &dyn BlockchainGateway,
    wallet: &Wallet,
    prefs: &WalletPrefs,
    intent: &TransferIntent,
    jetton: Option<&JettonMetadata>,
    fee_estimate: u128,
) -> Result<SenderStrategy, WalletError> {
    let mut preferred_failure = None;

    if let Some(preference) = intent.strategy_preference {
        match check_strategy(gateway, wallet, prefs, intent, jetton, fee_estimate, preference).await
        {
            Ok(()) => return Ok(preference),
            Err(e) => {
                log::debug!("Preferred strategy {:?} not usable: {}", preference, e);
                preferred_failure = Some(e);
            }
        }
    }

    for strategy in FALLBACK_ORDER {
        if Some(strategy) == intent.strategy_preference {
            continue; // already tried
        }
        if check_strategy(gateway, wallet, prefs, intent, jetton, fee_estimate, strategy)
            .await
            .is_ok()
        {
            return Ok(strategy);
        }
    }

    // Surface the preferred strategy's own failure when one was requested;
    // the generic error is for callers who left the choice open.
    Err(preferred_failure.unwrap_or(WalletError::NoAffordableSenderStrategy))
}

async fn check_strategy(
    gateway: &dyn BlockchainGateway,
    wallet: &Wallet,
    prefs: &WalletPrefs,
    intent: &TransferIntent,
    jetton: Option<&JettonMetadata>,
    fee_estimate: u128,
    strategy: SenderStrategy,
) -> Result<(), WalletError> {
    match strategy {
        SenderStrategy::Regular => {
            let available = gateway.balance(&wallet.address).await?;
            let attached = match intent.asset {
                AssetId::Ton => intent.amount,
                AssetId::Jetton { .. } => JETTON_TRANSFER_DEPOSIT,
            };
            let needed = attached + fee_estimate;
            if available < needed {
                return Err(WalletError::InsufficientBalance { needed, available });
            }
            Ok(())
        }
        SenderStrategy::Gasless => {
            let master = match &intent.asset {
                AssetId::Jetton { master } => master,
                AssetId::Ton => {
                    return Err(WalletError::UnsupportedAsset(
                        "gasless requires a jetton transfer".to_string(),
                    ))
                }
            };
            let meta = jetton.ok_or_else(|| WalletError::UnsupportedAsset(master.to_raw()))?;
            if !meta.supports_gasless {
                return Err(WalletError::UnsupportedAsset(format!(
                    "{} has no gasless relayer",
                    meta.symbol
                )));
            }
            let available = gateway.jetton_balance(&wallet.address, master).await?;
            let needed = intent.amount + meta.gasless_fee;
            if available < needed {
                return Err(WalletError::InsufficientBalance { needed, available });
            }
            Ok(())
        }
        SenderStrategy::Battery => {
            if !prefs.battery.enabled {
                return Err(WalletError::InsufficientCredit {
                    needed: 1,
                    available: 0,
                });
            }
            let available = gateway.battery_credit(&wallet.address).await?;
            if available < 1 {
                return Err(WalletError::InsufficientCredit {
                    needed: 1,
                    available,
                });
            }
            Ok(())
        }
    }
}
