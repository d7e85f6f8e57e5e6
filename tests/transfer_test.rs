mod common;

use common::{password, TestEnvironment, TEST_MNEMONIC};
use std::sync::atomic::Ordering;
use ton_wallet_core::{
    AssetId, BatterySettings, JettonMetadata, SendOutcome, SenderStrategy, TonAddress,
    TransferIntent, WalletError, WalletPrefsPatch,
};

fn intent(asset: AssetId, amount: u128) -> TransferIntent {
    TransferIntent {
        asset,
        recipient: common::recipient_address(),
        amount,
        comment: Some("integration".to_string()),
        strategy_preference: None,
    }
}

async fn funded_env() -> (TestEnvironment, ton_wallet_core::WalletId) {
    let env = TestEnvironment::new().unwrap();
    env.manager
        .import_account("Main", TEST_MNEMONIC, &password())
        .await
        .unwrap();
    let (_, wallet) = env.manager.active().await.unwrap();
    (env, wallet.id)
}

#[tokio::test]
async fn test_send_five_ton_regular() {
    let (env, wallet_id) = funded_env().await;

    let outcome = env
        .manager
        .send(intent(AssetId::Ton, 5_000_000_000))
        .await
        .unwrap();

    let (tx_hash, signed) = match outcome {
        SendOutcome::Broadcast { tx_hash, message } => (tx_hash, message),
        other => panic!("expected broadcast, got {:?}", other),
    };
    assert!(!tx_hash.is_empty());
    assert_eq!(signed.message.strategy, SenderStrategy::Regular);
    assert_eq!(signed.message.seqno, 7);
    assert_eq!(signed.message.messages.len(), 1);
    assert_eq!(signed.message.messages[0].amount, 5_000_000_000);
    assert_eq!(env.gateway.broadcast_count(), 1);

    // Sending never mutates wallet preferences.
    let prefs = env.manager.wallet_prefs(wallet_id).await.unwrap();
    assert_eq!(prefs, Default::default());
}

#[tokio::test]
async fn test_insufficient_balance_reports_amounts() {
    let (env, _) = funded_env().await;
    env.gateway.set_balance(1_000_000);

    // An explicit Regular preference surfaces that strategy's own failure
    // with the concrete amounts.
    let mut transfer = intent(AssetId::Ton, 5_000_000_000);
    transfer.strategy_preference = Some(SenderStrategy::Regular);
    let result = env.manager.send(transfer).await;
    match result {
        Err(WalletError::InsufficientBalance { needed, available }) => {
            assert_eq!(available, 1_000_000);
            assert!(needed > 5_000_000_000);
        }
        other => panic!("expected InsufficientBalance, got {:?}", other),
    }
    assert_eq!(env.gateway.broadcast_count(), 0);
}

#[tokio::test]
async fn test_regular_wins_at_exact_affordability() {
    let (env, wallet_id) = funded_env().await;
    // Balance covers amount + fee with nothing to spare; battery is also
    // available but the fallback order is deterministic.
    env.gateway.set_balance(5_000_000_000 + 5_000_000);
    env.gateway.set_battery(10);
    env.manager
        .update_wallet_prefs(
            wallet_id,
            WalletPrefsPatch {
                battery: Some(BatterySettings {
                    enabled: true,
                    charges: 10,
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let outcome = env
        .manager
        .send(intent(AssetId::Ton, 5_000_000_000))
        .await
        .unwrap();
    match outcome {
        SendOutcome::Broadcast { message, .. } => {
            assert_eq!(message.message.strategy, SenderStrategy::Regular);
        }
        other => panic!("expected broadcast, got {:?}", other),
    }
}

#[tokio::test]
async fn test_battery_fallback_when_balance_is_short() {
    let (env, wallet_id) = funded_env().await;
    env.gateway.set_balance(1_000_000);
    env.gateway.set_battery(5);
    env.manager
        .update_wallet_prefs(
            wallet_id,
            WalletPrefsPatch {
                battery: Some(BatterySettings {
                    enabled: true,
                    charges: 5,
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let outcome = env
        .manager
        .send(intent(AssetId::Ton, 5_000_000_000))
        .await
        .unwrap();
    match outcome {
        SendOutcome::Broadcast { message, .. } => {
            assert_eq!(message.message.strategy, SenderStrategy::Battery);
        }
        other => panic!("expected broadcast, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gasless_jetton_when_ton_balance_is_short() {
    let (env, _) = funded_env().await;
    let master = TonAddress::new(0, [0x77; 32]);
    env.gateway.add_jetton(
        master,
        JettonMetadata {
            symbol: "USDT".to_string(),
            decimals: 6,
            supports_gasless: true,
            gasless_fee: 100_000,
        },
        50_000_000,
    );
    // Not enough TON even for the jetton-wallet deposit.
    env.gateway.set_balance(1_000_000);

    let outcome = env
        .manager
        .send(intent(AssetId::Jetton { master }, 5_000_000))
        .await
        .unwrap();
    match outcome {
        SendOutcome::Broadcast { message, .. } => {
            assert_eq!(message.message.strategy, SenderStrategy::Gasless);
        }
        other => panic!("expected broadcast, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_jetton_is_unsupported() {
    let (env, _) = funded_env().await;
    let master = TonAddress::new(0, [0x99; 32]);

    let result = env
        .manager
        .send(intent(AssetId::Jetton { master }, 1_000))
        .await;
    assert!(matches!(result, Err(WalletError::UnsupportedAsset(_))));
}

#[tokio::test]
async fn test_explicit_preference_failure_is_surfaced() {
    let (env, _) = funded_env().await;
    env.gateway.set_balance(1_000_000);
    // Battery preferred but never enabled; nothing else qualifies either.
    let mut transfer = intent(AssetId::Ton, 5_000_000_000);
    transfer.strategy_preference = Some(SenderStrategy::Battery);

    let result = env.manager.send(transfer).await;
    assert!(matches!(
        result,
        Err(WalletError::InsufficientCredit { .. })
    ));
}

#[tokio::test]
async fn test_no_strategy_qualifies() {
    let (env, _) = funded_env().await;
    env.gateway.set_balance(0);

    let result = env.manager.send(intent(AssetId::Ton, 1_000_000_000)).await;
    assert!(matches!(
        result,
        Err(WalletError::NoAffordableSenderStrategy)
    ));
    assert_eq!(env.gateway.broadcast_count(), 0);
}

#[tokio::test]
async fn test_user_rejection_stops_before_unlock() {
    let env = TestEnvironment::with_approval(common::StaticApprovalGate::rejecting()).unwrap();
    env.manager
        .import_account("Main", TEST_MNEMONIC, &password())
        .await
        .unwrap();

    let result = env.manager.send(intent(AssetId::Ton, 1_000_000_000)).await;
    assert!(matches!(result, Err(WalletError::UserRejected)));
    assert_eq!(env.approval.unlock_calls.load(Ordering::SeqCst), 0);
    assert_eq!(env.gateway.broadcast_count(), 0);
}

#[tokio::test]
async fn test_broadcast_failure_surfaces_network_error() {
    let (env, _) = funded_env().await;
    env.gateway.fail_broadcast.store(true, Ordering::SeqCst);

    let result = env.manager.send(intent(AssetId::Ton, 1_000_000_000)).await;
    assert!(matches!(result, Err(WalletError::Network(_))));
    // Nothing was accepted; the caller decides how to recover, the core
    // does not silently retry with a fresh signature.
    assert_eq!(env.gateway.broadcast_count(), 0);
}

#[tokio::test]
async fn test_invalid_recipient_fails_before_network() {
    let (env, _) = funded_env().await;
    let calls_before = env.gateway.call_count();

    let mut transfer = intent(AssetId::Ton, 1_000_000_000);
    transfer.recipient = "not-an-address".to_string();
    let result = env.manager.send(transfer).await;
    assert!(matches!(result, Err(WalletError::InvalidAddress(_))));
    assert_eq!(env.gateway.call_count(), calls_before);
}
