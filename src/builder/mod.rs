//! Transaction builder
//!
//! Converts a [`TransferIntent`] into a strategy-tagged [`UnsignedMessage`].
//! Validation happens before any network read; the builder never mutates
//! registry state and performs no signing.

mod message;
mod strategy;

use chrono::Utc;

use crate::account::{TonAddress, Wallet, WalletPrefs};
use crate::error::WalletError;
use crate::gateway::BlockchainGateway;

pub use message::{
    AssetId, OutboundMessage, Payload, SenderStrategy, SignedMessage, Signature, TransferIntent,
    UnsignedMessage, JETTON_TRANSFER_DEPOSIT,
};

/// Build an unsigned message for one transfer.
///
/// Steps: recipient validation, asset resolution, seqno + fee reads, sender
/// strategy selection.
pub async fn build(
    gateway: &dyn BlockchainGateway,
    wallet: &Wallet,
    prefs: &WalletPrefs,
    intent: &TransferIntent,
    message_ttl_secs: u64,
) -> Result<UnsignedMessage, WalletError> {
    let destination = TonAddress::parse(&intent.recipient)?;
    destination.require_network(wallet.network)?;

    log::info!(
        "Building transfer of {} minor units of {} from {} to {}",
        intent.amount,
        intent.asset.describe(),
        wallet.address.to_raw(),
        destination.to_raw()
    );

    let jetton = match &intent.asset {
        AssetId::Ton => None,
        AssetId::Jetton { master } => Some(gateway.jetton_metadata(master).await?),
    };

    let outbound = match &intent.asset {
        AssetId::Ton => OutboundMessage {
            destination,
            amount: intent.amount,
            payload: intent
                .comment
                .clone()
                .map(|text| Payload::Comment { text }),
        },
        AssetId::Jetton { master } => OutboundMessage {
            // The jetton wallet contract forwards tokens on our behalf; the
            // attached nanotons cover its forwarding costs.
            destination: *master,
            amount: JETTON_TRANSFER_DEPOSIT,
            payload: Some(Payload::JettonTransfer {
                master: *master,
                token_amount: intent.amount,
                recipient: destination,
            }),
        },
    };

    let seqno = gateway.sequence_number(&wallet.address).await?;
    let valid_until = Utc::now().timestamp() as u64 + message_ttl_secs;

    // Draft with a placeholder strategy to get a fee quote; the strategy tag
    // does not change the message's gas profile.
    let mut unsigned = UnsignedMessage {
        wallet_id: wallet.id,
        from: wallet.address,
        network: wallet.network,
        version: wallet.version,
        seqno,
        valid_until,
        strategy: SenderStrategy::Regular,
        fee_estimate: 0,
        messages: vec![outbound],
    };
    let fee_estimate = gateway.estimate_fee(&unsigned).await?;

    let strategy = strategy::select_strategy(
        gateway,
        wallet,
        prefs,
        intent,
        jetton.as_ref(),
        fee_estimate,
    )
    .await?;

    unsigned.strategy = strategy;
    unsigned.fee_estimate = fee_estimate;

    log::debug!(
        "Built message seqno={} strategy={:?} fee={}",
        seqno,
        strategy,
        fee_estimate
    );
    Ok(unsigned)
}

/// Build an unsigned message from already-resolved outbound messages, as
/// sent by a connected DApp. DApp transfers are always self-funded, so no
/// strategy selection runs; destinations must be validated by the caller.
pub async fn build_raw(
    gateway: &dyn BlockchainGateway,
    wallet: &Wallet,
    messages: Vec<OutboundMessage>,
    message_ttl_secs: u64,
) -> Result<UnsignedMessage, WalletError> {
    if messages.is_empty() {
        return Err(WalletError::InvalidConnectionRequest(
            "request carries no messages".to_string(),
        ));
    }

    let seqno = gateway.sequence_number(&wallet.address).await?;
    let valid_until = Utc::now().timestamp() as u64 + message_ttl_secs;

    let mut unsigned = UnsignedMessage {
        wallet_id: wallet.id,
        from: wallet.address,
        network: wallet.network,
        version: wallet.version,
        seqno,
        valid_until,
        strategy: SenderStrategy::Regular,
        fee_estimate: 0,
        messages,
    };
    unsigned.fee_estimate = gateway.estimate_fee(&unsigned).await?;

    let attached: u128 = unsigned.messages.iter().map(|m| m.amount).sum();
    let balance = gateway.balance(&wallet.address).await?;
    if balance < attached + unsigned.fee_estimate {
        return Err(WalletError::InsufficientBalance {
            needed: attached + unsigned.fee_estimate,
            available: balance,
        });
    }

    log::debug!(
        "Built raw message seqno={} messages={} fee={}",
        seqno,
        unsigned.messages.len(),
        unsigned.fee_estimate
    );
    Ok(unsigned)
}
