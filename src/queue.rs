//! Per-account operation serialization
//!
//! Every stateful flow (send, DApp request, removal) holds the account's
//! queue lock from before its first network read until after broadcast, so
//! two concurrent flows can never observe the same seqno. Different accounts
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

use crate::account::AccountId;

pub struct AccountQueues {
    locks: Mutex<HashMap<AccountId, Arc<tokio::sync::Mutex<()>>>>,
}

impl AccountQueues {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the queue slot for one account, waiting behind any in-flight
    /// operation on the same account.
    pub async fn acquire(&self, id: AccountId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("queue map lock poisoned");
            locks
                .entry(id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the slot for a removed account. Any guard already held stays
    /// valid through its own Arc.
    pub fn forget(&self, id: AccountId) {
        let mut locks = self.locks.lock().expect("queue map lock poisoned");
        locks.remove(&id);
    }
}

impl Default for AccountQueues {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_account_serializes() {
        let queues = Arc::new(AccountQueues::new());
        let id = AccountId::generate();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let queues = queues.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                let _guard = queues.acquire(id).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst);
                assert_eq!(now, 0, "two operations inside the same account queue");
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_accounts_do_not_block() {
        let queues = AccountQueues::new();
        let a = queues.acquire(AccountId::generate()).await;
        // A second account's queue is free while the first is held.
        let b = queues.acquire(AccountId::generate()).await;
        drop((a, b));
    }
}
